// Session management: login, listing and credential vending for one SSO instance
use crate::auth::{AuthHandler, AuthManager, LoginOutput, LoginRequest, OidcClient};
use crate::cache::{CredentialCache, TokenCache};
use crate::config::{CacheDirs, Config, DEFAULT_EXPIRY_WINDOW_MINUTES};
use crate::context::OperationContext;
use crate::credentials::{CredentialFetcher, RoleTarget, SsoApi, SsoCredentialProvider};
use crate::error::{Result, SsoError};
use crate::models::{AccountRole, AwsAccount, SsoInstance, SsoToken};
use crate::validation::{format_account_id, validate_login_request, validate_sdk_config_request};
use aws_types::region::Region;
use aws_types::SdkConfig;
use std::sync::Arc;

/// Account name used when accounts are given by id and not looked up.
pub const UNKNOWN_ACCOUNT_NAME: &str = "UNKNOWN";

/// What to build an SDK config for.
#[derive(Debug, Clone)]
pub struct SdkConfigRequest {
    pub instance: SsoInstance,
    pub account_id: String,
    pub role_name: String,
    /// Region for the SDK clients, which may differ from the SSO region.
    pub region: String,
}

pub struct SessionManager {
    auth: AuthManager,
    expiry_window: chrono::Duration,
}

impl SessionManager {
    pub fn new(cache_dirs: &CacheDirs) -> Self {
        Self {
            auth: AuthManager::new(TokenCache::new(&cache_dirs.sso_cache_dir)),
            expiry_window: chrono::Duration::minutes(DEFAULT_EXPIRY_WINDOW_MINUTES),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let cache_dirs = config.cache_dirs()?;
        let mut session = Self::new(&cache_dirs);
        session.auth = session
            .auth
            .with_client_name(config.login.client_name.clone());
        session.expiry_window = config.expiry_window();
        Ok(session)
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    fn login_request(&self, instance: &SsoInstance, force: bool) -> LoginRequest {
        LoginRequest::new(&instance.start_url, &instance.region)
            .force_refresh(force)
            .expiry_window(self.expiry_window)
    }

    pub async fn login(
        &self,
        instance: &SsoInstance,
        force: bool,
        handler: &dyn AuthHandler,
        ctx: &OperationContext,
    ) -> Result<LoginOutput> {
        validate_login_request(&instance.start_url, &instance.region)?;
        let api = OidcClient::new(&instance.region).await;
        self.auth
            .login(&api, &self.login_request(instance, force), handler, ctx)
            .await
    }

    pub async fn logout(&self, instance: &SsoInstance) -> Result<()> {
        let api = CredentialFetcher::new(&instance.region).await;
        self.auth.logout(&api, &instance.start_url).await
    }

    /// Cached token, or a login through `handler` when one is given.
    async fn token(
        &self,
        instance: &SsoInstance,
        handler: Option<&dyn AuthHandler>,
        ctx: &OperationContext,
    ) -> Result<SsoToken> {
        let request = self.login_request(instance, false);
        match handler {
            Some(handler) => {
                let api = OidcClient::new(&instance.region).await;
                self.auth
                    .get_token_for_operation(&api, &request, true, handler, ctx)
                    .await
            }
            None => self
                .auth
                .get_cached_token(&instance.start_url)
                .unwrap_or_else(|e| {
                    tracing::debug!(error = %e, "Token cache read failed, treating as miss");
                    None
                })
                .ok_or_else(|| {
                    SsoError::AuthenticationNeeded(format!(
                        "no valid SSO token for {}; run login first",
                        instance.start_url
                    ))
                }),
        }
    }

    /// All accounts visible to the SSO user.
    pub async fn list_accounts(
        &self,
        instance: &SsoInstance,
        handler: Option<&dyn AuthHandler>,
        ctx: &OperationContext,
    ) -> Result<Vec<AwsAccount>> {
        let token = self.token(instance, handler, ctx).await?;
        let api = CredentialFetcher::new(&instance.region).await;
        ctx.guard(api.list_accounts(&token.access_token)).await
    }

    /// Roles across `account_ids`, or across every visible account when empty.
    pub async fn list_roles(
        &self,
        instance: &SsoInstance,
        account_ids: &[String],
        handler: Option<&dyn AuthHandler>,
        ctx: &OperationContext,
    ) -> Result<Vec<AccountRole>> {
        let token = self.token(instance, handler, ctx).await?;
        let api = CredentialFetcher::new(&instance.region).await;
        ctx.guard(list_roles_with(&api, &token.access_token, account_ids))
            .await
    }

    /// Credential provider for one account/role backed by this session's token cache.
    pub async fn credential_provider(
        &self,
        instance: &SsoInstance,
        account_id: &str,
        role_name: &str,
        credential_cache: CredentialCache,
    ) -> SsoCredentialProvider {
        let api = CredentialFetcher::new(&instance.region).await;
        let target = RoleTarget::new(
            &instance.start_url,
            format_account_id(account_id),
            role_name,
        );
        SsoCredentialProvider::new(Arc::new(api), self.auth.token_cache().clone(), target)
            .with_credential_cache(credential_cache)
    }

    /// SDK config whose credentials come from the SSO session.
    ///
    /// With a handler, a missing or expiring token triggers a login first.
    pub async fn sdk_config(
        &self,
        request: &SdkConfigRequest,
        handler: Option<&dyn AuthHandler>,
        ctx: &OperationContext,
    ) -> Result<SdkConfig> {
        let account_id = format_account_id(&request.account_id);
        validate_sdk_config_request(
            &request.instance.start_url,
            &request.instance.region,
            &account_id,
            &request.role_name,
            &request.region,
        )?;

        self.token(&request.instance, handler, ctx).await?;

        let provider = self
            .credential_provider(
                &request.instance,
                &account_id,
                &request.role_name,
                CredentialCache::in_memory(),
            )
            .await;

        tracing::debug!(
            account_id = %account_id,
            role_name = %request.role_name,
            region = %request.region,
            "Building SDK config"
        );
        Ok(aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(request.region.clone()))
            .credentials_provider(provider)
            .load()
            .await)
    }
}

/// Accounts named only by id, with ids normalized.
pub fn accounts_from_ids(account_ids: &[String]) -> Vec<AwsAccount> {
    account_ids
        .iter()
        .map(|id| AwsAccount {
            account_id: format_account_id(id),
            account_name: UNKNOWN_ACCOUNT_NAME.to_string(),
            email_address: None,
        })
        .collect()
}

/// Collect roles per account. An account whose roles cannot be listed is
/// skipped with a warning.
pub async fn list_roles_with(
    api: &dyn SsoApi,
    access_token: &str,
    account_ids: &[String],
) -> Result<Vec<AccountRole>> {
    let accounts = if account_ids.is_empty() {
        api.list_accounts(access_token).await?
    } else {
        accounts_from_ids(account_ids)
    };

    let mut roles = Vec::new();
    for account in &accounts {
        match api
            .list_account_roles(access_token, &account.account_id)
            .await
        {
            Ok(names) => roles.extend(names.into_iter().map(|role_name| AccountRole {
                account_id: account.account_id.clone(),
                account_name: account.account_name.clone(),
                role_name,
            })),
            Err(e) => {
                tracing::warn!(
                    account_id = %account.account_id,
                    error = %e,
                    "Failed to list roles, skipping account"
                );
            }
        }
    }

    Ok(roles)
}
