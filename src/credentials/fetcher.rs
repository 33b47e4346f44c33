use crate::error::{Result, SsoError};
use crate::models::{AwsAccount, RoleCredentials};
use async_trait::async_trait;
use aws_sdk_sso::Client as SsoClient;
use chrono::{TimeZone, Utc};

/// The AWS SSO portal operations used with an access token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SsoApi: Send + Sync {
    /// Exchange an access token for temporary credentials of one account/role.
    async fn get_role_credentials(
        &self,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials>;

    /// All accounts visible to the token, following pagination.
    async fn list_accounts(&self, access_token: &str) -> Result<Vec<AwsAccount>>;

    /// Role names in one account, following pagination.
    async fn list_account_roles(&self, access_token: &str, account_id: &str)
        -> Result<Vec<String>>;

    /// Revoke the portal session behind the token.
    async fn logout(&self, access_token: &str) -> Result<()>;
}

/// Fetches role credentials from AWS SSO
pub struct CredentialFetcher {
    client: SsoClient,
}

impl CredentialFetcher {
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::from_client(SsoClient::new(&config))
    }

    pub fn from_client(client: SsoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SsoApi for CredentialFetcher {
    async fn get_role_credentials(
        &self,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials> {
        tracing::debug!(account_id, role_name, "Fetching role credentials");

        let response = self
            .client
            .get_role_credentials()
            .access_token(access_token)
            .account_id(account_id)
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| SsoError::sdk("failed to get role credentials", e))?;

        let role_creds = response.role_credentials().ok_or_else(|| {
            SsoError::MalformedResponse("No role_credentials in response".to_string())
        })?;

        let field = |value: Option<&str>, name: &str| {
            value
                .map(str::to_string)
                .ok_or_else(|| SsoError::MalformedResponse(format!("No {} in credentials", name)))
        };

        let expiration = Utc
            .timestamp_millis_opt(role_creds.expiration())
            .single()
            .ok_or_else(|| SsoError::MalformedResponse("Invalid expiration timestamp".to_string()))?;

        Ok(RoleCredentials {
            access_key_id: field(role_creds.access_key_id(), "access_key_id")?,
            secret_access_key: field(role_creds.secret_access_key(), "secret_access_key")?,
            session_token: field(role_creds.session_token(), "session_token")?,
            expiration,
        })
    }

    async fn list_accounts(&self, access_token: &str) -> Result<Vec<AwsAccount>> {
        let mut accounts = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.client.list_accounts().access_token(access_token);

            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| SsoError::sdk("failed to list accounts", e))?;

            for account in response.account_list() {
                accounts.push(AwsAccount {
                    account_id: account.account_id().unwrap_or_default().to_string(),
                    account_name: account.account_name().unwrap_or_default().to_string(),
                    email_address: account.email_address().map(str::to_string),
                });
            }

            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        tracing::debug!(count = accounts.len(), "Listed accounts");
        Ok(accounts)
    }

    async fn list_account_roles(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<Vec<String>> {
        let mut roles = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_account_roles()
                .access_token(access_token)
                .account_id(account_id);

            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| SsoError::sdk("failed to list account roles", e))?;

            for role in response.role_list() {
                if let Some(role_name) = role.role_name() {
                    roles.push(role_name.to_string());
                }
            }

            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        Ok(roles)
    }

    async fn logout(&self, access_token: &str) -> Result<()> {
        self.client
            .logout()
            .access_token(access_token)
            .send()
            .await
            .map_err(|e| SsoError::sdk("failed to sign out of the SSO portal", e))?;
        Ok(())
    }
}
