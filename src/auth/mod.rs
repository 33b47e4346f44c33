// AWS SSO OIDC authentication module
mod device_flow;
mod handler;
mod oidc;

pub use device_flow::{
    next_poll_step, polling_timeout, DeviceAuthorizationFlow, DeviceAuthorizationSession,
    FlowState, PollStep, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT,
};
pub use handler::{AuthHandler, AuthHandlerParams, BrowserAuthHandler, NonInteractiveAuthHandler};
pub use oidc::{
    ClientRegistration, DeviceAuthorizationInfo, OidcApi, OidcClient, PollResponse, TokenGrant,
};

use crate::cache::TokenCache;
use crate::config::{DEFAULT_CLIENT_NAME, DEFAULT_EXPIRY_WINDOW_MINUTES};
use crate::context::OperationContext;
use crate::credentials::SsoApi;
use crate::error::{Result, SsoError};
use crate::models::SsoToken;
use crate::validation::validate_login_request;
use chrono::{DateTime, Duration, Utc};

/// Parameters for one login.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub start_url: String,
    pub sso_region: String,
    /// Skip the cached-token short-circuit.
    pub force_refresh: bool,
    /// A cached token must stay valid this long to be reused.
    pub expiry_window: Duration,
}

impl LoginRequest {
    pub fn new(start_url: impl Into<String>, sso_region: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            sso_region: sso_region.into(),
            force_refresh: false,
            expiry_window: Duration::minutes(DEFAULT_EXPIRY_WINDOW_MINUTES),
        }
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn expiry_window(mut self, window: Duration) -> Self {
        self.expiry_window = window;
        self
    }
}

#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub token: SsoToken,
    pub expires_at: DateTime<Utc>,
    /// True when the cached token was reused and no device flow ran.
    pub from_cache: bool,
}

/// High-level authentication interface
#[derive(Debug, Clone)]
pub struct AuthManager {
    token_cache: TokenCache,
    client_name: String,
}

impl AuthManager {
    pub fn new(token_cache: TokenCache) -> Self {
        Self {
            token_cache,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        }
    }

    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.token_cache
    }

    /// Get cached token if valid, None if expired or not found
    pub fn get_cached_token(&self, start_url: &str) -> Result<Option<SsoToken>> {
        self.token_cache.get_token(start_url)
    }

    /// Cached token usable for `request`, if any. Read failures count as a miss.
    fn reusable_token(&self, request: &LoginRequest) -> Option<SsoToken> {
        if request.force_refresh {
            return None;
        }

        match self.get_cached_token(&request.start_url) {
            Ok(Some(token)) if token.is_valid_for(request.expiry_window) => Some(token),
            Ok(Some(token)) => {
                tracing::debug!(
                    expires_at = %token.expires_at,
                    "Cached token expires within the login window"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Token cache read failed, treating as miss");
                None
            }
        }
    }

    /// Log in, reusing the cached token unless it is too close to expiry.
    ///
    /// A failure to write the new token to the cache is logged and the token
    /// is still returned.
    pub async fn login(
        &self,
        api: &dyn OidcApi,
        request: &LoginRequest,
        handler: &dyn AuthHandler,
        ctx: &OperationContext,
    ) -> Result<LoginOutput> {
        validate_login_request(&request.start_url, &request.sso_region)?;

        if let Some(token) = self.reusable_token(request) {
            tracing::info!(
                start_url = %request.start_url,
                expires_at = %token.expires_at,
                "Using cached SSO token"
            );
            return Ok(LoginOutput {
                expires_at: token.expires_at,
                token,
                from_cache: true,
            });
        }

        tracing::info!(start_url = %request.start_url, "Starting device authorization");
        let mut flow = DeviceAuthorizationFlow::new(api, self.client_name.clone());
        let token = flow
            .run(&request.start_url, &request.sso_region, handler, ctx)
            .await?;

        if let Err(e) = self.token_cache.save_token(&request.start_url, &token) {
            tracing::warn!(error = %e, "Failed to cache SSO token");
        }

        tracing::info!(expires_at = %token.expires_at, "Login successful");
        Ok(LoginOutput {
            expires_at: token.expires_at,
            token,
            from_cache: false,
        })
    }

    /// Revoke the portal session if a token is cached, then delete the token file.
    ///
    /// Revocation is best effort; only failing to remove the file is an error.
    pub async fn logout(&self, api: &dyn SsoApi, start_url: &str) -> Result<()> {
        let token = match self.get_cached_token(start_url) {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(error = %e, "Token cache read failed during logout");
                None
            }
        };

        if let Some(token) = token {
            if let Err(e) = api.logout(&token.access_token).await {
                tracing::warn!(error = %e, "Failed to revoke SSO session");
            }
        }

        self.token_cache.remove_token(start_url)?;
        tracing::info!(start_url, "Logged out");
        Ok(())
    }

    /// Token for an API call: the cached one, a fresh login when `login` is
    /// set, otherwise [`SsoError::AuthenticationNeeded`].
    pub async fn get_token_for_operation(
        &self,
        api: &dyn OidcApi,
        request: &LoginRequest,
        login: bool,
        handler: &dyn AuthHandler,
        ctx: &OperationContext,
    ) -> Result<SsoToken> {
        if let Some(token) = self.reusable_token(request) {
            return Ok(token);
        }

        if !login {
            return Err(SsoError::AuthenticationNeeded(format!(
                "no valid SSO token for {}; run login first",
                request.start_url
            )));
        }

        Ok(self.login(api, request, handler, ctx).await?.token)
    }
}
