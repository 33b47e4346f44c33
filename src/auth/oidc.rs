use crate::error::{Result, SsoError};
use async_trait::async_trait;
use aws_sdk_ssooidc::error::ProvideErrorMetadata;
use aws_sdk_ssooidc::Client as SsoOidcClient;
use std::fmt;

pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const CLIENT_TYPE: &str = "public";

/// Public OIDC client registered for one login attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("client_id", &self.client_id)
            .field("client_secret", &"** redacted **")
            .finish()
    }
}

/// Device authorization information from StartDeviceAuthorization
#[derive(Debug, Clone)]
pub struct DeviceAuthorizationInfo {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    /// Lifetime of the device code, in seconds.
    pub expires_in: i32,
    /// Server-requested poll interval, in seconds.
    pub interval: i32,
}

/// Successful CreateToken response.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Token lifetime, in seconds.
    pub expires_in: i32,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Outcome of one CreateToken poll.
#[derive(Debug)]
pub enum PollResponse {
    Granted(TokenGrant),
    /// The user has not approved the request yet.
    AuthorizationPending,
    /// The provider wants us to poll less often.
    SlowDown,
    Failed(SsoError),
}

/// The SSO-OIDC operations the device flow needs.
#[async_trait]
pub trait OidcApi: Send + Sync {
    async fn register_client(&self, client_name: &str) -> Result<ClientRegistration>;

    async fn start_device_authorization(
        &self,
        registration: &ClientRegistration,
        start_url: &str,
    ) -> Result<DeviceAuthorizationInfo>;

    async fn create_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> PollResponse;
}

/// OIDC client for AWS SSO device flow authentication
pub struct OidcClient {
    client: SsoOidcClient,
}

impl OidcClient {
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::from_client(SsoOidcClient::new(&config))
    }

    pub fn from_client(client: SsoOidcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OidcApi for OidcClient {
    async fn register_client(&self, client_name: &str) -> Result<ClientRegistration> {
        tracing::debug!(client_name, "Registering client with SSO-OIDC");

        let response = self
            .client
            .register_client()
            .client_name(client_name)
            .client_type(CLIENT_TYPE)
            .send()
            .await
            .map_err(|e| SsoError::sdk("failed to register SSO client", e))?;

        let client_id = response
            .client_id()
            .ok_or_else(|| SsoError::MalformedResponse("No client_id in response".to_string()))?
            .to_string();

        let client_secret = response
            .client_secret()
            .ok_or_else(|| {
                SsoError::MalformedResponse("No client_secret in response".to_string())
            })?
            .to_string();

        tracing::debug!("Client registered successfully");
        Ok(ClientRegistration {
            client_id,
            client_secret,
        })
    }

    async fn start_device_authorization(
        &self,
        registration: &ClientRegistration,
        start_url: &str,
    ) -> Result<DeviceAuthorizationInfo> {
        tracing::debug!(start_url, "Starting device authorization");

        let response = self
            .client
            .start_device_authorization()
            .client_id(&registration.client_id)
            .client_secret(&registration.client_secret)
            .start_url(start_url)
            .send()
            .await
            .map_err(|e| SsoError::sdk("failed to start SSO device authorization", e))?;

        let required = |value: Option<&str>, name: &str| {
            value
                .map(str::to_string)
                .ok_or_else(|| SsoError::MalformedResponse(format!("No {} in response", name)))
        };

        Ok(DeviceAuthorizationInfo {
            device_code: required(response.device_code(), "device_code")?,
            user_code: required(response.user_code(), "user_code")?,
            verification_uri: required(response.verification_uri(), "verification_uri")?,
            verification_uri_complete: response.verification_uri_complete().map(str::to_string),
            expires_in: response.expires_in(),
            interval: response.interval(),
        })
    }

    async fn create_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> PollResponse {
        let result = self
            .client
            .create_token()
            .client_id(&registration.client_id)
            .client_secret(&registration.client_secret)
            .grant_type(DEVICE_CODE_GRANT_TYPE)
            .device_code(device_code)
            .send()
            .await;

        match result {
            Ok(response) => match response.access_token() {
                Some(access_token) => PollResponse::Granted(TokenGrant {
                    access_token: access_token.to_string(),
                    refresh_token: response.refresh_token().map(str::to_string),
                    expires_in: response.expires_in(),
                }),
                None => PollResponse::Failed(SsoError::MalformedResponse(
                    "No access_token in response".to_string(),
                )),
            },
            Err(err) => {
                let code = err.code().map(str::to_string);
                tracing::trace!(code = ?code, "CreateToken returned an error");

                match code.as_deref() {
                    Some("AuthorizationPendingException") => PollResponse::AuthorizationPending,
                    Some("SlowDownException") => PollResponse::SlowDown,
                    Some("ExpiredTokenException") => {
                        PollResponse::Failed(SsoError::AuthorizationExpired)
                    }
                    _ => PollResponse::Failed(SsoError::sdk("failed to obtain access token", err)),
                }
            }
        }
    }
}
