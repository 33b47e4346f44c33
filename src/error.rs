use std::time::Duration;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum SsoError {
    #[error("{context}: {source}")]
    AwsSdk {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// No usable cached token and interactive login was not requested.
    #[error("{0}")]
    AuthenticationNeeded(String),

    #[error("Authorization expired - user took too long to complete device flow")]
    AuthorizationExpired,

    #[error("SSO authorization timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),
}

impl SsoError {
    /// Wrap a provider error, keeping it reachable through `source()`.
    pub fn sdk(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        SsoError::AwsSdk {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn authentication_needed() -> Self {
        SsoError::AuthenticationNeeded("authentication needed".to_string())
    }

    pub fn is_authentication_needed(&self) -> bool {
        matches!(self, SsoError::AuthenticationNeeded(_))
    }
}

pub type Result<T> = std::result::Result<T, SsoError>;
