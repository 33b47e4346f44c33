// How device authorization instructions reach the user
use crate::error::{Result, SsoError};
use chrono::{DateTime, Utc};

/// What the user needs to approve a pending device authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHandlerParams {
    pub verification_uri: String,
    pub user_code: String,
    /// Verification URI with the user code pre-filled, when the provider sent one.
    pub verification_uri_complete: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthHandlerParams {
    /// The URL worth opening: the pre-filled one if present.
    pub fn browser_url(&self) -> &str {
        if self.verification_uri_complete.is_empty() {
            &self.verification_uri
        } else {
            &self.verification_uri_complete
        }
    }
}

/// Presents device authorization instructions. Returning an error aborts the login.
pub trait AuthHandler: Send + Sync {
    fn present(&self, params: &AuthHandlerParams) -> Result<()>;
}

impl<F> AuthHandler for F
where
    F: Fn(&AuthHandlerParams) -> Result<()> + Send + Sync,
{
    fn present(&self, params: &AuthHandlerParams) -> Result<()> {
        self(params)
    }
}

/// Prints instructions to stderr and tries to open the verification page.
#[derive(Debug, Clone)]
pub struct BrowserAuthHandler {
    open_browser: bool,
}

impl BrowserAuthHandler {
    pub fn new(open_browser: bool) -> Self {
        Self { open_browser }
    }
}

impl Default for BrowserAuthHandler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AuthHandler for BrowserAuthHandler {
    fn present(&self, params: &AuthHandlerParams) -> Result<()> {
        let launch = if !self.open_browser {
            BrowserLaunch::Skipped
        } else {
            match webbrowser::open(params.browser_url()) {
                Ok(()) => BrowserLaunch::Opened,
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to open browser");
                    BrowserLaunch::Failed
                }
            }
        };

        eprint!("{}", render_instructions(params, launch, Utc::now()));
        Ok(())
    }
}

/// Refuses to prompt: login needs a human, so surface that as an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractiveAuthHandler;

impl AuthHandler for NonInteractiveAuthHandler {
    fn present(&self, params: &AuthHandlerParams) -> Result<()> {
        Err(SsoError::AuthenticationNeeded(format!(
            "interactive login required: visit {} and enter code {}",
            params.verification_uri, params.user_code
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BrowserLaunch {
    Skipped,
    Opened,
    Failed,
}

pub(crate) fn render_instructions(
    params: &AuthHandlerParams,
    launch: BrowserLaunch,
    now: DateTime<Utc>,
) -> String {
    let minutes_left = (params.expires_at - now).num_minutes().max(0);
    let mut out = String::new();

    out.push_str("\nAWS SSO device authorization\n\n");
    match launch {
        BrowserLaunch::Opened => {
            out.push_str("A browser window has been opened. If it did not open, visit:\n")
        }
        BrowserLaunch::Failed => {
            out.push_str("Failed to open browser automatically.\n");
            out.push_str("Open the following URL in a browser:\n");
        }
        BrowserLaunch::Skipped => out.push_str("Open the following URL in a browser:\n"),
    }
    out.push_str(&format!("  {}\n\n", params.verification_uri));
    out.push_str(&format!("Then enter the code:\n  {}\n\n", params.user_code));
    if !params.verification_uri_complete.is_empty() {
        out.push_str(&format!(
            "Or open this URL with the code pre-filled:\n  {}\n\n",
            params.verification_uri_complete
        ));
    }
    out.push_str(&format!(
        "The code expires in {} minutes. Waiting for authorization...\n",
        minutes_left
    ));
    out
}
