// Device authorization flow: pure poll policy plus the driver that does the I/O

use super::handler::{AuthHandler, AuthHandlerParams};
use super::oidc::{ClientRegistration, DeviceAuthorizationInfo, OidcApi, PollResponse, TokenGrant};
use crate::context::OperationContext;
use crate::error::{Result, SsoError};
use crate::models::SsoToken;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound on the Polling state when the caller's deadline is later (or absent).
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Used when the provider does not send a usable interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Init,
    ClientRegistered,
    DeviceCodeObtained,
    AwaitingUser,
    Polling,
    Success,
    Failed,
    TimedOut,
    Cancelled,
}

/// Everything learned from registration and StartDeviceAuthorization.
#[derive(Debug, Clone)]
pub struct DeviceAuthorizationSession {
    pub registration: ClientRegistration,
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: String,
    pub interval: Duration,
    pub expires_at: DateTime<Utc>,
}

impl DeviceAuthorizationSession {
    pub fn new(
        registration: ClientRegistration,
        info: DeviceAuthorizationInfo,
        now: DateTime<Utc>,
    ) -> Self {
        let interval = if info.interval > 0 {
            Duration::from_secs(info.interval as u64)
        } else {
            DEFAULT_POLL_INTERVAL
        };

        Self {
            registration,
            device_code: info.device_code,
            user_code: info.user_code,
            verification_uri: info.verification_uri,
            verification_uri_complete: info.verification_uri_complete.unwrap_or_default(),
            interval,
            expires_at: now + chrono::Duration::seconds(i64::from(info.expires_in.max(0))),
        }
    }

    pub fn handler_params(&self) -> AuthHandlerParams {
        AuthHandlerParams {
            verification_uri: self.verification_uri.clone(),
            user_code: self.user_code.clone(),
            verification_uri_complete: self.verification_uri_complete.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// What the poll loop does after one CreateToken call.
#[derive(Debug)]
pub enum PollStep {
    /// Stay in Polling and sleep this long before the next attempt.
    Wait(Duration),
    Complete(TokenGrant),
    Fail(SsoError),
}

impl PollStep {
    pub fn state(&self) -> FlowState {
        match self {
            PollStep::Wait(_) => FlowState::Polling,
            PollStep::Complete(_) => FlowState::Success,
            PollStep::Fail(_) => FlowState::Failed,
        }
    }
}

/// Transition for one poll outcome.
///
/// Slow-down costs one extra interval on top of the regular tick.
pub fn next_poll_step(response: PollResponse, interval: Duration) -> PollStep {
    match response {
        PollResponse::Granted(grant) => PollStep::Complete(grant),
        PollResponse::AuthorizationPending => PollStep::Wait(interval),
        PollResponse::SlowDown => PollStep::Wait(interval * 2),
        PollResponse::Failed(err) => PollStep::Fail(err),
    }
}

/// Timeout for the Polling state: the default, cut short by an earlier deadline.
pub fn polling_timeout(deadline: Option<Instant>, now: Instant) -> Duration {
    match deadline {
        Some(deadline) => DEFAULT_POLL_TIMEOUT.min(deadline.saturating_duration_since(now)),
        None => DEFAULT_POLL_TIMEOUT,
    }
}

/// One run of the device authorization flow against an [`OidcApi`].
pub struct DeviceAuthorizationFlow<'a> {
    api: &'a dyn OidcApi,
    client_name: String,
    state: FlowState,
    poll_attempts: u32,
}

impl<'a> DeviceAuthorizationFlow<'a> {
    pub fn new(api: &'a dyn OidcApi, client_name: impl Into<String>) -> Self {
        Self {
            api,
            client_name: client_name.into(),
            state: FlowState::Init,
            poll_attempts: 0,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn poll_attempts(&self) -> u32 {
        self.poll_attempts
    }

    /// Run the flow to a terminal state and build the resulting token.
    pub async fn run(
        &mut self,
        start_url: &str,
        region: &str,
        handler: &dyn AuthHandler,
        ctx: &OperationContext,
    ) -> Result<SsoToken> {
        let result = ctx
            .guard(self.authorize(start_url, region, handler, ctx.deadline()))
            .await;

        let terminal = match &result {
            Ok(_) => FlowState::Success,
            Err(SsoError::Cancelled) => FlowState::Cancelled,
            Err(SsoError::TimedOut(_)) => FlowState::TimedOut,
            Err(_) => FlowState::Failed,
        };
        self.transition(terminal);
        result
    }

    fn transition(&mut self, next: FlowState) {
        tracing::debug!(from = ?self.state, to = ?next, "Device flow transition");
        self.state = next;
    }

    async fn authorize(
        &mut self,
        start_url: &str,
        region: &str,
        handler: &dyn AuthHandler,
        deadline: Option<Instant>,
    ) -> Result<SsoToken> {
        let registration = self.api.register_client(&self.client_name).await?;
        self.transition(FlowState::ClientRegistered);

        let info = self
            .api
            .start_device_authorization(&registration, start_url)
            .await?;
        let session = DeviceAuthorizationSession::new(registration, info, Utc::now());
        self.transition(FlowState::DeviceCodeObtained);

        self.transition(FlowState::AwaitingUser);
        handler.present(&session.handler_params())?;

        let timeout = polling_timeout(deadline, Instant::now());
        self.transition(FlowState::Polling);
        tracing::info!(
            interval = ?session.interval,
            timeout = ?timeout,
            "Waiting for device authorization"
        );

        let grant = match tokio::time::timeout(timeout, self.poll(&session)).await {
            Ok(grant) => grant?,
            Err(_) => return Err(SsoError::TimedOut(timeout)),
        };

        let now = Utc::now();
        Ok(SsoToken {
            access_token: grant.access_token,
            expires_at: now + chrono::Duration::seconds(i64::from(grant.expires_in)),
            refresh_token: grant.refresh_token,
            client_id: Some(session.registration.client_id),
            client_secret: Some(session.registration.client_secret),
            registration_time: Some(now),
            region: region.to_string(),
            start_url: start_url.to_string(),
        })
    }

    /// Sequential poll loop. The first attempt happens one interval after start.
    async fn poll(&mut self, session: &DeviceAuthorizationSession) -> Result<TokenGrant> {
        let mut wait = session.interval;
        loop {
            tokio::time::sleep(wait).await;
            self.poll_attempts += 1;

            let response = self
                .api
                .create_token(&session.registration, &session.device_code)
                .await;

            match next_poll_step(response, session.interval) {
                PollStep::Wait(next) => {
                    tracing::trace!(attempt = self.poll_attempts, wait = ?next, "Authorization pending");
                    wait = next;
                }
                PollStep::Complete(grant) => {
                    tracing::debug!(attempts = self.poll_attempts, "Token received");
                    return Ok(grant);
                }
                PollStep::Fail(err) => return Err(err),
            }
        }
    }
}
