// Cancellation and deadline carried through public operations
use crate::error::{Result, SsoError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Caller-supplied cancellation signal and optional deadline.
#[derive(Debug, Clone)]
pub struct OperationContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drive `fut` until it finishes or the context is cancelled.
    ///
    /// The deadline is not enforced here; callers that own a timeout policy
    /// read it through [`deadline`](Self::deadline).
    pub async fn guard<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SsoError::Cancelled),
            result = fut => result,
        }
    }

    /// Drive `fut` under the context deadline, or under `default_timeout`
    /// when the context has none.
    pub async fn run_with_default_timeout<T>(
        &self,
        default_timeout: Duration,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let start = Instant::now();
        let deadline = self.deadline.unwrap_or(start + default_timeout);

        self.guard(async {
            match tokio::time::timeout_at(deadline, fut).await {
                Ok(result) => result,
                Err(_) => Err(SsoError::TimedOut(deadline.saturating_duration_since(start))),
            }
        })
        .await
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_default_timeout_applies_without_deadline() {
        let ctx = OperationContext::new();
        let result: Result<()> = ctx
            .run_with_default_timeout(Duration::from_secs(30), async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(SsoError::TimedOut(d)) if d == Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_deadline_overrides_default() {
        let ctx = OperationContext::new().with_timeout(Duration::from_secs(90));
        let result = ctx
            .run_with_default_timeout(Duration::from_secs(30), async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(42)
            })
            .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let cancel = CancellationToken::new();
        let ctx = OperationContext::new().with_cancellation(cancel.clone());
        cancel.cancel();

        let result: Result<()> = ctx.guard(std::future::pending()).await;
        assert!(matches!(result, Err(SsoError::Cancelled)));
    }
}
