//! Cancellable, deadline-bearing execution context.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why an operation did not run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Interrupted {
    pub fn kind(&self) -> &'static str {
        match self {
            Interrupted::Cancelled => "cancelled",
            Interrupted::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Derive a context whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    /// Derive a context cancelled together with this one, which can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check the context without waiting.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Run `fut` until it completes, the context is cancelled, or the
    /// deadline passes, whichever comes first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            _ = deadline => Err(Interrupted::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }

    /// Sleep for `duration` unless interrupted first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        self.run(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = ExecContext::background();
        assert_eq!(ctx.run(async { 42 }).await, Ok(42));
        assert!(ctx.check().is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let parent = ExecContext::background();
        let child = parent.child();
        parent.cancel();

        assert_eq!(child.check(), Err(Interrupted::Cancelled));
        assert_eq!(
            child.run(std::future::pending::<()>()).await,
            Err(Interrupted::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let ctx = ExecContext::background().with_timeout(Duration::from_secs(5));

        let result = ctx.run(tokio::time::sleep(Duration::from_secs(60))).await;
        assert_eq!(result, Err(Interrupted::DeadlineExceeded));
        assert_eq!(ctx.check(), Err(Interrupted::DeadlineExceeded));

        let shorter = ctx.with_timeout(Duration::from_secs(3600));
        assert_eq!(shorter.deadline(), ctx.deadline());
    }
}
