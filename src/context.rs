//! Cancellable execution context for queries.
//!
//! A [`Context`] carries a cancellation token and an optional deadline. The
//! database clients wrap each I/O await in [`Context::run`], so cancellation
//! takes effect at the client boundary and never inside the mapper.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{HsqlError, Result};

/// Execution context passed to every executor call.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a copy of this context that expires after `timeout`.
    ///
    /// An earlier existing deadline is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    /// Returns a copy of this context that is cancelled through `token`.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: token,
            deadline: self.deadline,
        }
    }

    /// Token that cancels this context.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancels this context and every clone sharing its token.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails fast when the context is already done.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(HsqlError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(HsqlError::Timeout),
            _ => Ok(()),
        }
    }

    /// Drives `fut` to completion unless the context is cancelled or expires first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let guarded = async {
            tokio::select! {
                _ = self.cancel.cancelled() => Err(HsqlError::Cancelled),
                res = fut => res,
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .map_err(|_| HsqlError::Timeout)?,
            None => guarded.await,
        }
    }
}
