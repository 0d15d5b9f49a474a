//! Cancellation and deadline propagation for context-aware calls.

use crate::error::DriverError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_postgres::{CancelToken, NoTls};
use tokio_util::sync::CancellationToken;

/// Carries a cancellation signal and an optional deadline into a driver call.
///
/// A `Context` is cheap to clone; clones share the same cancellation token.
///
/// ```ignore
/// let ctx = Context::background().with_timeout(Duration::from_secs(2));
/// let ids: Vec<i64> = db.select_context(&ctx, builder::select("users").columns(&["id"])).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A fresh cancellable context, returning the token that cancels it.
    pub fn with_cancel() -> (Self, CancellationToken) {
        let token = CancellationToken::new();
        let ctx = Self {
            cancel: Some(token.clone()),
            deadline: None,
        };
        (ctx, token)
    }

    /// Observe an externally owned token (e.g. a service shutdown token).
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Keep the earlier of the current deadline and `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A context cancelled together with `self` that can also be cancelled alone.
    pub fn child(&self) -> (Self, CancellationToken) {
        let token = match &self.cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let ctx = Self {
            cancel: Some(token.clone()),
            deadline: self.deadline,
        };
        (ctx, token)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why this context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<DriverError> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(DriverError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(DriverError::DeadlineExceeded);
        }
        None
    }

    /// Drive `fut` until it completes or the context is done.
    ///
    /// A context that is already done fails before `fut` is polled. When the
    /// context ends first, `fut` is dropped and `server_cancel` (if any) is
    /// used to ask the server to abort the running statement.
    pub(crate) async fn run<T, F>(
        &self,
        server_cancel: Option<CancelToken>,
        fut: F,
    ) -> Result<T, DriverError>
    where
        F: Future<Output = Result<T, DriverError>> + Send,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        if self.cancel.is_none() && self.deadline.is_none() {
            return fut.await;
        }

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::pin!(fut);
        let err = tokio::select! {
            biased;
            result = &mut fut => return result,
            _ = cancelled => DriverError::Cancelled,
            _ = expired => DriverError::DeadlineExceeded,
        };

        if let Some(token) = server_cancel {
            tokio::spawn(async move {
                let _ = token.cancel_query(NoTls).await;
            });
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "easql.sql", reason = %err, "statement abandoned");
        Err(err)
    }
}
