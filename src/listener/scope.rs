use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Why a scoped wait was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeExit {
    /// The scope's own deadline passed
    TimedOut,
    /// The scope (or one of its ancestors) was cancelled
    Cancelled,
}

/// "This run is still alive" signal with an optional deadline.
///
/// Child scopes inherit cancellation from their parent but carry their own
/// deadline; expiring or cancelling a child never affects the parent or its
/// siblings.
#[derive(Debug, Clone)]
pub struct CancellationScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for CancellationScope {
    fn default() -> Self {
        Self::root()
    }
}

impl CancellationScope {
    /// Creates a scope with no parent and no deadline
    pub fn root() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derives a child that expires after `timeout` unless cancelled first
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            token: self.token.child_token(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled (deadlines are not considered)
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Drives `fut` until it completes, the deadline passes or the scope is
    /// cancelled, whichever comes first. An expired deadline cancels this
    /// scope so anything else derived from it unwinds too.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ScopeExit> {
        let deadline = async {
            match self.deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ScopeExit::Cancelled),
            _ = deadline => {
                self.token.cancel();
                Err(ScopeExit::TimedOut)
            }
            output = fut => Ok(output),
        }
    }
}
