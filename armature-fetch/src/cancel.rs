//! Request cancellation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::{FetchError, Result};

/// External cancellation handle.
///
/// Clones share state. Cancelling is idempotent: the first reason sticks.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl CancelToken {
    /// Create a token that has not fired.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the token.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    /// Whether the token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Reason passed to [`cancel`](Self::cancel), if fired.
    pub fn reason(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Wait until the token fires and return its reason.
    pub async fn cancelled(&self) -> String {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(reason) = rx.borrow_and_update().clone() {
                return reason;
            }
            if rx.changed().await.is_err() {
                // Sender lives as long as `self`; unreachable in practice.
                return futures::future::pending().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Single per-request abort signal fed by the timeout and the cancel token.
pub(crate) struct RequestSignal {
    timeout: Option<Duration>,
    token: Option<CancelToken>,
}

impl RequestSignal {
    pub(crate) fn new(timeout: Option<Duration>, token: Option<CancelToken>) -> Self {
        Self {
            timeout: timeout.filter(|t| !t.is_zero()),
            token,
        }
    }

    fn is_armed(&self) -> bool {
        self.timeout.is_some() || self.token.is_some()
    }

    /// Resolves with the error of whichever source fires first.
    async fn fired(&self) -> FetchError {
        let timeout = async {
            match self.timeout {
                Some(duration) => {
                    tokio::time::sleep(duration).await;
                    FetchError::Timeout(duration)
                }
                None => futures::future::pending().await,
            }
        };
        let token = async {
            match &self.token {
                Some(token) => FetchError::Cancelled(token.cancelled().await),
                None => futures::future::pending().await,
            }
        };

        tokio::select! {
            err = timeout => err,
            err = token => err,
        }
    }

    /// Run `fut` until it completes or the signal fires. The future is
    /// dropped on abort.
    pub(crate) async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if !self.is_armed() {
            return fut.await;
        }

        tokio::select! {
            biased;
            err = self.fired() => {
                tracing::debug!(error = %err, "Aborting in-flight request");
                Err(err)
            }
            result = fut => result,
        }
    }
}
