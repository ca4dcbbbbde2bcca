//! Execution controls for version-control calls: deadline, retry with
//! exponential backoff, and run cancellation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::obs::emit_call_retry;
use crate::vcs::{ToolError, ToolResult};

/// Bounded retry for transient (network) failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries (0 = run once).
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries (milliseconds).
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

/// Await `call`, converting an expired deadline into [`ToolError::Timeout`].
///
/// The call's future is dropped on expiry.
pub async fn with_deadline<T, Fut>(limit: Duration, command: &str, call: Fut) -> ToolResult<T>
where
    Fut: Future<Output = ToolResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_elapsed) => Err(ToolError::Timeout {
            command: command.to_string(),
            limit_ms: limit.as_millis() as u64,
        }),
    }
}

/// Run `call` under a per-attempt deadline, retrying transient failures.
///
/// Non-transient errors ([`ToolError::is_transient`]) are returned at once.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    limit: Duration,
    command: &str,
    call: F,
) -> ToolResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ToolResult<T>>,
{
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 1;
    loop {
        match with_deadline(limit, command, call()).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                emit_call_retry(command, attempt, delay, &err);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Cooperative cancellation for an in-flight run.
///
/// Cloning shares the same signal.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Resolve once the signal behind `rx` is raised.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: cancellation can no longer happen.
            std::future::pending::<()>().await;
        }
    }
}
