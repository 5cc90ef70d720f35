//! Instruction runner: executes operations against the one owned backend,
//! absorbing transient stale-element-reference failures.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, ShimError};
use crate::shim::backend::Browser;
use crate::shim::capability::Operation;

/// Attempts per instruction before the stale error is re-raised.
pub const DEFAULT_CALL_TRIES: u32 = 10;
/// Pause between attempts, 1,000,000 microseconds.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_micros(1_000_000);

/// Owns exactly one Automation Instance and runs instructions against it.
///
/// A stale element reference means the DOM moved under the instruction, so
/// the call is retried after a pause until the budget runs out, at which
/// point the last stale error is re-raised. Every other error is returned
/// immediately and untouched.
pub struct CommandRunner {
    browser: Box<dyn Browser>,
    tries: u32,
    interval: Duration,
}

impl CommandRunner {
    pub fn new(browser: Box<dyn Browser>) -> Self {
        Self::with_policy(browser, DEFAULT_CALL_TRIES, DEFAULT_RETRY_INTERVAL)
    }

    /// Runner with a custom retry budget. `tries` is clamped to at least one
    /// attempt.
    pub fn with_policy(browser: Box<dyn Browser>, tries: u32, interval: Duration) -> Self {
        Self {
            browser,
            tries: tries.max(1),
            interval,
        }
    }

    /// Direct access to the owned backend, for lifecycle hooks and call
    /// sites building the instruction closure.
    pub fn browser(&self) -> &dyn Browser {
        self.browser.as_ref()
    }

    /// Runs `call` until it succeeds, fails with a non-stale error, or the
    /// retry budget is exhausted. The closure is re-invoked for every
    /// attempt so each retry issues a fresh backend call.
    pub async fn invoke<T, F, Fut>(&self, operation: Operation, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut remaining = self.tries;
        loop {
            remaining -= 1;
            match call().await {
                Err(ShimError::StaleElement(reason)) if remaining > 0 => {
                    tracing::debug!(
                        operation = operation.name(),
                        remaining,
                        %reason,
                        "stale element reference, retrying"
                    );
                    tokio::time::sleep(self.interval).await;
                }
                result => return result,
            }
        }
    }
}
