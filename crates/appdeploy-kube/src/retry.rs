//! Bounded polling with a fixed delay
//!
//! Used for cluster objects that are created asynchronously by a controller,
//! such as the `default` service account of a fresh namespace.

use std::future::Future;
use std::time::Duration;

use crate::error::{KubeError, Result};

/// Default number of attempts
pub const DEFAULT_ATTEMPTS: u32 = 10;

/// Default delay between attempts
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least one is always made)
    pub attempts: u32,
    /// Delay between two attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Poll `op` until it yields a value
    ///
    /// `op` returns `Ok(Some(_))` on success, `Ok(None)` when the thing it waits
    /// for is not there yet, and `Err(_)` to abort immediately. Once the attempt
    /// budget is spent a [`KubeError::ProvisioningTimeout`] naming `what` is
    /// returned.
    pub async fn poll<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let attempts = self.attempts.max(1);

        for attempt in 1..=attempts {
            if let Some(value) = op().await? {
                return Ok(value);
            }

            tracing::debug!(what, attempt, attempts, "not available yet");

            if attempt < attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(KubeError::ProvisioningTimeout {
            what: what.to_string(),
            attempts,
        })
    }
}
