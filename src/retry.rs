//! Retry policies for the watch session.
//!
//! The session deliberately carries two separate policies instead of one
//! generic retry abstraction: connection establishment backs off with a
//! fixed delay and retries forever, while the unread-message sweep
//! re-attempts its query immediately. Authentication, folder selection and
//! per-message processing failures are never retried.

use std::time::Duration;
use tracing::debug;

/// Retry policy for the Connecting state: fixed delay, unbounded attempts.
///
/// No jitter, no maximum - connectivity problems are waited out forever.
#[derive(Debug, Clone)]
pub struct ConnectRetry {
    delay: Duration,
}

impl ConnectRetry {
    /// Creates a policy with the given inter-attempt delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Returns the fixed inter-attempt delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleeps for one backoff interval.
    pub async fn pause(&self) {
        debug!(delay_secs = self.delay.as_secs(), "backing off before reconnect");
        tokio::time::sleep(self.delay).await;
    }
}

impl Default for ConnectRetry {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// Retry policy for the unread sweep: immediate re-attempt, unbounded.
///
/// The default delay is zero; the query is simply re-run on the live
/// session without reconnecting.
#[derive(Debug, Clone, Default)]
pub struct SweepRetry {
    delay: Duration,
}

impl SweepRetry {
    /// Creates a policy with the given inter-attempt delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Returns the inter-attempt delay (zero by default).
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Pauses before re-attempting the sweep query. A no-op at zero delay.
    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
