use crate::timer::Deadline;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Disconnect after this long without a ping from the server
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(90);

/// Tracks the ping timeout of one session.
///
/// Every liveness signal pushes the deadline out by the full timeout. The
/// session fails if the deadline passes first.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    timeout: Duration,
    deadline: Deadline,
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_TIMEOUT)
    }
}

impl LivenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: Deadline::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Restart the timeout window.
    pub fn reset(&mut self) {
        self.deadline.schedule(self.timeout);
        trace!(timeout = ?self.timeout, "Liveness timer reset");
    }

    pub fn cancel(&mut self) {
        self.deadline.cancel();
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_armed()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.instant()
    }

    /// Resolves when the timeout passes without a reset. Cancel safe.
    pub async fn expired(&self) {
        self.deadline.elapsed().await
    }
}
