use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Latest a deadline is ever set; longer delays are clamped to it.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A cancellable one-shot timer expressed as an optional deadline.
///
/// Scheduling overwrites any previous deadline, so at most one is ever armed.
/// Cancelling a timer that already fired or was never armed does nothing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn new() -> Self {
        Self { at: None }
    }

    /// Arm the timer `delay` from now, replacing any pending deadline.
    pub fn schedule(&mut self, delay: Duration) {
        let now = Instant::now();
        self.at = Some(now + delay.min(FAR_FUTURE));
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    /// Resolve once the deadline passes. Never resolves while disarmed.
    ///
    /// Cancel safe. The deadline stays armed after it resolves; the caller
    /// cancels or reschedules it.
    pub async fn elapsed(&self) {
        match self.at {
            Some(at) => sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}
