//! Absolute cut-off times for the blocking stages of a request.

use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, error::Elapsed, timeout_at};

/// A budget pinned to the moment it was started.
///
/// Each stage derives its own deadline with [`Deadline::after`] when it begins,
/// so stages are siblings: time spent in one never shrinks another's budget.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Drives `fut` until it completes or the deadline passes.
    ///
    /// On expiry `fut` is dropped, which cancels whatever I/O it was awaiting.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        timeout_at(self.at, fut).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_run_completes_within_budget() {
        let deadline = Deadline::after(Duration::from_millis(200));
        let result = deadline
            .run(async {
                sleep(Duration::from_millis(50)).await;
                42
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert!(!deadline.is_expired());
        assert!(deadline.remaining() <= Duration::from_millis(150));
        assert!(deadline.remaining() > Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cancels_slow_future() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let result = deadline.run(sleep(Duration::from_millis(500))).await;
        assert!(result.is_err());
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sibling_deadline_gets_full_budget() {
        let fetch = Deadline::after(Duration::from_millis(200));
        sleep(Duration::from_millis(190)).await;

        // Started after a slow first stage, the second still owns all of its budget.
        let persist = Deadline::after(Duration::from_millis(10));
        assert_eq!(persist.remaining(), Duration::from_millis(10));
        assert!(fetch.remaining() <= Duration::from_millis(10));
        assert_eq!(persist.budget(), Duration::from_millis(10));
    }
}
