//! Single cancellable deadline used for push retries.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// At most one pending deadline. Scheduling again replaces the previous one.
#[derive(Debug, Default)]
pub struct RetryTimer {
    deadline: Option<Instant>,
}

impl RetryTimer {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    pub fn schedule(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    /// Clear the pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Resolves when the pending deadline passes, then clears it.
    ///
    /// Never resolves while nothing is scheduled, so it can sit in a
    /// `select!` alongside other events.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}
