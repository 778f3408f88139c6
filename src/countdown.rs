//! Resend countdown owned by an authentication attempt.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Cancellable one-second ticker counting down to resend availability.
///
/// The task only publishes the remaining seconds, it never touches any
/// other attempt state. Dropping the handle aborts the task, so a
/// replaced attempt can never be mutated by a stale ticker.
#[derive(Debug)]
pub struct Countdown {
    remaining: watch::Receiver<u32>,
    task: JoinHandle<()>,
}

impl Countdown {
    /// Spawn a ticker from `seconds` down to zero, one decrement per
    /// second, the first a full second after start.
    pub fn start(seconds: u32) -> Self {
        let (tx, rx) = watch::channel(seconds);

        let task = tokio::spawn(async move {
            if seconds == 0 {
                return;
            }

            let period = Duration::from_secs(1);
            let mut ticker =
                time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let mut done = false;
                tx.send_modify(|remaining| {
                    *remaining = remaining.saturating_sub(1);
                    done = *remaining == 0;
                });

                if done {
                    break;
                }
            }
        });

        Self {
            remaining: rx,
            task,
        }
    }

    /// Seconds left before resend is allowed.
    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    /// The countdown reached zero: resend may be offered.
    pub fn finished(&self) -> bool {
        self.remaining() == 0
    }

    /// Wait for the next published value.
    ///
    /// Returns `false` once the ticker has stopped, letting hosts drive
    /// a render loop without polling.
    pub async fn changed(&mut self) -> bool {
        self.remaining.changed().await.is_ok()
    }

    /// Stop ticking and return the seconds that were left.
    pub fn cancel(self) -> u32 {
        self.task.abort();
        *self.remaining.borrow()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_decrements_once_per_second() {
        let countdown = Countdown::start(3);
        assert_eq!(countdown.remaining(), 3);
        assert!(!countdown.finished());

        // Half a second in, nothing has ticked yet.
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(countdown.remaining(), 3);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(countdown.remaining(), 2);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(countdown.remaining(), 1);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(countdown.remaining(), 0);
        assert!(countdown.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_zero() {
        let countdown = Countdown::start(1);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(countdown.remaining(), 0);
        assert!(countdown.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_start_is_immediately_finished() {
        let countdown = Countdown::start(0);
        assert!(countdown.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_returns_snapshot() {
        let countdown = Countdown::start(30);

        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(countdown.cancel(), 28);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_reports_ticks_then_completion() {
        let mut countdown = Countdown::start(2);

        assert!(countdown.changed().await);
        assert_eq!(countdown.remaining(), 1);

        assert!(countdown.changed().await);
        assert_eq!(countdown.remaining(), 0);

        // Ticker has exited, no further updates.
        assert!(!countdown.changed().await);
    }
}
