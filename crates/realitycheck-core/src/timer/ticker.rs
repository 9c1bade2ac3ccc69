//! Repeating async tick source.
//!
//! Spawns a tokio task that fires on a fixed period and delivers the tick
//! number over a channel. The receiving side drives an
//! [`IntervalTracker`](super::IntervalTracker) with the current wall clock.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Handle to a running ticker. Dropping it stops the task.
pub struct Ticker {
    handle: JoinHandle<()>,
    rx: mpsc::Receiver<u64>,
}

impl Ticker {
    /// Start ticking every `period`. The first tick arrives after one
    /// full period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut count: u64 = 0;
            loop {
                interval.tick().await;
                count += 1;
                if tx.send(count).await.is_err() {
                    break;
                }
            }
        });
        Self { handle, rx }
    }

    /// Wait for the next tick. Returns `None` once the ticker is stopped.
    pub async fn next(&mut self) -> Option<u64> {
        self.rx.recv().await
    }

    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.handle.abort();
        self.rx.close();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn delivers_sequential_ticks() {
        let mut ticker = Ticker::spawn(Duration::from_secs(1));
        assert_eq!(ticker.next().await, Some(1));
        assert_eq!(ticker.next().await, Some(2));
        assert_eq!(ticker.next().await, Some(3));
        ticker.stop();
    }
}
