//! Periodic session refresh
//!
//! The gateway drops sessions that are not refreshed, so while logged in a
//! background task posts a refresh once per period. The loop ends for good on
//! the first non-success reply or when cancelled. It never re-logs in.

use crate::gateway::RequestOutcome;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the keep-alive loop drives
#[async_trait]
pub trait KeepAliveTarget: Send + Sync + 'static {
    /// Called before each refresh. Returning false ends the loop silently.
    fn begin_tick(&self) -> bool;

    async fn refresh(&self) -> RequestOutcome;

    /// Record a refresh outcome. Returning false means the session was
    /// stopped while the refresh was in flight and the outcome was dropped.
    fn finish_tick(&self, outcome: RequestOutcome) -> bool;
}

/// Handle to a running keep-alive task
pub struct KeepAlive {
    cancel: watch::Sender<bool>,
    task: JoinHandle<Option<RequestOutcome>>,
}

impl KeepAlive {
    /// Start refreshing `target` every `period`, first tick one period from now
    pub fn spawn<T: KeepAliveTarget>(target: Arc<T>, period: Duration) -> Self {
        let (cancel, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(run(target, period, cancel_rx));
        info!("Keep-alive armed, refreshing every {:?}", period);
        Self { cancel, task }
    }

    /// Stop scheduling further ticks
    ///
    /// A tick already past `begin_tick` runs to completion; the target is
    /// expected to discard its outcome.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end, returning the outcome that stopped it
    ///
    /// `None` when it was cancelled or its result discarded.
    pub async fn join(self) -> Option<RequestOutcome> {
        self.task.await.ok().flatten()
    }
}

async fn run<T: KeepAliveTarget>(
    target: Arc<T>,
    period: Duration,
    mut cancel: watch::Receiver<bool>,
) -> Option<RequestOutcome> {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            // a dropped handle counts as cancellation too
            _ = cancel.changed() => {
                debug!("Keep-alive cancelled");
                return None;
            }
        }

        if *cancel.borrow() || !target.begin_tick() {
            debug!("Session stopped, skipping refresh");
            return None;
        }

        let outcome = match target.refresh().await {
            RequestOutcome::TransportFailure => {
                warn!("Refresh got no response from the gateway");
                RequestOutcome::NotConnected
            }
            outcome => outcome,
        };

        if !target.finish_tick(outcome) {
            debug!("Session stopped during refresh, discarding {}", outcome);
            return None;
        }

        if !outcome.is_success() {
            info!("Keep-alive stopped: refresh returned {}", outcome);
            return Some(outcome);
        }

        info!("Refresh succeeded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::Instant;

    const PERIOD: Duration = Duration::from_secs(60);

    /// Replies from a queue, then Success forever
    struct FakeTarget {
        replies: Mutex<VecDeque<RequestOutcome>>,
        ticks: Mutex<Vec<Instant>>,
        finished: Mutex<Vec<RequestOutcome>>,
        stopped: AtomicBool,
    }

    impl FakeTarget {
        fn new(replies: &[RequestOutcome]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().copied().collect()),
                ticks: Mutex::new(Vec::new()),
                finished: Mutex::new(Vec::new()),
                stopped: AtomicBool::new(false),
            })
        }

        fn tick_count(&self) -> usize {
            self.ticks.lock().len()
        }
    }

    #[async_trait]
    impl KeepAliveTarget for FakeTarget {
        fn begin_tick(&self) -> bool {
            !self.stopped.load(Ordering::SeqCst)
        }

        async fn refresh(&self) -> RequestOutcome {
            self.ticks.lock().push(Instant::now());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or(RequestOutcome::Success)
        }

        fn finish_tick(&self, outcome: RequestOutcome) -> bool {
            if self.stopped.load(Ordering::SeqCst) {
                return false;
            }
            self.finished.lock().push(outcome);
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let target = FakeTarget::new(&[]);
        let start = Instant::now();
        let keepalive = KeepAlive::spawn(target.clone(), PERIOD);

        tokio::time::sleep(Duration::from_secs(60 * 5 + 30)).await;

        let ticks = target.ticks.lock().clone();
        assert_eq!(ticks.len(), 5);
        for (i, tick) in ticks.iter().enumerate() {
            assert_eq!(*tick - start, PERIOD * (i as u32 + 1));
        }
        assert!(!keepalive.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_expiry() {
        let target = FakeTarget::new(&[
            RequestOutcome::Success,
            RequestOutcome::SessionExpired,
        ]);
        let keepalive = KeepAlive::spawn(target.clone(), PERIOD);

        tokio::time::sleep(Duration::from_secs(60 * 10)).await;

        assert_eq!(target.tick_count(), 2);
        assert!(keepalive.is_finished());
        assert_eq!(keepalive.join().await, Some(RequestOutcome::SessionExpired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_terminal_not_connected() {
        let target = FakeTarget::new(&[RequestOutcome::TransportFailure]);
        let keepalive = KeepAlive::spawn(target.clone(), PERIOD);

        assert_eq!(keepalive.join().await, Some(RequestOutcome::NotConnected));
        assert_eq!(
            target.finished.lock().clone(),
            vec![RequestOutcome::NotConnected]
        );
        assert_eq!(target.tick_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_further_ticks() {
        let target = FakeTarget::new(&[]);
        let keepalive = KeepAlive::spawn(target.clone(), PERIOD);

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(target.tick_count(), 2);

        keepalive.cancel();
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(target.tick_count(), 2);
        assert_eq!(keepalive.join().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_flag_skips_tick() {
        let target = FakeTarget::new(&[]);
        let keepalive = KeepAlive::spawn(target.clone(), PERIOD);

        target.stopped.store(true, Ordering::SeqCst);

        assert_eq!(keepalive.join().await, None);
        assert_eq!(target.tick_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_loop() {
        let target = FakeTarget::new(&[]);
        let keepalive = KeepAlive::spawn(target.clone(), PERIOD);
        drop(keepalive);

        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(target.tick_count(), 0);
    }
}
