//! Timeout watcher
//!
//! Runs next to an IRC session and bounds the time until the XDCC request
//! is sent. Past the budget it asks the session to PING the server, and if
//! the request still has not gone out after the grace period it reports
//! expiry. The session turns that into `XdccError::Timeout`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::irc::SessionFlags;

/// What the watcher asks of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    /// Budget exceeded, probe the server
    Ping,
    /// No request after the grace period
    Expired { elapsed: Duration },
}

pub struct TimeoutWatcher {
    timeout: Duration,
    ping_grace: Duration,
    tick: Duration,
    flags: Arc<SessionFlags>,
    cancel: CancellationToken,
    started: Instant,
}

impl TimeoutWatcher {
    /// The clock starts now, so create the watcher right before connecting
    pub fn new(timeout: Duration, ping_grace: Duration, flags: Arc<SessionFlags>, cancel: CancellationToken) -> Self {
        Self {
            timeout,
            ping_grace,
            tick: Duration::from_secs(1),
            flags,
            cancel,
            started: Instant::now(),
        }
    }

    pub async fn run(self, events: mpsc::Sender<WatchEvent>) {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            if self.flags.is_settled() {
                debug!("Timeout watcher done");
                return;
            }

            let elapsed = self.started.elapsed();
            if elapsed < self.timeout {
                continue;
            }

            warn!("No XDCC request sent after {}s, pinging server", elapsed.as_secs());
            if events.send(WatchEvent::Ping).await.is_err() {
                return;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = sleep(self.ping_grace) => {}
            }

            if self.flags.is_settled() {
                debug!("Request went out during ping grace period");
                return;
            }

            let elapsed = self.started.elapsed();
            warn!("Session timed out after {}s", elapsed.as_secs());
            let _ = events.send(WatchEvent::Expired { elapsed }).await;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_watcher(timeout: u64, flags: Arc<SessionFlags>, cancel: CancellationToken) -> mpsc::Receiver<WatchEvent> {
        let (tx, rx) = mpsc::channel(4);
        let watcher = TimeoutWatcher::new(Duration::from_secs(timeout), Duration::from_secs(2), flags, cancel);
        tokio::spawn(watcher.run(tx));
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_then_expire() {
        let start = Instant::now();
        let mut rx = spawn_watcher(3, Arc::new(SessionFlags::new()), CancellationToken::new());

        assert_eq!(rx.recv().await, Some(WatchEvent::Ping));
        let ping_at = start.elapsed();
        assert!(ping_at >= Duration::from_secs(3) && ping_at < Duration::from_secs(4), "{:?}", ping_at);

        match rx.recv().await {
            Some(WatchEvent::Expired { elapsed }) => {
                assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6), "{:?}", elapsed);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_sent_stops_watcher() {
        let flags = Arc::new(SessionFlags::new());
        let mut rx = spawn_watcher(3, flags.clone(), CancellationToken::new());

        sleep(Duration::from_millis(1500)).await;
        flags.mark_message_sent();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_during_grace_period() {
        let flags = Arc::new(SessionFlags::new());
        let mut rx = spawn_watcher(1, flags.clone(), CancellationToken::new());

        assert_eq!(rx.recv().await, Some(WatchEvent::Ping));
        flags.mark_message_sent();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_watcher() {
        let cancel = CancellationToken::new();
        let mut rx = spawn_watcher(3, Arc::new(SessionFlags::new()), cancel.clone());

        cancel.cancel();
        assert_eq!(rx.recv().await, None);
    }
}
