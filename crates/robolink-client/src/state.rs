//! Connection state tracking.
//!
//! [`ConnectionTracker`] owns the `connected` flag shared by the background
//! loops and the client facade. Each real transition is published on a
//! `watch` channel: observers always see the latest value and never block
//! the writer.
//!
//! ```text
//! Disconnected ──dial ok──> Connected
//!      ▲                        │
//!      └──── liveness fail ─────┘
//!
//!   (any) ──close()──> Closed
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

/// Observable client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No usable transport; calls fail with `Unavailable`.
    Disconnected,
    /// Transport believed healthy.
    Connected,
    /// `close()` was called. Terminal.
    Closed,
}

impl ClientState {
    /// Returns a short status label for display.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Timestamps {
    last_success: Option<Instant>,
    last_transition: Option<Instant>,
}

/// Shared connected flag with change notification.
#[derive(Debug)]
pub struct ConnectionTracker {
    connected: AtomicBool,
    closed: AtomicBool,
    /// Held while flipping `connected` so flag and notification stay ordered.
    notifier: Mutex<Option<watch::Sender<bool>>>,
    /// Kept so observers subscribing after close still get an ended channel.
    closed_rx: watch::Receiver<bool>,
    timestamps: Mutex<Timestamps>,
}

impl ConnectionTracker {
    /// Create a tracker in the given state.
    #[must_use]
    pub fn new(connected: bool) -> Self {
        let (tx, rx) = watch::channel(connected);
        let now = Instant::now();
        Self {
            connected: AtomicBool::new(connected),
            closed: AtomicBool::new(false),
            notifier: Mutex::new(Some(tx)),
            closed_rx: rx,
            timestamps: Mutex::new(Timestamps {
                last_success: connected.then_some(now),
                last_transition: Some(now),
            }),
        }
    }

    /// Set the flag. Returns `true` only if this call changed it, in which
    /// case exactly one notification was published.
    pub fn set_connected(&self, connected: bool) -> bool {
        let notifier = self.notifier.lock();
        let Some(tx) = notifier.as_ref() else {
            return false;
        };
        if self.connected.swap(connected, Ordering::AcqRel) == connected {
            return false;
        }
        tx.send_replace(connected);
        let now = Instant::now();
        let mut ts = self.timestamps.lock();
        ts.last_transition = Some(now);
        if connected {
            ts.last_success = Some(now);
        }
        true
    }

    /// Non-blocking read of the flag.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Returns `true` once [`ConnectionTracker::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Subscribe to transitions.
    ///
    /// The receiver starts with the current value marked as seen; each
    /// later transition overwrites the buffered value. After close the
    /// channel reports that the sender is gone.
    #[must_use]
    pub fn changed(&self) -> watch::Receiver<bool> {
        match self.notifier.lock().as_ref() {
            Some(tx) => tx.subscribe(),
            None => self.closed_rx.clone(),
        }
    }

    /// Record a successful liveness check.
    pub fn mark_checked(&self) {
        self.timestamps.lock().last_success = Some(Instant::now());
    }

    /// Time of the last successful check or connect.
    #[must_use]
    pub fn last_success(&self) -> Option<Instant> {
        self.timestamps.lock().last_success
    }

    /// Time of the last flip of the flag.
    #[must_use]
    pub fn last_transition(&self) -> Option<Instant> {
        self.timestamps.lock().last_transition
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        if self.is_closed() {
            ClientState::Closed
        } else if self.is_connected() {
            ClientState::Connected
        } else {
            ClientState::Disconnected
        }
    }

    /// Mark closed, force the flag off and end the notification channel.
    ///
    /// Returns `false` if the tracker was already closed.
    pub fn close(&self) -> bool {
        let mut notifier = self.notifier.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if self.connected.swap(false, Ordering::AcqRel) {
            if let Some(tx) = notifier.as_ref() {
                tx.send_replace(false);
            }
        }
        notifier.take();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_value_is_noop() {
        let tracker = ConnectionTracker::new(true);
        let rx = tracker.changed();

        assert!(!tracker.set_connected(true));
        assert!(!rx.has_changed().unwrap());

        assert!(tracker.set_connected(false));
        assert!(rx.has_changed().unwrap());
        assert!(!tracker.is_connected());
        assert_eq!(tracker.state(), ClientState::Disconnected);
    }

    #[tokio::test]
    async fn test_latest_value_is_buffered() {
        let tracker = ConnectionTracker::new(true);
        let mut rx = tracker.changed();

        // Two transitions without a reader in between: only the last is seen
        tracker.set_connected(false);
        tracker.set_connected(true);

        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_close_ends_channel() {
        let tracker = ConnectionTracker::new(true);
        let mut rx = tracker.changed();

        assert!(tracker.close());
        assert!(!tracker.close());
        assert_eq!(tracker.state(), ClientState::Closed);
        assert!(!tracker.is_connected());

        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
        assert!(rx.changed().await.is_err());

        // Transitions after close are ignored
        assert!(!tracker.set_connected(true));
        assert!(!tracker.is_connected());
        assert!(tracker.changed().has_changed().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timestamps() {
        let tracker = ConnectionTracker::new(false);
        assert!(tracker.last_success().is_none());
        let created = tracker.last_transition().unwrap();

        tokio::time::advance(std::time::Duration::from_secs(1)).await;
        tracker.set_connected(true);
        let connected_at = tracker.last_transition().unwrap();
        assert!(connected_at > created);
        assert_eq!(tracker.last_success(), Some(connected_at));

        tokio::time::advance(std::time::Duration::from_secs(1)).await;
        tracker.mark_checked();
        assert!(tracker.last_success().unwrap() > connected_at);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ClientState::Connected.label(), "Connected");
        assert_eq!(ClientState::Closed.to_string(), "Closed");
    }
}
