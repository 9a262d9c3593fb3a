//! Background loops: liveness, reconnect and refresh.
//!
//! Each loop is one task in a shared [`JoinSet`]. A `watch` channel carries
//! the cancel signal; every loop selects on it both while waiting for its
//! next tick and while a tick is running, so `shutdown` also interrupts
//! in-flight RPCs.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::client::ClientInner;
use crate::options::PollInterval;

/// Owner of the background tasks of one client.
#[derive(Debug)]
pub(crate) struct Poller {
    tasks: JoinSet<()>,
    cancel: watch::Sender<bool>,
}

impl Poller {
    /// Spawn the loops enabled by the client's options.
    ///
    /// `refreshed_at_start` marks the construction-time refresh as the
    /// refresh loop's immediate tick.
    pub(crate) fn start(inner: Arc<ClientInner>, refreshed_at_start: bool) -> Self {
        let (cancel, cancel_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();
        let opts = inner.options().clone();

        if opts.check_connected_every.is_enabled() {
            let inner = Arc::clone(&inner);
            tasks.spawn(run_loop(
                "liveness",
                opts.check_connected_every,
                false,
                cancel_rx.clone(),
                move || {
                    let inner = Arc::clone(&inner);
                    async move { inner.check_liveness().await }
                },
            ));
        }

        if opts.reconnect_every.is_enabled() {
            let inner = Arc::clone(&inner);
            tasks.spawn(run_loop(
                "reconnect",
                opts.reconnect_every,
                false,
                cancel_rx.clone(),
                move || {
                    let inner = Arc::clone(&inner);
                    async move { inner.reconnect_tick().await }
                },
            ));
        }

        if opts.refresh_every.is_enabled() {
            let inner = Arc::clone(&inner);
            tasks.spawn(run_loop(
                "refresh",
                opts.refresh_every,
                refreshed_at_start,
                cancel_rx,
                move || {
                    let inner = Arc::clone(&inner);
                    async move { inner.refresh_tick().await }
                },
            ));
        }

        debug!(loops = tasks.len(), "Background poller started");
        Self { tasks, cancel }
    }

    /// Number of loops still running.
    pub(crate) fn active_loops(&self) -> usize {
        self.tasks.len()
    }

    /// Signal every loop to stop and wait for all of them to exit.
    pub(crate) async fn shutdown(&mut self) {
        self.cancel.send_replace(true);
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    warn!(error = %e, "Background loop panicked");
                }
            }
        }
        debug!("Background poller stopped");
    }
}

/// Resolves once cancellation is requested or the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Drive `tick` on `interval` until cancelled.
///
/// A zero period is treated as [`PollInterval::Once`].
///
/// Ticks of one loop never overlap. A slow tick delays the next one; missed
/// ticks are skipped rather than burst.
async fn run_loop<F, Fut>(
    name: &'static str,
    interval: PollInterval,
    skip_first: bool,
    mut cancel: watch::Receiver<bool>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let period = match interval.normalized() {
        PollInterval::Never => return,
        PollInterval::Once => {
            if !skip_first {
                tokio::select! {
                    biased;
                    () = cancelled(&mut cancel) => {}
                    () = tick() => {}
                }
            }
            return;
        }
        PollInterval::Every(period) => period,
    };

    let start = if skip_first {
        Instant::now() + period
    } else {
        Instant::now()
    };
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancelled(&mut cancel) => break,
            _ = ticker.tick() => {}
        }
        trace!(loop_name = name, "tick");
        tokio::select! {
            biased;
            () = cancelled(&mut cancel) => break,
            () = tick() => {}
        }
    }
    trace!(loop_name = name, "loop exited");
}
