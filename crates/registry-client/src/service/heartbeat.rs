//! Periodic heartbeat timer.
//!
//! A background task that invokes a tick closure every `period`, starting one
//! period after it is spawned. Stopping it is synchronous and immediate: once
//! `stop` returns no further tick begins.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Handle to an armed heartbeat timer.
pub struct HeartbeatTimer {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
    period: Duration,
}

impl HeartbeatTimer {
    /// Start ticking every `period`.
    ///
    /// Ticks run sequentially; if one overruns its slot the missed slots are
    /// skipped rather than fired in a burst.
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                        tick().await;
                    }
                }
            }

            debug!("Heartbeat timer stopped");
        });

        debug!(period_ms = period.as_millis() as u64, "Heartbeat timer armed");

        Self {
            shutdown,
            handle,
            period,
        }
    }

    /// Disarm the timer. A tick already in flight is allowed to finish.
    pub fn stop(self) {
        let _ = self.shutdown.send(true);
    }

    /// Disarm the timer and cancel any tick in flight.
    pub fn abort(self) {
        self.handle.abort();
    }

    /// Configured spacing between ticks.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// True once the background task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
