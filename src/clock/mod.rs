//! Tick source for the health-check scheduler.
//!
//! Emits a monotonic one-second pulse on a one-slot channel. Delivery is
//! best-effort: if the subscriber has not consumed the previous tick, the new
//! tick is dropped. The subscriber's per-tick work is bounded, so missing a
//! tick only means checks fire slightly late.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// One-second pulse emitter with a single subscriber.
pub struct Clock {
    tx: mpsc::Sender<()>,
    rx: Option<mpsc::Receiver<()>>,
    stopped: CancellationToken,
}

impl Clock {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Some(rx),
            stopped: CancellationToken::new(),
        }
    }

    /// Take the receive end of the tick channel. Yields `Some` exactly once.
    pub fn subscribe(&mut self) -> Option<mpsc::Receiver<()>> {
        self.rx.take()
    }

    /// Stop the clock. Idempotent.
    pub fn stop(&self) {
        self.stopped.cancel();
    }

    /// Start emitting ticks until cancellation or [`Clock::stop`].
    pub fn start(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let tx = self.tx.clone();
        let stopped = self.stopped.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // A tokio interval fires immediately; consume that so the first
            // emitted tick lands a full second after start.
            interval.tick().await;

            tracing::info!("clock started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = stopped.cancelled() => break,
                    _ = interval.tick() => {
                        // Drop the tick if the subscriber is still busy.
                        let _ = tx.try_send(());
                    }
                }
            }

            tracing::info!("clock stopped");
        })
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
