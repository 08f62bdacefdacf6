//! Cancellable playback timer.
//!
//! A [`PlaybackClock`] is a spawned task that emits a [`PlaybackTick`] every
//! period until cancelled. Each clock is bound to one controller generation;
//! changing speed or pausing drops the clock and, if needed, starts a new one.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// One timer firing, tagged with the generation the clock was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTick {
    pub generation: u64,
}

/// Handle to a running timer task. Dropping it stops the task.
pub struct PlaybackClock {
    generation: u64,
    period: Duration,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackClock {
    /// Spawn a timer that first fires one `period` from now.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        generation: u64,
        period: Duration,
        ticks: mpsc::UnboundedSender<PlaybackTick>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(generation, period, ticks, cancel.clone()));
        tracing::debug!(
            generation,
            period_ms = period.as_millis() as u64,
            "Playback clock started"
        );
        Self {
            generation,
            period,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancel and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    generation: u64,
    period: Duration,
    ticks: mpsc::UnboundedSender<PlaybackTick>,
    cancel: CancellationToken,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(generation, "Playback clock stopping");
                break;
            }
            _ = interval.tick() => {
                if ticks.send(PlaybackTick { generation }).is_err() {
                    // Receiver gone; nobody left to advance.
                    break;
                }
            }
        }
    }
}
