//! Meeting elapsed-time counter.
//!
//! A periodic ticker task drives the count; the controller applies each tick
//! through its mailbox so elapsed time only advances while a session is
//! active. Stopping (or dropping) the timer always clears the ticker.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Elapsed-seconds counter with an owned ticker task.
#[derive(Debug)]
pub struct MeetingTimer {
    elapsed_seconds: u64,
    started_at: DateTime<Utc>,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MeetingTimer {
    /// Start at zero and invoke `on_tick` every `period`. The ticker exits
    /// when `cancel_token` fires, the timer is stopped, or `on_tick` returns
    /// `false`.
    pub fn start<F, Fut>(period: Duration, cancel_token: CancellationToken, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let token = cancel_token.clone();
        let task = tokio::spawn(async move {
            // First tick one period from now, not immediately.
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !on_tick().await {
                            break;
                        }
                    }
                }
            }

            debug!(target: "ms.timer", "Meeting timer ticker exited");
        });

        Self {
            elapsed_seconds: 0,
            started_at: Utc::now(),
            cancel_token,
            task: Some(task),
        }
    }

    /// Apply one tick.
    pub fn record_tick(&mut self) {
        if self.is_running() {
            self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        }
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Clear the ticker. Idempotent.
    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for MeetingTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Format seconds as `HH:MM:SS`. Hours are not wrapped.
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
