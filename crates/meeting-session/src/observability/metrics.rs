//! Metrics definitions for the meeting session controller.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ms_` prefix for meeting session
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded by enums in this crate:
//! - `outcome`: success plus the `SessionError` labels (~6 values)
//! - `reason`: `EndReason` labels (4 values)
//! - `event`: `SessionEvent` labels (10 values)
//! - `command`: `BackendCommand` names (5 values)

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return the handle used to render the
/// exposition text.
///
/// # Errors
///
/// Returns error if a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Record a join attempt outcome.
///
/// Metric: `ms_session_joins_total`
/// Labels: `outcome` ("success" or a `SessionError` label)
pub fn record_session_join(outcome: &'static str) {
    counter!("ms_session_joins_total", "outcome" => outcome).increment(1);
}

/// Record a session ending.
///
/// Metric: `ms_session_ends_total`
/// Labels: `reason` (local, remote_closed, kicked, backend_disconnected)
pub fn record_session_end(reason: &'static str) {
    counter!("ms_session_ends_total", "reason" => reason).increment(1);
}

/// Record a translated backend event applied by the controller.
///
/// Metric: `ms_backend_events_total`
/// Labels: `event`
pub fn record_backend_event(event: &'static str) {
    counter!("ms_backend_events_total", "event" => event).increment(1);
}

/// Record a command forwarded to the backend.
///
/// Metric: `ms_backend_commands_total`
/// Labels: `command`
pub fn record_backend_command(command: &'static str) {
    counter!("ms_backend_commands_total", "command" => command).increment(1);
}

/// Set the number of participants in the current session.
///
/// Metric: `ms_participants_active`
/// Labels: none
pub fn set_participants_active(count: usize) {
    // usize to f64 is exact for realistic roster sizes
    #[allow(clippy::cast_precision_loss)]
    gauge!("ms_participants_active").set(count as f64);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    // Without an installed recorder these calls go to the no-op recorder.
    #[test]
    fn test_recording_without_recorder_does_not_panic() {
        record_session_join("success");
        record_session_end("local");
        record_backend_event("participant_joined");
        record_backend_command("toggleAudio");
        set_participants_active(3);
    }

    #[test]
    fn test_metrics_recorded_with_debugging_recorder() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_session_join("success");
            record_session_join("success");
            record_session_end("kicked");
            set_participants_active(2);
        });

        let metrics = snapshotter.snapshot().into_vec();
        let joins = metrics
            .iter()
            .find(|(key, _, _, _)| key.key().name() == "ms_session_joins_total")
            .map(|(_, _, _, value)| value.clone())
            .unwrap();
        assert_eq!(*joins, DebugValue::Counter(2));

        assert!(metrics
            .iter()
            .any(|(key, _, _, _)| key.key().name() == "ms_session_ends_total"));
        assert!(metrics
            .iter()
            .any(|(key, _, _, _)| key.key().name() == "ms_participants_active"));
    }
}
