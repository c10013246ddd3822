//! Observability for the meeting session controller.
//!
//! # Privacy by Default
//!
//! The actor loop uses `#[instrument(skip_all)]`. Room ids and participant ids
//! are logged; display names and chat bodies are not.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `ms_session_joins_total` | Counter | `outcome` | Join attempts by result |
//! | `ms_session_ends_total` | Counter | `reason` | Session endings by cause |
//! | `ms_backend_events_total` | Counter | `event` | Backend events applied |
//! | `ms_backend_commands_total` | Counter | `command` | Commands forwarded |
//! | `ms_participants_active` | Gauge | none | Current roster size |

pub mod metrics;

pub use self::metrics::{
    init_metrics_recorder, record_backend_command, record_backend_event, record_session_end,
    record_session_join, set_participants_active,
};
