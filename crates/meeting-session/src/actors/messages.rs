//! Message and snapshot types for the session controller actor.
//!
//! Requests from the presentation layer carry a `oneshot` reply channel.
//! Backend events and timer ticks arrive on the same mailbox tagged with the
//! session generation they belong to.

use crate::backend::{BackendCommand, SessionHandle};
use crate::bridge::SessionEvent;
use crate::chat::ChatMessage;
use crate::config::SessionConfig;
use crate::errors::{BackendError, SessionError};
use crate::registry::Participant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

/// Messages sent to `MeetingSessionController`.
#[derive(Debug)]
pub enum ControllerMessage {
    /// Start a session.
    Join {
        config: SessionConfig,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// The in-flight join for `generation` finished (internal).
    JoinSettled {
        generation: u64,
        result: Result<Box<dyn SessionHandle>, BackendError>,
    },

    /// End the current session, or no-op when idle.
    Leave {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Forward a command to the active session's backend handle.
    Command {
        command: BackendCommand,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Read the current session snapshot.
    GetSnapshot {
        respond_to: oneshot::Sender<SessionSnapshot>,
    },

    /// Translated backend event (from `EventBridge`).
    BackendEvent { generation: u64, event: SessionEvent },

    /// The backend event stream ended (from `EventBridge`).
    BackendStreamClosed { generation: u64 },

    /// One meeting timer period elapsed.
    Tick { generation: u64 },
}

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Joining,
    Active,
    Ending,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Joining => "joining",
            SessionState::Active => "active",
            SessionState::Ending => "ending",
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// `leave()` was called.
    Local,
    /// The backend reported `readyToClose`.
    RemoteClosed,
    /// The local participant was kicked out.
    Kicked,
    /// The backend event stream closed unexpectedly.
    BackendDisconnected,
}

impl EndReason {
    /// Bounded label for metrics.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            EndReason::Local => "local",
            EndReason::RemoteClosed => "remote_closed",
            EndReason::Kicked => "kicked",
            EndReason::BackendDisconnected => "backend_disconnected",
        }
    }

    /// Whether the session was ended by something other than the caller.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        !matches!(self, EndReason::Local)
    }
}

/// Notifications broadcast to subscribers of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotification {
    Joined { room_id: String },
    Ended { reason: EndReason },
    ParticipantJoined { id: String, display_name: String },
    ParticipantLeft { id: String },
}

/// Read-only view of the session for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub room_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
    pub participants: Vec<Participant>,
    pub chat: Vec<ChatMessage>,
    pub is_audio_muted: bool,
    pub is_video_muted: bool,
    pub is_screen_sharing: bool,
    pub last_end_reason: Option<EndReason>,
}

impl SessionSnapshot {
    /// Participant count including the local participant.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}
