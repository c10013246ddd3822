//! Test fixtures: session configurations and raw backend events.

use meeting_session::backend::RawEvent;
use meeting_session::config::SessionConfig;
use serde_json::{json, Value};

/// Builder for test [`SessionConfig`]s.
///
/// ```rust,ignore
/// let config = TestSessionConfig::new("room-1").display_name("Ann").admin().build();
/// ```
#[derive(Debug, Clone)]
pub struct TestSessionConfig {
    room_id: String,
    display_name: String,
    admin: bool,
    max_participants: Option<u32>,
}

impl TestSessionConfig {
    #[must_use]
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            display_name: "Ann".to_string(),
            admin: false,
            max_participants: None,
        }
    }

    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Request admin-only features (recording, admin toolbar).
    #[must_use]
    pub fn admin(mut self) -> Self {
        self.admin = true;
        self
    }

    #[must_use]
    pub fn max_participants(mut self, max: u32) -> Self {
        self.max_participants = Some(max);
        self
    }

    #[must_use]
    pub fn build(self) -> SessionConfig {
        let mut config = if self.admin {
            meeting_session::config::Config::default()
                .session_config(self.room_id, self.display_name)
        } else {
            SessionConfig::new(self.room_id, self.display_name)
        };
        if let Some(max) = self.max_participants {
            config.max_participants = max;
        }
        config
    }
}

/// Raw backend event builders, named after the backend's own events.
pub mod events {
    use super::{json, RawEvent, Value};

    #[must_use]
    pub fn conference_joined(room_id: &str) -> RawEvent {
        RawEvent::new("conferenceJoined", json!({ "roomName": room_id }))
    }

    #[must_use]
    pub fn conference_left(room_id: &str) -> RawEvent {
        RawEvent::new("conferenceLeft", json!({ "roomName": room_id }))
    }

    #[must_use]
    pub fn participant_joined(id: &str, display_name: Option<&str>) -> RawEvent {
        let payload = match display_name {
            Some(name) => json!({ "id": id, "displayName": name }),
            None => json!({ "id": id }),
        };
        RawEvent::new("participantJoined", payload)
    }

    #[must_use]
    pub fn participant_left(id: &str) -> RawEvent {
        RawEvent::new("participantLeft", json!({ "id": id }))
    }

    /// `participant_id: None` reports the local device.
    #[must_use]
    pub fn audio_mute(participant_id: Option<&str>, muted: bool) -> RawEvent {
        RawEvent::new("audioMuteStatusChanged", mute_payload(participant_id, muted))
    }

    /// `participant_id: None` reports the local device.
    #[must_use]
    pub fn video_mute(participant_id: Option<&str>, muted: bool) -> RawEvent {
        RawEvent::new("videoMuteStatusChanged", mute_payload(participant_id, muted))
    }

    #[must_use]
    pub fn screen_share(on: bool) -> RawEvent {
        RawEvent::new("screenSharingStatusChanged", json!({ "on": on }))
    }

    #[must_use]
    pub fn chat(sender: Option<&str>, body: &str) -> RawEvent {
        let payload = match sender {
            Some(name) => json!({ "message": body, "sender": { "displayName": name } }),
            None => json!({ "message": body }),
        };
        RawEvent::new("chatMessage", payload)
    }

    #[must_use]
    pub fn kicked(participant_id: &str, local: bool) -> RawEvent {
        RawEvent::new(
            "participantKickedOut",
            json!({ "kicked": { "id": participant_id, "local": local } }),
        )
    }

    #[must_use]
    pub fn ready_to_close() -> RawEvent {
        RawEvent::new("readyToClose", Value::Null)
    }

    /// An event the controller does not subscribe to.
    #[must_use]
    pub fn unknown(name: &str) -> RawEvent {
        RawEvent::new(name, json!({ "id": "p1" }))
    }

    fn mute_payload(participant_id: Option<&str>, muted: bool) -> Value {
        match participant_id {
            Some(id) => json!({ "participantId": id, "muted": muted }),
            None => json!({ "muted": muted }),
        }
    }
}
