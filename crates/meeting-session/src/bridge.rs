//! `EventBridge` - translates backend events into controller events.
//!
//! One forwarding task per session drains the handle's raw event stream,
//! translates each event and sends it to the controller mailbox in delivery
//! order. Nothing is reordered or batched. Unknown events are dropped.
//!
//! The returned [`Subscription`] owns the forwarding task. Dropping it
//! unsubscribes, so teardown happens on every exit path from Active.

use crate::actors::messages::ControllerMessage;
use crate::backend::{RawEvent, SessionHandle};
use crate::errors::BackendError;
use crate::registry::{display_name_or_anonymous, LOCAL_PARTICIPANT_ID};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Controller-internal event vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConferenceJoined,
    ConferenceLeft,
    ParticipantJoined {
        id: String,
        display_name: Option<String>,
    },
    ParticipantLeft {
        id: String,
    },
    /// `participant_id` is `None` when the backend reports the local device.
    AudioMuteChanged {
        participant_id: Option<String>,
        muted: bool,
    },
    VideoMuteChanged {
        participant_id: Option<String>,
        muted: bool,
    },
    ScreenShareChanged {
        on: bool,
    },
    ChatReceived {
        sender: String,
        body: String,
    },
    Kicked {
        participant_id: String,
        is_local: bool,
    },
    ReadyToClose,
}

impl SessionEvent {
    /// Bounded label for metrics and logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            SessionEvent::ConferenceJoined => "conference_joined",
            SessionEvent::ConferenceLeft => "conference_left",
            SessionEvent::ParticipantJoined { .. } => "participant_joined",
            SessionEvent::ParticipantLeft { .. } => "participant_left",
            SessionEvent::AudioMuteChanged { .. } => "audio_mute_changed",
            SessionEvent::VideoMuteChanged { .. } => "video_mute_changed",
            SessionEvent::ScreenShareChanged { .. } => "screen_share_changed",
            SessionEvent::ChatReceived { .. } => "chat_received",
            SessionEvent::Kicked { .. } => "kicked",
            SessionEvent::ReadyToClose => "ready_to_close",
        }
    }
}

/// Translate one raw backend event. Returns `None` for unknown or malformed
/// events.
#[must_use]
pub fn translate(raw: &RawEvent) -> Option<SessionEvent> {
    let payload = &raw.payload;
    let event = match raw.name.as_str() {
        "conferenceJoined" => Some(SessionEvent::ConferenceJoined),
        "conferenceLeft" => Some(SessionEvent::ConferenceLeft),
        "readyToClose" => Some(SessionEvent::ReadyToClose),
        "participantJoined" => str_field(payload, "id").map(|id| SessionEvent::ParticipantJoined {
            id: id.to_string(),
            display_name: str_field(payload, "displayName").map(str::to_string),
        }),
        "participantLeft" => str_field(payload, "id").map(|id| SessionEvent::ParticipantLeft {
            id: id.to_string(),
        }),
        "audioMuteStatusChanged" => {
            bool_field(payload, "muted").map(|muted| SessionEvent::AudioMuteChanged {
                participant_id: str_field(payload, "participantId").map(str::to_string),
                muted,
            })
        }
        "videoMuteStatusChanged" => {
            bool_field(payload, "muted").map(|muted| SessionEvent::VideoMuteChanged {
                participant_id: str_field(payload, "participantId").map(str::to_string),
                muted,
            })
        }
        "screenSharingStatusChanged" => {
            bool_field(payload, "on").map(|on| SessionEvent::ScreenShareChanged { on })
        }
        "chatMessage" => str_field(payload, "message").map(|body| {
            let sender = payload
                .get("sender")
                .and_then(|s| str_field(s, "displayName"))
                .or_else(|| str_field(payload, "nick"));
            SessionEvent::ChatReceived {
                sender: display_name_or_anonymous(sender),
                body: body.to_string(),
            }
        }),
        "participantKickedOut" => payload.get("kicked").and_then(|kicked| {
            let id = str_field(kicked, "participantId").or_else(|| str_field(kicked, "id"))?;
            let is_local =
                bool_field(kicked, "local").unwrap_or(false) || id == LOCAL_PARTICIPANT_ID;
            Some(SessionEvent::Kicked {
                participant_id: id.to_string(),
                is_local,
            })
        }),
        _ => {
            debug!(target: "ms.bridge", event = %raw.name, "Ignoring unsubscribed backend event");
            return None;
        }
    };

    if event.is_none() {
        warn!(target: "ms.bridge", event = %raw.name, "Malformed backend event payload");
    }
    event
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str()
}

fn bool_field(value: &Value, key: &str) -> Option<bool> {
    value.get(key)?.as_bool()
}

/// Wires a session handle's events into the controller mailbox.
pub struct EventBridge;

impl EventBridge {
    /// Subscribe to the handle's event stream for session `generation`.
    ///
    /// The forwarding task holds only a weak sender so it never keeps the
    /// controller alive. When the backend closes the stream the controller is
    /// told with [`ControllerMessage::BackendStreamClosed`].
    pub fn subscribe(
        handle: &mut dyn SessionHandle,
        generation: u64,
        mailbox: mpsc::WeakSender<ControllerMessage>,
        cancel_token: CancellationToken,
    ) -> Result<Subscription, BackendError> {
        let mut events = handle.take_events().ok_or_else(|| {
            BackendError::HandleCreation("event stream already taken".to_string())
        })?;

        let token = cancel_token.clone();
        let task = tokio::spawn(async move {
            debug!(target: "ms.bridge", generation, "EventBridge subscribed");

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    raw = events.recv() => {
                        let Some(raw) = raw else {
                            debug!(target: "ms.bridge", generation, "Backend event stream closed");
                            forward(&mailbox, ControllerMessage::BackendStreamClosed { generation }).await;
                            break;
                        };

                        let Some(event) = translate(&raw) else {
                            continue;
                        };

                        if !forward(&mailbox, ControllerMessage::BackendEvent { generation, event }).await {
                            break;
                        }
                    }
                }
            }

            debug!(target: "ms.bridge", generation, "EventBridge unsubscribed");
        });

        Ok(Subscription {
            generation,
            cancel_token,
            task: Some(task),
        })
    }
}

async fn forward(mailbox: &mpsc::WeakSender<ControllerMessage>, message: ControllerMessage) -> bool {
    match mailbox.upgrade() {
        Some(sender) => sender.send(message).await.is_ok(),
        None => false,
    }
}

/// Active event subscription. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    generation: u64,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop forwarding events. Idempotent.
    pub fn unsubscribe(&mut self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
