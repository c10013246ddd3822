//! In-process loopback backend.
//!
//! Echoes local commands back as the events a real conferencing backend would
//! emit for the local participant. No media, no network. Used by the demo
//! binary and by unit tests that only need a well-behaved backend.

use super::{BackendCommand, ConferenceBackend, RawEvent, RawEventStream, SessionHandle};
use crate::config::SessionConfig;
use crate::errors::BackendError;

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Loopback conferencing backend.
#[derive(Debug)]
pub struct LoopbackBackend {
    domain: String,
    loads: AtomicUsize,
}

impl LoopbackBackend {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            loads: AtomicUsize::new(0),
        }
    }

    /// How many times the client library was loaded.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConferenceBackend for LoopbackBackend {
    async fn load(&self) -> Result<(), BackendError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        debug!(target: "ms.backend", domain = %self.domain, "Loopback client loaded");
        Ok(())
    }

    async fn create_handle(
        &self,
        config: &SessionConfig,
    ) -> Result<Box<dyn SessionHandle>, BackendError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let _ = events_tx.send(RawEvent::new(
            "conferenceJoined",
            json!({ "roomName": config.room_id }),
        ));

        Ok(Box::new(LoopbackHandle {
            room_id: config.room_id.clone(),
            display_name: config.display_name.clone(),
            events_tx: Some(events_tx),
            events_rx: Some(events_rx),
            audio_muted: false,
            video_muted: false,
            screen_sharing: false,
        }))
    }
}

/// Handle created by [`LoopbackBackend`].
#[derive(Debug)]
pub struct LoopbackHandle {
    room_id: String,
    display_name: String,
    events_tx: Option<mpsc::UnboundedSender<RawEvent>>,
    events_rx: Option<RawEventStream>,
    audio_muted: bool,
    video_muted: bool,
    screen_sharing: bool,
}

impl LoopbackHandle {
    fn emit(&self, event: RawEvent) -> Result<(), BackendError> {
        let tx = self.events_tx.as_ref().ok_or(BackendError::Disposed)?;
        tx.send(event).map_err(|_| BackendError::Disposed)
    }
}

#[async_trait]
impl SessionHandle for LoopbackHandle {
    async fn execute_command(&mut self, command: BackendCommand) -> Result<(), BackendError> {
        if self.events_tx.is_none() {
            return Err(BackendError::Disposed);
        }

        match command {
            BackendCommand::ToggleAudio => {
                self.audio_muted = !self.audio_muted;
                self.emit(RawEvent::new(
                    "audioMuteStatusChanged",
                    json!({ "muted": self.audio_muted }),
                ))
            }
            BackendCommand::ToggleVideo => {
                self.video_muted = !self.video_muted;
                self.emit(RawEvent::new(
                    "videoMuteStatusChanged",
                    json!({ "muted": self.video_muted }),
                ))
            }
            BackendCommand::ToggleShareScreen => {
                self.screen_sharing = !self.screen_sharing;
                self.emit(RawEvent::new(
                    "screenSharingStatusChanged",
                    json!({ "on": self.screen_sharing }),
                ))
            }
            BackendCommand::SendChatMessage(body) => self.emit(RawEvent::new(
                "chatMessage",
                json!({
                    "message": body,
                    "sender": { "id": "local", "displayName": self.display_name },
                }),
            )),
            BackendCommand::Hangup => {
                debug!(target: "ms.backend", room_id = %self.room_id, "Loopback hangup");
                Ok(())
            }
        }
    }

    fn take_events(&mut self) -> Option<RawEventStream> {
        self.events_rx.take()
    }

    async fn dispose(&mut self) -> Result<(), BackendError> {
        self.events_tx.take().map(|_| ()).ok_or(BackendError::Disposed)
    }
}
