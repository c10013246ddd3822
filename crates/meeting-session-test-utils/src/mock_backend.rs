//! Scriptable mock conferencing backend.
//!
//! Can be configured to:
//! - Fail the first N client loads, or delay each load
//! - Fail handle creation, or hold it until released by the test
//! - Fail dispose
//! - Reject commands, or echo them back as the real backend would
//!
//! The test drives the current session's event stream with
//! [`MockBackend::emit`] and [`MockBackend::close_stream`].
//!
//! # Example
//!
//! ```rust,ignore
//! use meeting_session_test_utils::MockBackend;
//!
//! let backend = MockBackend::builder().fail_first_loads(1).build();
//! let connector = Arc::new(BackendConnector::new(backend.as_backend()));
//! ```

use async_trait::async_trait;
use meeting_session::backend::{
    BackendCommand, ConferenceBackend, RawEvent, RawEventStream, SessionHandle,
};
use meeting_session::config::SessionConfig;
use meeting_session::errors::BackendError;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Mock backend. Clones share state, so the test keeps one clone and hands
/// another to the connector.
#[derive(Debug, Clone)]
pub struct MockBackend {
    inner: Arc<MockInner>,
}

#[derive(Debug)]
struct MockInner {
    script: MockScript,
    state: Mutex<MockState>,
    release: Notify,
}

#[derive(Debug, Default, Clone)]
struct MockScript {
    failing_loads: usize,
    load_delay: Option<Duration>,
    fail_handle_creation: bool,
    gate_handle_creation: bool,
    fail_dispose: bool,
    reject_commands: bool,
    echo_commands: bool,
}

#[derive(Debug, Default)]
struct MockState {
    loads: usize,
    handles_created: usize,
    disposals: usize,
    commands: Vec<BackendCommand>,
    last_options: Option<serde_json::Value>,
    /// Open event streams keyed by handle ordinal, oldest first.
    streams: Vec<(usize, mpsc::UnboundedSender<RawEvent>)>,
}

impl MockInner {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock backend state poisoned")
    }
}

impl MockBackend {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> MockBackendBuilder {
        MockBackendBuilder::default()
    }

    /// A backend that loads, creates handles and disposes without failures.
    #[must_use]
    pub fn healthy() -> Self {
        Self::builder().build()
    }

    /// This backend as the trait object the connector expects.
    #[must_use]
    pub fn as_backend(&self) -> Arc<dyn ConferenceBackend> {
        Arc::new(self.clone())
    }

    /// Deliver a raw event on the most recently opened session stream.
    ///
    /// # Panics
    ///
    /// Panics if no session stream is open.
    pub fn emit(&self, event: RawEvent) {
        let state = self.inner.state();
        let (_, tx) = state
            .streams
            .last()
            .expect("no open session stream to emit on");
        tx.send(event).expect("session stream receiver dropped");
    }

    /// Close the most recently opened event stream (abrupt disconnect).
    pub fn close_stream(&self) {
        self.inner.state().streams.pop();
    }

    /// Whether any session event stream is open.
    #[must_use]
    pub fn has_open_stream(&self) -> bool {
        !self.inner.state().streams.is_empty()
    }

    /// Let one gated `create_handle` call proceed.
    pub fn release_handle_creation(&self) {
        self.inner.release.notify_one();
    }

    #[must_use]
    pub fn load_count(&self) -> usize {
        self.inner.state().loads
    }

    #[must_use]
    pub fn handles_created(&self) -> usize {
        self.inner.state().handles_created
    }

    #[must_use]
    pub fn dispose_count(&self) -> usize {
        self.inner.state().disposals
    }

    /// Commands received by any handle, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<BackendCommand> {
        self.inner.state().commands.clone()
    }

    /// Options passed to the most recent `create_handle`.
    #[must_use]
    pub fn last_options(&self) -> Option<serde_json::Value> {
        self.inner.state().last_options.clone()
    }
}

#[async_trait]
impl ConferenceBackend for MockBackend {
    async fn load(&self) -> Result<(), BackendError> {
        if let Some(delay) = self.inner.script.load_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.inner.state();
        state.loads += 1;
        if state.loads <= self.inner.script.failing_loads {
            return Err(BackendError::Unavailable(format!(
                "mock load failure {}",
                state.loads
            )));
        }
        Ok(())
    }

    async fn create_handle(
        &self,
        config: &SessionConfig,
    ) -> Result<Box<dyn SessionHandle>, BackendError> {
        if self.inner.script.gate_handle_creation {
            self.inner.release.notified().await;
        }

        let mut state = self.inner.state();
        state.last_options = Some(config.to_backend_options());
        if self.inner.script.fail_handle_creation {
            return Err(BackendError::HandleCreation(
                "mock handle creation failure".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.handles_created += 1;
        let ordinal = state.handles_created;
        state.streams.push((ordinal, tx));

        Ok(Box::new(MockHandle {
            inner: Arc::clone(&self.inner),
            ordinal,
            disposed: false,
            events_rx: Some(rx),
            display_name: config.display_name.clone(),
            audio_muted: false,
            video_muted: false,
            screen_sharing: false,
        }))
    }
}

/// Handle created by [`MockBackend`].
#[derive(Debug)]
pub struct MockHandle {
    inner: Arc<MockInner>,
    ordinal: usize,
    disposed: bool,
    events_rx: Option<RawEventStream>,
    display_name: String,
    audio_muted: bool,
    video_muted: bool,
    screen_sharing: bool,
}

impl MockHandle {
    fn echo(&mut self, command: &BackendCommand) {
        let event = match command {
            BackendCommand::ToggleAudio => {
                self.audio_muted = !self.audio_muted;
                RawEvent::new("audioMuteStatusChanged", json!({ "muted": self.audio_muted }))
            }
            BackendCommand::ToggleVideo => {
                self.video_muted = !self.video_muted;
                RawEvent::new("videoMuteStatusChanged", json!({ "muted": self.video_muted }))
            }
            BackendCommand::ToggleShareScreen => {
                self.screen_sharing = !self.screen_sharing;
                RawEvent::new("screenSharingStatusChanged", json!({ "on": self.screen_sharing }))
            }
            BackendCommand::SendChatMessage(body) => RawEvent::new(
                "chatMessage",
                json!({ "message": body, "sender": { "displayName": self.display_name } }),
            ),
            BackendCommand::Hangup => return,
        };
        let state = self.inner.state();
        if let Some((_, tx)) = state.streams.iter().find(|(o, _)| *o == self.ordinal) {
            let _ = tx.send(event);
        }
    }
}

#[async_trait]
impl SessionHandle for MockHandle {
    async fn execute_command(&mut self, command: BackendCommand) -> Result<(), BackendError> {
        if self.disposed {
            return Err(BackendError::Disposed);
        }
        self.inner.state().commands.push(command.clone());

        if self.inner.script.reject_commands && command != BackendCommand::Hangup {
            return Err(BackendError::CommandRejected(format!(
                "mock rejected {}",
                command.name()
            )));
        }
        if self.inner.script.echo_commands {
            self.echo(&command);
        }
        Ok(())
    }

    fn take_events(&mut self) -> Option<RawEventStream> {
        self.events_rx.take()
    }

    async fn dispose(&mut self) -> Result<(), BackendError> {
        if self.disposed {
            return Err(BackendError::Disposed);
        }
        self.disposed = true;

        let mut state = self.inner.state();
        state.disposals += 1;
        state.streams.retain(|(o, _)| *o != self.ordinal);
        if self.inner.script.fail_dispose {
            return Err(BackendError::Unavailable("mock dispose failure".to_string()));
        }
        Ok(())
    }
}

/// Builder for [`MockBackend`].
#[derive(Debug, Default)]
pub struct MockBackendBuilder {
    script: MockScript,
}

impl MockBackendBuilder {
    /// Fail the first `n` client loads with `Unavailable`.
    #[must_use]
    pub fn fail_first_loads(mut self, n: usize) -> Self {
        self.script.failing_loads = n;
        self
    }

    /// Sleep before each load completes.
    #[must_use]
    pub fn load_delay(mut self, delay: Duration) -> Self {
        self.script.load_delay = Some(delay);
        self
    }

    /// Fail every `create_handle` with `HandleCreation`.
    #[must_use]
    pub fn fail_handle_creation(mut self) -> Self {
        self.script.fail_handle_creation = true;
        self
    }

    /// Hold each `create_handle` until [`MockBackend::release_handle_creation`].
    #[must_use]
    pub fn gate_handle_creation(mut self) -> Self {
        self.script.gate_handle_creation = true;
        self
    }

    /// Fail every `dispose` (the stream is still closed).
    #[must_use]
    pub fn fail_dispose(mut self) -> Self {
        self.script.fail_dispose = true;
        self
    }

    /// Reject every command except `hangup`.
    #[must_use]
    pub fn reject_commands(mut self) -> Self {
        self.script.reject_commands = true;
        self
    }

    /// Echo toggles and chat back as backend events.
    #[must_use]
    pub fn echo_commands(mut self) -> Self {
        self.script.echo_commands = true;
        self
    }

    #[must_use]
    pub fn build(self) -> MockBackend {
        MockBackend {
            inner: Arc::new(MockInner {
                script: self.script,
                state: Mutex::new(MockState::default()),
                release: Notify::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_loads_then_success() {
        let backend = MockBackend::builder().fail_first_loads(2).build();

        assert!(backend.load().await.is_err());
        assert!(backend.load().await.is_err());
        assert!(backend.load().await.is_ok());
        assert_eq!(backend.load_count(), 3);
    }

    #[tokio::test]
    async fn test_emit_reaches_handle_stream() {
        let backend = MockBackend::healthy();
        let mut handle = backend
            .create_handle(&SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();
        let mut events = handle.take_events().unwrap();

        backend.emit(RawEvent::new("readyToClose", serde_json::Value::Null));
        assert_eq!(events.recv().await.unwrap().name, "readyToClose");

        handle.dispose().await.unwrap();
        assert!(!backend.has_open_stream());
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_commands_recorded_and_rejected() {
        let backend = MockBackend::builder().reject_commands().build();
        let mut handle = backend
            .create_handle(&SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();

        assert!(matches!(
            handle.execute_command(BackendCommand::ToggleAudio).await,
            Err(BackendError::CommandRejected(_))
        ));
        assert!(handle.execute_command(BackendCommand::Hangup).await.is_ok());
        assert_eq!(
            backend.commands(),
            vec![BackendCommand::ToggleAudio, BackendCommand::Hangup]
        );
    }
}
