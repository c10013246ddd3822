//! Conferencing backend contract and connector.
//!
//! The backend is an external collaborator: media transport, signaling and
//! rendering are opaque. The controller only depends on:
//!
//! - a one-time asynchronous load of the client library ([`ConferenceBackend::load`])
//! - session handle creation ([`ConferenceBackend::create_handle`])
//! - the handle's command surface and raw event stream ([`SessionHandle`])
//!
//! [`BackendConnector`] guarantees a single shared initialization per
//! connector. Share one connector (behind an `Arc`) across every controller in
//! the process to get process-wide init-once semantics.

pub mod loopback;

use crate::config::SessionConfig;
use crate::errors::BackendError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, info, warn};

/// Outgoing command understood by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    ToggleAudio,
    ToggleVideo,
    ToggleShareScreen,
    SendChatMessage(String),
    Hangup,
}

impl BackendCommand {
    /// Backend-native command name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            BackendCommand::ToggleAudio => "toggleAudio",
            BackendCommand::ToggleVideo => "toggleVideo",
            BackendCommand::ToggleShareScreen => "toggleShareScreen",
            BackendCommand::SendChatMessage(_) => "sendChatMessage",
            BackendCommand::Hangup => "hangup",
        }
    }
}

/// Event exactly as delivered by the backend: native name plus JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub name: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RawEvent {
    #[must_use]
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Raw event stream handed out once per handle.
pub type RawEventStream = mpsc::UnboundedReceiver<RawEvent>;

/// The conferencing client library.
#[async_trait]
pub trait ConferenceBackend: Send + Sync {
    /// Load and register the client library. Called at most once successfully
    /// per [`BackendConnector`].
    async fn load(&self) -> Result<(), BackendError>;

    /// Create a session handle for the given configuration.
    async fn create_handle(
        &self,
        config: &SessionConfig,
    ) -> Result<Box<dyn SessionHandle>, BackendError>;
}

/// A live session created by the backend.
///
/// Owned exclusively by the controller for the lifetime of one session.
#[async_trait]
pub trait SessionHandle: Send + fmt::Debug {
    /// Forward one command to the backend.
    async fn execute_command(&mut self, command: BackendCommand) -> Result<(), BackendError>;

    /// Take the raw event stream. Returns `None` once the stream has been taken.
    fn take_events(&mut self) -> Option<RawEventStream>;

    /// Release the session (media devices, network connections).
    async fn dispose(&mut self) -> Result<(), BackendError>;
}

/// Init-once wrapper around a [`ConferenceBackend`].
pub struct BackendConnector {
    backend: Arc<dyn ConferenceBackend>,
    /// Shared in-flight initialization. Concurrent callers await the same
    /// load; a failed load leaves the cell empty so a later join retries.
    initialized: OnceCell<()>,
}

impl fmt::Debug for BackendConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConnector")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl BackendConnector {
    #[must_use]
    pub fn new(backend: Arc<dyn ConferenceBackend>) -> Self {
        Self {
            backend,
            initialized: OnceCell::new(),
        }
    }

    /// Whether the client library has been loaded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// Load the client library if it has not been loaded yet.
    pub async fn initialize(&self) -> Result<(), BackendError> {
        self.initialized
            .get_or_try_init(|| async {
                info!(target: "ms.backend", "Loading conferencing client");
                self.backend.load().await.map_err(|e| {
                    warn!(target: "ms.backend", error = %e, "Conferencing client failed to load");
                    match e {
                        BackendError::Unavailable(_) => e,
                        other => BackendError::Unavailable(other.to_string()),
                    }
                })?;
                info!(target: "ms.backend", "Conferencing client loaded");
                Ok::<(), BackendError>(())
            })
            .await
            .map(|_| ())
    }

    /// Initialize (reusing a previous load) and create a session handle.
    pub async fn create_handle(
        &self,
        config: &SessionConfig,
    ) -> Result<Box<dyn SessionHandle>, BackendError> {
        self.initialize().await?;

        debug!(
            target: "ms.backend",
            room_id = %config.room_id,
            "Creating session handle"
        );
        self.backend.create_handle(config).await
    }

    /// Dispose a handle. Errors are returned for logging; the handle is
    /// consumed either way.
    pub async fn dispose(&self, mut handle: Box<dyn SessionHandle>) -> Result<(), BackendError> {
        handle.dispose().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Backend whose load takes a while and can be told to fail.
    struct SlowBackend {
        loads: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl ConferenceBackend for SlowBackend {
        async fn load(&self) -> Result<(), BackendError> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail_first && attempt == 0 {
                return Err(BackendError::Unavailable("script error".to_string()));
            }
            Ok(())
        }

        async fn create_handle(
            &self,
            _config: &SessionConfig,
        ) -> Result<Box<dyn SessionHandle>, BackendError> {
            Err(BackendError::HandleCreation("not used".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_initialize_shares_one_load() {
        let backend = Arc::new(SlowBackend {
            loads: AtomicUsize::new(0),
            fail_first: false,
        });
        let connector = Arc::new(BackendConnector::new(backend.clone()));

        let a = tokio::spawn({
            let connector = Arc::clone(&connector);
            async move { connector.initialize().await }
        });
        let b = tokio::spawn({
            let connector = Arc::clone(&connector);
            async move { connector.initialize().await }
        });

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());
        assert!(connector.initialize().await.is_ok());

        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
        assert!(connector.is_initialized());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_is_retried_by_next_initialize() {
        let backend = Arc::new(SlowBackend {
            loads: AtomicUsize::new(0),
            fail_first: true,
        });
        let connector = BackendConnector::new(backend.clone());

        let first = connector.initialize().await;
        assert!(matches!(first, Err(BackendError::Unavailable(_))));
        assert!(!connector.is_initialized());

        assert!(connector.initialize().await.is_ok());
        assert_eq!(backend.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_command_names() {
        assert_eq!(BackendCommand::ToggleAudio.name(), "toggleAudio");
        assert_eq!(BackendCommand::ToggleShareScreen.name(), "toggleShareScreen");
        assert_eq!(
            BackendCommand::SendChatMessage("hi".to_string()).name(),
            "sendChatMessage"
        );
        assert_eq!(BackendCommand::Hangup.name(), "hangup");
    }

    #[test]
    fn test_raw_event_deserializes_without_payload() {
        let event: RawEvent = serde_json::from_str(r#"{"name":"readyToClose"}"#).unwrap();
        assert_eq!(event.name, "readyToClose");
        assert!(event.payload.is_null());
    }
}
