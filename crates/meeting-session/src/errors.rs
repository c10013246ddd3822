//! Meeting session error types.
//!
//! Errors map to client-safe messages for the presentation layer.
//! Backend internals are logged but never shown to the user.

use thiserror::Error;

/// Meeting session controller error type.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested session configuration was rejected before any side effect.
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    /// A session is already joining, active, or ending.
    #[error("Already in a session")]
    AlreadyInSession,

    /// The backend failed to load or could not create a session handle.
    #[error("Session initialization failed: {0}")]
    SessionInit(#[source] BackendError),

    /// A session command was issued while no session is active.
    #[error("No active session")]
    NotActive,

    /// The backend rejected a command for the active session.
    #[error("Command failed: {0}")]
    CommandFailed(#[source] BackendError),

    /// Controller mailbox failure (actor gone).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by the conferencing backend collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend client library failed to load.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend refused to create a session handle.
    #[error("Handle creation failed: {0}")]
    HandleCreation(String),

    /// The backend rejected a command.
    #[error("Command rejected: {0}")]
    CommandRejected(String),

    /// The handle has already been disposed.
    #[error("Handle disposed")]
    Disposed,
}

impl SessionError {
    /// Returns a client-safe error message (no backend details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            SessionError::InvalidConfig(_) => "Please enter a room name".to_string(),
            SessionError::AlreadyInSession => "You are already in a meeting".to_string(),
            SessionError::SessionInit(_) => {
                "Failed to join meeting. Please try again.".to_string()
            }
            SessionError::NotActive => "You are not in a meeting".to_string(),
            SessionError::CommandFailed(_) => "That action could not be completed".to_string(),
            SessionError::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    /// Bounded label for metrics.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            SessionError::InvalidConfig(_) => "invalid_config",
            SessionError::AlreadyInSession => "already_in_session",
            SessionError::SessionInit(_) => "init_failed",
            SessionError::NotActive => "not_active",
            SessionError::CommandFailed(_) => "command_failed",
            SessionError::Internal(_) => "internal",
        }
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        SessionError::SessionInit(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_hide_backend_details() {
        let err = SessionError::SessionInit(BackendError::Unavailable(
            "script https://meet.jit.si/external_api.js returned 503".to_string(),
        ));
        assert!(!err.client_message().contains("503"));
        assert_eq!(
            err.client_message(),
            "Failed to join meeting. Please try again."
        );

        let internal = SessionError::Internal("channel send failed: closed".to_string());
        assert_eq!(internal.client_message(), "An internal error occurred");
    }

    #[test]
    fn test_backend_error_conversion() {
        let err: SessionError = BackendError::HandleCreation("boom".to_string()).into();
        assert!(matches!(
            err,
            SessionError::SessionInit(BackendError::HandleCreation(_))
        ));
        assert_eq!(err.as_label(), "init_failed");
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", SessionError::InvalidConfig("room id is empty".to_string())),
            "Invalid session configuration: room id is empty"
        );
        assert_eq!(
            format!(
                "{}",
                SessionError::SessionInit(BackendError::Unavailable("offline".to_string()))
            ),
            "Session initialization failed: Backend unavailable: offline"
        );
        assert_eq!(format!("{}", BackendError::Disposed), "Handle disposed");
    }
}
