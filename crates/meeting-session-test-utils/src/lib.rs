//! # Meeting Session Test Utilities
//!
//! Mocks and fixtures for testing the meeting session controller without a
//! real conferencing backend.
//!
//! ## Modules
//!
//! - `mock_backend` - Scriptable `ConferenceBackend` with event injection
//! - `fixtures` - Session configurations and raw backend event builders
//! - `assertions` - Snapshot wait helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meeting_session_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let backend = MockBackend::healthy();
//!     let connector = Arc::new(BackendConnector::new(backend.as_backend()));
//!     let controller = MeetingSessionControllerHandle::new(connector, Duration::from_secs(1));
//!
//!     controller.join(TestSessionConfig::new("room-1").build()).await.unwrap();
//!     backend.emit(events::participant_joined("p1", Some("Bob")));
//!
//!     let snapshot = wait_for_snapshot(&controller, |s| s.participants.len() == 2).await;
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock_backend;

pub use assertions::{chat_bodies, participant_ids, wait_for_snapshot, wait_for_state};
pub use fixtures::{events, TestSessionConfig};
pub use mock_backend::{MockBackend, MockBackendBuilder, MockHandle};
