//! Meeting Session Library
//!
//! Drives the lifecycle of a live audio/video meeting hosted by an external
//! conferencing backend, for the school administration video chat pages:
//!
//! - Join/leave state machine with init-once backend loading
//! - Translation of backend events into registry, chat and flag updates
//! - Command relay (mute, camera, screen share, chat) without optimistic updates
//! - Elapsed meeting time while a session is active
//!
//! # Architecture
//!
//! ```text
//! presentation layer
//!     │ join / leave / toggle_* / send_chat_message
//!     ▼
//! MeetingSessionControllerHandle ──mpsc──▶ MeetingSessionController (actor)
//!                                             ├── BackendConnector ──▶ SessionHandle
//!                                             ├── EventBridge ◀── raw backend events
//!                                             ├── ParticipantRegistry
//!                                             ├── ChatLog
//!                                             └── MeetingTimer
//! ```
//!
//! The controller publishes a [`SessionSnapshot`](actors::SessionSnapshot)
//! after every mutation and broadcasts
//! [`SessionNotification`](actors::SessionNotification)s for joins, endings
//! and roster changes.
//!
//! # Modules
//!
//! - [`actors`] - Controller actor, mailbox messages and snapshots
//! - [`backend`] - Backend contract, init-once connector, loopback backend
//! - [`bridge`] - Backend event translation and subscription lifetime
//! - [`chat`] - Chat log
//! - [`config`] - Host configuration from environment and `SessionConfig`
//! - [`errors`] - Error types with client-safe messages
//! - [`observability`] - Metrics
//! - [`registry`] - Participant roster
//! - [`timer`] - Meeting timer

pub mod actors;
pub mod backend;
pub mod bridge;
pub mod chat;
pub mod config;
pub mod errors;
pub mod observability;
pub mod registry;
pub mod timer;

pub use actors::{MeetingSessionControllerHandle, SessionSnapshot, SessionState};
pub use config::SessionConfig;
pub use errors::{BackendError, SessionError};
