//! Actor implementation for the meeting session controller.
//!
//! ```text
//! MeetingSessionController (one per host page)
//! ├── owns session state, registry, chat log and timer
//! ├── EventBridge forwarding task (one per session)
//! └── MeetingTimer ticker task (one per session)
//! ```
//!
//! # Modules
//!
//! - [`controller`] - `MeetingSessionController` and its handle
//! - [`messages`] - Mailbox, snapshot and notification types
//! - [`metrics`] - Mailbox monitoring

pub mod controller;
pub mod messages;
pub mod metrics;

pub use controller::{MeetingSessionController, MeetingSessionControllerHandle};
pub use messages::*;
pub use metrics::MailboxMonitor;
