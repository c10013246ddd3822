//! Mailbox monitoring for the session controller actor.
//!
//! | Level    | Depth   |
//! |----------|---------|
//! | Normal   | < 100   |
//! | Warning  | 100-400 |
//! | Critical | > 400   |

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Depth at which the mailbox is considered elevated.
pub const CONTROLLER_MAILBOX_NORMAL: usize = 100;

/// Depth above which the mailbox is considered critical.
pub const CONTROLLER_MAILBOX_WARNING: usize = 400;

/// Mailbox depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    Normal,
    Warning,
    Critical,
}

/// Tracks queue depth and throughput for one actor mailbox.
#[derive(Debug)]
pub struct MailboxMonitor {
    actor_id: String,
    depth: AtomicUsize,
    peak_depth: AtomicUsize,
    messages_processed: AtomicU64,
}

impl MailboxMonitor {
    #[must_use]
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            depth: AtomicUsize::new(0),
            peak_depth: AtomicUsize::new(0),
            messages_processed: AtomicU64::new(0),
        }
    }

    /// Record a message being taken off the channel for handling.
    pub fn record_enqueue(&self) {
        let new_depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_depth.fetch_max(new_depth, Ordering::Relaxed);

        match level_for_depth(new_depth) {
            MailboxLevel::Critical => warn!(
                target: "ms.actor.mailbox",
                actor_id = %self.actor_id,
                depth = new_depth,
                threshold = CONTROLLER_MAILBOX_WARNING,
                "Mailbox depth critical"
            ),
            MailboxLevel::Warning if new_depth == CONTROLLER_MAILBOX_NORMAL => debug!(
                target: "ms.actor.mailbox",
                actor_id = %self.actor_id,
                depth = new_depth,
                "Mailbox depth elevated"
            ),
            _ => {}
        }
    }

    /// Record a message as handled.
    pub fn record_dequeue(&self) {
        let _ = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| d.checked_sub(1));
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn current_level(&self) -> MailboxLevel {
        level_for_depth(self.current_depth())
    }
}

fn level_for_depth(depth: usize) -> MailboxLevel {
    if depth < CONTROLLER_MAILBOX_NORMAL {
        MailboxLevel::Normal
    } else if depth <= CONTROLLER_MAILBOX_WARNING {
        MailboxLevel::Warning
    } else {
        MailboxLevel::Critical
    }
}
