use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::typewriter::TypingMode;

/// Every state change in the system produces an Event.
/// Hosts drain them from a channel and render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A check decided to show the popup and recorded `shown_at_ms`.
    PopupShown {
        shown_at_ms: u64,
        /// True when no usable previous record existed.
        first_visit: bool,
        at: DateTime<Utc>,
    },
    /// A check ran but the cooldown has not elapsed yet.
    PopupSuppressed {
        last_shown_at_ms: u64,
        next_due_at_ms: u64,
        at: DateTime<Utc>,
    },
    PopupDismissed {
        at: DateTime<Utc>,
    },
    PopupPollerStarted {
        poll_period_ms: u64,
        at: DateTime<Utc>,
    },
    PopupPollerStopped {
        at: DateTime<Utc>,
    },
    /// Displayed text changed.
    TypewriterFrame {
        phrase_index: usize,
        text: String,
        mode: TypingMode,
        at: DateTime<Utc>,
    },
    /// The pause after a fully typed phrase is over.
    TypewriterDeletionStarted {
        phrase_index: usize,
        at: DateTime<Utc>,
    },
    TypewriterStopped {
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The `type` tag this variant serializes with.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::PopupShown { .. } => "popup_shown",
            Event::PopupSuppressed { .. } => "popup_suppressed",
            Event::PopupDismissed { .. } => "popup_dismissed",
            Event::PopupPollerStarted { .. } => "popup_poller_started",
            Event::PopupPollerStopped { .. } => "popup_poller_stopped",
            Event::TypewriterFrame { .. } => "typewriter_frame",
            Event::TypewriterDeletionStarted { .. } => "typewriter_deletion_started",
            Event::TypewriterStopped { .. } => "typewriter_stopped",
        }
    }
}
