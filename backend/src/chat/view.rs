//! View port
//!
//! The controller never touches a UI toolkit directly. It emits
//! [`ViewUpdate`] values through a [`ChatView`], and each front-end maps them
//! onto its own widgets. A front-end that has no element for an update simply
//! ignores it.

use crate::chat::models::TranscriptEntry;
use std::sync::Mutex;

/// A change the front-end should apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// Widget shown or hidden (the chat bubble shows while hidden)
    WidgetVisible(bool),
    /// Remove every message from the message list
    ClearMessages,
    /// Header naming the current agent
    AgentLabel(String),
    /// Append a message to the message list
    Message(TranscriptEntry),
    /// Typing indicator on or off
    Loading(bool),
    /// Notification for a new bot message; `pulse_bubble` when hidden
    Chime {
        /// Animate the chat bubble as well
        pulse_bubble: bool,
    },
    /// Link continuing the purchase on WhatsApp
    HandoffLink {
        /// Link text
        label: String,
        /// Target URL
        url: String,
    },
    /// Link to the complaint form
    ComplaintLink {
        /// Link text
        label: String,
        /// Target URL
        url: String,
    },
    /// Show the rating prompt
    RatingPrompt {
        /// Question shown above the levels
        question: String,
        /// Number of selectable levels
        levels: u8,
    },
    /// Levels 1..=chosen are highlighted
    RatingSelection(u8),
    /// Remove the rating prompt
    RatingClosed,
    /// Acknowledgement shown after a rating
    Feedback(String),
    /// Show or hide the reconnect action
    ReconnectOffer {
        /// Whether the action is visible
        visible: bool,
        /// Button text
        label: String,
    },
    /// Show or hide the "looking for an agent" loader
    Connecting {
        /// Whether the loader is visible
        visible: bool,
        /// Loader text
        text: String,
    },
}

/// Front-end port of the chat session
pub trait ChatView: Send + Sync {
    /// Apply one update
    fn apply(&self, update: ViewUpdate);
}

/// View that records every update, for tests and headless drivers
#[derive(Debug, Default)]
pub struct RecordingView {
    updates: Mutex<Vec<ViewUpdate>>,
}

impl RecordingView {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all updates so far
    pub fn updates(&self) -> Vec<ViewUpdate> {
        self.updates
            .lock()
            .map(|updates| updates.clone())
            .unwrap_or_default()
    }

    /// Drain the recorded updates
    pub fn take(&self) -> Vec<ViewUpdate> {
        self.updates
            .lock()
            .map(|mut updates| std::mem::take(&mut *updates))
            .unwrap_or_default()
    }

    /// Contents of all messages recorded so far
    pub fn messages(&self) -> Vec<TranscriptEntry> {
        self.updates()
            .into_iter()
            .filter_map(|update| match update {
                ViewUpdate::Message(entry) => Some(entry),
                _ => None,
            })
            .collect()
    }
}

impl ChatView for RecordingView {
    fn apply(&self, update: ViewUpdate) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(update);
        }
    }
}
