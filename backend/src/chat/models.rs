//! Chat data models
//!
//! Defines the session, its phase, the history replayed to the model and the
//! rendered transcript shown to the customer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a turn in the history sent to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Turn written by the customer
    User,
    /// Turn produced by the model (or seeded on its behalf)
    Model,
}

impl Role {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// A single role-tagged turn of the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced the turn
    pub role: Role,
    /// Raw text of the turn
    pub text: String,
}

impl Turn {
    /// Create a customer turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create a model turn
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Who a transcript entry is displayed as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The customer
    User,
    /// The agent persona
    Bot,
}

/// A rendered message in the chat transcript
///
/// Entries are append-only: once pushed into a [`Session`] they are never
/// edited. Ordering is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Who the message is shown as
    pub sender: Sender,
    /// HTML content ready for display
    pub content: String,
}

/// Lifecycle phase of the chat widget's session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No session has been started yet
    Closed,
    /// Welcome sent, waiting for the customer's name
    AwaitingName,
    /// Regular conversation
    Active,
    /// Terminal until the customer asks for a new agent
    Ended,
}

impl Phase {
    /// Whether the controller accepts customer messages in this phase
    pub fn accepts_messages(&self) -> bool {
        matches!(self, Phase::AwaitingName | Phase::Active)
    }
}

/// One continuous chat interaction, from name collection to termination
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique identifier, used to discard deferred work from older sessions
    pub id: Uuid,
    /// Persona name of the agent for this session
    pub agent_name: String,
    /// Customer name, set verbatim once validated
    pub customer_name: Option<String>,
    history: Vec<Turn>,
    transcript: Vec<TranscriptEntry>,
}

impl Session {
    /// Create a new session with the given agent persona
    pub fn new(agent_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_name,
            customer_name: None,
            history: Vec::new(),
            transcript: Vec::new(),
        }
    }

    /// History replayed to the model, oldest first
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Rendered transcript, oldest first
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Append a turn to the history
    pub fn push_turn(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    /// Append a rendered message to the transcript
    pub fn push_entry(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
    }

    /// The current history followed by `turn`, without committing it
    pub fn history_with(&self, turn: Turn) -> Vec<Turn> {
        let mut history = self.history.clone();
        history.push(turn);
        history
    }

    /// Name used when addressing the customer (empty until known)
    pub fn addressee(&self) -> &str {
        self.customer_name.as_deref().unwrap_or("")
    }
}
