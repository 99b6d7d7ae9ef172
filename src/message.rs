//! Conversation data types shared across the controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    /// The farmer talking to the assistant.
    User,
    /// The assistant.
    Agent,
}

/// A tappable follow-up action attached to an agent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAction {
    /// Stable action identifier the UI reports back on tap.
    pub id: String,
    /// Button label.
    pub label: String,
}

/// One entry in the conversation transcript.
///
/// Messages are immutable once appended; the conversation list is
/// append-only for the lifetime of the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Monotonically assigned id, unique within the conversation.
    pub id: u64,
    pub sender: MessageSender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Follow-up actions, in display order. Usually empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_actions: Vec<QuickAction>,
}

impl Message {
    /// Build a message stamped with the current time and no quick actions.
    pub fn new(id: u64, sender: MessageSender, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            quick_actions: Vec::new(),
        }
    }
}

/// Opaque consent payload surfaced to the UI boundary when the processor
/// flags that a pending action needs explicit user approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRequest {
    /// Processor-defined payload; this core never inspects it.
    pub payload: serde_json::Value,
}

/// The user's decision on a pending [`ConsentRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentDecision {
    Granted,
    Declined,
}
