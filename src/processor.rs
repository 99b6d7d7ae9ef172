//! The message-understanding collaborator boundary.
//!
//! What the assistant "understands" is out of scope for this crate; the
//! orchestrator hands each finalized user utterance to an opaque
//! [`MessageProcessor`] and deals only with the reply envelope.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::Message;

/// Reply envelope returned by a [`MessageProcessor`].
#[derive(Debug, Clone)]
pub struct ProcessorReply {
    /// The message to append to the conversation. An `Agent` sender is
    /// spoken aloud when voice output is armed.
    pub message: Message,
    /// Whether the reply requires explicit user consent before the
    /// underlying action proceeds.
    pub requires_consent: bool,
    /// Consent payload for the UI boundary. A `requires_consent` flag with
    /// no payload is treated as a no-op, not an error.
    pub consent_request: Option<serde_json::Value>,
}

impl ProcessorReply {
    /// A plain reply with no consent gate.
    pub fn message(message: Message) -> Self {
        Self {
            message,
            requires_consent: false,
            consent_request: None,
        }
    }
}

/// Opaque message-understanding collaborator.
///
/// `process` is the only suspension point in a conversation turn. It may
/// fail; the orchestrator converts failures into a transient advisory and
/// never lets them poison the conversation state.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    /// Interpret `text` in the context of the conversation so far and
    /// produce a reply.
    ///
    /// `history` includes the user message being answered.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply cannot be produced; the user message
    /// stays in the transcript and the turn is abandoned.
    async fn process(&self, text: &str, history: &[Message]) -> Result<ProcessorReply>;
}
