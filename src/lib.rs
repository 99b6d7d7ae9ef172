//! Sakhi voice: the voice interaction controller for the Sakhi farm
//! advisory assistant.
//!
//! This crate orchestrates one conversational voice experience:
//! Microphone → capture → orchestrator → message processor → playback → Speaker
//!
//! # Architecture
//!
//! The controller is built from reducers fed by tagged platform events:
//! - **Capture**: one continuous speech-recognition lifecycle with
//!   auto-resume, guarded against stale callbacks by a session epoch
//! - **Catalog**: deterministic persona→voice assignment over the
//!   platform's dynamic voice inventory
//! - **Playback**: single-flight speech synthesis guarded by an utterance
//!   token, with a sticky or single-shot arming policy
//! - **Orchestrator**: the consent-gated turn pipeline around an opaque
//!   [`MessageProcessor`] collaborator, plus the command/event surface for
//!   the UI boundary
//!
//! The platform recognizer and synthesizer are trait seams
//! ([`platform::RecognizerBackend`], [`platform::SynthesizerBackend`]);
//! hosts adapt whatever speech services they have and feed the resulting
//! events into [`ConversationOrchestrator::run`].

pub mod advisory;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod platform;
pub mod playback;
pub mod processor;

pub use advisory::Advisory;
pub use config::{AssistantConfig, PlaybackPolicy};
pub use error::{Result, VoiceError};
pub use message::{ConsentDecision, ConsentRequest, Message, MessageSender, QuickAction};
pub use orchestrator::{ConversationCommand, ConversationEvent, ConversationOrchestrator};
pub use processor::{MessageProcessor, ProcessorReply};
