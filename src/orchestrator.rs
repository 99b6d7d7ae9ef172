//! Conversation orchestration: turn pipeline, consent gate, and the
//! command/event surface for the UI boundary.
//!
//! [`ConversationOrchestrator`] composes the capture session, the playback
//! manager, and the opaque [`MessageProcessor`] collaborator. The turn
//! pipeline suspends only at the processor call; everything else is
//! synchronous reducer work, so the `processing` flag is set on entry and
//! cleared on every exit path — success, processor failure, or empty-input
//! rejection — and can never be left hanging.
//!
//! Concurrent `send` calls are not serialized here: the UI boundary is
//! expected to disable the send affordance while `processing` is true.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::advisory::Advisory;
use crate::capture::{CaptureSignal, SpeechCaptureSession};
use crate::config::AssistantConfig;
use crate::error::{Result, VoiceError};
use crate::message::{ConsentDecision, ConsentRequest, Message, MessageSender};
use crate::platform::{RecognizerBackend, RecognizerEvent, SynthesisEvent, SynthesizerBackend};
use crate::playback::{PlaybackSignal, SpeechPlaybackManager};
use crate::processor::MessageProcessor;

/// Broadcast capacity for UI boundary events.
const EVENT_CHANNEL_SIZE: usize = 256;

/// Command from the UI boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationCommand {
    /// Submit a typed (or quick-action) message.
    Send(String),
    /// Start listening, or stop if already listening.
    ToggleMic,
    /// Arm voice output.
    EnableVoice,
    /// Disarm voice output.
    DisableVoice,
    /// Cut off the current utterance.
    StopSpeaking,
    /// Answer the pending consent request.
    ResolveConsent(ConsentDecision),
    /// Switch the spoken persona by catalog id.
    SelectPersona(String),
    /// Re-query the platform voice inventory (voices-changed signal).
    RefreshVoices,
}

/// Event for the UI boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// A message was appended to the transcript.
    MessageAppended(Message),
    /// Live preview of the in-progress voice transcript.
    InterimTranscript(String),
    ListeningChanged(bool),
    ProcessingChanged(bool),
    SpeakingChanged(bool),
    /// The processor requires explicit user approval to proceed.
    ConsentRequested(ConsentRequest),
    /// The user answered the pending consent request.
    ConsentResolved(ConsentDecision),
    /// A transient, recoverable fault notification.
    Advisory(Advisory),
}

/// Composes capture, playback, and the message processor into one
/// conversational assistant surface.
pub struct ConversationOrchestrator {
    capture: SpeechCaptureSession,
    playback: SpeechPlaybackManager,
    processor: Arc<dyn MessageProcessor>,
    messages: Vec<Message>,
    next_message_id: u64,
    processing: bool,
    consent_request: Option<ConsentRequest>,
    events: broadcast::Sender<ConversationEvent>,
    recognizer_rx: Option<mpsc::UnboundedReceiver<RecognizerEvent>>,
    synthesis_rx: Option<mpsc::UnboundedReceiver<SynthesisEvent>>,
}

impl ConversationOrchestrator {
    /// Wire up a conversation over the given platform backends and
    /// processor. A non-empty configured greeting is appended as the
    /// opening agent message (but not spoken).
    pub fn new(
        config: &AssistantConfig,
        recognizer: Box<dyn RecognizerBackend>,
        synthesizer: Box<dyn SynthesizerBackend>,
        processor: Arc<dyn MessageProcessor>,
    ) -> Self {
        let (recognizer_tx, recognizer_rx) = mpsc::unbounded_channel();
        let (synthesis_tx, synthesis_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        let capture = SpeechCaptureSession::new(recognizer, &config.capture, recognizer_tx);
        let playback = SpeechPlaybackManager::new(synthesizer, &config.playback, synthesis_tx);

        let mut orchestrator = Self {
            capture,
            playback,
            processor,
            messages: Vec::new(),
            next_message_id: 0,
            processing: false,
            consent_request: None,
            events,
            recognizer_rx: Some(recognizer_rx),
            synthesis_rx: Some(synthesis_rx),
        };

        let greeting = config.greeting.trim();
        if !greeting.is_empty() {
            let id = orchestrator.take_message_id();
            orchestrator.push_message(Message::new(id, MessageSender::Agent, greeting));
        }
        orchestrator
    }

    /// Subscribe to UI boundary events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// The conversation transcript, in append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_listening(&self) -> bool {
        self.capture.is_listening()
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn is_speaking(&self) -> bool {
        self.playback.is_speaking()
    }

    /// Whether voice output is currently armed.
    pub fn is_voice_enabled(&self) -> bool {
        self.playback.is_armed()
    }

    /// The pending consent request, if the processor gated a turn on one.
    pub fn consent_request(&self) -> Option<&ConsentRequest> {
        self.consent_request.as_ref()
    }

    /// The playback manager, for voice-picker surfaces.
    pub fn playback(&self) -> &SpeechPlaybackManager {
        &self.playback
    }

    /// Submit one user turn.
    ///
    /// Blank input is rejected with no side effects. On processor failure
    /// the user message stays in the transcript, no agent message is
    /// appended, and a [`Advisory::ProcessorFailure`] is surfaced. The
    /// `processing` flag is cleared on every path before this returns.
    pub async fn send(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let id = self.take_message_id();
        self.push_message(Message::new(id, MessageSender::User, text));
        self.set_processing(true);

        let history = self.messages.clone();
        let processor = Arc::clone(&self.processor);
        let result = processor.process(text, &history).await;
        match result {
            Ok(reply) => {
                let mut message = reply.message;
                // The orchestrator owns id assignment; restamp to keep ids
                // unique and monotonic.
                message.id = self.take_message_id();
                let spoken = (message.sender == MessageSender::Agent).then(|| message.text.clone());
                self.push_message(message);

                if let Some(text) = spoken {
                    let signals = self.playback.speak(&text, None);
                    self.apply_playback_signals(signals);
                }

                if reply.requires_consent {
                    match reply.consent_request {
                        Some(payload) => {
                            let request = ConsentRequest { payload };
                            self.consent_request = Some(request.clone());
                            self.emit(ConversationEvent::ConsentRequested(request));
                        }
                        None => {
                            // Flag without payload: treat as no-op consent.
                            debug!("processor flagged consent without a payload, ignoring");
                        }
                    }
                }
            }
            Err(e) => {
                warn!("message processor failed: {e}");
                self.emit(ConversationEvent::Advisory(Advisory::ProcessorFailure));
            }
        }
        self.set_processing(false);
    }

    /// Start listening, or stop if already listening. Starting also cuts
    /// off any agent speech so the mic does not transcribe the speaker.
    pub fn toggle_mic(&mut self) {
        let signals = if self.capture.is_listening() {
            self.capture.stop()
        } else {
            let playback_signals = self.playback.stop();
            self.apply_playback_signals(playback_signals);
            self.capture.start()
        };
        for signal in signals {
            if self.apply_capture_signal(signal).is_some() {
                // start()/stop() never finalize a transcript.
                warn!("transcript emitted during mic toggle was dropped");
            }
        }
    }

    /// Arm voice output (rearms a single-shot session).
    pub fn enable_voice(&mut self) {
        self.playback.set_armed(true);
    }

    /// Disarm voice output. Any utterance already in flight finishes.
    pub fn disable_voice(&mut self) {
        self.playback.set_armed(false);
    }

    /// Cut off the current utterance.
    pub fn stop_speaking(&mut self) {
        let signals = self.playback.stop();
        self.apply_playback_signals(signals);
    }

    /// Answer the pending consent request, clearing it. A decision with no
    /// pending request is ignored.
    pub fn resolve_consent(&mut self, decision: ConsentDecision) {
        if self.consent_request.take().is_some() {
            info!(?decision, "consent resolved");
            self.emit(ConversationEvent::ConsentResolved(decision));
        }
    }

    /// Switch the spoken persona by catalog id.
    pub fn select_persona(&mut self, persona_id: &str) {
        self.playback.set_active_persona(persona_id);
    }

    /// Recompute the persona→voice assignment from the live inventory.
    pub fn refresh_voices(&mut self) {
        self.playback.refresh_voices();
    }

    /// Route one recognizer event through the capture reducer. A finalized
    /// transcript becomes a full [`send`](Self::send) turn.
    pub async fn handle_recognizer_event(&mut self, event: RecognizerEvent) {
        for signal in self.capture.handle_event(event) {
            if let Some(text) = self.apply_capture_signal(signal) {
                self.send(&text).await;
            }
        }
    }

    /// Route one synthesis event through the playback reducer.
    pub fn handle_synthesis_event(&mut self, event: SynthesisEvent) {
        let signals = self.playback.handle_event(event);
        self.apply_playback_signals(signals);
    }

    /// Drive the conversation until cancelled: UI commands, recognizer
    /// events, and synthesis events all funnel through one task.
    ///
    /// # Errors
    ///
    /// Returns an error if called while a previous `run` is still holding
    /// the platform event receivers.
    pub async fn run(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<ConversationCommand>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut recognizer_rx = self
            .recognizer_rx
            .take()
            .ok_or_else(|| VoiceError::Pipeline("conversation loop already running".to_owned()))?;
        let mut synthesis_rx = self
            .synthesis_rx
            .take()
            .ok_or_else(|| VoiceError::Pipeline("conversation loop already running".to_owned()))?;

        info!("conversation loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("conversation loop cancelled");
                    break;
                }
                Some(command) = commands.recv() => {
                    self.handle_command(command).await;
                }
                Some(event) = recognizer_rx.recv() => {
                    self.handle_recognizer_event(event).await;
                }
                Some(event) = synthesis_rx.recv() => {
                    self.handle_synthesis_event(event);
                }
                else => break,
            }
        }

        // Hand the receivers back so the loop can be restarted.
        self.recognizer_rx = Some(recognizer_rx);
        self.synthesis_rx = Some(synthesis_rx);
        Ok(())
    }

    async fn handle_command(&mut self, command: ConversationCommand) {
        match command {
            ConversationCommand::Send(text) => self.send(&text).await,
            ConversationCommand::ToggleMic => self.toggle_mic(),
            ConversationCommand::EnableVoice => self.enable_voice(),
            ConversationCommand::DisableVoice => self.disable_voice(),
            ConversationCommand::StopSpeaking => self.stop_speaking(),
            ConversationCommand::ResolveConsent(decision) => self.resolve_consent(decision),
            ConversationCommand::SelectPersona(id) => self.select_persona(&id),
            ConversationCommand::RefreshVoices => self.refresh_voices(),
        }
    }

    /// Apply a capture signal, returning a finalized transcript for the
    /// caller to turn into a `send`.
    fn apply_capture_signal(&mut self, signal: CaptureSignal) -> Option<String> {
        match signal {
            CaptureSignal::TranscriptFinal(text) => return Some(text),
            CaptureSignal::TranscriptInterim(text) => {
                self.emit(ConversationEvent::InterimTranscript(text));
            }
            CaptureSignal::ListeningChanged(listening) => {
                self.emit(ConversationEvent::ListeningChanged(listening));
            }
            CaptureSignal::Fault(advisory) => {
                self.emit(ConversationEvent::Advisory(advisory));
            }
        }
        None
    }

    fn apply_playback_signals(&mut self, signals: Vec<PlaybackSignal>) {
        for signal in signals {
            match signal {
                PlaybackSignal::SpeakingChanged(speaking) => {
                    self.emit(ConversationEvent::SpeakingChanged(speaking));
                }
                PlaybackSignal::Fault(advisory) => {
                    self.emit(ConversationEvent::Advisory(advisory));
                }
            }
        }
    }

    fn take_message_id(&mut self) -> u64 {
        self.next_message_id += 1;
        self.next_message_id
    }

    fn push_message(&mut self, message: Message) {
        self.messages.push(message.clone());
        self.emit(ConversationEvent::MessageAppended(message));
    }

    fn set_processing(&mut self, processing: bool) {
        if self.processing != processing {
            self.processing = processing;
            self.emit(ConversationEvent::ProcessingChanged(processing));
        }
    }

    fn emit(&self, event: ConversationEvent) {
        // Send fails only when nobody is subscribed, which is fine.
        let _ = self.events.send(event);
    }
}
