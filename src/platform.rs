//! Platform speech service seams.
//!
//! The underlying recognizer and synthesizer are process-wide singletons
//! owned by the host platform (browser, WebView, OS speech service). This
//! module models them as trait objects that deliver **tagged events** over
//! channels instead of mutating shared callbacks: every event carries the
//! epoch or utterance token of the instance that produced it, and the
//! reducers in [`crate::capture`] and [`crate::playback`] drop anything
//! stale. `stop`/`cancel` are best-effort requests — one more in-flight
//! event may still arrive afterwards and must be ignored, not acted on.

use tokio::sync::mpsc;

use crate::catalog::DeviceVoice;
use crate::error::{Result, VoiceError};

/// Options applied to each fresh recognizer instance.
#[derive(Debug, Clone)]
pub struct RecognitionOptions {
    /// BCP-47 recognition language tag.
    pub language: String,
    /// Ask the platform to keep the session open across pauses.
    pub continuous: bool,
    /// Deliver provisional interim results.
    pub interim_results: bool,
}

/// Event payload from a recognizer instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEventPayload {
    /// The instance began capturing audio.
    Started,
    /// A provisional transcript segment, replacing any previous interim.
    ResultInterim(String),
    /// A platform-confirmed, immutable transcript segment.
    ResultFinal(String),
    /// The instance failed with a platform error code.
    Error(String),
    /// The instance ended, normally or after stop/error.
    Ended,
}

/// A recognizer event tagged with the epoch of the instance that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerEvent {
    pub epoch: u64,
    pub payload: RecognizerEventPayload,
}

/// Handle to the platform speech recognizer singleton.
///
/// `start` creates a fresh underlying instance that tags everything it
/// emits with `epoch`. At most one instance is live; callers tear down the
/// previous instance (epoch bump + `stop`) before starting another.
pub trait RecognizerBackend: Send {
    /// Whether the platform exposes recognition at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Start a fresh recognizer instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses to start a session.
    fn start(
        &mut self,
        epoch: u64,
        events: mpsc::UnboundedSender<RecognizerEvent>,
        options: &RecognitionOptions,
    ) -> Result<()>;

    /// Best-effort stop of the current instance.
    fn stop(&mut self);
}

/// One utterance handed to the synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    /// Token identifying this utterance in its event stream.
    pub token: u64,
    pub text: String,
    /// Device voice name to bind, if one was resolved.
    pub voice: Option<String>,
    /// Pitch offset derived from the persona's gender category.
    pub pitch: f32,
    /// Speaking rate multiplier.
    pub rate: f32,
}

/// Event payload for one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEventPayload {
    Started,
    Ended,
    Error(String),
}

/// A synthesis event tagged with the token of the utterance it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisEvent {
    pub token: u64,
    pub payload: SynthesisEventPayload,
}

/// Handle to the platform speech synthesizer singleton.
pub trait SynthesizerBackend: Send {
    /// Whether the platform exposes synthesis at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Current voice inventory. May change at runtime; the platform's
    /// voices-changed signal should be forwarded as a refresh command.
    fn voices(&self) -> Vec<DeviceVoice>;

    /// Queue an utterance for playback.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the utterance.
    fn speak(
        &mut self,
        request: UtteranceRequest,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> Result<()>;

    /// Best-effort cancellation of any audio in flight.
    fn cancel(&mut self);
}

/// Recognizer stand-in for platforms without speech recognition.
///
/// `start` never succeeds; the capture session checks availability first
/// and reports [`crate::advisory::Advisory::RecognitionUnsupported`]
/// without ever calling it.
#[derive(Debug, Default)]
pub struct NullRecognizer;

impl RecognizerBackend for NullRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    fn start(
        &mut self,
        _epoch: u64,
        _events: mpsc::UnboundedSender<RecognizerEvent>,
        _options: &RecognitionOptions,
    ) -> Result<()> {
        Err(VoiceError::Recognition(
            "speech recognition is not supported on this platform".to_owned(),
        ))
    }

    fn stop(&mut self) {}
}

/// Synthesizer stand-in for platforms without speech synthesis.
#[derive(Debug, Default)]
pub struct NullSynthesizer;

impl SynthesizerBackend for NullSynthesizer {
    fn is_available(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<DeviceVoice> {
        Vec::new()
    }

    fn speak(
        &mut self,
        _request: UtteranceRequest,
        _events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> Result<()> {
        Err(VoiceError::Synthesis(
            "speech synthesis is not supported on this platform".to_owned(),
        ))
    }

    fn cancel(&mut self) {}
}
