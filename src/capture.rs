//! Continuous speech capture with auto-resume.
//!
//! [`SpeechCaptureSession`] owns one logical recognition lifecycle over the
//! platform recognizer singleton. Platform callbacks are redelivered as
//! tagged [`RecognizerEvent`]s into [`handle_event`], a single-threaded
//! reducer; each call returns the [`CaptureSignal`]s it emitted so the
//! caller can route them without shared mutable state.
//!
//! The `epoch` counter is the staleness guard: it identifies the currently
//! live recognizer instance, and any event tagged with a different epoch is
//! dropped. This is what keeps a late callback from a torn-down instance
//! from corrupting the active transcript.
//!
//! [`handle_event`]: SpeechCaptureSession::handle_event

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::advisory::{Advisory, classify_recognition_error};
use crate::config::CaptureConfig;
use crate::platform::{
    RecognitionOptions, RecognizerBackend, RecognizerEvent, RecognizerEventPayload,
};

/// Capture lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Listening,
}

/// Signal emitted by the capture reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSignal {
    /// Live preview of the in-progress transcript (finals + interim).
    TranscriptInterim(String),
    /// A finalized utterance, deduplicated, ready for the orchestrator.
    TranscriptFinal(String),
    ListeningChanged(bool),
    Fault(Advisory),
}

/// One continuous speech-recognition lifecycle.
pub struct SpeechCaptureSession {
    backend: Box<dyn RecognizerBackend>,
    event_tx: mpsc::UnboundedSender<RecognizerEvent>,
    options: RecognitionOptions,
    state: CaptureState,
    resume_requested: bool,
    final_segments: Vec<String>,
    interim_segment: String,
    last_submitted: String,
    epoch: u64,
}

impl SpeechCaptureSession {
    /// Create a session over `backend`. Events the backend sends through
    /// `event_tx` must be fed back into [`handle_event`](Self::handle_event).
    pub fn new(
        backend: Box<dyn RecognizerBackend>,
        config: &CaptureConfig,
        event_tx: mpsc::UnboundedSender<RecognizerEvent>,
    ) -> Self {
        Self {
            backend,
            event_tx,
            options: RecognitionOptions {
                language: config.language.clone(),
                continuous: config.continuous,
                interim_results: config.interim_results,
            },
            state: CaptureState::Idle,
            resume_requested: false,
            final_segments: Vec::new(),
            interim_segment: String::new(),
            last_submitted: String::new(),
            epoch: 0,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.state == CaptureState::Listening
    }

    /// Epoch of the currently live recognizer instance.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Begin (or restart) listening.
    ///
    /// Any live instance is torn down first — the singleton recognizer must
    /// never have two active sessions. The transcript accumulator and the
    /// submission dedup are reset for the new utterance.
    pub fn start(&mut self) -> Vec<CaptureSignal> {
        if !self.backend.is_available() {
            warn!("speech recognition not supported on this platform");
            return vec![CaptureSignal::Fault(Advisory::RecognitionUnsupported)];
        }

        if self.state == CaptureState::Listening {
            debug!(epoch = self.epoch, "tearing down live recognizer before restart");
            self.backend.stop();
        }

        self.final_segments.clear();
        self.interim_segment.clear();
        self.last_submitted.clear();
        self.resume_requested = true;
        self.epoch += 1;
        info!(epoch = self.epoch, language = %self.options.language, "starting recognition");

        if let Err(e) = self.backend.start(self.epoch, self.event_tx.clone(), &self.options) {
            warn!("recognizer failed to start: {e}");
            self.resume_requested = false;
            let mut signals = Vec::new();
            if self.state == CaptureState::Listening {
                self.state = CaptureState::Idle;
                signals.push(CaptureSignal::ListeningChanged(false));
            }
            signals.push(CaptureSignal::Fault(Advisory::RecognitionFailed));
            return signals;
        }

        Vec::new()
    }

    /// Stop listening. The epoch bump makes any event still in flight from
    /// the stopped instance stale.
    pub fn stop(&mut self) -> Vec<CaptureSignal> {
        self.resume_requested = false;
        self.epoch += 1;
        self.backend.stop();

        if self.state == CaptureState::Listening {
            info!("recognition stopped");
            self.state = CaptureState::Idle;
            vec![CaptureSignal::ListeningChanged(false)]
        } else {
            Vec::new()
        }
    }

    /// Reduce one recognizer event into the session state.
    pub fn handle_event(&mut self, event: RecognizerEvent) -> Vec<CaptureSignal> {
        if event.epoch != self.epoch {
            trace!(
                event_epoch = event.epoch,
                current_epoch = self.epoch,
                "dropping stale recognizer event"
            );
            return Vec::new();
        }

        match event.payload {
            RecognizerEventPayload::Started => self.on_started(),
            RecognizerEventPayload::ResultInterim(text) => self.on_interim(text),
            RecognizerEventPayload::ResultFinal(text) => self.on_final(text),
            RecognizerEventPayload::Error(code) => self.on_error(&code),
            RecognizerEventPayload::Ended => self.on_ended(),
        }
    }

    fn on_started(&mut self) -> Vec<CaptureSignal> {
        if self.state == CaptureState::Idle {
            self.state = CaptureState::Listening;
            vec![CaptureSignal::ListeningChanged(true)]
        } else {
            // A resumed instance reports started while we never left
            // Listening; nothing changed for the UI.
            Vec::new()
        }
    }

    fn on_interim(&mut self, text: String) -> Vec<CaptureSignal> {
        self.interim_segment = text;
        let preview = self.combined_preview();
        if preview.is_empty() {
            Vec::new()
        } else {
            vec![CaptureSignal::TranscriptInterim(preview)]
        }
    }

    fn on_final(&mut self, text: String) -> Vec<CaptureSignal> {
        if !text.trim().is_empty() {
            self.final_segments.push(text);
        }
        self.interim_segment.clear();

        let combined = self.combined_final();
        let mut signals = Vec::new();
        if !combined.is_empty() && combined != self.last_submitted {
            debug!(text = %combined, "finalized transcript");
            self.last_submitted = combined.clone();
            signals.push(CaptureSignal::TranscriptFinal(combined));
        }

        // One finalized utterance per instance: ask the platform to wind
        // down and do not resume when it reports ended.
        self.resume_requested = false;
        self.backend.stop();
        signals
    }

    fn on_error(&mut self, code: &str) -> Vec<CaptureSignal> {
        let kind = classify_recognition_error(code);
        warn!(code = %code, "recognition error: {}", kind.message());
        self.resume_requested = false;

        let mut signals = Vec::new();
        if self.state == CaptureState::Listening {
            self.state = CaptureState::Idle;
            signals.push(CaptureSignal::ListeningChanged(false));
        }
        signals.push(CaptureSignal::Fault(kind));
        signals
    }

    fn on_ended(&mut self) -> Vec<CaptureSignal> {
        if self.resume_requested {
            // The platform imposed a session limit mid-utterance; keep
            // listening on a fresh instance.
            self.epoch += 1;
            debug!(epoch = self.epoch, "recognizer ended early, resuming");
            if let Err(e) = self.backend.start(self.epoch, self.event_tx.clone(), &self.options) {
                warn!("failed to resume recognition: {e}");
                self.resume_requested = false;
                let mut signals = Vec::new();
                if self.state == CaptureState::Listening {
                    self.state = CaptureState::Idle;
                    signals.push(CaptureSignal::ListeningChanged(false));
                }
                signals.push(CaptureSignal::Fault(Advisory::RecognitionFailed));
                return signals;
            }
            return Vec::new();
        }

        if self.state == CaptureState::Listening {
            self.state = CaptureState::Idle;
            vec![CaptureSignal::ListeningChanged(false)]
        } else {
            Vec::new()
        }
    }

    /// Finalized segments joined into the submission text.
    fn combined_final(&self) -> String {
        let parts: Vec<&str> = self
            .final_segments
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        parts.join(" ")
    }

    /// Finals plus the current interim, for live preview.
    fn combined_preview(&self) -> String {
        let mut preview = self.combined_final();
        let interim = self.interim_segment.trim();
        if !interim.is_empty() {
            if !preview.is_empty() {
                preview.push(' ');
            }
            preview.push_str(interim);
        }
        preview
    }
}

impl Drop for SpeechCaptureSession {
    fn drop(&mut self) {
        self.backend.stop();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::error::{Result, VoiceError};
    use std::sync::{Arc, Mutex};

    /// Recognizer double that records starts/stops for assertions.
    #[derive(Default)]
    struct RecorderState {
        started_epochs: Vec<u64>,
        stops: usize,
        fail_start: bool,
        available: bool,
    }

    #[derive(Clone)]
    struct Recorder(Arc<Mutex<RecorderState>>);

    impl Recorder {
        fn available() -> Self {
            Recorder(Arc::new(Mutex::new(RecorderState {
                available: true,
                ..RecorderState::default()
            })))
        }

        fn starts(&self) -> Vec<u64> {
            self.0.lock().unwrap().started_epochs.clone()
        }

        fn stops(&self) -> usize {
            self.0.lock().unwrap().stops
        }
    }

    impl RecognizerBackend for Recorder {
        fn is_available(&self) -> bool {
            self.0.lock().unwrap().available
        }

        fn start(
            &mut self,
            epoch: u64,
            _events: mpsc::UnboundedSender<RecognizerEvent>,
            _options: &RecognitionOptions,
        ) -> Result<()> {
            let mut state = self.0.lock().unwrap();
            if state.fail_start {
                return Err(VoiceError::Recognition("refused".to_owned()));
            }
            state.started_epochs.push(epoch);
            Ok(())
        }

        fn stop(&mut self) {
            self.0.lock().unwrap().stops += 1;
        }
    }

    fn session_with(recorder: &Recorder) -> SpeechCaptureSession {
        let (tx, _rx) = mpsc::unbounded_channel();
        SpeechCaptureSession::new(Box::new(recorder.clone()), &CaptureConfig::default(), tx)
    }

    fn event(epoch: u64, payload: RecognizerEventPayload) -> RecognizerEvent {
        RecognizerEvent { epoch, payload }
    }

    #[test]
    fn interims_then_one_final_emit_exactly_one_transcript() {
        let recorder = Recorder::available();
        let mut session = session_with(&recorder);
        session.start();
        let epoch = session.epoch();
        session.handle_event(event(epoch, RecognizerEventPayload::Started));

        let signals = session.handle_event(event(
            epoch,
            RecognizerEventPayload::ResultInterim("check my".to_owned()),
        ));
        assert_eq!(
            signals,
            vec![CaptureSignal::TranscriptInterim("check my".to_owned())]
        );

        session.handle_event(event(
            epoch,
            RecognizerEventPayload::ResultInterim("check my field".to_owned()),
        ));

        let signals = session.handle_event(event(
            epoch,
            RecognizerEventPayload::ResultFinal(" check my field ".to_owned()),
        ));
        assert_eq!(
            signals,
            vec![CaptureSignal::TranscriptFinal("check my field".to_owned())]
        );
    }

    #[test]
    fn final_segments_accumulate_in_order() {
        let recorder = Recorder::available();
        let mut session = session_with(&recorder);
        session.start();
        let epoch = session.epoch();
        session.handle_event(event(epoch, RecognizerEventPayload::Started));

        session.handle_event(event(
            epoch,
            RecognizerEventPayload::ResultFinal("what is".to_owned()),
        ));
        let signals = session.handle_event(event(
            epoch,
            RecognizerEventPayload::ResultFinal("the mandi price".to_owned()),
        ));
        assert_eq!(
            signals,
            vec![CaptureSignal::TranscriptFinal(
                "what is the mandi price".to_owned()
            )]
        );
    }

    #[test]
    fn duplicate_final_text_is_submitted_once() {
        let recorder = Recorder::available();
        let mut session = session_with(&recorder);
        session.start();
        let epoch = session.epoch();
        session.handle_event(event(epoch, RecognizerEventPayload::Started));

        let first = session.handle_event(event(
            epoch,
            RecognizerEventPayload::ResultFinal("hello".to_owned()),
        ));
        assert_eq!(
            first,
            vec![CaptureSignal::TranscriptFinal("hello".to_owned())]
        );

        // A late empty final re-derives the same combined text.
        let second = session.handle_event(event(
            epoch,
            RecognizerEventPayload::ResultFinal("   ".to_owned()),
        ));
        assert!(second.is_empty());
    }

    #[test]
    fn restart_while_listening_increments_epoch_and_drops_old_events() {
        let recorder = Recorder::available();
        let mut session = session_with(&recorder);
        session.start();
        let old_epoch = session.epoch();
        session.handle_event(event(old_epoch, RecognizerEventPayload::Started));
        assert!(session.is_listening());

        let stops_before = recorder.stops();
        session.start();
        let new_epoch = session.epoch();
        assert!(new_epoch > old_epoch);
        assert!(recorder.stops() > stops_before, "old instance torn down");
        assert_eq!(recorder.starts(), vec![old_epoch, new_epoch]);

        // A result from the torn-down instance must not reach the buffer.
        let signals = session.handle_event(event(
            old_epoch,
            RecognizerEventPayload::ResultFinal("stale".to_owned()),
        ));
        assert!(signals.is_empty());

        let signals = session.handle_event(event(
            new_epoch,
            RecognizerEventPayload::ResultFinal("fresh".to_owned()),
        ));
        assert_eq!(
            signals,
            vec![CaptureSignal::TranscriptFinal("fresh".to_owned())]
        );
    }

    #[test]
    fn ended_with_resume_pending_starts_a_fresh_instance() {
        let recorder = Recorder::available();
        let mut session = session_with(&recorder);
        session.start();
        let epoch = session.epoch();
        session.handle_event(event(epoch, RecognizerEventPayload::Started));

        // Platform session limit hit before any final: silent restart.
        let signals = session.handle_event(event(epoch, RecognizerEventPayload::Ended));
        assert!(signals.is_empty());
        assert!(session.is_listening());
        assert_eq!(recorder.starts(), vec![epoch, epoch + 1]);
    }

    #[test]
    fn ended_after_final_goes_idle_without_resuming() {
        let recorder = Recorder::available();
        let mut session = session_with(&recorder);
        session.start();
        let epoch = session.epoch();
        session.handle_event(event(epoch, RecognizerEventPayload::Started));
        session.handle_event(event(
            epoch,
            RecognizerEventPayload::ResultFinal("done".to_owned()),
        ));

        let signals = session.handle_event(event(epoch, RecognizerEventPayload::Ended));
        assert_eq!(signals, vec![CaptureSignal::ListeningChanged(false)]);
        assert!(!session.is_listening());
        assert_eq!(recorder.starts().len(), 1, "no resume after a final");
    }

    #[test]
    fn not_allowed_error_classifies_as_permission_denied() {
        let recorder = Recorder::available();
        let mut session = session_with(&recorder);
        session.start();
        let epoch = session.epoch();
        session.handle_event(event(epoch, RecognizerEventPayload::Started));

        let signals = session.handle_event(event(
            epoch,
            RecognizerEventPayload::Error("not-allowed".to_owned()),
        ));
        assert_eq!(
            signals,
            vec![
                CaptureSignal::ListeningChanged(false),
                CaptureSignal::Fault(Advisory::PermissionDenied),
            ]
        );
        assert!(!session.is_listening());

        // The instance's trailing Ended must not resurrect the session.
        let signals = session.handle_event(event(epoch, RecognizerEventPayload::Ended));
        assert!(signals.is_empty());
        assert_eq!(recorder.starts().len(), 1);
    }

    #[test]
    fn error_is_not_fatal_to_the_session() {
        let recorder = Recorder::available();
        let mut session = session_with(&recorder);
        session.start();
        let epoch = session.epoch();
        session.handle_event(event(epoch, RecognizerEventPayload::Error("no-speech".to_owned())));

        // A later start must succeed as if nothing happened.
        let signals = session.start();
        assert!(signals.is_empty());
        let epoch = session.epoch();
        let signals = session.handle_event(event(epoch, RecognizerEventPayload::Started));
        assert_eq!(signals, vec![CaptureSignal::ListeningChanged(true)]);
    }

    #[test]
    fn unsupported_platform_reports_advisory_and_stays_idle() {
        let recorder = Recorder(Arc::new(Mutex::new(RecorderState::default())));
        let mut session = session_with(&recorder);

        let signals = session.start();
        assert_eq!(
            signals,
            vec![CaptureSignal::Fault(Advisory::RecognitionUnsupported)]
        );
        assert!(!session.is_listening());
        assert!(recorder.starts().is_empty(), "backend start never attempted");
    }

    #[test]
    fn stop_invalidates_in_flight_events() {
        let recorder = Recorder::available();
        let mut session = session_with(&recorder);
        session.start();
        let epoch = session.epoch();
        session.handle_event(event(epoch, RecognizerEventPayload::Started));

        let signals = session.stop();
        assert_eq!(signals, vec![CaptureSignal::ListeningChanged(false)]);

        // The stopped instance may deliver one more event; it is stale.
        let signals =
            session.handle_event(event(epoch, RecognizerEventPayload::ResultFinal("late".to_owned())));
        assert!(signals.is_empty());
        let signals = session.handle_event(event(epoch, RecognizerEventPayload::Ended));
        assert!(signals.is_empty());
    }

    #[test]
    fn failed_start_surfaces_recognition_failed() {
        let recorder = Recorder::available();
        recorder.0.lock().unwrap().fail_start = true;
        let mut session = session_with(&recorder);

        let signals = session.start();
        assert_eq!(
            signals,
            vec![CaptureSignal::Fault(Advisory::RecognitionFailed)]
        );
        assert!(!session.is_listening());
    }
}
