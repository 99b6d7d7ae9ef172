//! Single-flight speech synthesis playback.
//!
//! [`SpeechPlaybackManager`] owns the synthesizer singleton. At most one
//! utterance is current at a time: `speak` bumps the utterance token
//! before anything else, so completion callbacks from a superseded
//! utterance arrive stale and are dropped. Voice binding goes through the
//! persona catalog assignment, recomputed whenever the platform inventory
//! changes.

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::advisory::Advisory;
use crate::catalog::{self, VoiceAssignment, VoiceGender, VoicePersona};
use crate::config::{PlaybackConfig, PlaybackPolicy};
use crate::platform::{SynthesisEvent, SynthesisEventPayload, SynthesizerBackend, UtteranceRequest};

/// Signal emitted by the playback reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSignal {
    SpeakingChanged(bool),
    Fault(Advisory),
}

/// One speech-synthesis lifecycle bound to the persona catalog.
pub struct SpeechPlaybackManager {
    backend: Box<dyn SynthesizerBackend>,
    event_tx: mpsc::UnboundedSender<SynthesisEvent>,
    personas: Vec<VoicePersona>,
    assignment: VoiceAssignment,
    active_persona: String,
    policy: PlaybackPolicy,
    rate: f32,
    armed: bool,
    speaking: bool,
    active_token: u64,
}

impl SpeechPlaybackManager {
    /// Create a manager over `backend`. Events the backend sends through
    /// `event_tx` must be fed back into [`handle_event`](Self::handle_event).
    pub fn new(
        backend: Box<dyn SynthesizerBackend>,
        config: &PlaybackConfig,
        event_tx: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> Self {
        let personas = catalog::builtin_personas();
        let assignment = catalog::assign_voices(&backend.voices(), &personas);
        info!(
            personas = personas.len(),
            bound = assignment.iter().filter(|(_, v)| v.is_some()).count(),
            "voice catalog assigned"
        );
        Self {
            backend,
            event_tx,
            personas,
            assignment,
            active_persona: config.default_persona.clone(),
            policy: config.policy,
            rate: config.rate,
            armed: config.start_enabled,
            speaking: false,
            active_token: 0,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Whether voice output is currently armed.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Arm or disarm voice output.
    pub fn set_armed(&mut self, armed: bool) {
        if self.armed != armed {
            debug!(armed, "voice output toggled");
            self.armed = armed;
        }
    }

    /// Token of the current utterance (stale-callback guard).
    pub fn active_token(&self) -> u64 {
        self.active_token
    }

    /// The persona catalog, in priority order.
    pub fn personas(&self) -> &[VoicePersona] {
        &self.personas
    }

    /// The current persona→voice assignment, for voice pickers.
    pub fn assignment(&self) -> &VoiceAssignment {
        &self.assignment
    }

    /// Switch the persona used when `speak` is called without one.
    ///
    /// Returns false (and keeps the current persona) for an unknown id.
    pub fn set_active_persona(&mut self, persona_id: &str) -> bool {
        if self.personas.iter().any(|p| p.id == persona_id) {
            debug!(persona = persona_id, "active persona switched");
            self.active_persona = persona_id.to_owned();
            true
        } else {
            warn!(persona = persona_id, "unknown persona id ignored");
            false
        }
    }

    /// Re-query the platform inventory and recompute the assignment.
    ///
    /// Called when the platform signals a voices-changed event. The matcher
    /// is deterministic, so an unchanged inventory yields an unchanged
    /// assignment.
    pub fn refresh_voices(&mut self) {
        let devices = self.backend.voices();
        self.assignment = catalog::assign_voices(&devices, &self.personas);
        info!(
            devices = devices.len(),
            bound = self.assignment.iter().filter(|(_, v)| v.is_some()).count(),
            "voice inventory refreshed"
        );
    }

    /// Speak `text` as `persona_id` (or the active persona).
    ///
    /// Any utterance in flight is invalidated and cancelled first, so at
    /// most one utterance is ever current. Disarmed or empty input is a
    /// no-op.
    pub fn speak(&mut self, text: &str, persona_id: Option<&str>) -> Vec<PlaybackSignal> {
        let text = text.trim();
        if !self.armed || text.is_empty() {
            return Vec::new();
        }
        if !self.backend.is_available() {
            warn!("speech synthesis not supported on this platform");
            return vec![PlaybackSignal::Fault(Advisory::SynthesisUnavailable)];
        }

        // Invalidate the previous token before anything reaches the
        // platform: late callbacks from the superseded utterance must not
        // toggle the speaking flag.
        self.active_token += 1;
        self.backend.cancel();

        let mut signals = Vec::new();
        if self.speaking {
            self.speaking = false;
            signals.push(PlaybackSignal::SpeakingChanged(false));
        }

        let persona = self.resolve_persona(persona_id);
        let voice = persona
            .and_then(|p| self.assignment.voice_for(&p.id))
            .cloned();
        let gender = persona.map(|p| p.gender).unwrap_or(VoiceGender::Neutral);
        debug!(
            token = self.active_token,
            persona = persona.map(|p| p.id.as_str()).unwrap_or("<none>"),
            voice = voice.as_ref().map(|v| v.name.as_str()).unwrap_or("<default>"),
            "speaking"
        );

        let request = UtteranceRequest {
            token: self.active_token,
            text: text.to_owned(),
            voice: voice.map(|v| v.name),
            pitch: pitch_for(gender),
            rate: self.rate,
        };
        if let Err(e) = self.backend.speak(request, self.event_tx.clone()) {
            warn!("synthesis failed to start: {e}");
            self.disarm_if_single_shot();
            signals.push(PlaybackSignal::Fault(Advisory::SynthesisUnavailable));
        }
        signals
    }

    /// Cancel any audio in flight and clear the speaking flag
    /// unconditionally. Late callbacks from the cancelled utterance are
    /// stale after the token bump.
    pub fn stop(&mut self) -> Vec<PlaybackSignal> {
        self.active_token += 1;
        self.backend.cancel();
        if self.speaking {
            self.speaking = false;
            vec![PlaybackSignal::SpeakingChanged(false)]
        } else {
            Vec::new()
        }
    }

    /// Reduce one synthesis event into the playback state.
    pub fn handle_event(&mut self, event: SynthesisEvent) -> Vec<PlaybackSignal> {
        if event.token != self.active_token {
            trace!(
                event_token = event.token,
                current_token = self.active_token,
                "dropping stale synthesis event"
            );
            return Vec::new();
        }

        match event.payload {
            SynthesisEventPayload::Started => {
                if self.speaking {
                    Vec::new()
                } else {
                    self.speaking = true;
                    vec![PlaybackSignal::SpeakingChanged(true)]
                }
            }
            SynthesisEventPayload::Ended => {
                let mut signals = Vec::new();
                if self.speaking {
                    self.speaking = false;
                    signals.push(PlaybackSignal::SpeakingChanged(false));
                }
                self.disarm_if_single_shot();
                signals
            }
            SynthesisEventPayload::Error(reason) => {
                warn!(reason = %reason, "utterance failed");
                let mut signals = Vec::new();
                if self.speaking {
                    self.speaking = false;
                    signals.push(PlaybackSignal::SpeakingChanged(false));
                }
                self.disarm_if_single_shot();
                signals.push(PlaybackSignal::Fault(Advisory::SynthesisUnavailable));
                signals
            }
        }
    }

    fn disarm_if_single_shot(&mut self) {
        if self.policy == PlaybackPolicy::SingleShot && self.armed {
            debug!("single-shot utterance settled, disarming voice output");
            self.armed = false;
        }
    }

    fn resolve_persona(&self, persona_id: Option<&str>) -> Option<&VoicePersona> {
        let wanted = persona_id.unwrap_or(&self.active_persona);
        self.personas
            .iter()
            .find(|p| p.id == wanted)
            .or_else(|| self.personas.first())
    }
}

/// Pitch offset per gender category. The exact numbers are a presentation
/// choice; what matters is that they are stable per category.
fn pitch_for(gender: VoiceGender) -> f32 {
    match gender {
        VoiceGender::Female => 1.05,
        VoiceGender::Male => 0.95,
        VoiceGender::Neutral => 1.0,
    }
}
