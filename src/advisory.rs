//! User-facing advisories for recoverable voice faults.
//!
//! Recognition, synthesis, and processor failures are never fatal to the
//! conversation: each is classified into an [`Advisory`] and surfaced to the
//! UI boundary as a transient notification while the controller resets the
//! affected sub-session. Re-invoking the corresponding command retries.

use serde::Serialize;

/// Classified, recoverable fault surfaced to the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    /// Microphone permission was denied by the user or platform policy.
    PermissionDenied,
    /// No usable capture device was found.
    DeviceUnavailable,
    /// The recognizer gave up without hearing any speech.
    NoSpeechDetected,
    /// The platform exposes no speech recognition capability at all.
    RecognitionUnsupported,
    /// Recognition failed with an unclassified platform code.
    RecognitionFailed,
    /// Speech synthesis is missing or refused to play the utterance.
    SynthesisUnavailable,
    /// The message processor collaborator failed; the turn was abandoned.
    ProcessorFailure,
}

impl Advisory {
    /// Human-readable notification text for this advisory.
    pub fn message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Microphone access was denied. Allow microphone access in your browser settings."
            }
            Self::DeviceUnavailable => "No microphone was found. Ensure a microphone is connected.",
            Self::NoSpeechDetected => "I couldn't hear anything. Try speaking again.",
            Self::RecognitionUnsupported => {
                "Voice input is not supported here. Use a recent version of Chrome or Edge."
            }
            Self::RecognitionFailed => {
                "Could not access your microphone. Check your permissions and try again."
            }
            Self::SynthesisUnavailable => {
                "Unable to play the selected voice. Try another voice or refresh."
            }
            Self::ProcessorFailure => "I'm having trouble processing that. Please try again.",
        }
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Map a platform recognition error code to an advisory.
///
/// Codes follow the Web Speech API error vocabulary; anything unrecognized
/// degrades to [`Advisory::RecognitionFailed`].
pub fn classify_recognition_error(code: &str) -> Advisory {
    match code {
        "not-allowed" | "service-not-allowed" => Advisory::PermissionDenied,
        "audio-capture" => Advisory::DeviceUnavailable,
        "no-speech" => Advisory::NoSpeechDetected,
        _ => Advisory::RecognitionFailed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_platform_codes() {
        assert_eq!(
            classify_recognition_error("not-allowed"),
            Advisory::PermissionDenied
        );
        assert_eq!(
            classify_recognition_error("service-not-allowed"),
            Advisory::PermissionDenied
        );
        assert_eq!(
            classify_recognition_error("audio-capture"),
            Advisory::DeviceUnavailable
        );
        assert_eq!(
            classify_recognition_error("no-speech"),
            Advisory::NoSpeechDetected
        );
    }

    #[test]
    fn unknown_codes_degrade_to_recognition_failed() {
        assert_eq!(
            classify_recognition_error("network"),
            Advisory::RecognitionFailed
        );
        assert_eq!(classify_recognition_error(""), Advisory::RecognitionFailed);
    }

    #[test]
    fn each_advisory_has_distinct_copy() {
        let all = [
            Advisory::PermissionDenied,
            Advisory::DeviceUnavailable,
            Advisory::NoSpeechDetected,
            Advisory::RecognitionUnsupported,
            Advisory::RecognitionFailed,
            Advisory::SynthesisUnavailable,
            Advisory::ProcessorFailure,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.message(), b.message());
            }
        }
    }
}
