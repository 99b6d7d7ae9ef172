//! Voice persona catalog and deterministic persona→voice assignment.
//!
//! The platform supplies a dynamic inventory of synthesis voices; the
//! assistant declares a fixed catalog of personas. [`assign_voices`] maps
//! one onto the other. The matcher is a pure function of its inputs: the
//! inventory is re-queried live on device changes and UI voice pickers
//! must not jump between identical runs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A synthesis voice reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceVoice {
    /// Platform voice name, unique within one inventory snapshot.
    pub name: String,
    /// BCP-47 language tag, e.g. `en-IN`.
    pub language: String,
}

/// Gender category of a persona, used for stable prosody offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Female,
    Male,
    Neutral,
}

/// A named synthetic voice profile the assistant can speak as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoicePersona {
    /// Stable persona id, e.g. `en-female-soft`.
    pub id: String,
    /// Display label for voice pickers.
    pub label: String,
    pub gender: VoiceGender,
    /// Preferred regional language tag, e.g. `en-IN`.
    pub language: String,
    /// Same-family fallback tag searched before the base language, e.g.
    /// `hi` for the Indian-English personas.
    pub fallback_language: Option<String>,
    /// Case-insensitive substring patterns matched against
    /// `"{voice name} {voice language}"`, in priority order.
    pub matchers: Vec<String>,
}

/// Partial injective persona→voice mapping, in persona catalog order.
///
/// A device voice is bound to at most one persona; a persona maps to at
/// most one device voice, or none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceAssignment {
    entries: Vec<(String, Option<DeviceVoice>)>,
}

impl VoiceAssignment {
    /// The device voice bound to `persona_id`, if any.
    pub fn voice_for(&self, persona_id: &str) -> Option<&DeviceVoice> {
        self.entries
            .iter()
            .find(|(id, _)| id == persona_id)
            .and_then(|(_, voice)| voice.as_ref())
    }

    /// Iterate `(persona id, assigned voice)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&DeviceVoice>)> {
        self.entries
            .iter()
            .map(|(id, voice)| (id.as_str(), voice.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The built-in Sakhi persona catalog, in fixed priority order.
pub fn builtin_personas() -> Vec<VoicePersona> {
    fn persona(
        id: &str,
        label: &str,
        gender: VoiceGender,
        language: &str,
        fallback: Option<&str>,
        matchers: &[&str],
    ) -> VoicePersona {
        VoicePersona {
            id: id.to_owned(),
            label: label.to_owned(),
            gender,
            language: language.to_owned(),
            fallback_language: fallback.map(str::to_owned),
            matchers: matchers.iter().map(|m| (*m).to_owned()).collect(),
        }
    }

    vec![
        persona(
            "en-female-soft",
            "Asha · Warm Female",
            VoiceGender::Female,
            "en-IN",
            Some("hi"),
            &["asha", "female", "india", "en-in"],
        ),
        persona(
            "en-female-clear",
            "Meera · Crisp Female",
            VoiceGender::Female,
            "en-IN",
            Some("hi"),
            &["meera", "female", "en-in"],
        ),
        persona(
            "en-male-calm",
            "Arjun · Calm Male",
            VoiceGender::Male,
            "en-IN",
            Some("hi"),
            &["arjun", "male", "en-in"],
        ),
        persona(
            "en-male-energetic",
            "Rohit · Energetic Male",
            VoiceGender::Male,
            "en-IN",
            Some("hi"),
            &["rohit", "male", "en-in"],
        ),
        persona(
            "en-neutral-global",
            "Kai · Neutral Global",
            VoiceGender::Neutral,
            "en-GB",
            None,
            &["english", "neutral", "en-gb"],
        ),
    ]
}

/// Assign device voices to personas.
///
/// Personas are processed in declared order. For each persona an ordered
/// candidate list is built:
///
/// 1. the first voice whose `"{name} {language}"` contains a matcher
///    pattern, trying patterns in order;
/// 2. the first unclaimed voice whose language contains the persona's
///    regional tag;
/// 3. the first unclaimed voice in the persona's fallback language;
/// 4. the first unclaimed voice sharing the base language;
/// 5. the first unclaimed voice of any language.
///
/// The first candidate not already claimed by an earlier persona wins and
/// is marked claimed; a persona with no remaining candidate maps to none.
pub fn assign_voices(devices: &[DeviceVoice], personas: &[VoicePersona]) -> VoiceAssignment {
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut entries = Vec::with_capacity(personas.len());

    for persona in personas {
        let chosen = candidates_for(devices, persona, &claimed)
            .into_iter()
            .find(|voice| !claimed.contains(voice.name.as_str()));

        if let Some(voice) = chosen {
            claimed.insert(voice.name.as_str());
            entries.push((persona.id.clone(), Some(voice.clone())));
        } else {
            entries.push((persona.id.clone(), None));
        }
    }

    VoiceAssignment { entries }
}

/// Ordered candidate voices for one persona. Tiers 2–5 only consider
/// voices not yet claimed; tier 1 may name a claimed voice, which the
/// caller then skips.
fn candidates_for<'a>(
    devices: &'a [DeviceVoice],
    persona: &VoicePersona,
    claimed: &HashSet<&str>,
) -> Vec<&'a DeviceVoice> {
    let unclaimed = |voice: &&DeviceVoice| !claimed.contains(voice.name.as_str());
    let mut candidates = Vec::new();

    for pattern in &persona.matchers {
        let pattern = pattern.to_lowercase();
        if let Some(voice) = devices.iter().find(|v| haystack(v).contains(&pattern)) {
            candidates.push(voice);
            break;
        }
    }

    let regional = persona.language.to_lowercase();
    if let Some(voice) = devices
        .iter()
        .filter(unclaimed)
        .find(|v| v.language.to_lowercase().contains(&regional))
    {
        candidates.push(voice);
    }

    if let Some(fallback) = &persona.fallback_language {
        let fallback = fallback.to_lowercase();
        if let Some(voice) = devices
            .iter()
            .filter(unclaimed)
            .find(|v| v.language.to_lowercase().starts_with(&fallback))
        {
            candidates.push(voice);
        }
    }

    let base = persona
        .language
        .split('-')
        .next()
        .unwrap_or(&persona.language)
        .to_lowercase();
    if let Some(voice) = devices
        .iter()
        .filter(unclaimed)
        .find(|v| v.language.to_lowercase().starts_with(&base))
    {
        candidates.push(voice);
    }

    if let Some(voice) = devices.iter().find(unclaimed) {
        candidates.push(voice);
    }

    candidates
}

fn haystack(voice: &DeviceVoice) -> String {
    format!("{} {}", voice.name, voice.language).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, language: &str) -> DeviceVoice {
        DeviceVoice {
            name: name.to_owned(),
            language: language.to_owned(),
        }
    }

    fn persona(id: &str, gender: VoiceGender, matchers: &[&str]) -> VoicePersona {
        VoicePersona {
            id: id.to_owned(),
            label: id.to_owned(),
            gender,
            language: "en-IN".to_owned(),
            fallback_language: Some("hi".to_owned()),
            matchers: matchers.iter().map(|m| (*m).to_owned()).collect(),
        }
    }

    #[test]
    fn assignment_is_deterministic() {
        let devices = vec![
            voice("Meera (en-IN, female)", "en-IN"),
            voice("Arjun (en-IN, male)", "en-IN"),
            voice("Google UK English", "en-GB"),
        ];
        let personas = builtin_personas();

        let first = assign_voices(&devices, &personas);
        let second = assign_voices(&devices, &personas);
        assert_eq!(first, second);
    }

    #[test]
    fn assignment_is_injective() {
        let devices = vec![
            voice("Meera (en-IN, female)", "en-IN"),
            voice("Arjun (en-IN, male)", "en-IN"),
            voice("Hindi Voice", "hi-IN"),
        ];
        let personas = builtin_personas();
        let assignment = assign_voices(&devices, &personas);

        let mut seen = HashSet::new();
        for (_, voice) in assignment.iter() {
            if let Some(voice) = voice {
                assert!(seen.insert(voice.name.clone()), "voice assigned twice");
            }
        }
    }

    #[test]
    fn claimed_primary_match_falls_through_the_chain() {
        // Asha claims "Meera" via her `female` pattern; persona Meera's own
        // name match is then taken, so she falls through to the first
        // unclaimed regional voice; Arjun is left with nothing.
        let devices = vec![
            voice("Meera (en-IN, female)", "en-IN"),
            voice("Arjun (en-IN, male)", "en-IN"),
        ];
        let personas = vec![
            persona("asha", VoiceGender::Female, &["asha", "female", "india", "en-in"]),
            persona("meera", VoiceGender::Female, &["meera", "female", "en-in"]),
            persona("arjun", VoiceGender::Male, &["arjun", "male", "en-in"]),
        ];

        let assignment = assign_voices(&devices, &personas);
        assert_eq!(
            assignment.voice_for("asha").map(|v| v.name.as_str()),
            Some("Meera (en-IN, female)")
        );
        assert_eq!(
            assignment.voice_for("meera").map(|v| v.name.as_str()),
            Some("Arjun (en-IN, male)")
        );
        assert_eq!(assignment.voice_for("arjun"), None);
    }

    #[test]
    fn fallback_language_is_searched_before_base_language() {
        let devices = vec![
            voice("US Voice", "en-US"),
            voice("Hindi Voice", "hi-IN"),
        ];
        let personas = vec![persona("asha", VoiceGender::Female, &["asha"])];

        let assignment = assign_voices(&devices, &personas);
        assert_eq!(
            assignment.voice_for("asha").map(|v| v.name.as_str()),
            Some("Hindi Voice")
        );
    }

    #[test]
    fn any_language_is_the_last_resort() {
        let devices = vec![voice("Voix Française", "fr-FR")];
        let personas = vec![persona("asha", VoiceGender::Female, &["asha"])];

        let assignment = assign_voices(&devices, &personas);
        assert_eq!(
            assignment.voice_for("asha").map(|v| v.name.as_str()),
            Some("Voix Française")
        );
    }

    #[test]
    fn empty_inventory_maps_every_persona_to_none() {
        let personas = builtin_personas();
        let assignment = assign_voices(&[], &personas);
        assert_eq!(assignment.len(), personas.len());
        for (_, voice) in assignment.iter() {
            assert!(voice.is_none());
        }
    }

    #[test]
    fn pattern_order_beats_device_order() {
        // "rohit" appears later in the inventory than the generic male
        // voice, but the name pattern is tried first.
        let devices = vec![
            voice("Generic Male", "en-IN"),
            voice("Rohit", "en-IN"),
        ];
        let personas = vec![persona("rohit", VoiceGender::Male, &["rohit", "male", "en-in"])];

        let assignment = assign_voices(&devices, &personas);
        assert_eq!(
            assignment.voice_for("rohit").map(|v| v.name.as_str()),
            Some("Rohit")
        );
    }
}
