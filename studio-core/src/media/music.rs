//! Music direction for a concept, used to build the soundtrack prompt.

use crate::engine::{decode, TextBackend};
use crate::proposal::{lenient_text, ProposalItem};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Short musical brief for one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicProfile {
    #[serde(default, deserialize_with = "lenient_text")]
    pub mood: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tempo: String,
    #[serde(default)]
    pub instruments: Vec<String>,
    #[serde(default)]
    pub style_tags: Vec<String>,
}

impl MusicProfile {
    /// Profile used when no backend is available or it returns nothing
    /// usable.
    pub fn fallback_for(item: &ProposalItem) -> Self {
        let style_tags = item
            .name
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| w.len() > 2)
            .take(3)
            .collect();
        Self {
            mood: "atmospheric".to_string(),
            tempo: "moderate".to_string(),
            instruments: vec!["synth pads".to_string(), "soft piano".to_string()],
            style_tags,
        }
    }

    /// Ask the backend for a brief. Falls back field by field.
    pub async fn derive(backend: Option<&dyn TextBackend>, item: &ProposalItem) -> Self {
        let fallback = Self::fallback_for(item);
        let Some(backend) = backend else {
            return fallback;
        };

        let raw = match backend.generate_json(&profile_prompt(item)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(item = %item.name, error = %e, "music profile request failed");
                return fallback;
            }
        };

        match decode::<MusicProfile>(&raw) {
            Ok(profile) => profile.filled_from(fallback),
            Err(e) => {
                warn!(item = %item.name, error = %e, "music profile unusable");
                fallback
            }
        }
    }

    fn filled_from(mut self, fallback: Self) -> Self {
        if self.mood.trim().is_empty() {
            self.mood = fallback.mood;
        }
        if self.tempo.trim().is_empty() {
            self.tempo = fallback.tempo;
        }
        self.instruments.retain(|i| !i.trim().is_empty());
        if self.instruments.is_empty() {
            self.instruments = fallback.instruments;
        }
        self.style_tags.retain(|t| !t.trim().is_empty());
        if self.style_tags.is_empty() {
            self.style_tags = fallback.style_tags;
        }
        self
    }

    /// Text prompt for the audio chain.
    pub fn to_prompt(&self, item: &ProposalItem) -> String {
        let mut parts = vec![
            format!("{} soundtrack", item.name),
            format!("{} mood", self.mood),
            format!("{} tempo", self.tempo),
        ];
        if !self.instruments.is_empty() {
            parts.push(format!("featuring {}", self.instruments.join(", ")));
        }
        if !self.style_tags.is_empty() {
            parts.push(self.style_tags.join(", "));
        }
        parts.push("video game background music, high quality, instrumental".to_string());
        parts.join(", ")
    }
}

fn profile_prompt(item: &ProposalItem) -> String {
    format!(
        r#"Act as a game composer. Suggest a soundtrack direction for this game concept.

Title: {name}
Pitch: {blurb}
Core loop: {core_loop}

Return JSON only: {{ "mood": "...", "tempo": "...", "instruments": ["..."], "style_tags": ["..."] }}"#,
        name = item.name,
        blurb = item.details.release_blurb,
        core_loop = item.details.core_loop,
    )
}
