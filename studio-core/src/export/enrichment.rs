//! Design-document enrichment: the extra sections a full document needs
//! beyond what the proposal carries.

use crate::engine::{decode, TextBackend};
use crate::proposal::{lenient_text, ProposalItem};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

/// One phase of the production plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductionPhase {
    Detailed {
        #[serde(default, alias = "name", deserialize_with = "lenient_text")]
        phase: String,
        #[serde(default, deserialize_with = "lenient_text")]
        duration: String,
        #[serde(default, alias = "outcomes", deserialize_with = "lenient_text")]
        deliverables: String,
    },
    Note(String),
}

impl ProductionPhase {
    /// Single-line rendering: `Name (duration) - deliverables`.
    pub fn line(&self) -> String {
        match self {
            ProductionPhase::Note(text) => text.clone(),
            ProductionPhase::Detailed {
                phase,
                duration,
                deliverables,
            } => {
                let mut line = if phase.trim().is_empty() {
                    "Phase".to_string()
                } else {
                    phase.clone()
                };
                if !duration.is_empty() {
                    line.push_str(&format!(" ({duration})"));
                }
                if !deliverables.is_empty() {
                    line.push_str(&format!(" - {deliverables}"));
                }
                line
            }
        }
    }
}

/// Additional document content. Every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentProfile {
    #[serde(deserialize_with = "lenient_text")]
    pub executive_summary: String,
    #[serde(deserialize_with = "lenient_list")]
    pub pillars: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub target_audience: String,
    #[serde(deserialize_with = "lenient_text")]
    pub player_experience: String,
    #[serde(deserialize_with = "lenient_list")]
    pub key_features: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub progression: String,
    #[serde(deserialize_with = "lenient_text")]
    pub content_scope: String,
    #[serde(deserialize_with = "lenient_text")]
    pub art_direction: String,
    #[serde(deserialize_with = "lenient_text")]
    pub audio_direction: String,
    #[serde(deserialize_with = "lenient_text")]
    pub ui_ux: String,
    #[serde(deserialize_with = "lenient_text")]
    pub accessibility: String,
    #[serde(deserialize_with = "lenient_text")]
    pub tech_scope: String,
    #[serde(deserialize_with = "lenient_phases")]
    pub production_plan: Vec<ProductionPhase>,
    #[serde(deserialize_with = "lenient_list")]
    pub risks: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub success_metrics: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub monetization: String,
    #[serde(deserialize_with = "lenient_text")]
    pub live_ops: String,
    #[serde(deserialize_with = "lenient_list")]
    pub marketing_hooks: Vec<String>,
}

impl EnrichmentProfile {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A list of strings, a single string, or null. Objects carry no list
/// entry and are dropped.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let items = match value {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::Null | serde_json::Value::Object(_) => None,
                serde_json::Value::String(s) => Some(s),
                other => Some(other.to_string()),
            })
            .collect(),
        serde_json::Value::String(s) => vec![s],
        serde_json::Value::Object(_) => Vec::new(),
        other => vec![other.to_string()],
    };
    Ok(items.into_iter().filter(|s| !s.trim().is_empty()).collect())
}

fn lenient_phases<'de, D>(deserializer: D) -> Result<Vec<ProductionPhase>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::Null => None,
            serde_json::Value::Number(n) => Some(ProductionPhase::Note(n.to_string())),
            other => serde_json::from_value(other).ok(),
        })
        .collect())
}

fn enrichment_prompt(item: &ProposalItem) -> String {
    let concept = serde_json::to_string_pretty(item).unwrap_or_else(|_| item.name.clone());
    format!(
        r#"Act as a lead game designer writing a professional game design document.
Expand the concept below into the missing sections. Be concrete and concise.

Concept:
{concept}

Return JSON only, with these keys:
{{
  "executive_summary": "...",
  "pillars": ["..."],
  "target_audience": "...",
  "player_experience": "...",
  "key_features": ["..."],
  "progression": "...",
  "content_scope": "...",
  "art_direction": "...",
  "audio_direction": "...",
  "ui_ux": "...",
  "accessibility": "...",
  "tech_scope": "...",
  "production_plan": [{{"phase": "...", "duration": "...", "deliverables": "..."}}],
  "risks": ["..."],
  "success_metrics": ["..."],
  "monetization": "...",
  "live_ops": "...",
  "marketing_hooks": ["..."]
}}"#
    )
}

/// Best-effort enrichment. Any failure yields an empty profile.
pub async fn enrich(backend: Option<&dyn TextBackend>, item: &ProposalItem) -> EnrichmentProfile {
    let Some(backend) = backend else {
        debug!("no backend, exporting without enrichment");
        return EnrichmentProfile::default();
    };

    let raw = match backend.generate_json(&enrichment_prompt(item)).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(item = %item.name, error = %e, "enrichment request failed");
            return EnrichmentProfile::default();
        }
    };

    decode::<EnrichmentProfile>(&raw).unwrap_or_else(|e| {
        warn!(item = %item.name, error = %e, "enrichment response unusable");
        EnrichmentProfile::default()
    })
}
