//! Proposal generation engine.
//!
//! Turns user constraints into a structured [`ProposalSet`] by prompting a
//! [`TextBackend`] for JSON and decoding the answer into typed values.
//! Failures of the primary deliverable (proposal, evaluation) are returned
//! as [`ProposalError`]; the encyclopedia lookup never fails and falls back
//! to a placeholder instead.

mod backend;
pub mod prompts;

pub use backend::{BackendError, TextBackend};

use crate::constraints::Constraints;
use crate::proposal::{lenient_text, ProposalItem, ProposalSet, WireItem, WireProposalSet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from proposal generation and evaluation.
#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("No text generation backend configured")]
    Unavailable,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Response was not valid JSON: {0}")]
    MalformedJson(serde_json::Error),

    #[error("Response did not match the expected schema: {0}")]
    SchemaMismatch(serde_json::Error),
}

/// Outcome of checking one genre against the constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Budget and schedule support a full release.
    FeasibleGame { reason: String, proposal: ProposalItem },
    /// Not enough for a full game, enough for a vertical slice.
    FeasibleDemo { reason: String, proposal: ProposalItem },
    /// The genre cannot be done under these constraints.
    Impossible { reason: String },
}

impl Evaluation {
    pub fn reason(&self) -> &str {
        match self {
            Evaluation::FeasibleGame { reason, .. }
            | Evaluation::FeasibleDemo { reason, .. }
            | Evaluation::Impossible { reason } => reason,
        }
    }

    pub fn proposal(&self) -> Option<&ProposalItem> {
        match self {
            Evaluation::FeasibleGame { proposal, .. } | Evaluation::FeasibleDemo { proposal, .. } => {
                Some(proposal)
            }
            Evaluation::Impossible { .. } => None,
        }
    }

    /// Wire name of the outcome.
    pub fn status(&self) -> &'static str {
        match self {
            Evaluation::FeasibleGame { .. } => "feasible_game",
            Evaluation::FeasibleDemo { .. } => "feasible_demo",
            Evaluation::Impossible { .. } => "impossible",
        }
    }
}

/// Short encyclopedia entry for a genre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreInfo {
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl GenreInfo {
    pub const MAX_TAGS: usize = 10;

    /// Returned whenever the lookup fails.
    pub fn placeholder() -> Self {
        Self {
            summary: "Info unavailable.".to_string(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireEvaluation {
    status: String,
    #[serde(default, deserialize_with = "lenient_text")]
    reason: String,
    #[serde(default)]
    data: Option<WireItem>,
}

/// The proposal engine.
///
/// Holds no state between calls; cloning shares the backend.
#[derive(Clone)]
pub struct ProposalEngine {
    backend: Option<Arc<dyn TextBackend>>,
}

impl ProposalEngine {
    /// Create an engine over the given backend.
    pub fn new(backend: Arc<dyn TextBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// An engine with no backend: every call reports the feature as
    /// unavailable (or returns the placeholder, for lookups).
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    /// Create an engine from an optional backend.
    pub fn with_backend(backend: Option<Arc<dyn TextBackend>>) -> Self {
        Self { backend }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// The backend, for collaborators that need free-text generation.
    pub fn backend(&self) -> Option<Arc<dyn TextBackend>> {
        self.backend.clone()
    }

    /// Generate achievable genres and demo ideas for the constraints.
    ///
    /// Returns either a complete set (both lists present, possibly empty) or
    /// an error; never a partial object. No retry is attempted here.
    pub async fn generate_proposal(
        &self,
        constraints: &Constraints,
    ) -> Result<ProposalSet, ProposalError> {
        let backend = self.backend.as_ref().ok_or(ProposalError::Unavailable)?;
        let prompt = prompts::proposal_prompt(constraints);

        info!(backend = backend.name(), "generating proposals");
        let raw = backend.generate_json(&prompt).await?;
        let wire: WireProposalSet = decode(&raw)?;
        let set = wire.into_set();

        for violation in set.budget_violations(constraints) {
            warn!(
                item = %violation.item_name,
                quoted = %violation.quoted,
                kind = ?violation.kind,
                "full-game budget projection breaks the budget rules"
            );
        }

        info!(
            achievable = set.achievable.len(),
            demo = set.demo.len(),
            "proposals generated"
        );
        Ok(set)
    }

    /// Classify one genre as a feasible full game, a feasible demo, or
    /// impossible under the constraints.
    pub async fn evaluate_specific_genre(
        &self,
        genre: &str,
        constraints: &Constraints,
    ) -> Result<Evaluation, ProposalError> {
        let backend = self.backend.as_ref().ok_or(ProposalError::Unavailable)?;
        let prompt = prompts::evaluation_prompt(genre, constraints);

        debug!(genre, "evaluating genre feasibility");
        let raw = backend.generate_json(&prompt).await?;
        let wire: WireEvaluation = decode(&raw)?;
        evaluation_from_wire(wire)
    }

    /// Best-effort encyclopedia entry for a genre. Never fails.
    pub async fn get_genre_wiki_info(&self, genre: &str) -> GenreInfo {
        let Some(backend) = self.backend.as_ref() else {
            return GenreInfo::placeholder();
        };

        let raw = match backend.generate_json(&prompts::wiki_prompt(genre)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(genre, error = %e, "genre lookup failed");
                return GenreInfo::placeholder();
            }
        };

        match decode::<GenreInfo>(&raw) {
            Ok(mut info) => {
                info.tags.truncate(GenreInfo::MAX_TAGS);
                info
            }
            Err(e) => {
                warn!(genre, error = %e, "genre lookup returned unusable JSON");
                GenreInfo::placeholder()
            }
        }
    }
}

fn evaluation_from_wire(wire: WireEvaluation) -> Result<Evaluation, ProposalError> {
    let status = wire.status.trim().to_ascii_lowercase();
    let proposal = || {
        wire.data
            .map(WireItem::into_item)
            .ok_or_else(|| schema_error(format!("status '{status}' requires a data payload")))
    };

    match status.as_str() {
        "feasible_game" => Ok(Evaluation::FeasibleGame {
            proposal: proposal()?,
            reason: wire.reason,
        }),
        "feasible_demo" => Ok(Evaluation::FeasibleDemo {
            proposal: proposal()?,
            reason: wire.reason,
        }),
        "impossible" => Ok(Evaluation::Impossible {
            reason: wire.reason,
        }),
        other => Err(schema_error(format!("unknown evaluation status '{other}'"))),
    }
}

fn schema_error(message: String) -> ProposalError {
    ProposalError::SchemaMismatch(<serde_json::Error as serde::de::Error>::custom(message))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Decode a JSON response in two steps so that bad JSON and a wrong shape
/// are reported differently.
pub(crate) fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, ProposalError> {
    let value: serde_json::Value =
        serde_json::from_str(strip_code_fence(raw)).map_err(ProposalError::MalformedJson)?;
    // Derived structs also accept arrays positionally; every response is an object.
    if !value.is_object() {
        return Err(schema_error(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    serde_json::from_value(value).map_err(ProposalError::SchemaMismatch)
}

/// Models sometimes wrap JSON in a markdown fence despite being told not to.
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
