//! Proposal data model.
//!
//! Proposals arrive from the language model as loosely-typed JSON. The
//! `Wire*` types describe that JSON (with explicit defaults for every
//! optional field) and are converted into the public, immutable
//! [`ProposalItem`] values, each stamped with a fresh [`ItemId`].

use crate::constraints::Constraints;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Synthetic identity assigned to a proposal item when it is created.
///
/// Names produced by the model are not guaranteed unique, so everything
/// that needs to point at "this item" uses the id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A classic game cited as a reference point.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: String,
}

/// Long-term projection attached to a demo item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FullGamePrediction {
    #[serde(default, deserialize_with = "lenient_text")]
    pub cycle: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub budget: String,
}

impl FullGamePrediction {
    /// Numeric value of the quoted budget, if one can be read.
    pub fn budget_amount(&self) -> Option<f64> {
        parse_budget_amount(&self.budget)
    }

    pub fn is_empty(&self) -> bool {
        self.cycle.trim().is_empty() && self.budget.trim().is_empty()
    }
}

/// Narrative and gameplay detail for a proposal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Details {
    #[serde(default, deserialize_with = "lenient_text")]
    pub optimized_outline: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub protagonist: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub storyline: String,
    #[serde(default, deserialize_with = "lenient_text", alias = "blurb")]
    pub release_blurb: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub core_loop: String,
    #[serde(default, deserialize_with = "lenient_prediction")]
    pub full_game_prediction: Option<FullGamePrediction>,
}

impl Details {
    pub fn is_empty(&self) -> bool {
        self.optimized_outline.trim().is_empty()
            && self.protagonist.trim().is_empty()
            && self.storyline.trim().is_empty()
            && self.release_blurb.trim().is_empty()
            && self.core_loop.trim().is_empty()
            && self.full_game_prediction.is_none()
    }
}

/// One generated game concept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalItem {
    pub id: ItemId,
    pub name: String,
    pub reason: String,
    pub estimated_cycle: String,
    pub visual_prompt: String,
    pub references: Vec<Reference>,
    pub details: Details,
}

impl ProposalItem {
    /// Create an item with only a name; everything else empty.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            reason: String::new(),
            estimated_cycle: String::new(),
            visual_prompt: String::new(),
            references: Vec::new(),
            details: Details::default(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_cycle(mut self, cycle: impl Into<String>) -> Self {
        self.estimated_cycle = cycle.into();
        self
    }

    pub fn with_visual_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.visual_prompt = prompt.into();
        self
    }

    pub fn with_reference(mut self, title: impl Into<String>, url: impl Into<String>) -> Self {
        self.references.push(Reference {
            title: title.into(),
            url: url.into(),
        });
        self
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    /// Prompt used for concept art: the model's visual prompt, or the name.
    pub fn image_prompt(&self) -> &str {
        if self.visual_prompt.trim().is_empty() {
            &self.name
        } else {
            &self.visual_prompt
        }
    }
}

/// Root output of one generation call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProposalSet {
    pub achievable: Vec<ProposalItem>,
    pub demo: Vec<ProposalItem>,
}

impl ProposalSet {
    pub fn is_empty(&self) -> bool {
        self.achievable.is_empty() && self.demo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.achievable.len() + self.demo.len()
    }

    /// Iterate over every item, achievable first.
    pub fn items(&self) -> impl Iterator<Item = &ProposalItem> {
        self.achievable.iter().chain(self.demo.iter())
    }

    pub fn find(&self, id: ItemId) -> Option<&ProposalItem> {
        self.items().find(|item| item.id == id)
    }

    /// Check every full-game projection against the budget rules: at least
    /// 5x the input budget and never below it.
    ///
    /// Violations are the backend not honouring its instructions; they are
    /// reported, not treated as errors.
    pub fn budget_violations(&self, constraints: &Constraints) -> Vec<BudgetViolation> {
        let floor = constraints.minimum_full_game_budget();
        self.items()
            .filter_map(|item| {
                let prediction = item.details.full_game_prediction.as_ref()?;
                if prediction.budget.trim().is_empty() {
                    return None;
                }
                let kind = match prediction.budget_amount() {
                    None => ViolationKind::Unparseable,
                    Some(amount) if amount < constraints.budget() => ViolationKind::BelowInput,
                    Some(amount) if amount < floor => ViolationKind::BelowMultiple,
                    Some(_) => return None,
                };
                Some(BudgetViolation {
                    item: item.id,
                    item_name: item.name.clone(),
                    quoted: prediction.budget.clone(),
                    amount: prediction.budget_amount(),
                    kind,
                })
            })
            .collect()
    }
}

/// How a projection broke the budget rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Lower than the input budget.
    BelowInput,
    /// At or above the input budget but under 5x of it.
    BelowMultiple,
    /// No amount could be read from the quoted text.
    Unparseable,
}

/// A full-game projection that does not satisfy the budget rules.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetViolation {
    pub item: ItemId,
    pub item_name: String,
    pub quoted: String,
    pub amount: Option<f64>,
    pub kind: ViolationKind,
}

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(k|m|thousand|million)?\b")
        .expect("budget pattern is valid")
});

/// Read a currency amount out of free text such as `"$150,000"`, `"120k"`,
/// `"1.5M USD"` or `"$100k - $200k"` (lower bound of a range).
pub fn parse_budget_amount(text: &str) -> Option<f64> {
    let caps = AMOUNT_RE.captures(text)?;
    let number: f64 = caps[1].replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(ref s) if s == "k" || s == "thousand" => 1_000.0,
        Some(ref s) if s == "m" || s == "million" => 1_000_000.0,
        _ => 1.0,
    };
    Some(number * multiplier)
}

// ============================================================================
// Wire types
// ============================================================================

/// JSON shape of a proposal response.
#[derive(Debug, Deserialize)]
pub(crate) struct WireProposalSet {
    pub achievable_genres: Vec<WireItem>,
    pub demo_ideas: Vec<WireItem>,
}

impl WireProposalSet {
    pub fn into_set(self) -> ProposalSet {
        ProposalSet {
            achievable: self.achievable_genres.into_iter().map(WireItem::into_item).collect(),
            demo: self.demo_ideas.into_iter().map(WireItem::into_item).collect(),
        }
    }
}

/// JSON shape of one proposal item. Only `name` is required.
#[derive(Debug, Deserialize)]
pub(crate) struct WireItem {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reason: String,
    #[serde(default, deserialize_with = "lenient_text", alias = "est_time")]
    pub cycle: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub visual_prompt: String,
    #[serde(default, deserialize_with = "lenient_references")]
    pub classic_references: Vec<Reference>,
    #[serde(default, deserialize_with = "lenient_details")]
    pub details: Details,
}

impl WireItem {
    pub fn into_item(self) -> ProposalItem {
        ProposalItem {
            id: ItemId::new(),
            name: self.name,
            reason: self.reason,
            estimated_cycle: self.cycle,
            visual_prompt: self.visual_prompt,
            references: self.classic_references,
            details: self.details,
        }
    }
}

/// Accept a string, a number, a bool or null where text is expected.
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other @ serde_json::Value::Object(_) => other.to_string(),
    })
}

fn lenient_references<'de, D>(deserializer: D) -> Result<Vec<Reference>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Reference>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_details<'de, D>(deserializer: D) -> Result<Details, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Details>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_prediction<'de, D>(deserializer: D) -> Result<Option<FullGamePrediction>, D::Error>
where
    D: Deserializer<'de>,
{
    let prediction = Option::<FullGamePrediction>::deserialize(deserializer)?;
    Ok(prediction.filter(|p| !p.is_empty()))
}
