//! Prompt construction.
//!
//! Templates live next to this file and use `{name}` placeholders. JSON
//! braces in the templates are left alone; only known placeholders are
//! substituted.

use crate::constraints::Constraints;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const PROPOSAL_TEMPLATE: &str = include_str!("prompts/proposal.txt");
const EVALUATE_TEMPLATE: &str = include_str!("prompts/evaluate.txt");
const WIKI_TEMPLATE: &str = include_str!("prompts/wiki.txt");

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Substitute placeholders in a single pass over the template, so values
/// are never scanned again. Unknown placeholders are kept verbatim.
fn fill(template: &str, values: &[(&str, String)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn constraint_values(constraints: &Constraints) -> Vec<(&'static str, String)> {
    vec![
        ("team", constraints.team_size().to_string()),
        ("duration", constraints.duration_months().to_string()),
        (
            "min_full_budget",
            format!("${:.0}", constraints.minimum_full_game_budget()),
        ),
        ("budget", constraints.budget_display()),
    ]
}

/// Instruction for the full proposal call.
pub fn proposal_prompt(constraints: &Constraints) -> String {
    let mut values = constraint_values(constraints);
    values.push(("story", constraints.story().to_string()));
    fill(PROPOSAL_TEMPLATE, &values)
}

/// Instruction for the single-genre feasibility call.
pub fn evaluation_prompt(genre: &str, constraints: &Constraints) -> String {
    let mut values = constraint_values(constraints);
    values.push(("genre", genre.to_string()));
    values.push(("story", constraints.story().to_string()));
    fill(EVALUATE_TEMPLATE, &values)
}

/// Instruction for the encyclopedia lookup.
pub fn wiki_prompt(genre: &str) -> String {
    fill(WIKI_TEMPLATE, &[("genre", genre.to_string())])
}
