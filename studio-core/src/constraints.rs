//! Project constraints supplied by the user.

use serde::Serialize;
use thiserror::Error;

/// Reasons a set of constraints is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    #[error("Team size must be at least 1")]
    EmptyTeam,

    #[error("Duration must be at least 1 month")]
    ZeroDuration,

    #[error("Budget must be a non-negative amount, got {0}")]
    InvalidBudget(f64),
}

/// The creative and production limits a proposal has to fit.
///
/// Immutable once built; the fields are only readable through accessors so
/// the invariants checked in [`Constraints::new`] always hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraints {
    story: String,
    team_size: u32,
    duration_months: u32,
    budget: f64,
}

impl Constraints {
    /// Validate and build a set of constraints.
    pub fn new(
        story: impl Into<String>,
        team_size: u32,
        duration_months: u32,
        budget: f64,
    ) -> Result<Self, ConstraintError> {
        if team_size == 0 {
            return Err(ConstraintError::EmptyTeam);
        }
        if duration_months == 0 {
            return Err(ConstraintError::ZeroDuration);
        }
        if !budget.is_finite() || budget < 0.0 {
            return Err(ConstraintError::InvalidBudget(budget));
        }
        Ok(Self {
            story: story.into(),
            team_size,
            duration_months,
            budget,
        })
    }

    pub fn story(&self) -> &str {
        &self.story
    }

    pub fn team_size(&self) -> u32 {
        self.team_size
    }

    pub fn duration_months(&self) -> u32 {
        self.duration_months
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    /// Smallest full-game budget a projection may quote (5x the input).
    pub fn minimum_full_game_budget(&self) -> f64 {
        self.budget * 5.0
    }

    /// Budget formatted the way prompts quote it, e.g. `$10000`.
    pub fn budget_display(&self) -> String {
        if self.budget.fract() == 0.0 {
            format!("${:.0}", self.budget)
        } else {
            format!("${:.2}", self.budget)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_constraints() {
        let c = Constraints::new("A hacker...", 3, 6, 10_000.0).unwrap();
        assert_eq!(c.story(), "A hacker...");
        assert_eq!(c.team_size(), 3);
        assert_eq!(c.duration_months(), 6);
        assert_eq!(c.minimum_full_game_budget(), 50_000.0);
        assert_eq!(c.budget_display(), "$10000");
    }

    #[test]
    fn test_zero_budget_is_allowed() {
        assert!(Constraints::new("", 1, 1, 0.0).is_ok());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert_eq!(
            Constraints::new("x", 0, 6, 1.0),
            Err(ConstraintError::EmptyTeam)
        );
        assert_eq!(
            Constraints::new("x", 2, 0, 1.0),
            Err(ConstraintError::ZeroDuration)
        );
        assert!(matches!(
            Constraints::new("x", 2, 3, -5.0),
            Err(ConstraintError::InvalidBudget(_))
        ));
        assert!(Constraints::new("x", 2, 3, f64::NAN).is_err());
    }

    #[test]
    fn test_fractional_budget_display() {
        let c = Constraints::new("x", 1, 1, 99.5).unwrap();
        assert_eq!(c.budget_display(), "$99.50");
    }
}
