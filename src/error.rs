//! Error types for schedule generation.
//!
//! Generation failures abort the whole run: no partial schedule is ever
//! returned. Validation findings are not errors; see [`crate::validate`].

use std::fmt;
use thiserror::Error;

/// Constraint class named when a round bijection cannot be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintClass {
    /// Teams closing round r-1 may not open round r.
    BoundarySpacing,
    /// A realized match repeats a confirmed team set.
    NoRerun,
    /// No deficient pair could be made to face each other.
    FacingDeficit,
}

impl fmt::Display for ConstraintClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintClass::BoundarySpacing => "boundary spacing",
            ConstraintClass::NoRerun => "no-rerun",
            ConstraintClass::FacingDeficit => "facing deficit",
        };
        f.write_str(name)
    }
}

/// Main error type for match planning.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Parameters rejected before any solving begins.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// No single-round pattern satisfies the proto-round constraints.
    #[error(
        "no proto-round exists for {num_teams} teams, {appearances} appearances, \
         {zones} zones, spacing {spacing}"
    )]
    InfeasibleProtoRound {
        num_teams: usize,
        appearances: usize,
        zones: usize,
        spacing: usize,
    },

    /// No bijection exists for the given round.
    #[error("no valid team assignment for round {round}: {class} cannot be satisfied")]
    InfeasibleRound { round: usize, class: ConstraintClass },

    /// A bounded search gave up; the problem may still be solvable.
    #[error("{stage}: search budget of {budget} exhausted")]
    SearchBudgetExhausted { stage: &'static str, budget: usize },

    /// Malformed line in the textual match format.
    #[error("line {line}: {message}")]
    Format { line: usize, message: String },

    /// A validator rule names a predecessor that is not registered yet.
    #[error("rule '{rule}' must run after '{predecessor}', which is not registered")]
    UnknownPredecessor { rule: String, predecessor: String },

    /// A proto-round cache file could not be read or written.
    #[error("cache i/o: {0}")]
    CacheIo(#[from] std::io::Error),

    /// A proto-round cache file is not valid JSON for a proto-round.
    #[error("cache entry: {0}")]
    CacheFormat(#[from] serde_json::Error),

    /// The constraint model handed to the solver is malformed.
    #[error("solver model error: {0}")]
    Solver(String),
}

/// Result type alias for match planning.
pub type Result<T> = std::result::Result<T, ScheduleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_error_names_class() {
        let err = ScheduleError::InfeasibleRound {
            round: 3,
            class: ConstraintClass::NoRerun,
        };
        let msg = err.to_string();
        assert!(msg.contains("round 3"));
        assert!(msg.contains("no-rerun"));
    }

    #[test]
    fn test_budget_error_message() {
        let err = ScheduleError::SearchBudgetExhausted {
            stage: "coalesce",
            budget: 1000,
        };
        assert_eq!(err.to_string(), "coalesce: search budget of 1000 exhausted");
    }

    #[test]
    fn test_cache_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(ScheduleError::from(io), ScheduleError::CacheIo(_)));

        let json = serde_json::from_str::<Vec<usize>>("not json").unwrap_err();
        let err = ScheduleError::from(json);
        assert!(err.to_string().starts_with("cache entry: "));
    }
}
