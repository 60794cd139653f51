//! Schedule validation.
//!
//! A [`Pipeline`] runs an ordered list of [`Rule`]s over a schedule's team
//! labels and collects their findings into a [`Report`]. Findings are data,
//! never errors: a schedule fails validation iff the report holds at least
//! one error-severity finding.

mod pipeline;
pub mod rules;
mod types;

pub use pipeline::{Pipeline, ValidatorConfig};
pub use types::{Finding, Report, Rule, RuleOutcome, Severity};
