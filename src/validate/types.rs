//! Core types for schedule validation.

use std::fmt;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A single observation about a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,

    /// Stable identifier, e.g. `"rerun"`.
    pub code: &'static str,

    pub message: String,
}

impl Finding {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// What a rule produced and whether later rules should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Continue(Vec<Finding>),

    /// Record these findings, then halt the pipeline.
    Stop(Vec<Finding>),
}

impl RuleOutcome {
    pub fn findings(&self) -> &[Finding] {
        match self {
            RuleOutcome::Continue(f) | RuleOutcome::Stop(f) => f,
        }
    }
}

/// A schedule check.
///
/// Rules see team labels as written, so textual input that would not
/// parse as a [`Schedule`](crate::schedule::Schedule) can still be
/// checked.
///
/// # Examples
///
/// ```
/// use u_matchplan::validate::{Finding, Rule, RuleOutcome};
///
/// struct NoByes;
///
/// impl Rule for NoByes {
///     fn name(&self) -> &str { "no-byes" }
///     fn check(&self, schedule: &[Vec<String>]) -> RuleOutcome {
///         let findings = schedule
///             .iter()
///             .enumerate()
///             .filter(|(_, m)| m.iter().any(|t| t == "bye"))
///             .map(|(ix, _)| Finding::warning("bye", format!("Match {ix} has a bye")))
///             .collect();
///         RuleOutcome::Continue(findings)
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Returns the name of this rule.
    fn name(&self) -> &str;

    /// Names of rules that must already be registered.
    fn after(&self) -> &[&'static str] {
        &[]
    }

    fn check(&self, schedule: &[Vec<String>]) -> RuleOutcome;
}

/// Findings of a pipeline run, split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub warnings: Vec<Finding>,
    pub errors: Vec<Finding>,
}

impl Report {
    pub fn push(&mut self, finding: Finding) {
        match finding.severity {
            Severity::Warning => self.warnings.push(finding),
            Severity::Error => self.errors.push(finding),
        }
    }

    /// A run fails iff it produced at least one error.
    pub fn is_failure(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Findings of either severity carrying `code`.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.errors
            .iter()
            .chain(&self.warnings)
            .filter(move |f| f.code == code)
    }
}

impl fmt::Display for Report {
    /// One `W`/`E` line per finding, then a count summary.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for w in &self.warnings {
            writeln!(f, "W {}: {}", w.code, w.message)?;
        }
        for e in &self.errors {
            writeln!(f, "E {}: {}", e.code, e.message)?;
        }
        write!(f, "{} warnings, {} errors", self.warnings.len(), self.errors.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_splits_by_severity() {
        let mut report = Report::default();
        assert!(report.is_clean());
        report.push(Finding::warning("numeric", "w"));
        assert!(!report.is_failure());
        report.push(Finding::error("rerun", "e"));
        assert!(report.is_failure());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.with_code("rerun").count(), 1);
        assert_eq!(report.to_string(), "W numeric: w\nE rerun: e\n1 warnings, 1 errors");
    }

    #[test]
    fn test_outcome_findings() {
        let outcome = RuleOutcome::Stop(vec![Finding::error("wrong-size", "x")]);
        assert_eq!(outcome.findings().len(), 1);
    }

    #[test]
    fn test_finding_display() {
        let f = Finding::error("dupe", "Team 3 appears in match 0 2 times");
        assert_eq!(f.to_string(), "[dupe] Team 3 appears in match 0 2 times");
    }
}
