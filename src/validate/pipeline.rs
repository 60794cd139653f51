//! Ordered rule execution.

use super::rules::{
    DuplicatesRule, EqualAppearancesRule, FacingRule, NumericRule, RerunRule, SizeRule,
    SpacingRule, ZoneDistributionRule,
};
use super::types::{Finding, Report, Rule, RuleOutcome};
use crate::error::{Result, ScheduleError};
use crate::schedule::Schedule;
use tracing::{debug, info};

/// Thresholds for the standard rule set.
///
/// # Examples
///
/// ```
/// use u_matchplan::validate::{Pipeline, ValidatorConfig};
///
/// let pipeline = Pipeline::standard(&ValidatorConfig::default().with_spacing(2));
/// assert_eq!(pipeline.rule_count(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Matches a team must sit out between appearances.
    pub spacing: usize,

    /// Facing shortfall reported as a warning; larger ones are errors.
    pub facing_warn_gap: usize,

    /// Zone unbalance reported as a warning; larger ones are errors.
    pub zone_warn_unbalance: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            spacing: 1,
            facing_warn_gap: 2,
            zone_warn_unbalance: 1,
        }
    }
}

impl ValidatorConfig {
    pub fn with_spacing(mut self, spacing: usize) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_facing_warn_gap(mut self, gap: usize) -> Self {
        self.facing_warn_gap = gap;
        self
    }

    pub fn with_zone_warn_unbalance(mut self, unbalance: usize) -> Self {
        self.zone_warn_unbalance = unbalance;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.facing_warn_gap == 0 {
            return Err("facing_warn_gap must be positive".into());
        }
        if self.zone_warn_unbalance == 0 {
            return Err("zone_warn_unbalance must be positive".into());
        }
        Ok(())
    }
}

/// An ordered list of rules.
///
/// Rules run in registration order. A rule's declared predecessors must
/// be registered before it, which [`Pipeline::register`] checks when the
/// pipeline is built rather than when it runs.
///
/// # Examples
///
/// ```
/// use u_matchplan::format::parse_labels;
/// use u_matchplan::validate::{Pipeline, ValidatorConfig};
///
/// let pipeline = Pipeline::standard(&ValidatorConfig::default());
/// let report = pipeline.run(&parse_labels("1|2\n3|4\n5|6\n2|3\n6|1\n4|5", "|"));
/// assert!(report.is_clean());
/// ```
pub struct Pipeline {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The eight standard rules in dependency order.
    pub fn standard(config: &ValidatorConfig) -> Self {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(SizeRule),
            Box::new(DuplicatesRule),
            Box::new(EqualAppearancesRule),
            Box::new(RerunRule),
            Box::new(SpacingRule::new(config.spacing)),
            Box::new(FacingRule::new(config.facing_warn_gap)),
            Box::new(ZoneDistributionRule::new(config.zone_warn_unbalance)),
            Box::new(NumericRule),
        ];
        Self { rules }
    }

    /// Appends a rule.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::UnknownPredecessor`] if the rule names a
    /// predecessor that is not registered yet.
    pub fn register<R: Rule + 'static>(mut self, rule: R) -> Result<Self> {
        for &predecessor in rule.after() {
            if !self.rules.iter().any(|r| r.name() == predecessor) {
                return Err(ScheduleError::UnknownPredecessor {
                    rule: rule.name().to_string(),
                    predecessor: predecessor.to_string(),
                });
            }
        }
        self.rules.push(Box::new(rule));
        Ok(self)
    }

    /// Returns the number of rules in this pipeline.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Returns the names of all rules in order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Runs every rule over team labels.
    pub fn run(&self, schedule: &[Vec<String>]) -> Report {
        let mut report = Report::default();
        if schedule.is_empty() {
            report.push(Finding::error("empty", "No matches in schedule"));
            return report;
        }

        for rule in &self.rules {
            let outcome = rule.check(schedule);
            debug!(rule = rule.name(), findings = outcome.findings().len(), "rule checked");
            let stop = matches!(outcome, RuleOutcome::Stop(_));
            let findings = match outcome {
                RuleOutcome::Continue(f) | RuleOutcome::Stop(f) => f,
            };
            for finding in findings {
                report.push(finding);
            }
            if stop {
                debug!(rule = rule.name(), "pipeline stopped");
                break;
            }
        }

        info!(
            warnings = report.warnings.len(),
            errors = report.errors.len(),
            "validation finished"
        );
        report
    }

    /// Runs every rule over a generated schedule, labeled one-based.
    pub fn run_schedule(&self, schedule: &Schedule) -> Report {
        self.run(&schedule.to_labels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parse_labels;

    struct Named(&'static str, &'static [&'static str]);

    impl Rule for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn after(&self) -> &[&'static str] {
            self.1
        }
        fn check(&self, _: &[Vec<String>]) -> RuleOutcome {
            RuleOutcome::Continue(vec![Finding::warning("seen", self.0)])
        }
    }

    struct Halt;

    impl Rule for Halt {
        fn name(&self) -> &str {
            "halt"
        }
        fn check(&self, _: &[Vec<String>]) -> RuleOutcome {
            RuleOutcome::Stop(vec![Finding::error("halted", "stop here")])
        }
    }

    fn labels(text: &str) -> Vec<Vec<String>> {
        parse_labels(text, "|")
    }

    #[test]
    fn test_standard_order_satisfies_predecessors() {
        let pipeline = Pipeline::standard(&ValidatorConfig::default());
        let mut seen = Vec::new();
        for rule in &pipeline.rules {
            for p in rule.after() {
                assert!(seen.contains(p), "{} runs before {p}", rule.name());
            }
            seen.push(rule.name());
        }
        assert_eq!(
            pipeline.rule_names(),
            vec![
                "size",
                "duplicates",
                "equal-appearances",
                "reruns",
                "spacing",
                "facing",
                "zone-distribution",
                "numeric"
            ]
        );
    }

    #[test]
    fn test_register_rejects_unknown_predecessor() {
        let err = Pipeline::new()
            .register(Named("late", &["early"]))
            .err()
            .unwrap();
        match err {
            ScheduleError::UnknownPredecessor { rule, predecessor } => {
                assert_eq!(rule, "late");
                assert_eq!(predecessor, "early");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_register_in_order() {
        let pipeline = Pipeline::new()
            .register(Named("early", &[]))
            .unwrap()
            .register(Named("late", &["early"]))
            .unwrap();
        let report = pipeline.run(&labels("1|2"));
        let order: Vec<_> = report.warnings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(order, vec!["early", "late"]);
    }

    #[test]
    fn test_stop_halts_after_recording() {
        let pipeline = Pipeline::new()
            .register(Halt)
            .unwrap()
            .register(Named("never", &[]))
            .unwrap();
        let report = pipeline.run(&labels("1|2"));
        assert_eq!(report.errors.len(), 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_empty_schedule_is_one_error() {
        let report = Pipeline::standard(&ValidatorConfig::default()).run(&[]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, "empty");
    }

    #[test]
    fn test_unequal_appearances_names_team() {
        // Fano plane plus two matches: team 5 plays 3 times, everyone else 4
        let text = "1|2|3\n1|4|5\n1|6|7\n2|4|6\n2|5|7\n3|4|7\n3|5|6\n1|2|4\n3|6|7";
        let report =
            Pipeline::standard(&ValidatorConfig::default().with_spacing(0)).run(&labels(text));
        let errors: Vec<_> = report.with_code("unequal-appearances").collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Team 5 appears 3 times, expected 4");
    }

    #[test]
    fn test_rerun_names_both_matches() {
        let report =
            Pipeline::standard(&ValidatorConfig::default().with_spacing(0)).run(&labels("1|2|3\n3|2|1"));
        let reruns: Vec<_> = report.with_code("rerun").collect();
        assert_eq!(reruns.len(), 1);
        assert!(reruns[0].message.contains("Match 1"));
        assert!(reruns[0].message.contains("match 0"));
    }

    #[test]
    fn test_size_mismatch_stops_pipeline() {
        let report = Pipeline::standard(&ValidatorConfig::default()).run(&labels("1|2\n3|4|5\n1|1"));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, "wrong-size");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_run_schedule_uses_one_based_labels() {
        let schedule = Schedule::new(vec![
            vec![0, 1],
            vec![2, 3],
            vec![4, 5],
            vec![1, 2],
            vec![5, 0],
            vec![3, 4],
        ]);
        let report = Pipeline::standard(&ValidatorConfig::default()).run_schedule(&schedule);
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn test_config_validation() {
        assert!(ValidatorConfig::default().validate().is_ok());
        assert!(ValidatorConfig::default().with_facing_warn_gap(0).validate().is_err());
    }
}
