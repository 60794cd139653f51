//! Rules about the shape of the schedule and its team labels.

use super::{label_cmp, sorted_teams};
use crate::validate::types::{Finding, Rule, RuleOutcome};
use std::collections::{BTreeMap, HashMap};

/// Every match has as many teams as the first. Stops the pipeline on a
/// mismatch, since later rules index zones by position.
pub struct SizeRule;

impl Rule for SizeRule {
    fn name(&self) -> &str {
        "size"
    }

    fn check(&self, schedule: &[Vec<String>]) -> RuleOutcome {
        let expected = schedule.first().map_or(0, Vec::len);
        let findings: Vec<Finding> = schedule
            .iter()
            .enumerate()
            .filter(|(_, m)| m.len() != expected)
            .map(|(ix, m)| {
                Finding::error(
                    "wrong-size",
                    format!("Match {ix} has {} teams, expected {expected}", m.len()),
                )
            })
            .collect();

        if findings.is_empty() {
            RuleOutcome::Continue(findings)
        } else {
            RuleOutcome::Stop(findings)
        }
    }
}

/// No team appears twice in one match.
pub struct DuplicatesRule;

impl Rule for DuplicatesRule {
    fn name(&self) -> &str {
        "duplicates"
    }

    fn check(&self, schedule: &[Vec<String>]) -> RuleOutcome {
        let mut findings = Vec::new();
        for (ix, m) in schedule.iter().enumerate() {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for team in m {
                *counts.entry(team).or_default() += 1;
            }
            let mut dupes: Vec<_> = counts.into_iter().filter(|&(_, c)| c > 1).collect();
            dupes.sort_by(|a, b| label_cmp(a.0, b.0));
            for (team, count) in dupes {
                findings.push(Finding::error(
                    "dupe",
                    format!("Team {team} appears in match {ix} {count} times"),
                ));
            }
        }
        RuleOutcome::Continue(findings)
    }
}

/// Every team plays as often as the busiest team.
pub struct EqualAppearancesRule;

impl Rule for EqualAppearancesRule {
    fn name(&self) -> &str {
        "equal-appearances"
    }

    fn check(&self, schedule: &[Vec<String>]) -> RuleOutcome {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for team in schedule.iter().flatten() {
            *counts.entry(team).or_default() += 1;
        }
        let most = counts.values().copied().max().unwrap_or(0);

        let findings = sorted_teams(schedule)
            .into_iter()
            .filter(|team| counts[team] != most)
            .map(|team| {
                Finding::error(
                    "unequal-appearances",
                    format!("Team {team} appears {} times, expected {most}", counts[team]),
                )
            })
            .collect();
        RuleOutcome::Continue(findings)
    }
}

/// No two matches have the same set of teams.
pub struct RerunRule;

impl Rule for RerunRule {
    fn name(&self) -> &str {
        "reruns"
    }

    fn after(&self) -> &[&'static str] {
        &["duplicates"]
    }

    fn check(&self, schedule: &[Vec<String>]) -> RuleOutcome {
        let mut first_seen: HashMap<Vec<&str>, usize> = HashMap::new();
        let mut findings = Vec::new();
        for (ix, m) in schedule.iter().enumerate() {
            let mut key: Vec<&str> = m.iter().map(String::as_str).collect();
            key.sort_by(|a, b| label_cmp(a, b));
            key.dedup();
            match first_seen.get(&key) {
                Some(&previous) => findings.push(Finding::error(
                    "rerun",
                    format!(
                        "Match {ix} has the same teams as match {previous} ({})",
                        key.join(", ")
                    ),
                )),
                None => {
                    first_seen.insert(key, ix);
                }
            }
        }
        RuleOutcome::Continue(findings)
    }
}

/// Team labels are the numbers `1..=N`. Warnings only.
pub struct NumericRule;

impl Rule for NumericRule {
    fn name(&self) -> &str {
        "numeric"
    }

    fn check(&self, schedule: &[Vec<String>]) -> RuleOutcome {
        let teams = sorted_teams(schedule);
        let mut findings = Vec::new();
        let mut numbers = Vec::new();
        for team in &teams {
            match team.parse::<i64>() {
                Ok(n) => numbers.push(n),
                Err(_) => findings.push(Finding::warning(
                    "non-numeric",
                    format!("Team {team:?} is not a number"),
                )),
            }
        }

        if let (Some(&lowest), Some(&highest)) = (numbers.iter().min(), numbers.iter().max()) {
            if lowest != 1 {
                findings.push(Finding::warning(
                    "non-one-indexed",
                    format!("Team numbers are not one-indexed, lowest is {lowest}"),
                ));
            } else if highest != teams.len() as i64 {
                findings.push(Finding::warning(
                    "non-consecutive",
                    format!(
                        "Team numbers are not consecutive, highest is {highest} but should be {}",
                        teams.len()
                    ),
                ));
            }
        }
        RuleOutcome::Continue(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parse_labels;

    fn check(rule: &dyn Rule, text: &str) -> RuleOutcome {
        rule.check(&parse_labels(text, "|"))
    }

    #[test]
    fn test_size_stops_on_mismatch() {
        let outcome = check(&SizeRule, "1|2\n3|4|5\n6");
        match outcome {
            RuleOutcome::Stop(findings) => {
                assert_eq!(findings.len(), 2);
                assert_eq!(findings[0].message, "Match 1 has 3 teams, expected 2");
            }
            other => panic!("expected stop, got {other:?}"),
        }
        assert_eq!(check(&SizeRule, "1|2\n3|4"), RuleOutcome::Continue(vec![]));
    }

    #[test]
    fn test_duplicates_per_team() {
        let outcome = check(&DuplicatesRule, "1|1|2|2\n3|4|5|6");
        let findings = outcome.findings();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].message, "Team 1 appears in match 0 2 times");
        assert_eq!(findings[1].code, "dupe");
    }

    #[test]
    fn test_equal_appearances_clean() {
        assert!(check(&EqualAppearancesRule, "1|2\n2|1").findings().is_empty());
    }

    #[test]
    fn test_rerun_ignores_order() {
        let outcome = check(&RerunRule, "1|2|3\n4|5|6\n3|1|2\n2|3|1");
        let messages: Vec<_> = outcome.findings().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Match 2 has the same teams as match 0 (1, 2, 3)",
                "Match 3 has the same teams as match 0 (1, 2, 3)"
            ]
        );
    }

    #[test]
    fn test_numeric_warnings() {
        let outcome = check(&NumericRule, "0|1\n2|x");
        let codes: Vec<_> = outcome.findings().iter().map(|f| f.code).collect();
        assert_eq!(codes, vec!["non-numeric", "non-one-indexed"]);

        let outcome = check(&NumericRule, "1|2\n3|5");
        assert_eq!(outcome.findings()[0].code, "non-consecutive");

        assert!(check(&NumericRule, "1|2\n3|4").findings().is_empty());
        assert!(outcome.findings().iter().all(|f| f.severity == crate::validate::Severity::Warning));
    }
}
