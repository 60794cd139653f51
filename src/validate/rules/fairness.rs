//! Rules about how fairly teams are treated.

use super::{label_cmp, sorted_teams};
use crate::validate::types::{Finding, Rule, RuleOutcome};
use std::collections::{BTreeSet, HashMap};

/// A team sits out at least `spacing` matches between appearances.
pub struct SpacingRule {
    spacing: usize,
}

impl SpacingRule {
    pub fn new(spacing: usize) -> Self {
        Self { spacing }
    }
}

impl Rule for SpacingRule {
    fn name(&self) -> &str {
        "spacing"
    }

    fn after(&self) -> &[&'static str] {
        &["equal-appearances"]
    }

    fn check(&self, schedule: &[Vec<String>]) -> RuleOutcome {
        let mut findings = Vec::new();
        for (ix, m) in schedule.iter().enumerate() {
            let mut teams: Vec<&str> = m
                .iter()
                .map(String::as_str)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            teams.sort_by(|a, b| label_cmp(a, b));

            let end = (ix + self.spacing + 1).min(schedule.len());
            for (later, other) in schedule.iter().enumerate().take(end).skip(ix + 1) {
                for team in &teams {
                    if other.iter().any(|t| t == team) {
                        findings.push(Finding::error(
                            "spacing",
                            format!("Team {team} appears in match {ix} and {later}"),
                        ));
                    }
                }
            }
        }
        RuleOutcome::Continue(findings)
    }
}

/// Every pair faces about as often as the most-faced pair.
///
/// A pair short by `warn_gap` is a warning; shorter is an error.
pub struct FacingRule {
    warn_gap: usize,
}

impl FacingRule {
    pub fn new(warn_gap: usize) -> Self {
        Self { warn_gap }
    }
}

impl Rule for FacingRule {
    fn name(&self) -> &str {
        "facing"
    }

    fn after(&self) -> &[&'static str] {
        &["equal-appearances"]
    }

    fn check(&self, schedule: &[Vec<String>]) -> RuleOutcome {
        let teams = sorted_teams(schedule);
        let position: HashMap<&str, usize> =
            teams.iter().enumerate().map(|(i, &t)| (t, i)).collect();

        let n = teams.len();
        let mut facings = vec![0usize; n * n];
        for m in schedule {
            let ids: BTreeSet<usize> = m.iter().map(|t| position[t.as_str()]).collect();
            let ids: Vec<usize> = ids.into_iter().collect();
            for (i, &a) in ids.iter().enumerate() {
                for &b in &ids[i + 1..] {
                    facings[a * n + b] += 1;
                }
            }
        }

        let pairs = (0..n).flat_map(|a| (a + 1..n).map(move |b| (a, b)));
        let most = pairs.clone().map(|(a, b)| facings[a * n + b]).max().unwrap_or(0);

        let mut findings = Vec::new();
        for (a, b) in pairs {
            let count = facings[a * n + b];
            let gap = most - count;
            if gap < self.warn_gap {
                continue;
            }
            let (left, right) = (teams[a], teams[b]);
            if gap == self.warn_gap {
                findings.push(Finding::warning(
                    "unequal-facings",
                    format!("Team {left} and {right} face each other {count} times, ideally {most}"),
                ));
            } else {
                findings.push(Finding::error(
                    "unequal-facings",
                    format!("Team {left} and {right} face only {count} times, ideally {most}"),
                ));
            }
        }
        RuleOutcome::Continue(findings)
    }
}

/// Each team starts from every zone about equally often.
///
/// An unbalance of `warn_unbalance` is passable; more is not.
pub struct ZoneDistributionRule {
    warn_unbalance: usize,
}

impl ZoneDistributionRule {
    pub fn new(warn_unbalance: usize) -> Self {
        Self { warn_unbalance }
    }
}

impl Rule for ZoneDistributionRule {
    fn name(&self) -> &str {
        "zone-distribution"
    }

    fn after(&self) -> &[&'static str] {
        &["size"]
    }

    fn check(&self, schedule: &[Vec<String>]) -> RuleOutcome {
        let num_zones = schedule.first().map_or(0, Vec::len);
        let mut by_zone: HashMap<&str, Vec<usize>> = HashMap::new();
        for m in schedule {
            for (zone, team) in m.iter().enumerate().take(num_zones) {
                by_zone.entry(team).or_insert_with(|| vec![0; num_zones])[zone] += 1;
            }
        }

        let mut findings = Vec::new();
        for team in sorted_teams(schedule) {
            let Some(counts) = by_zone.get(team) else {
                continue;
            };
            let (Some(fewest), Some(most)) = (counts.iter().min(), counts.iter().max()) else {
                continue;
            };
            let unbalance = most - fewest;
            if unbalance == 0 {
                continue;
            }
            let witness = |target: usize| counts.iter().position(|&c| c == target).unwrap_or(0);
            let (zone_most, zone_fewest) = (witness(*most), witness(*fewest));

            if unbalance <= self.warn_unbalance {
                findings.push(Finding::warning(
                    "unbalanced-passable",
                    format!(
                        "Team {team} has a {unbalance}-appearance unbalance - appears {most} times in zone {zone_most} and {fewest} times in zone {zone_fewest}"
                    ),
                ));
            } else {
                findings.push(Finding::error(
                    "unbalanced-impassable",
                    format!(
                        "Team {team} has a {unbalance}-appearance unbalance - appears {most} times in zone {zone_most} and {fewest} times in zone {zone_fewest}"
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
    use crate::validate::Severity;

    fn check(rule: &dyn Rule, text: &str) -> Vec<Finding> {
        match rule.check(&parse_labels(text, "|")) {
            RuleOutcome::Continue(f) | RuleOutcome::Stop(f) => f,
        }
    }

    #[test]
    fn test_spacing_adjacent() {
        let findings = check(&SpacingRule::new(1), "1|2\n2|3\n4|5");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Team 2 appears in match 0 and 1");
    }

    #[test]
    fn test_spacing_window_reaches_schedule_end() {
        // The last pair is inside a window that runs off the end.
        let findings = check(&SpacingRule::new(2), "1|2\n3|4\n5|6\n7|1\n8|1");
        let messages: Vec<_> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["Team 1 appears in match 3 and 4"]);
    }

    #[test]
    fn test_spacing_zero_allows_back_to_back() {
        assert!(check(&SpacingRule::new(0), "1|2\n1|2").is_empty());
    }

    #[test]
    fn test_facing_warning_then_error() {
        // 1-2 face three times; 3-4 never, others once or less
        let text = "1|2\n1|2\n1|2\n1|3\n2|4";
        let findings = check(&FacingRule::new(2), text);
        assert!(findings
            .iter()
            .any(|f| f.severity == Severity::Error && f.message.starts_with("Team 3 and 4 face only 0")));
        assert!(findings
            .iter()
            .any(|f| f.severity == Severity::Warning && f.message.starts_with("Team 1 and 3 face each other 1")));
    }

    #[test]
    fn test_facing_tolerates_gap_of_one() {
        assert!(check(&FacingRule::new(2), "1|2\n3|4\n1|3\n2|4").is_empty());
    }

    #[test]
    fn test_zone_distribution() {
        let findings = check(&ZoneDistributionRule::new(1), "1|2\n1|3\n2|3\n1|2");
        let by_code = |code: &str| findings.iter().filter(|f| f.code == code).count();
        // team 1 is 3/0, team 2 is 1/2, team 3 is 0/2
        assert_eq!(by_code("unbalanced-impassable"), 2);
        assert_eq!(by_code("unbalanced-passable"), 1);
        assert!(findings[0].message.starts_with("Team 1 has a 3-appearance"));
    }

    #[test]
    fn test_zone_distribution_balanced() {
        assert!(check(&ZoneDistributionRule::new(1), "1|2\n2|1").is_empty());
    }
}
