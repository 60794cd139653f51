//! The standard validation rules.
//!
//! | Rule | Runs after |
//! |---|---|
//! | `size` | |
//! | `duplicates` | |
//! | `equal-appearances` | |
//! | `reruns` | `duplicates` |
//! | `spacing` | `equal-appearances` |
//! | `facing` | `equal-appearances` |
//! | `zone-distribution` | `size` |
//! | `numeric` | |

mod fairness;
mod structure;

pub use fairness::{FacingRule, SpacingRule, ZoneDistributionRule};
pub use structure::{DuplicatesRule, EqualAppearancesRule, NumericRule, RerunRule, SizeRule};

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Orders labels numerically where both parse, then lexically.
pub(crate) fn label_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Distinct labels in display order.
pub(crate) fn sorted_teams(schedule: &[Vec<String>]) -> Vec<&str> {
    let mut teams: Vec<&str> = schedule
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    teams.sort_by(|a, b| label_cmp(a, b));
    teams
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order() {
        let schedule = vec![vec!["10".to_string(), "2".to_string()], vec!["b".into(), "1".into()]];
        assert_eq!(sorted_teams(&schedule), vec!["1", "2", "10", "b"]);
    }
}
