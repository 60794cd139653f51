//! Entropy-gap badness of a zone distribution.

use crate::schedule::{Match, Team};
use std::collections::HashMap;

fn c_ln_c(c: usize) -> f64 {
    if c == 0 {
        0.0
    } else {
        let c = c as f64;
        c * c.ln()
    }
}

/// Zone appearance counts of a schedule with an incrementally maintained
/// `Σ c·ln c`.
///
/// The grid is every occurring team against every zone, so
/// `ln K - H` is zero exactly when all cells hold the same count. Team ids
/// need not be dense; each distinct id gets a row in order of appearance.
#[derive(Debug, Clone)]
pub struct ZoneTally {
    num_zones: usize,
    rows: HashMap<Team, usize>,
    num_rows: usize,
    counts: Vec<usize>,
    total: usize,
    sum_c_ln_c: f64,
}

impl ZoneTally {
    pub fn new(matches: &[Match]) -> Self {
        let num_zones = matches.iter().map(Vec::len).max().unwrap_or(0);

        let mut rows = HashMap::new();
        for &team in matches.iter().flatten() {
            let next = rows.len();
            rows.entry(team).or_insert(next);
        }
        let num_rows = rows.len();

        let mut tally = Self {
            num_zones,
            rows,
            num_rows,
            counts: vec![0; num_rows * num_zones],
            total: 0,
            sum_c_ln_c: 0.0,
        };
        for m in matches {
            for (zone, &team) in m.iter().enumerate() {
                let cell = tally.cell(team, zone);
                tally.counts[cell] += 1;
                tally.total += 1;
            }
        }
        tally.sum_c_ln_c = tally.counts.iter().map(|&c| c_ln_c(c)).sum();
        tally
    }

    fn cell(&self, team: Team, zone: usize) -> usize {
        // Every team seen by `new` has a row; membership never changes.
        let row = self.rows.get(&team).copied().unwrap_or(0);
        row * self.num_zones + zone
    }

    pub fn num_zones(&self) -> usize {
        self.num_zones
    }

    /// Appearances of `team` in `zone`.
    pub fn count(&self, team: Team, zone: usize) -> usize {
        match self.rows.get(&team).copied() {
            Some(row) if zone < self.num_zones => self.counts[row * self.num_zones + zone],
            _ => 0,
        }
    }

    pub fn badness(&self) -> f64 {
        self.badness_for(self.sum_c_ln_c)
    }

    fn badness_for(&self, sum_c_ln_c: f64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let k = (self.num_rows * self.num_zones) as f64;
        let n = self.total as f64;
        (k.ln() - n.ln() + sum_c_ln_c / n).max(0.0)
    }

    fn delta(&self, current: &[Team], candidate: &[Team]) -> f64 {
        let mut delta = 0.0;
        for (zone, (&old, &new)) in current.iter().zip(candidate).enumerate() {
            if old == new {
                continue;
            }
            let out = self.counts[self.cell(old, zone)];
            let inc = self.counts[self.cell(new, zone)];
            delta += c_ln_c(out.saturating_sub(1)) - c_ln_c(out);
            delta += c_ln_c(inc + 1) - c_ln_c(inc);
        }
        delta
    }

    /// Badness if `current` were replaced by the reordering `candidate`.
    pub fn badness_if(&self, current: &[Team], candidate: &[Team]) -> f64 {
        self.badness_for(self.sum_c_ln_c + self.delta(current, candidate))
    }

    /// Commits the reordering of one match.
    pub fn apply(&mut self, current: &[Team], candidate: &[Team]) {
        self.sum_c_ln_c += self.delta(current, candidate);
        for (zone, (&old, &new)) in current.iter().zip(candidate).enumerate() {
            if old == new {
                continue;
            }
            let out = self.cell(old, zone);
            let inc = self.cell(new, zone);
            self.counts[out] = self.counts[out].saturating_sub(1);
            self.counts[inc] += 1;
        }
    }
}

/// Badness of a whole schedule.
pub fn badness(matches: &[Match]) -> f64 {
    ZoneTally::new(matches).badness()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_is_zero() {
        assert!(badness(&[vec![0, 1], vec![1, 0]]).abs() < 1e-12);
    }

    #[test]
    fn test_known_value() {
        // cells (0,0)=2 (1,1)=2 over K=4, N=4
        let b = badness(&[vec![0, 1], vec![0, 1]]);
        assert!((b - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_schedule() {
        assert_eq!(badness(&[]), 0.0);
    }

    #[test]
    fn test_incremental_matches_recompute() {
        let matches = vec![vec![0, 1, 2], vec![0, 3, 4], vec![1, 3, 5], vec![2, 4, 5]];
        let mut tally = ZoneTally::new(&matches);
        let candidate = vec![3, 4, 0];
        let predicted = tally.badness_if(&matches[1], &candidate);
        tally.apply(&matches[1], &candidate);

        let mut changed = matches.clone();
        changed[1] = candidate;
        let recomputed = badness(&changed);
        assert!((predicted - recomputed).abs() < 1e-12);
        assert!((tally.badness() - recomputed).abs() < 1e-12);
        assert_eq!(tally.count(0, 2), 1);
        assert_eq!(tally.count(0, 0), 1);
    }

    #[test]
    fn test_sparse_team_ids() {
        let huge = 4_000_000_000_000;
        let sparse = badness(&[vec![0, huge], vec![1, 2]]);
        let dense = badness(&[vec![0, 3], vec![1, 2]]);
        assert!((sparse - dense).abs() < 1e-12);

        let tally = ZoneTally::new(&[vec![0, huge], vec![huge, 0]]);
        assert_eq!(tally.count(huge, 0), 1);
        assert_eq!(tally.count(huge, 1), 1);
        assert!(tally.badness().abs() < 1e-12);
    }

    #[test]
    fn test_unchanged_candidate_has_same_badness() {
        let matches = vec![vec![0, 1], vec![0, 1]];
        let tally = ZoneTally::new(&matches);
        assert_eq!(tally.badness_if(&matches[0], &matches[0]), tally.badness());
    }
}
