//! Pairwise facing counts.

use super::types::{Match, Team};

/// How often each unordered pair of teams has shared a match.
///
/// Stored as a dense upper-triangular table over `0..num_teams`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacingCount {
    num_teams: usize,
    counts: Vec<usize>,
}

impl FacingCount {
    pub fn new(num_teams: usize) -> Self {
        let pairs = num_teams * num_teams.saturating_sub(1) / 2;
        Self {
            num_teams,
            counts: vec![0; pairs],
        }
    }

    pub fn from_matches(num_teams: usize, matches: &[Match]) -> Self {
        let mut facings = Self::new(num_teams);
        for m in matches {
            facings.record(m);
        }
        facings
    }

    fn index(&self, a: Team, b: Team) -> usize {
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        a * self.num_teams - a * (a + 1) / 2 + (b - a - 1)
    }

    /// Counts every pair in `m` once more.
    pub fn record(&mut self, m: &[Team]) {
        for (i, &a) in m.iter().enumerate() {
            for &b in &m[i + 1..] {
                if a != b && a < self.num_teams && b < self.num_teams {
                    let ix = self.index(a, b);
                    self.counts[ix] += 1;
                }
            }
        }
    }

    /// Count for the pair; 0 for a team outside `0..num_teams`, which
    /// [`record`](Self::record) never counts either.
    pub fn get(&self, a: Team, b: Team) -> usize {
        if a == b || a >= self.num_teams || b >= self.num_teams {
            return 0;
        }
        self.counts[self.index(a, b)]
    }

    pub fn num_teams(&self) -> usize {
        self.num_teams
    }

    /// `(min, max)` over all pairs, `(0, 0)` with fewer than two teams.
    pub fn spread(&self) -> (usize, usize) {
        let min = self.counts.iter().copied().min().unwrap_or(0);
        let max = self.counts.iter().copied().max().unwrap_or(0);
        (min, max)
    }

    /// `max - min` over all pairs.
    pub fn gap(&self) -> usize {
        let (min, max) = self.spread();
        max - min
    }

    /// Every pair `(a, b)` with `a < b` and its count.
    pub fn pairs(&self) -> impl Iterator<Item = (Team, Team, usize)> + '_ {
        (0..self.num_teams).flat_map(move |a| {
            (a + 1..self.num_teams).map(move |b| (a, b, self.counts[self.index(a, b)]))
        })
    }

    /// Pairs `(a, b)` with `a < b` that have met at least `count` times.
    pub fn pairs_at_least(&self, count: usize) -> Vec<(Team, Team)> {
        self.pairs()
            .filter(|&(_, _, c)| c >= count)
            .map(|(a, b, _)| (a, b))
            .collect()
    }

    /// Pairs in the bottom `fraction` by count.
    ///
    /// The cutoff is the count at the `ceil(fraction * pairs)`-th lowest
    /// pair; every pair at or below it is returned, so ties at the cutoff
    /// are never split.
    pub fn deficient_pairs(&self, fraction: f64) -> Vec<(Team, Team)> {
        if self.counts.is_empty() {
            return Vec::new();
        }
        let mut sorted = self.counts.clone();
        sorted.sort_unstable();
        let take = ((fraction * sorted.len() as f64).ceil() as usize).clamp(1, sorted.len());
        let cutoff = sorted[take - 1];
        self.pairs()
            .filter(|&(_, _, count)| count <= cutoff)
            .map(|(a, b, _)| (a, b))
            .collect()
    }
}
