//! Teams, matches, proto-rounds and schedules.

use crate::error::{Result, ScheduleError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A team identifier. Dense and zero-based internally.
pub type Team = usize;

/// A zone (slot) index within a match. Dense and zero-based.
pub type Zone = usize;

/// An ordered list of teams, one per zone.
pub type Match = Vec<Team>;

/// Generation parameters for one proto-round.
///
/// Also the cache key for proto-round memoization.
///
/// # Examples
///
/// ```
/// use u_matchplan::schedule::Params;
///
/// let params = Params::new(8, 1, 4, 1);
/// assert_eq!(params.num_matches(), 2);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Params {
    /// Number of distinct teams (T).
    pub num_teams: usize,
    /// Appearances of each team within one round (A).
    pub appearances_per_round: usize,
    /// Teams per match (Z).
    pub num_zones: usize,
    /// Minimum number of other matches between two appearances (S).
    pub spacing: usize,
}

impl Params {
    pub fn new(
        num_teams: usize,
        appearances_per_round: usize,
        num_zones: usize,
        spacing: usize,
    ) -> Self {
        Self {
            num_teams,
            appearances_per_round,
            num_zones,
            spacing,
        }
    }

    /// Matches per round: `ceil(T * A / Z)`.
    pub fn num_matches(&self) -> usize {
        if self.num_zones == 0 {
            return 0;
        }
        (self.num_teams * self.appearances_per_round).div_ceil(self.num_zones)
    }

    /// Rejects parameters no solver should ever see.
    pub fn validate(&self) -> Result<()> {
        if self.num_teams == 0 {
            return Err(invalid("num_teams must be positive"));
        }
        if self.appearances_per_round == 0 {
            return Err(invalid("appearances_per_round must be positive"));
        }
        if self.num_zones < 2 {
            return Err(invalid(format!(
                "num_zones must be at least 2, got {}",
                self.num_zones
            )));
        }
        if self.num_zones > self.num_teams {
            return Err(invalid(format!(
                "{} zones cannot be filled by {} teams",
                self.num_zones, self.num_teams
            )));
        }
        let matches = self.num_matches();
        if self.spacing >= matches {
            return Err(invalid(format!(
                "spacing {} must be less than the {} matches in a round",
                self.spacing, matches
            )));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ScheduleError {
    ScheduleError::InvalidParameters(message.into())
}

/// An abstract single-round match pattern over pseudo-team ids `0..T`.
///
/// Every match is stored in ascending order and every pseudo-team appears
/// the same number of times. A proto-round is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoRound {
    matches: Vec<Match>,
    num_teams: usize,
    num_zones: usize,
}

impl ProtoRound {
    /// Builds a proto-round, sorting each match into canonical order.
    ///
    /// Fails unless all matches share one size of at least 2, entries
    /// within a match are distinct, the ids are exactly `0..T`, and every
    /// id appears equally often.
    pub fn new(mut matches: Vec<Match>) -> Result<Self> {
        let num_zones = match matches.first() {
            Some(first) => first.len(),
            None => return Err(invalid("proto-round has no matches")),
        };
        if num_zones < 2 {
            return Err(invalid("proto-round matches need at least 2 teams"));
        }

        for (ix, m) in matches.iter_mut().enumerate() {
            if m.len() != num_zones {
                return Err(invalid(format!(
                    "proto-round match {ix} has {} teams, expected {num_zones}",
                    m.len()
                )));
            }
            m.sort_unstable();
            if m.windows(2).any(|w| w[0] == w[1]) {
                return Err(invalid(format!(
                    "proto-round match {ix} repeats a team"
                )));
            }
        }

        let num_teams = matches.iter().flatten().max().map_or(0, |&t| t + 1);
        let slots = matches.len() * num_zones;
        if num_teams > slots {
            return Err(invalid(format!(
                "proto-round ids must be dense, found team {} in {slots} slots",
                num_teams - 1
            )));
        }
        let counts = appearance_counts(num_teams, &matches);
        if let Some(team) = counts.iter().position(|&c| c == 0) {
            return Err(invalid(format!(
                "proto-round ids must be dense, team {team} never appears"
            )));
        }
        if counts.iter().any(|&c| c != counts[0]) {
            return Err(invalid("proto-round teams appear unequally often"));
        }

        Ok(Self {
            matches,
            num_teams,
            num_zones,
        })
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn num_teams(&self) -> usize {
        self.num_teams
    }

    pub fn num_zones(&self) -> usize {
        self.num_zones
    }

    pub fn num_matches(&self) -> usize {
        self.matches.len()
    }

    /// How many times each pseudo-team appears in this round.
    pub fn appearances_per_round(&self) -> usize {
        self.num_matches() * self.num_zones / self.num_teams
    }

    /// Applies a pseudo → real bijection element-wise.
    pub fn realize(&self, bijection: &[Team]) -> Vec<Match> {
        self.matches
            .iter()
            .map(|m| m.iter().map(|&pseudo| bijection[pseudo]).collect())
            .collect()
    }

    /// Checks that this proto-round satisfies everything the builder
    /// demands for `params`: the same shape, no pseudo-team twice within
    /// `spacing + 1` consecutive matches, and no pair facing twice when
    /// teams appear more than once per round.
    pub fn verify(&self, params: &Params) -> Result<()> {
        if self.num_teams != params.num_teams
            || self.num_zones != params.num_zones
            || self.appearances_per_round() != params.appearances_per_round
        {
            return Err(invalid(format!(
                "proto-round has {} teams, {} zones and {} appearances, expected {}, {} and {}",
                self.num_teams,
                self.num_zones,
                self.appearances_per_round(),
                params.num_teams,
                params.num_zones,
                params.appearances_per_round
            )));
        }
        if params.appearances_per_round < 2 {
            return Ok(());
        }

        for (ix, m) in self.matches.iter().enumerate() {
            let window = &self.matches[ix + 1..(ix + params.spacing + 1).min(self.matches.len())];
            for (offset, other) in window.iter().enumerate() {
                if let Some(team) = m.iter().find(|t| other.contains(t)) {
                    return Err(invalid(format!(
                        "pseudo-team {team} appears in matches {ix} and {}",
                        ix + offset + 1
                    )));
                }
            }
        }

        let mut seen = BTreeSet::new();
        for (ix, m) in self.matches.iter().enumerate() {
            for (i, &a) in m.iter().enumerate() {
                for &b in &m[i + 1..] {
                    if !seen.insert((a, b)) {
                        return Err(invalid(format!(
                            "pseudo-teams {a} and {b} face twice, again in match {ix}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// The pseudo-teams appearing in the first `n` matches.
    pub fn head_teams(&self, n: usize) -> BTreeSet<Team> {
        self.matches.iter().take(n).flatten().copied().collect()
    }
}

/// A flat sequence of matches in play order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schedule {
    matches: Vec<Match>,
}

impl Schedule {
    pub fn new(matches: Vec<Match>) -> Self {
        Self { matches }
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<Match> {
        self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Zone count of the first match (0 for an empty schedule).
    pub fn num_zones(&self) -> usize {
        self.matches.first().map_or(0, Vec::len)
    }

    /// One past the highest team id.
    pub fn num_teams(&self) -> usize {
        self.matches.iter().flatten().max().map_or(0, |&t| t + 1)
    }

    /// Team labels as shown to people: one-based decimal numbers.
    pub fn to_labels(&self) -> Vec<Vec<String>> {
        self.matches
            .iter()
            .map(|m| m.iter().map(|t| (t + 1).to_string()).collect())
            .collect()
    }
}

/// Per-team match counts over `0..num_teams`.
pub fn appearance_counts(num_teams: usize, matches: &[Match]) -> Vec<usize> {
    let mut counts = vec![0; num_teams];
    for &team in matches.iter().flatten() {
        if team < num_teams {
            counts[team] += 1;
        }
    }
    counts
}

/// Canonical, order-insensitive key of a match's team set.
pub fn team_set(m: &[Team]) -> Vec<Team> {
    let mut set = m.to_vec();
    set.sort_unstable();
    set
}
