//! Cross-round accumulator.

use crate::error::ConstraintClass;
use crate::schedule::{team_set, FacingCount, Match, ProtoRound, Schedule, Team};
use std::collections::BTreeSet;

/// Everything a round's solve depends on from the rounds before it.
///
/// Passed into each round step by value and returned extended, so a single
/// round can be solved and tested in isolation.
#[derive(Debug, Clone)]
pub struct CoalesceState {
    num_teams: usize,
    spacing: usize,
    confirmed: Vec<Match>,
    seen: BTreeSet<Vec<Team>>,
    facings: FacingCount,
    rounds: usize,
}

impl CoalesceState {
    /// Confirms round 0 under the identity bijection.
    pub fn start(proto: &ProtoRound, spacing: usize) -> Self {
        let state = Self {
            num_teams: proto.num_teams(),
            spacing,
            confirmed: Vec::new(),
            seen: BTreeSet::new(),
            facings: FacingCount::new(proto.num_teams()),
            rounds: 0,
        };
        state.confirm(proto.matches().to_vec())
    }

    /// Appends a realized round. Confirmed rounds are never revisited.
    pub fn confirm(mut self, round: Vec<Match>) -> Self {
        for m in &round {
            self.facings.record(m);
            self.seen.insert(team_set(m));
        }
        self.confirmed.extend(round);
        self.rounds += 1;
        self
    }

    pub fn num_teams(&self) -> usize {
        self.num_teams
    }

    pub fn spacing(&self) -> usize {
        self.spacing
    }

    /// Rounds confirmed so far, round 0 included.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn confirmed(&self) -> &[Match] {
        &self.confirmed
    }

    pub fn facings(&self) -> &FacingCount {
        &self.facings
    }

    /// Distinct team sets played so far, each sorted.
    pub fn confirmed_sets(&self) -> impl Iterator<Item = &Vec<Team>> {
        self.seen.iter()
    }

    /// Teams in the last `spacing` confirmed matches.
    pub fn tail_teams(&self) -> BTreeSet<Team> {
        let start = self.confirmed.len().saturating_sub(self.spacing);
        self.confirmed[start..].iter().flatten().copied().collect()
    }

    /// The first constraint class a provisional round breaks, if any.
    ///
    /// Checks spacing across the seam, reruns against every confirmed
    /// match and within the round, and the facing gap after the round.
    pub fn violation(&self, round: &[Match], facing_tolerance: usize) -> Option<ConstraintClass> {
        let start = self.confirmed.len().saturating_sub(self.spacing);
        let window: Vec<&Match> = self.confirmed[start..].iter().chain(round).collect();
        for (i, m) in window.iter().enumerate() {
            let end = (i + self.spacing + 1).min(window.len());
            for other in &window[i + 1..end] {
                if m.iter().any(|t| other.contains(t)) {
                    return Some(ConstraintClass::BoundarySpacing);
                }
            }
        }

        let mut fresh = BTreeSet::new();
        for m in round {
            let set = team_set(m);
            if self.seen.contains(&set) || !fresh.insert(set) {
                return Some(ConstraintClass::NoRerun);
            }
        }

        let mut facings = self.facings.clone();
        for m in round {
            facings.record(m);
        }
        if facings.gap() > facing_tolerance {
            return Some(ConstraintClass::FacingDeficit);
        }
        None
    }

    pub fn into_schedule(self) -> Schedule {
        Schedule::new(self.confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proto() -> ProtoRound {
        ProtoRound::new(vec![vec![0, 1], vec![2, 3]]).unwrap()
    }

    #[test]
    fn test_start_confirms_identity_round() {
        let state = CoalesceState::start(&proto(), 1);
        assert_eq!(state.rounds(), 1);
        assert_eq!(state.confirmed(), &[vec![0, 1], vec![2, 3]]);
        assert_eq!(state.facings().get(0, 1), 1);
        assert_eq!(state.confirmed_sets().count(), 2);
    }

    #[test]
    fn test_tail_teams() {
        let state = CoalesceState::start(&proto(), 1);
        assert_eq!(state.tail_teams(), BTreeSet::from([2, 3]));
    }

    #[test]
    fn test_violation_classes() {
        let state = CoalesceState::start(&proto(), 1);
        // 3 closes round 0 and would open round 1
        assert_eq!(
            state.violation(&[vec![3, 0], vec![1, 2]], 2),
            Some(ConstraintClass::BoundarySpacing)
        );
        assert_eq!(
            state.violation(&[vec![0, 2], vec![1, 3]], 2),
            Some(ConstraintClass::BoundarySpacing)
        );
        assert_eq!(
            state.violation(&[vec![1, 0], vec![3, 2]], 2),
            Some(ConstraintClass::NoRerun)
        );
    }

    #[test]
    fn test_violation_accepts_fresh_round() {
        let state = CoalesceState::start(&proto(), 0);
        assert_eq!(state.violation(&[vec![0, 2], vec![1, 3]], 2), None);
    }

    #[test]
    fn test_violation_rerun_without_spacing() {
        let state = CoalesceState::start(&proto(), 0);
        assert_eq!(
            state.violation(&[vec![1, 0], vec![2, 3]], 2),
            Some(ConstraintClass::NoRerun)
        );
    }

    #[test]
    fn test_violation_facing_gap() {
        let state = CoalesceState::start(&proto(), 0);
        assert_eq!(
            state.violation(&[vec![0, 2], vec![1, 3]], 0),
            Some(ConstraintClass::FacingDeficit)
        );
    }

    #[test]
    fn test_confirm_accumulates() {
        let state = CoalesceState::start(&proto(), 1).confirm(vec![vec![0, 2], vec![1, 3]]);
        assert_eq!(state.rounds(), 2);
        assert_eq!(state.into_schedule().len(), 4);
    }
}
