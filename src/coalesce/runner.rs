//! Round-by-round relabeling of a proto-round.

use super::config::{CoalesceConfig, CoalesceStrategy};
use super::state::CoalesceState;
use crate::cp::{
    BacktrackingSolver, Constraint, CpModel, CpSolver, IntVar, SolverConfig, SolverStatus, VarId,
};
use crate::error::{ConstraintClass, Result, ScheduleError};
use crate::random::{create_rng, derive_seed};
use crate::schedule::{FacingCount, Match, ProtoRound, Schedule, Team};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::{debug, info, warn};

const ALL_CLASSES: [ConstraintClass; 3] = [
    ConstraintClass::BoundarySpacing,
    ConstraintClass::NoRerun,
    ConstraintClass::FacingDeficit,
];

/// Facing targets for one round, read off the confirmed history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacingBand {
    /// Lowest-count pairs; at least one of them meets this round.
    pub deficit: Vec<(Team, Team)>,
    /// Pairs already at `min + tolerance`; none of them meets again.
    pub ceiling: Vec<(Team, Team)>,
    /// Pairs one meeting short of the ceiling; as few as possible meet.
    pub edge: Vec<(Team, Team)>,
}

impl FacingBand {
    /// Keeping the ceiling pairs apart bounds the gap after the round by
    /// `tolerance`, since the minimum count can only grow.
    pub fn new(facings: &FacingCount, deficit_fraction: f64, tolerance: usize) -> Self {
        let (min, _) = facings.spread();
        let limit = min + tolerance;
        let edge = if tolerance >= 2 {
            facings
                .pairs()
                .filter(|&(_, _, count)| count + 1 == limit)
                .map(|(a, b, _)| (a, b))
                .collect()
        } else {
            Vec::new()
        };
        Self {
            deficit: facings.deficient_pairs(deficit_fraction),
            ceiling: facings.pairs_at_least(limit),
            edge,
        }
    }

    /// How many edge pairs meet in `round`.
    pub fn edge_meetings(&self, round: &[Match]) -> usize {
        let edge: HashSet<(Team, Team)> = self.edge.iter().copied().collect();
        round
            .iter()
            .map(|m| {
                let mut count = 0;
                for (i, &a) in m.iter().enumerate() {
                    for &b in &m[i + 1..] {
                        if edge.contains(&(a.min(b), a.max(b))) {
                            count += 1;
                        }
                    }
                }
                count
            })
            .sum()
    }
}

/// Extends a proto-round into a multi-round schedule.
///
/// Round 0 is the proto-round itself. Every later round relabels it with a
/// bijection π_r found against the confirmed history only; rounds are
/// never revisited. Solving all rounds jointly would multiply the
/// cross-round terms, so each solve stays at `T` variables plus
/// constraints over the fixed proto-round shape and the summarized
/// history.
///
/// Both strategies hold the facing gap within
/// [`CoalesceConfig::facing_tolerance`] after every round. A round that
/// cannot is reported as [`ScheduleError::InfeasibleRound`].
///
/// # Examples
///
/// ```
/// use u_matchplan::coalesce::{CoalesceConfig, RoundCoalescer};
/// use u_matchplan::schedule::ProtoRound;
///
/// let proto = ProtoRound::new(vec![vec![0, 1], vec![2, 3]]).unwrap();
/// let coalescer = RoundCoalescer::new(CoalesceConfig::default().with_seed(1));
/// let schedule = coalescer.coalesce(&proto, 2, 0).unwrap();
/// assert_eq!(schedule.len(), 4);
/// ```
pub struct RoundCoalescer<S: CpSolver = BacktrackingSolver> {
    solver: S,
    config: CoalesceConfig,
}

impl RoundCoalescer<BacktrackingSolver> {
    pub fn new(config: CoalesceConfig) -> Self {
        Self::with_solver(BacktrackingSolver::new(), config)
    }
}

impl<S: CpSolver> RoundCoalescer<S> {
    pub fn with_solver(solver: S, config: CoalesceConfig) -> Self {
        Self { solver, config }
    }

    pub fn config(&self) -> &CoalesceConfig {
        &self.config
    }

    /// Builds the full schedule of `num_rounds` rounds.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::InvalidParameters`] for a bad config, zero rounds,
    ///   or spacing that does not fit in a round
    /// - [`ScheduleError::InfeasibleRound`] naming the round and class
    /// - [`ScheduleError::SearchBudgetExhausted`] when a bounded search gives up
    pub fn coalesce(
        &self,
        proto: &ProtoRound,
        num_rounds: usize,
        spacing: usize,
    ) -> Result<Schedule> {
        self.config
            .validate()
            .map_err(ScheduleError::InvalidParameters)?;
        if num_rounds == 0 {
            return Err(ScheduleError::InvalidParameters(
                "rounds must be positive".into(),
            ));
        }
        if spacing >= proto.num_matches() {
            return Err(ScheduleError::InvalidParameters(format!(
                "spacing {spacing} must be less than the {} matches in a round",
                proto.num_matches()
            )));
        }

        let seed = self.config.seed.unwrap_or_else(rand::random);
        info!(
            rounds = num_rounds,
            teams = proto.num_teams(),
            matches_per_round = proto.num_matches(),
            "coalescing proto-rounds"
        );

        let mut state = CoalesceState::start(proto, spacing);
        for round in 1..num_rounds {
            state = self.solve_round(proto, state, round, seed)?;
        }

        let (min, max) = state.facings().spread();
        debug!(min, max, "facing spread after coalescing");
        Ok(state.into_schedule())
    }

    /// Solves and confirms one round on top of `state`.
    pub fn solve_round(
        &self,
        proto: &ProtoRound,
        state: CoalesceState,
        round: usize,
        seed: u64,
    ) -> Result<CoalesceState> {
        let bijection = match self.config.strategy {
            CoalesceStrategy::Exact => self.exact_bijection(proto, &state, round, seed)?,
            CoalesceStrategy::RandomRestart { attempts } => {
                self.shuffled_bijection(proto, &state, round, seed, attempts)?
            }
        };
        let realized = proto.realize(&bijection);
        debug!(round, ?bijection, "round confirmed");
        Ok(state.confirm(realized))
    }

    fn exact_bijection(
        &self,
        proto: &ProtoRound,
        state: &CoalesceState,
        round: usize,
        seed: u64,
    ) -> Result<Vec<Team>> {
        let band = FacingBand::new(
            state.facings(),
            self.config.deficit_fraction,
            self.config.facing_tolerance,
        );
        let (model, vars) = bijection_model(proto, state, &ALL_CLASSES, &band);
        debug!(
            round,
            deficient_pairs = band.deficit.len(),
            ceiling_pairs = band.ceiling.len(),
            constraints = model.constraint_count(),
            "solving round bijection"
        );

        let config = self
            .config
            .solver
            .clone()
            .with_seed(derive_seed(seed, round as u64));
        let solution = self.solver.solve(&model, &config);
        match solution.status {
            SolverStatus::Feasible => {}
            SolverStatus::Infeasible => {
                let class = self.diagnose(proto, state, &band, &config)?;
                warn!(round, %class, "round has no valid bijection");
                return Err(ScheduleError::InfeasibleRound { round, class });
            }
            SolverStatus::BudgetExhausted => {
                return Err(ScheduleError::SearchBudgetExhausted {
                    stage: "coalesce",
                    budget: config.budget(),
                })
            }
            SolverStatus::ModelInvalid => {
                return Err(ScheduleError::Solver(solution.message.unwrap_or_default()))
            }
        }

        let bijection = to_bijection(&solution.values);
        Ok(self.settle_edge(proto, &model, &vars, &band, bijection, &config))
    }

    /// Re-solves with fewer edge pairs meeting until no better round is found.
    ///
    /// Failing to improve, whether infeasible or out of budget, keeps the
    /// last round found.
    fn settle_edge(
        &self,
        proto: &ProtoRound,
        model: &CpModel,
        vars: &[VarId],
        band: &FacingBand,
        mut best: Vec<Team>,
        config: &SolverConfig,
    ) -> Vec<Team> {
        let groups = pseudo_groups(proto, vars);
        let edge: Vec<(i64, i64)> = band.edge.iter().map(|&(a, b)| (a as i64, b as i64)).collect();
        let mut met = band.edge_meetings(&proto.realize(&best));
        while met > 0 {
            let mut tighter = model.clone();
            tighter.add_constraint(Constraint::PairsTogetherAtMost {
                groups: groups.clone(),
                pairs: edge.clone(),
                max: met - 1,
            });
            let solution = self.solver.solve(&tighter, config);
            if !solution.is_solution_found() {
                break;
            }
            best = to_bijection(&solution.values);
            met = band.edge_meetings(&proto.realize(&best));
        }
        debug!(edge_meetings = met, "round settled");
        best
    }

    /// Adds constraint classes one at a time to find the first that breaks.
    fn diagnose(
        &self,
        proto: &ProtoRound,
        state: &CoalesceState,
        band: &FacingBand,
        config: &SolverConfig,
    ) -> Result<ConstraintClass> {
        for k in 1..=ALL_CLASSES.len() {
            let (model, _) = bijection_model(proto, state, &ALL_CLASSES[..k], band);
            match self.solver.solve(&model, config).status {
                SolverStatus::Infeasible => return Ok(ALL_CLASSES[k - 1]),
                SolverStatus::BudgetExhausted => {
                    return Err(ScheduleError::SearchBudgetExhausted {
                        stage: "coalesce",
                        budget: config.budget(),
                    })
                }
                _ => {}
            }
        }
        Ok(ConstraintClass::FacingDeficit)
    }

    fn shuffled_bijection(
        &self,
        proto: &ProtoRound,
        state: &CoalesceState,
        round: usize,
        seed: u64,
        attempts: usize,
    ) -> Result<Vec<Team>> {
        let mut rng = create_rng(derive_seed(seed, round as u64));
        let mut teams: Vec<Team> = (0..proto.num_teams()).collect();
        for attempt in 0..attempts {
            teams.shuffle(&mut rng);
            let realized = proto.realize(&teams);
            if state
                .violation(&realized, self.config.facing_tolerance)
                .is_none()
            {
                debug!(round, attempt, "shuffled bijection accepted");
                return Ok(teams);
            }
        }
        Err(ScheduleError::SearchBudgetExhausted {
            stage: "coalesce",
            budget: attempts,
        })
    }
}

fn to_bijection(values: &[i64]) -> Vec<Team> {
    values.iter().map(|&v| v as Team).collect()
}

/// Each proto-round match as the bijection variables of its pseudo-teams.
fn pseudo_groups(proto: &ProtoRound, vars: &[VarId]) -> Vec<Vec<VarId>> {
    proto
        .matches()
        .iter()
        .map(|m| m.iter().map(|&p| vars[p]).collect())
        .collect()
}

/// The bijection π_r as a CP model restricted to the given classes.
///
/// Variable `p` is π_r(p); the returned handles are in pseudo-team order.
/// When every pseudo-team plays once per round, teams within a match are
/// interchangeable and are kept in ascending order.
pub fn bijection_model(
    proto: &ProtoRound,
    state: &CoalesceState,
    classes: &[ConstraintClass],
    band: &FacingBand,
) -> (CpModel, Vec<VarId>) {
    let t = proto.num_teams();
    let mut model = CpModel::new(format!("round-bijection-{}", state.rounds()));
    let vars: Vec<VarId> = (0..t)
        .map(|p| model.add_int_var(IntVar::new(format!("pi-{p}"), 0, t as i64 - 1)))
        .collect();
    model.add_all_different(vars.clone());

    let groups = pseudo_groups(proto, &vars);
    if proto.appearances_per_round() == 1 {
        for group in &groups {
            for pair in group.windows(2) {
                model.add_less(pair[0], pair[1]);
            }
        }
    }

    let as_values = |pairs: &[(Team, Team)]| -> Vec<(i64, i64)> {
        pairs.iter().map(|&(a, b)| (a as i64, b as i64)).collect()
    };
    for class in classes {
        match class {
            ConstraintClass::BoundarySpacing => {
                let banned: Vec<i64> = state.tail_teams().iter().map(|&t| t as i64).collect();
                if banned.is_empty() {
                    continue;
                }
                for p in proto.head_teams(state.spacing()) {
                    model.add_not_in(vars[p], banned.clone());
                }
            }
            ConstraintClass::NoRerun => {
                for set in state.confirmed_sets() {
                    let values: Vec<i64> = set.iter().map(|&t| t as i64).collect();
                    for group in &groups {
                        model.add_not_all_in(group.clone(), values.clone());
                    }
                }
            }
            ConstraintClass::FacingDeficit => {
                if !band.deficit.is_empty() {
                    model.add_constraint(Constraint::AnyPairTogether {
                        groups: groups.clone(),
                        pairs: as_values(&band.deficit),
                    });
                }
                if !band.ceiling.is_empty() {
                    model.add_pairs_apart(groups.clone(), as_values(&band.ceiling));
                }
            }
        }
    }

    (model, vars)
}
