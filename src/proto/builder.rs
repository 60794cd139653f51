//! Proto-round construction as a constraint model.

use crate::cp::{BacktrackingSolver, Constraint, CpModel, CpSolver, IntVar, SolverConfig, SolverStatus, VarId};
use crate::error::{Result, ScheduleError};
use crate::schedule::{Params, ProtoRound};
use tracing::{debug, info};

/// Builds one round's abstract match pattern.
///
/// The first satisfying assignment is accepted; there is no secondary
/// objective. With the default ascending value order the result is a pure
/// function of the [`Params`], which is what makes caching it sound.
///
/// # Examples
///
/// ```
/// use u_matchplan::proto::ProtoRoundBuilder;
/// use u_matchplan::schedule::Params;
///
/// let proto = ProtoRoundBuilder::new().build(&Params::new(4, 1, 2, 1)).unwrap();
/// assert_eq!(proto.matches(), &[vec![0, 1], vec![2, 3]]);
/// ```
pub struct ProtoRoundBuilder<S: CpSolver = BacktrackingSolver> {
    solver: S,
    config: SolverConfig,
}

impl ProtoRoundBuilder<BacktrackingSolver> {
    pub fn new() -> Self {
        Self::with_solver(BacktrackingSolver::new())
    }
}

impl Default for ProtoRoundBuilder<BacktrackingSolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CpSolver> ProtoRoundBuilder<S> {
    /// Uses a different constraint solver.
    pub fn with_solver(solver: S) -> Self {
        Self {
            solver,
            config: SolverConfig::default(),
        }
    }

    /// Sets the solver budget and value order.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Solves for a proto-round.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::InvalidParameters`] before any solving
    /// - [`ScheduleError::InfeasibleProtoRound`] when no assignment exists
    /// - [`ScheduleError::SearchBudgetExhausted`] when the solver gives up
    pub fn build(&self, params: &Params) -> Result<ProtoRound> {
        params.validate()?;
        let infeasible = || ScheduleError::InfeasibleProtoRound {
            num_teams: params.num_teams,
            appearances: params.appearances_per_round,
            zones: params.num_zones,
            spacing: params.spacing,
        };

        if let Some(reason) = counting_obstruction(params) {
            debug!(?params, reason, "proto-round ruled out before search");
            return Err(infeasible());
        }

        let (model, _) = build_model(params);
        info!(
            num_matches = params.num_matches(),
            vars = model.var_count(),
            constraints = model.constraint_count(),
            "solving proto-round"
        );

        let solution = self.solver.solve(&model, &self.config);
        match solution.status {
            SolverStatus::Feasible => {}
            SolverStatus::Infeasible => return Err(infeasible()),
            SolverStatus::BudgetExhausted => {
                return Err(ScheduleError::SearchBudgetExhausted {
                    stage: "proto-round",
                    budget: self.config.budget(),
                })
            }
            SolverStatus::ModelInvalid => {
                return Err(ScheduleError::Solver(solution.message.unwrap_or_default()))
            }
        }

        let zones = params.num_zones;
        let matches = solution
            .values
            .chunks(zones)
            .map(|slots| slots.iter().map(|&v| v as usize).collect())
            .collect();
        ProtoRound::new(matches)
    }
}

/// Necessary conditions that are cheaper to check than to search.
fn counting_obstruction(params: &Params) -> Option<&'static str> {
    let Params {
        num_teams: t,
        appearances_per_round: a,
        num_zones: z,
        spacing: s,
    } = *params;
    let m = params.num_matches();

    if (t * a) % z != 0 {
        return Some("team appearances do not fill whole matches");
    }
    if a > 1 && a * (z - 1) > t - 1 {
        return Some("not enough distinct opponents to face each at most once");
    }
    if a > 1 && s > 0 && (a - 1) * (s + 1) + 1 > m {
        return Some("spacing leaves no room for every appearance");
    }
    None
}

/// The proto-round as a CP model, plus the slot variables by match.
///
/// Variables are declared match by match, which is the order value
/// precedence runs in: pseudo-team `k + 1` never appears before `k`.
pub fn build_model(params: &Params) -> (CpModel, Vec<Vec<VarId>>) {
    let t = params.num_teams as i64;
    let z = params.num_zones;
    let m = params.num_matches();
    let a = params.appearances_per_round;
    let s = params.spacing;

    let mut model = CpModel::new(format!(
        "pround-{}-{}-{}-{}",
        params.num_teams, a, z, s
    ));

    // 1: range; strict order tightens each zone's bounds
    let slots: Vec<Vec<VarId>> = (0..m)
        .map(|mi| {
            (0..z)
                .map(|zi| {
                    let zi64 = zi as i64;
                    let lo = zi64;
                    let hi = t - z as i64 + zi64;
                    model.add_int_var(IntVar::new(format!("match-{mi}-{zi}"), lo, hi))
                })
                .collect()
        })
        .collect();

    // 2: canonical order within a match
    for row in &slots {
        for pair in row.windows(2) {
            model.add_less(pair[0], pair[1]);
        }
    }

    // 3: every team appears exactly `a` times
    let all: Vec<VarId> = slots.iter().flatten().copied().collect();
    model.add_exact_cardinality(all, 0, t - 1, a);

    // 4: sliding spacing windows
    if s > 0 && a > 1 {
        for start in 0..m.saturating_sub(s) {
            let window = slots[start..start + s + 1].iter().flatten().copied().collect();
            model.add_all_different(window);
        }
    }

    // 5: each pair faces at most once this round
    if a > 1 {
        model.add_constraint(Constraint::PairsAtMostOnce {
            groups: slots.clone(),
        });
    }

    // 6: pseudo-teams are interchangeable, so number them by first appearance
    model.add_constraint(Constraint::ValuePrecedence {
        vars: slots.iter().flatten().copied().collect(),
        first: 0,
    });

    (model, slots)
}
