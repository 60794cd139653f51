//! CP solver interface and backtracking implementation.

use super::model::{Constraint, CpModel};
use super::variables::VarId;
use crate::random::rng_from;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::debug;

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// A satisfying valuation was found.
    Feasible,
    /// The whole search space was explored: no valuation exists.
    Infeasible,
    /// Model is invalid or malformed.
    ModelInvalid,
    /// Node or time budget ran out before the search finished.
    BudgetExhausted,
}

/// Solution from a CP solver.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Variable values indexed by [`VarId`]; empty unless feasible.
    pub values: Vec<i64>,
    /// Search nodes visited.
    pub nodes: usize,
    /// Solve time in milliseconds.
    pub solve_time_ms: i64,
    /// Reason for a `ModelInvalid` status.
    pub message: Option<String>,
}

impl CpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            nodes: 0,
            solve_time_ms: 0,
            message: None,
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        self.status == SolverStatus::Feasible
    }

    /// The value assigned to `var`, if a solution was found.
    pub fn value(&self, var: VarId) -> Option<i64> {
        self.values.get(var.0).copied()
    }
}

/// Order in which candidate values are tried for each variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueOrder {
    /// Smallest value first. Deterministic.
    #[default]
    Ascending,
    /// Per-variable random order drawn from the configured seed.
    Shuffled,
}

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum search nodes. 0 = no limit.
    pub node_limit: usize,
    /// Optional wall-clock limit in milliseconds.
    pub time_limit_ms: Option<u64>,
    /// Value ordering heuristic.
    pub value_order: ValueOrder,
    /// Random seed for [`ValueOrder::Shuffled`].
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            node_limit: 2_000_000,
            time_limit_ms: None,
            value_order: ValueOrder::Ascending,
            seed: None,
        }
    }
}

impl SolverConfig {
    pub fn with_node_limit(mut self, n: usize) -> Self {
        self.node_limit = n;
        self
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    pub fn with_value_order(mut self, order: ValueOrder) -> Self {
        self.value_order = order;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The budget reported when the search gives up.
    pub fn budget(&self) -> usize {
        self.node_limit
    }
}

/// Trait for CP solver implementations.
///
/// Implementors return either one satisfying valuation or a definitive
/// infeasibility. Budget exhaustion is a third, non-definitive answer.
/// No constraint is ever relaxed by the solver.
pub trait CpSolver {
    /// Solves the model and returns a solution.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}

/// Depth-first search with forward checking.
///
/// The unassigned variable with the fewest remaining values is branched on
/// next, ties going to the lowest index. Every constraint touching the
/// assigned variable is checked against the partial assignment and then
/// prunes the domains of its other unassigned variables; a domain wiped
/// out by pruning backtracks at once. Pruned values are restored from a
/// trail on backtrack.
///
/// # Limitations
///
/// - Exponential in the worst case; bound it with `node_limit`
/// - Forward checking only, with no fixpoint; `AnyPairTogether` is checked
///   but never prunes
pub struct BacktrackingSolver;

impl BacktrackingSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BacktrackingSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CpSolver for BacktrackingSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        if let Err(message) = model.validate() {
            let mut solution = CpSolution::empty(SolverStatus::ModelInvalid);
            solution.message = Some(message);
            return solution;
        }

        let start_time = Instant::now();
        let domains = initial_domains(model, config);
        if domains.iter().any(Vec::is_empty) {
            debug!(model = %model.name, "empty domain after unary filtering");
            return CpSolution::empty(SolverStatus::Infeasible);
        }

        let mut watchers = vec![Vec::new(); model.var_count()];
        for (ci, constraint) in model.constraints.iter().enumerate() {
            if matches!(constraint, Constraint::NotIn { .. }) {
                continue;
            }
            for var in constraint.scope() {
                watchers[var.0].push(ci);
            }
        }

        let mut search = Search {
            model,
            domains,
            trail: Vec::new(),
            watchers,
            assignment: vec![None; model.var_count()],
            nodes: 0,
            node_limit: config.node_limit,
            deadline: config
                .time_limit_ms
                .map(|ms| start_time + Duration::from_millis(ms)),
        };

        let outcome = if search.prune_root() {
            search.descend()
        } else {
            Outcome::Exhausted
        };
        let status = match outcome {
            Outcome::Found => SolverStatus::Feasible,
            Outcome::Exhausted => SolverStatus::Infeasible,
            Outcome::OutOfBudget => SolverStatus::BudgetExhausted,
        };

        debug!(
            model = %model.name,
            vars = model.var_count(),
            constraints = model.constraint_count(),
            nodes = search.nodes,
            ?status,
            "cp search finished"
        );

        CpSolution {
            status,
            values: if status == SolverStatus::Feasible {
                search.assignment.iter().map(|v| v.unwrap_or(0)).collect()
            } else {
                Vec::new()
            },
            nodes: search.nodes,
            solve_time_ms: start_time.elapsed().as_millis() as i64,
            message: None,
        }
    }
}

/// Bounds minus unary exclusions, in the configured order.
fn initial_domains(model: &CpModel, config: &SolverConfig) -> Vec<Vec<i64>> {
    let mut forbidden: Vec<HashSet<i64>> = vec![HashSet::new(); model.var_count()];
    for constraint in &model.constraints {
        if let Constraint::NotIn { var, values } = constraint {
            forbidden[var.0].extend(values.iter().copied());
        }
    }

    let mut rng = rng_from(config.seed);
    model
        .vars
        .iter()
        .zip(&forbidden)
        .map(|(var, banned)| {
            let mut values: Vec<i64> = match var.fixed {
                Some(v) => vec![v],
                None => (var.min..=var.max).collect(),
            };
            values.retain(|v| !banned.contains(v));
            if config.value_order == ValueOrder::Shuffled {
                values.shuffle(&mut rng);
            }
            values
        })
        .collect()
}

enum Outcome {
    Found,
    Exhausted,
    OutOfBudget,
}

struct Search<'m> {
    model: &'m CpModel,
    domains: Vec<Vec<i64>>,
    /// Domains as they were before each pruning step.
    trail: Vec<(usize, Vec<i64>)>,
    watchers: Vec<Vec<usize>>,
    assignment: Vec<Option<i64>>,
    nodes: usize,
    node_limit: usize,
    deadline: Option<Instant>,
}

impl Search<'_> {
    fn descend(&mut self) -> Outcome {
        let Some(var) = self.next_var() else {
            return Outcome::Found;
        };

        let values = self.domains[var.0].clone();
        for value in values {
            self.nodes += 1;
            if self.out_of_budget() {
                return Outcome::OutOfBudget;
            }

            let mark = self.trail.len();
            self.assignment[var.0] = Some(value);
            if self.consistent(var, value) && self.propagate(var, value) {
                match self.descend() {
                    Outcome::Exhausted => {}
                    done => return done,
                }
            }
            self.undo(mark);
        }

        self.assignment[var.0] = None;
        Outcome::Exhausted
    }

    /// Smallest domain first; `min_by_key` keeps the lowest index on ties.
    fn next_var(&self) -> Option<VarId> {
        (0..self.assignment.len())
            .filter(|&i| self.assignment[i].is_none())
            .min_by_key(|&i| self.domains[i].len())
            .map(VarId)
    }

    fn out_of_budget(&self) -> bool {
        if self.node_limit > 0 && self.nodes > self.node_limit {
            return true;
        }
        match self.deadline {
            Some(deadline) if self.nodes % 1024 == 0 => Instant::now() >= deadline,
            _ => false,
        }
    }

    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some((var, domain)) = self.trail.pop() {
                self.domains[var] = domain;
            }
        }
    }

    /// Keeps the values of an unassigned `var` that pass `keep`.
    ///
    /// Returns false when the domain is wiped out.
    fn restrict(&mut self, var: VarId, keep: impl Fn(i64) -> bool) -> bool {
        if self.assignment[var.0].is_some() {
            return true;
        }
        let domain = &self.domains[var.0];
        if domain.iter().all(|&x| keep(x)) {
            return true;
        }
        let pruned: Vec<i64> = domain.iter().copied().filter(|&x| keep(x)).collect();
        let previous = std::mem::replace(&mut self.domains[var.0], pruned);
        self.trail.push((var.0, previous));
        !self.domains[var.0].is_empty()
    }

    /// Pruning that needs no assignment at all.
    fn prune_root(&mut self) -> bool {
        let model = self.model;
        model.constraints.iter().all(|constraint| match constraint {
            Constraint::ValuePrecedence { vars, first } => self.prune_precedence(vars, *first),
            _ => true,
        })
    }

    fn consistent(&self, var: VarId, value: i64) -> bool {
        self.watchers[var.0]
            .iter()
            .all(|&ci| self.holds(&self.model.constraints[ci], var, value))
    }

    /// Forward checking after `var = value`.
    fn propagate(&mut self, var: VarId, value: i64) -> bool {
        let model = self.model;
        for k in 0..self.watchers[var.0].len() {
            let ci = self.watchers[var.0][k];
            let alive = match &model.constraints[ci] {
                Constraint::Less { left, right } => {
                    if *left == var {
                        self.restrict(*right, |x| x > value)
                    } else {
                        self.restrict(*left, |x| x < value)
                    }
                }
                Constraint::AllDifferent { vars } => vars
                    .iter()
                    .all(|&u| u == var || self.restrict(u, |x| x != value)),
                Constraint::Cardinality {
                    vars,
                    values_min,
                    values_max,
                    max,
                    ..
                } => {
                    let taken = vars
                        .iter()
                        .filter(|v| self.assignment[v.0] == Some(value))
                        .count();
                    !(*values_min..=*values_max).contains(&value)
                        || taken < *max
                        || vars.iter().all(|&u| self.restrict(u, |x| x != value))
                }
                Constraint::NotIn { .. } | Constraint::AnyPairTogether { .. } => true,
                Constraint::NotAllIn { vars, values } => self.prune_not_all_in(vars, values),
                Constraint::PairsAtMostOnce { groups } => {
                    self.prune_repeated_pairs(groups, var, value)
                }
                Constraint::PairsTogetherAtMost { groups, pairs, max } => {
                    self.prune_capped_pairs(groups, pairs, *max)
                }
                Constraint::ValuePrecedence { vars, first } => self.prune_precedence(vars, *first),
            };
            if !alive {
                return false;
            }
        }
        true
    }

    fn prune_not_all_in(&mut self, vars: &[VarId], values: &[i64]) -> bool {
        let free: Vec<VarId> = vars
            .iter()
            .copied()
            .filter(|v| self.assignment[v.0].is_none())
            .collect();
        let rest_inside = vars
            .iter()
            .filter_map(|v| self.assignment[v.0])
            .all(|x| values.contains(&x));
        match free.as_slice() {
            [last] if rest_inside => self.restrict(*last, |x| !values.contains(&x)),
            _ => true,
        }
    }

    /// Removes values that would make a pair meet in a second group.
    fn prune_repeated_pairs(&mut self, groups: &[Vec<VarId>], var: VarId, value: i64) -> bool {
        let assigned: Vec<Vec<i64>> = groups
            .iter()
            .map(|g| g.iter().filter_map(|v| self.assignment[v.0]).collect())
            .collect();

        for (gi, group) in groups.iter().enumerate() {
            if !group.contains(&var) {
                continue;
            }

            // a free slot here must not pair with anyone already met elsewhere
            let mut met: HashSet<i64> = HashSet::new();
            for &w in &assigned[gi] {
                for (gj, other) in assigned.iter().enumerate() {
                    if gj != gi && other.contains(&w) {
                        met.extend(other.iter().copied().filter(|&y| y != w));
                    }
                }
            }
            if !group.iter().all(|&u| self.restrict(u, |x| !met.contains(&x))) {
                return false;
            }

            // elsewhere, the pairs just formed must not be completed again
            let partners: Vec<i64> = assigned[gi].iter().copied().filter(|&w| w != value).collect();
            for (gj, other) in groups.iter().enumerate() {
                if gj == gi {
                    continue;
                }
                let mut banned: HashSet<i64> = HashSet::new();
                if assigned[gj].contains(&value) {
                    banned.extend(partners.iter().copied());
                }
                if partners.iter().any(|w| assigned[gj].contains(w)) {
                    banned.insert(value);
                }
                if !banned.is_empty()
                    && !other.iter().all(|&u| self.restrict(u, |x| !banned.contains(&x)))
                {
                    return false;
                }
            }
        }
        true
    }

    /// Once the cap is reached, no further listed pair may form anywhere.
    fn prune_capped_pairs(&mut self, groups: &[Vec<VarId>], pairs: &[(i64, i64)], max: usize) -> bool {
        if together_count(&self.assignment, groups, pairs) < max {
            return true;
        }
        let mut partners: HashMap<i64, Vec<i64>> = HashMap::new();
        for &(x, y) in pairs {
            partners.entry(x).or_default().push(y);
            partners.entry(y).or_default().push(x);
        }
        for group in groups {
            let banned: HashSet<i64> = group
                .iter()
                .filter_map(|v| self.assignment[v.0])
                .filter_map(|x| partners.get(&x))
                .flatten()
                .copied()
                .collect();
            if !banned.is_empty() && !group.iter().all(|&u| self.restrict(u, |x| !banned.contains(&x))) {
                return false;
            }
        }
        true
    }

    /// Drops values whose predecessor no earlier variable can take.
    fn prune_precedence(&mut self, vars: &[VarId], first: i64) -> bool {
        let mut reach: HashSet<i64> = HashSet::new();
        for &v in vars {
            let earlier = &reach;
            if !self.restrict(v, |x| x <= first || earlier.contains(&(x - 1))) {
                return false;
            }
            match self.assignment[v.0] {
                Some(x) => {
                    reach.insert(x);
                }
                None => reach.extend(self.domains[v.0].iter().copied()),
            }
        }
        true
    }

    /// Whether `constraint` can still be satisfied after `var = value`.
    fn holds(&self, constraint: &Constraint, var: VarId, value: i64) -> bool {
        let a = &self.assignment;
        match constraint {
            Constraint::Less { left, right } => match (a[left.0], a[right.0]) {
                (Some(l), Some(r)) => l < r,
                (Some(l), None) => self.domains[right.0].iter().any(|&r| l < r),
                (None, Some(r)) => self.domains[left.0].iter().any(|&l| l < r),
                (None, None) => true,
            },
            Constraint::AllDifferent { vars } => self.all_different_holds(vars, var, value),
            Constraint::Cardinality {
                vars,
                values_min,
                values_max,
                min,
                max,
            } => self.cardinality_holds(vars, *values_min, *values_max, *min, *max),
            Constraint::NotIn { values, .. } => !values.contains(&value),
            Constraint::NotAllIn { vars, values } => !vars
                .iter()
                .all(|v| matches!(a[v.0], Some(x) if values.contains(&x))),
            Constraint::PairsAtMostOnce { groups } => self.pairs_unique(groups, var, value),
            Constraint::AnyPairTogether { groups, pairs } => self.any_pair_reachable(groups, pairs),
            Constraint::PairsTogetherAtMost { groups, pairs, max } => {
                together_count(a, groups, pairs) <= *max
            }
            Constraint::ValuePrecedence { vars, first } => self.precedence_holds(vars, *first),
        }
    }

    fn all_different_holds(&self, vars: &[VarId], var: VarId, value: i64) -> bool {
        let a = &self.assignment;
        if vars.iter().any(|&other| other != var && a[other.0] == Some(value)) {
            return false;
        }
        // the free variables still need one distinct value each
        let taken: HashSet<i64> = vars.iter().filter_map(|v| a[v.0]).collect();
        let free: Vec<VarId> = vars.iter().copied().filter(|v| a[v.0].is_none()).collect();
        let open: HashSet<i64> = free
            .iter()
            .flat_map(|v| self.domains[v.0].iter().copied())
            .filter(|x| !taken.contains(x))
            .collect();
        open.len() >= free.len()
    }

    fn cardinality_holds(
        &self,
        vars: &[VarId],
        values_min: i64,
        values_max: i64,
        min: usize,
        max: usize,
    ) -> bool {
        let width = (values_max - values_min + 1) as usize;
        let mut counts = vec![0usize; width];
        let mut support = vec![0usize; width];
        let mut free = 0usize;
        for v in vars {
            match self.assignment[v.0] {
                Some(x) if (values_min..=values_max).contains(&x) => {
                    counts[(x - values_min) as usize] += 1;
                }
                Some(_) => {}
                None => {
                    free += 1;
                    for &x in &self.domains[v.0] {
                        if (values_min..=values_max).contains(&x) {
                            support[(x - values_min) as usize] += 1;
                        }
                    }
                }
            }
        }
        if counts.iter().any(|&c| c > max) {
            return false;
        }
        // each free variable can close at most one deficit
        let deficit: usize = counts.iter().map(|&c| min.saturating_sub(c)).sum();
        deficit <= free && counts.iter().zip(&support).all(|(&c, &s)| c + s >= min)
    }

    fn pairs_unique(&self, groups: &[Vec<VarId>], var: VarId, value: i64) -> bool {
        let a = &self.assignment;
        let has_value = |group: &Vec<VarId>, x: i64| group.iter().any(|v| a[v.0] == Some(x));

        for (gi, group) in groups.iter().enumerate() {
            if !group.contains(&var) {
                continue;
            }
            for other in group {
                let Some(w) = a[other.0] else { continue };
                if *other == var || w == value {
                    continue;
                }
                let repeated = groups
                    .iter()
                    .enumerate()
                    .any(|(gj, g)| gj != gi && has_value(g, value) && has_value(g, w));
                if repeated {
                    return false;
                }
            }
        }
        true
    }

    fn any_pair_reachable(&self, groups: &[Vec<VarId>], pairs: &[(i64, i64)]) -> bool {
        let a = &self.assignment;
        let summaries: Vec<(Vec<i64>, Vec<VarId>)> = groups
            .iter()
            .map(|group| {
                let assigned = group.iter().filter_map(|v| a[v.0]).collect();
                let free = group.iter().copied().filter(|v| a[v.0].is_none()).collect();
                (assigned, free)
            })
            .collect();
        let can_take = |v: VarId, x: i64| self.domains[v.0].contains(&x);

        pairs.iter().any(|&(x, y)| {
            summaries.iter().any(|(assigned, free)| {
                let has_x = assigned.contains(&x);
                let has_y = assigned.contains(&y);
                if has_x && has_y {
                    return true;
                }
                let need = usize::from(!has_x) + usize::from(!has_y);
                if free.len() < need {
                    return false;
                }
                let x_ok = has_x || free.iter().any(|&v| can_take(v, x));
                let y_ok = has_y || free.iter().any(|&v| can_take(v, y));
                x_ok && y_ok
            })
        })
    }

    fn precedence_holds(&self, vars: &[VarId], first: i64) -> bool {
        let mut reach: HashSet<i64> = HashSet::new();
        for v in vars {
            match self.assignment[v.0] {
                Some(x) => {
                    if x > first && !reach.contains(&(x - 1)) {
                        return false;
                    }
                    reach.insert(x);
                }
                None => reach.extend(self.domains[v.0].iter().copied()),
            }
        }
        true
    }
}

/// Listed pairs whose values are both assigned within one group.
fn together_count(assignment: &[Option<i64>], groups: &[Vec<VarId>], pairs: &[(i64, i64)]) -> usize {
    groups
        .iter()
        .map(|group| {
            let values: Vec<i64> = group.iter().filter_map(|v| assignment[v.0]).collect();
            pairs
                .iter()
                .filter(|(x, y)| values.contains(x) && values.contains(y))
                .count()
        })
        .sum()
}
