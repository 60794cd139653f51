//! CP model definition.

use super::variables::{IntVar, VarId};
use std::collections::HashSet;

/// A constraint in the CP model.
///
/// The vocabulary covers what assignment problems over small integer
/// domains need: strict order, global distinctness, cardinality, domain
/// exclusion, and pairwise group conditions. Anything fancier (steering,
/// relaxation) is expressed by the caller through these.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Strict order: `left < right`.
    Less { left: VarId, right: VarId },

    /// All variables take pairwise distinct values.
    AllDifferent { vars: Vec<VarId> },

    /// Global cardinality.
    ///
    /// Every value in `values_min..=values_max` is taken by between
    /// `min` and `max` of `vars`.
    Cardinality {
        vars: Vec<VarId>,
        values_min: i64,
        values_max: i64,
        min: usize,
        max: usize,
    },

    /// `var` takes none of `values`.
    NotIn { var: VarId, values: Vec<i64> },

    /// Not every variable in `vars` takes a value from `values`.
    ///
    /// With distinct variables and `vars.len() == values.len()`, this
    /// forbids the variables from spelling out exactly the set `values`.
    NotAllIn { vars: Vec<VarId>, values: Vec<i64> },

    /// No unordered pair of values occurs together in more than one group.
    PairsAtMostOnce { groups: Vec<Vec<VarId>> },

    /// At least one of `pairs` occurs together within some group.
    AnyPairTogether {
        groups: Vec<Vec<VarId>>,
        pairs: Vec<(i64, i64)>,
    },

    /// At most `max` of `pairs` occur together, counted over all groups.
    ///
    /// With `max == 0` no listed pair may ever share a group.
    PairsTogetherAtMost {
        groups: Vec<Vec<VarId>>,
        pairs: Vec<(i64, i64)>,
        max: usize,
    },

    /// Values above `first` are introduced in order along `vars`.
    ///
    /// A variable may take `x > first` only if `x - 1` is taken by some
    /// earlier variable in `vars`. Breaks the symmetry of interchangeable
    /// values.
    ValuePrecedence { vars: Vec<VarId>, first: i64 },
}

impl Constraint {
    /// Every variable this constraint reads, deduplicated.
    pub fn scope(&self) -> Vec<VarId> {
        let mut vars: Vec<VarId> = match self {
            Constraint::Less { left, right } => vec![*left, *right],
            Constraint::AllDifferent { vars }
            | Constraint::Cardinality { vars, .. }
            | Constraint::NotAllIn { vars, .. }
            | Constraint::ValuePrecedence { vars, .. } => vars.clone(),
            Constraint::NotIn { var, .. } => vec![*var],
            Constraint::PairsAtMostOnce { groups }
            | Constraint::AnyPairTogether { groups, .. }
            | Constraint::PairsTogetherAtMost { groups, .. } => groups.iter().flatten().copied().collect(),
        };
        vars.sort_unstable();
        vars.dedup();
        vars
    }
}

/// A constraint programming model.
///
/// Contains integer variables and a conjunction of constraints. There is
/// no objective: solvers look for any satisfying valuation.
///
/// # Examples
///
/// ```
/// use u_matchplan::cp::{CpModel, IntVar};
///
/// let mut model = CpModel::new("example");
/// let x = model.add_int_var(IntVar::new("x", 0, 3));
/// let y = model.add_int_var(IntVar::new("y", 0, 3));
/// model.add_less(x, y);
/// model.add_all_different(vec![x, y]);
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Integer variables, indexed by [`VarId`].
    pub vars: Vec<IntVar>,
    /// Constraints.
    pub constraints: Vec<Constraint>,
}

impl CpModel {
    /// Creates a new empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Adds an integer variable and returns its handle.
    pub fn add_int_var(&mut self, var: IntVar) -> VarId {
        self.vars.push(var);
        VarId(self.vars.len() - 1)
    }

    /// Returns the variable behind a handle.
    pub fn var(&self, id: VarId) -> &IntVar {
        &self.vars[id.0]
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Convenience: add `left < right`.
    pub fn add_less(&mut self, left: VarId, right: VarId) {
        self.constraints.push(Constraint::Less { left, right });
    }

    /// Convenience: add an all-different constraint.
    pub fn add_all_different(&mut self, vars: Vec<VarId>) {
        self.constraints.push(Constraint::AllDifferent { vars });
    }

    /// Convenience: every value in range occurs exactly `count` times.
    pub fn add_exact_cardinality(
        &mut self,
        vars: Vec<VarId>,
        values_min: i64,
        values_max: i64,
        count: usize,
    ) {
        self.constraints.push(Constraint::Cardinality {
            vars,
            values_min,
            values_max,
            min: count,
            max: count,
        });
    }

    /// Convenience: forbid `values` for `var`.
    pub fn add_not_in(&mut self, var: VarId, values: Vec<i64>) {
        self.constraints.push(Constraint::NotIn { var, values });
    }

    /// Convenience: forbid `vars` from all landing in `values`.
    pub fn add_not_all_in(&mut self, vars: Vec<VarId>, values: Vec<i64>) {
        self.constraints.push(Constraint::NotAllIn { vars, values });
    }

    /// Convenience: forbid every pair in `pairs` from sharing a group.
    pub fn add_pairs_apart(&mut self, groups: Vec<Vec<VarId>>, pairs: Vec<(i64, i64)>) {
        self.constraints.push(Constraint::PairsTogetherAtMost {
            groups,
            pairs,
            max: 0,
        });
    }

    /// Validates the model for consistency.
    ///
    /// Checks that all referenced variables exist, that names are unique,
    /// and that constraint parameters make sense.
    pub fn validate(&self) -> Result<(), String> {
        let mut names = HashSet::new();
        for var in &self.vars {
            if !names.insert(var.name.as_str()) {
                return Err(format!("duplicate variable name: {}", var.name));
            }
            if var.domain_size() == 0 {
                return Err(format!("empty domain: {}", var.name));
            }
        }

        for constraint in &self.constraints {
            for id in constraint.scope() {
                if id.0 >= self.vars.len() {
                    return Err(format!("undefined variable: #{}", id.0));
                }
            }
            match constraint {
                Constraint::Less { left, right } if left == right => {
                    return Err(format!("less: variable #{} compared to itself", left.0));
                }
                Constraint::Cardinality {
                    values_min,
                    values_max,
                    min,
                    max,
                    ..
                } => {
                    if values_min > values_max {
                        return Err("cardinality: empty value range".into());
                    }
                    if min > max {
                        return Err(format!("cardinality: min {min} exceeds max {max}"));
                    }
                }
                Constraint::AnyPairTogether { pairs, .. } => {
                    if pairs.iter().any(|(a, b)| a == b) {
                        return Err("any-pair-together: pair of identical values".into());
                    }
                }
                Constraint::PairsTogetherAtMost { pairs, .. } => {
                    if pairs.iter().any(|(a, b)| a == b) {
                        return Err("pairs-together-at-most: pair of identical values".into());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns the number of variables.
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Returns the number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}
