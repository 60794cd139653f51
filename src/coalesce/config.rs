//! Coalescer configuration and policy constants.

use crate::cp::{SolverConfig, ValueOrder};

/// How each round's bijection is searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoalesceStrategy {
    /// Constraint search per round. Infeasibility is definitive.
    #[default]
    Exact,

    /// Shuffle the team list and accept the first relabeling that keeps
    /// spacing, avoids reruns and keeps the facing gap within tolerance.
    ///
    /// Running out of attempts is a budget failure, not infeasibility.
    RandomRestart {
        /// Shuffles tried per round.
        attempts: usize,
    },
}

/// Configuration for the round coalescer.
///
/// # Examples
///
/// ```
/// use u_matchplan::coalesce::{CoalesceConfig, CoalesceStrategy};
///
/// let config = CoalesceConfig::default()
///     .with_strategy(CoalesceStrategy::RandomRestart { attempts: 10_000 })
///     .with_facing_tolerance(2)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CoalesceConfig {
    /// Search strategy.
    pub strategy: CoalesceStrategy,

    /// Fraction of pairs, lowest facing count first, treated as deficient.
    ///
    /// Every pair tied with the cutoff count is included as well.
    pub deficit_fraction: f64,

    /// Largest acceptable `max - min` facing gap, enforced after every round.
    pub facing_tolerance: usize,

    /// Budget and value order for each exact round solve.
    pub solver: SolverConfig,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for CoalesceConfig {
    fn default() -> Self {
        Self {
            strategy: CoalesceStrategy::default(),
            deficit_fraction: 0.05,
            facing_tolerance: 2,
            solver: SolverConfig::default().with_value_order(ValueOrder::Shuffled),
            seed: None,
        }
    }
}

impl CoalesceConfig {
    pub fn with_strategy(mut self, strategy: CoalesceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_deficit_fraction(mut self, fraction: f64) -> Self {
        self.deficit_fraction = fraction;
        self
    }

    pub fn with_facing_tolerance(mut self, tolerance: usize) -> Self {
        self.facing_tolerance = tolerance;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.deficit_fraction > 0.0 && self.deficit_fraction <= 1.0) {
            return Err(format!(
                "deficit_fraction must be in (0, 1], got {}",
                self.deficit_fraction
            ));
        }
        if let CoalesceStrategy::RandomRestart { attempts: 0 } = self.strategy {
            return Err("random restart needs at least one attempt".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoalesceConfig::default();
        assert_eq!(config.strategy, CoalesceStrategy::Exact);
        assert!((config.deficit_fraction - 0.05).abs() < 1e-12);
        assert_eq!(config.facing_tolerance, 2);
        assert_eq!(config.solver.value_order, ValueOrder::Shuffled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_fraction() {
        assert!(CoalesceConfig::default().with_deficit_fraction(0.0).validate().is_err());
        assert!(CoalesceConfig::default().with_deficit_fraction(1.5).validate().is_err());
    }

    #[test]
    fn test_validate_zero_attempts() {
        let config = CoalesceConfig::default()
            .with_strategy(CoalesceStrategy::RandomRestart { attempts: 0 });
        assert!(config.validate().is_err());
    }
}
