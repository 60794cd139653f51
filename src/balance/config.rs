//! Zone balancer configuration.

/// Configuration for the zone balancer.
///
/// # Examples
///
/// ```
/// use u_matchplan::balance::BalanceConfig;
///
/// let config = BalanceConfig::default()
///     .with_max_passes(50)
///     .with_parallel(true)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct BalanceConfig {
    /// Upper bound on descent passes over the schedule.
    pub max_passes: usize,

    /// Badness at or below which the schedule counts as balanced.
    pub epsilon: f64,

    /// Largest zone count for which every ordering of a match is tried.
    ///
    /// Wider matches only try swapping two teams.
    pub exhaustive_max_zones: usize,

    /// Whether to score the orderings of a match in parallel using rayon.
    pub parallel: bool,

    /// Random seed for the escape shuffles.
    pub seed: Option<u64>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            max_passes: 100,
            epsilon: 1e-9,
            exhaustive_max_zones: 6,
            parallel: false,
            seed: None,
        }
    }
}

impl BalanceConfig {
    pub fn with_max_passes(mut self, n: usize) -> Self {
        self.max_passes = n;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_exhaustive_max_zones(mut self, zones: usize) -> Self {
        self.exhaustive_max_zones = zones;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_passes == 0 {
            return Err("max_passes must be positive".into());
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(format!("epsilon must be finite and non-negative, got {}", self.epsilon));
        }
        if self.exhaustive_max_zones == 0 {
            return Err("exhaustive_max_zones must be positive".into());
        }
        Ok(())
    }
}
