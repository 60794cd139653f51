//! End-to-end planning: build, coalesce, balance, validate.

use crate::balance::{BalanceConfig, BalanceResult, ZoneBalancer};
use crate::cache::{build_cached, NoCache, ProtoRoundCache};
use crate::coalesce::{CoalesceConfig, RoundCoalescer};
use crate::cp::SolverConfig;
use crate::error::{Result, ScheduleError};
use crate::proto::ProtoRoundBuilder;
use crate::schedule::{Params, ProtoRound, Schedule};
use crate::validate::{Pipeline, Report, ValidatorConfig};
use tracing::info;

/// Where the schedule comes from.
#[derive(Debug, Clone, Default)]
pub enum PlanMode {
    /// Solve (or load) a proto-round and coalesce it.
    #[default]
    Generate,

    /// Coalesce a given proto-round instead of solving one.
    ProtoOverride(ProtoRound),

    /// Balance and validate an existing schedule.
    Rebalance(Schedule),
}

/// One planning job.
///
/// # Examples
///
/// ```
/// use u_matchplan::planner::PlanRequest;
///
/// let request = PlanRequest::new(12, 3).with_zones(4).with_spacing(1);
/// assert_eq!(request.params().num_matches(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub num_teams: usize,
    pub rounds: usize,
    pub appearances: usize,
    pub zones: usize,
    pub spacing: usize,
    pub mode: PlanMode,

    /// Skip the zone balancer.
    pub skip_balance: bool,
}

impl Default for PlanRequest {
    /// Twelve teams over three rounds of three four-team matches.
    fn default() -> Self {
        Self::new(12, 3)
    }
}

impl PlanRequest {
    /// A request with one appearance per round, 4 zones and spacing 1.
    pub fn new(num_teams: usize, rounds: usize) -> Self {
        Self {
            num_teams,
            rounds,
            appearances: 1,
            zones: 4,
            spacing: 1,
            mode: PlanMode::Generate,
            skip_balance: false,
        }
    }

    pub fn with_appearances(mut self, appearances: usize) -> Self {
        self.appearances = appearances;
        self
    }

    pub fn with_zones(mut self, zones: usize) -> Self {
        self.zones = zones;
        self
    }

    pub fn with_spacing(mut self, spacing: usize) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_mode(mut self, mode: PlanMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_skip_balance(mut self, skip: bool) -> Self {
        self.skip_balance = skip;
        self
    }

    pub fn params(&self) -> Params {
        Params::new(self.num_teams, self.appearances, self.zones, self.spacing)
    }
}

/// A finished plan.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub schedule: Schedule,
    pub report: Report,

    /// `None` when balancing was skipped.
    pub balance: Option<BalanceResult>,
}

impl PlanOutcome {
    /// Process exit status: 0 when validation passes, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.report.is_failure() {
            1
        } else {
            0
        }
    }
}

/// Runs every stage of schedule generation with one set of configs.
///
/// # Examples
///
/// ```
/// use u_matchplan::planner::{PlanRequest, Planner};
///
/// let planner = Planner::new().with_seed(7);
/// let outcome = planner.plan(&PlanRequest::new(12, 3)).unwrap();
/// assert_eq!(outcome.schedule.len(), 9);
/// assert!(outcome.report.with_code("rerun").next().is_none());
/// ```
pub struct Planner {
    builder: ProtoRoundBuilder,
    coalesce: CoalesceConfig,
    balance: BalanceConfig,
    validator: ValidatorConfig,
    cache: Box<dyn ProtoRoundCache>,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner {
    /// Default configs and no proto-round cache.
    pub fn new() -> Self {
        Self {
            builder: ProtoRoundBuilder::new(),
            coalesce: CoalesceConfig::default(),
            balance: BalanceConfig::default(),
            validator: ValidatorConfig::default(),
            cache: Box::new(NoCache),
        }
    }

    pub fn with_proto_solver(mut self, config: SolverConfig) -> Self {
        self.builder = ProtoRoundBuilder::new().with_config(config);
        self
    }

    pub fn with_coalesce(mut self, config: CoalesceConfig) -> Self {
        self.coalesce = config;
        self
    }

    pub fn with_balance(mut self, config: BalanceConfig) -> Self {
        self.balance = config;
        self
    }

    /// Thresholds for validation. Spacing is always taken from the request.
    pub fn with_validator(mut self, config: ValidatorConfig) -> Self {
        self.validator = config;
        self
    }

    pub fn with_cache(mut self, cache: impl ProtoRoundCache + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }

    /// Seeds both the coalescer and the balancer.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.coalesce = self.coalesce.with_seed(seed);
        self.balance = self.balance.with_seed(seed);
        self
    }

    /// Produces, balances and validates a schedule.
    ///
    /// # Errors
    ///
    /// Any generation failure, including a [`PlanMode::ProtoOverride`]
    /// proto-round that does not fit the request. Validation findings never
    /// turn into errors; they are in [`PlanOutcome::report`].
    pub fn plan(&self, request: &PlanRequest) -> Result<PlanOutcome> {
        self.validator
            .validate()
            .map_err(ScheduleError::InvalidParameters)?;

        let schedule = match &request.mode {
            PlanMode::Generate => {
                let params = request.params();
                if request.rounds == 0 {
                    return Err(ScheduleError::InvalidParameters(
                        "rounds must be positive".into(),
                    ));
                }
                let proto = build_cached(&self.builder, self.cache.as_ref(), &params)?;
                self.coalesce_rounds(&proto, request)?
            }
            PlanMode::ProtoOverride(proto) => {
                proto.verify(&request.params())?;
                self.coalesce_rounds(proto, request)?
            }
            PlanMode::Rebalance(schedule) => schedule.clone(),
        };

        let (schedule, balance) = if request.skip_balance {
            (schedule, None)
        } else {
            let result = ZoneBalancer::run(&schedule, &self.balance)?;
            (result.schedule.clone(), Some(result))
        };

        let validator = self.validator.clone().with_spacing(request.spacing);
        let report = Pipeline::standard(&validator).run_schedule(&schedule);
        info!(
            matches = schedule.len(),
            warnings = report.warnings.len(),
            errors = report.errors.len(),
            "plan finished"
        );

        Ok(PlanOutcome {
            schedule,
            report,
            balance,
        })
    }

    fn coalesce_rounds(&self, proto: &ProtoRound, request: &PlanRequest) -> Result<Schedule> {
        RoundCoalescer::new(self.coalesce.clone()).coalesce(proto, request.rounds, request.spacing)
    }
}
