//! Coordinate descent over match orderings.

use super::badness::ZoneTally;
use super::config::BalanceConfig;
use crate::error::{Result, ScheduleError};
use crate::random::rng_from;
use crate::schedule::{Match, Schedule, Team};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

const IMPROVEMENT: f64 = 1e-12;

/// Result of a zone balancing run.
#[derive(Debug, Clone)]
pub struct BalanceResult {
    /// The best-scoring schedule observed.
    pub schedule: Schedule,

    /// Badness of `schedule`.
    pub badness: f64,

    /// Badness of the input.
    pub initial_badness: f64,

    /// Descent passes performed.
    pub passes: usize,

    /// Escape shuffles performed.
    pub escapes: usize,

    /// Best badness after each pass, starting with the input's.
    pub history: Vec<f64>,

    /// Indices of matches whose ordering differs from the input.
    pub modified: Vec<usize>,

    /// Whether cancelled externally.
    pub cancelled: bool,
}

/// Reorders teams within matches so each team's zone appearances are as
/// even as possible.
///
/// Match membership and match order are never changed.
///
/// # Examples
///
/// ```
/// use u_matchplan::balance::{BalanceConfig, ZoneBalancer};
/// use u_matchplan::schedule::Schedule;
///
/// let schedule = Schedule::new(vec![vec![0, 1], vec![0, 1]]);
/// let result = ZoneBalancer::run(&schedule, &BalanceConfig::default().with_seed(1)).unwrap();
/// assert!(result.badness < 1e-9);
/// assert_eq!(result.modified.len(), 1);
/// ```
pub struct ZoneBalancer;

impl ZoneBalancer {
    /// Runs the balancer.
    pub fn run(schedule: &Schedule, config: &BalanceConfig) -> Result<BalanceResult> {
        Self::run_with_cancel(schedule, config, None)
    }

    /// Runs the balancer with an optional cancellation token.
    ///
    /// The flag is checked between passes; a cancelled run still returns
    /// the best schedule seen so far.
    pub fn run_with_cancel(
        schedule: &Schedule,
        config: &BalanceConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<BalanceResult> {
        config
            .validate()
            .map_err(ScheduleError::InvalidParameters)?;

        let mut rng = rng_from(config.seed);
        let mut current: Vec<Match> = schedule.matches().to_vec();
        let mut tally = ZoneTally::new(&current);

        let initial_badness = tally.badness();
        let mut best = current.clone();
        let mut best_badness = initial_badness;
        let mut history = vec![best_badness];
        let mut passes = 0usize;
        let mut escapes = 0usize;
        let mut cancelled = false;

        info!(
            matches = current.len(),
            zones = tally.num_zones(),
            badness = initial_badness,
            "balancing zones"
        );

        while passes < config.max_passes && best_badness > config.epsilon {
            if let Some(ref flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
            }

            let mut changed = false;
            for i in 0..current.len() {
                if let Some(better) = best_ordering(&tally, &current[i], config) {
                    tally.apply(&current[i], &better);
                    current[i] = better;
                    changed = true;
                }
            }
            passes += 1;

            let badness = tally.badness();
            if badness < best_badness - IMPROVEMENT {
                best = current.clone();
                best_badness = badness;
            }
            history.push(best_badness);
            debug!(pass = passes, badness, best = best_badness, "balance pass");

            if !changed && best_badness > config.epsilon {
                // Local optimum: reshuffle with a probability that decays
                // as the budget runs out.
                let remaining = 1.0 - passes as f64 / config.max_passes as f64;
                let probability = remaining * remaining;
                for m in current.iter_mut() {
                    if rng.random_range(0.0..1.0) < probability {
                        let mut shuffled = m.clone();
                        shuffled.shuffle(&mut rng);
                        tally.apply(m, &shuffled);
                        *m = shuffled;
                    }
                }
                escapes += 1;
                debug!(pass = passes, probability, "balance escape");
            }
        }

        let modified = best
            .iter()
            .zip(schedule.matches())
            .enumerate()
            .filter(|(_, (after, before))| after != before)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        info!(
            passes,
            escapes,
            badness = best_badness,
            modified = modified.len(),
            "zone balancing finished"
        );

        Ok(BalanceResult {
            schedule: Schedule::new(best),
            badness: best_badness,
            initial_badness,
            passes,
            escapes,
            history,
            modified,
            cancelled,
        })
    }
}

/// The lowest-badness ordering of `current`, if strictly better.
///
/// Ties resolve to the earliest candidate so parallel and sequential
/// evaluation agree.
fn best_ordering(tally: &ZoneTally, current: &[Team], config: &BalanceConfig) -> Option<Match> {
    let candidates = if current.len() <= config.exhaustive_max_zones {
        permutations(current)
    } else {
        pairwise_swaps(current)
    };

    let score = |(i, candidate): (usize, &Match)| (tally.badness_if(current, candidate), i);
    let pick = |a: (f64, usize), b: (f64, usize)| {
        a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
    };
    let (badness, index) = if config.parallel {
        candidates.par_iter().enumerate().map(score).min_by(|a, b| pick(*a, *b))?
    } else {
        candidates.iter().enumerate().map(score).min_by(|a, b| pick(*a, *b))?
    };

    if badness < tally.badness() - IMPROVEMENT {
        candidates.into_iter().nth(index)
    } else {
        None
    }
}

/// Every ordering of `items` by Heap's algorithm, `items` first.
fn permutations(items: &[Team]) -> Vec<Match> {
    let n = items.len();
    let mut a = items.to_vec();
    let mut c = vec![0usize; n];
    let mut out = vec![a.clone()];
    let mut i = 1;
    while i < n {
        if c[i] < i {
            if i % 2 == 0 {
                a.swap(0, i);
            } else {
                a.swap(c[i], i);
            }
            out.push(a.clone());
            c[i] += 1;
            i = 1;
        } else {
            c[i] = 0;
            i += 1;
        }
    }
    out
}

/// `items` and every ordering one swap away from it.
fn pairwise_swaps(items: &[Team]) -> Vec<Match> {
    let n = items.len();
    let mut out = vec![items.to_vec()];
    for i in 0..n {
        for j in i + 1..n {
            let mut swapped = items.to_vec();
            swapped.swap(i, j);
            out.push(swapped);
        }
    }
    out
}
