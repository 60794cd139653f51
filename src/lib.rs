//! Fair multi-round match schedule generation.
//!
//! Schedules `T` teams into matches of `Z` zones over `R` rounds so that
//! every team plays equally often, rests between appearances, meets a
//! balanced mix of opponents and starts from each zone about equally often.
//!
//! - **Proto-round** ([`proto`]): one round's match pattern over placeholder
//!   teams, found by constraint search.
//! - **Coalescing** ([`coalesce`]): relabels the proto-round round by round,
//!   keeping spacing across round boundaries, avoiding repeated matches and
//!   steering toward pairs that have rarely met.
//! - **Zone balancing** ([`balance`]): permutes teams within each match to
//!   flatten the team × zone distribution.
//! - **Validation** ([`validate`]): an ordered pipeline of rules producing
//!   warnings and errors.
//! - **CP** ([`cp`]): the finite-domain modeling vocabulary and the
//!   backtracking solver behind the first two stages.
//!
//! [`planner::Planner`] runs the stages end to end; [`format`] reads and
//! writes the textual match format and [`cache`] keeps solved proto-rounds
//! between runs.
//!
//! # Architecture
//!
//! Generation is synchronous and deterministic for a given seed. Every
//! search is bounded; running out of budget is reported separately from
//! proven infeasibility. Nothing here installs a `tracing` subscriber.

pub mod balance;
pub mod cache;
pub mod coalesce;
pub mod cp;
pub mod error;
pub mod format;
pub mod planner;
pub mod proto;
pub mod random;
pub mod schedule;
pub mod validate;

pub use error::{ConstraintClass, Result, ScheduleError};
