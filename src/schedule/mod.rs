//! Schedule data model.
//!
//! - [`ProtoRound`]: one round's abstract pattern over pseudo-team ids
//! - [`Schedule`]: the flat, ordered concatenation of realized rounds
//! - [`FacingCount`]: how often each pair of teams has met
//! - [`Params`]: `(teams, appearances, zones, spacing)`, also the cache key

mod facing;
mod types;

pub use facing::FacingCount;
pub use types::{appearance_counts, team_set, Match, Params, ProtoRound, Schedule, Team, Zone};
