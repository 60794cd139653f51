//! Proto-round construction.
//!
//! A proto-round is a single round's match pattern over placeholder
//! ("pseudo") team ids. It is found once per `(teams, appearances, zones,
//! spacing)` by a constraint search and then reused for every round by
//! relabeling (see [`crate::coalesce`]).
//!
//! Constraints on the slot assignment `slot[m][z] ∈ [0, T)`:
//!
//! 1. Range
//! 2. Canonical order: `slot[m][0] < … < slot[m][Z-1]`
//! 3. Each pseudo-team appears exactly A times
//! 4. Spacing windows of `S+1` matches (when `S > 0` and `A > 1`)
//! 5. Each pair faces at most once (when `A > 1`)

mod builder;

pub use builder::{build_model, ProtoRoundBuilder};
