//! Multi-round schedule construction from a proto-round.
//!
//! Each round `r > 0` is the proto-round relabeled by a bijection
//! `π_r: pseudo → real`. Rounds are solved one at a time against an
//! explicit [`CoalesceState`] holding the confirmed matches, the set of
//! team sets already played and the pairwise facing counts.
//!
//! Per-round constraints:
//!
//! - **Boundary spacing**: the first `S` matches of the round share no
//!   team with the last `S` confirmed matches.
//! - **No rerun**: no match repeats a confirmed team set.
//! - **Facing band**: at least one of the least-faced pairs plays
//!   together in the round, and no pair already `facing_tolerance` above
//!   the least-faced count plays together again. Among valid rounds the
//!   exact strategy keeps pairs one short of that ceiling apart as far as
//!   it can.
//!
//! When a round has no valid bijection the classes are added back one at a
//! time to name the first that cannot be met.

mod config;
mod runner;
mod state;

pub use config::{CoalesceConfig, CoalesceStrategy};
pub use runner::{bijection_model, FacingBand, RoundCoalescer};
pub use state::CoalesceState;
