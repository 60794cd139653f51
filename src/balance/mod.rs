//! Zone balancing.
//!
//! Teams in a match are interchangeable as far as the draw is concerned,
//! but not as far as the zones are: every team should start from each
//! zone about equally often. The balancer permutes teams within each
//! match, never across matches, to minimize the entropy gap
//!
//! ```text
//! badness = ln K - H(p),   p = ZoneAppearanceCount / N
//! ```
//!
//! over the (occurring team × zone) grid of `K` cells.

mod badness;
mod config;
mod runner;

pub use badness::{badness, ZoneTally};
pub use config::BalanceConfig;
pub use runner::{BalanceResult, ZoneBalancer};
