//! Constraint Programming (CP) framework.
//!
//! Provides a small finite-domain model for expressing assignment problems
//! over integer variables, and a solver interface that returns either a
//! satisfying valuation or a definitive "no valuation exists".
//!
//! # Key Components
//!
//! - **Variables**: [`IntVar`] with declared bounds, referenced by [`VarId`]
//! - **Constraints**: [`Constraint`]: strict order, all-different,
//!   cardinality, domain exclusion, pairwise group conditions
//! - **Model**: [`CpModel`]: container for variables and constraints
//! - **Solver**: [`CpSolver`] trait and the bundled [`BacktrackingSolver`]
//!
//! # Design
//!
//! The [`CpSolver`] trait is the seam: any exhaustive search, SAT or SMT
//! backend that honors the contract can stand in for the bundled solver.
//! Solvers never relax constraints. Heuristic steering is expressed by the
//! caller as additional constraints.
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod model;
mod solver;
mod variables;

pub use model::{Constraint, CpModel};
pub use solver::{BacktrackingSolver, CpSolution, CpSolver, SolverConfig, SolverStatus, ValueOrder};
pub use variables::{IntVar, VarId};
