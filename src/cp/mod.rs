//! Constraint-programming layer.
//!
//! A small CP model sized for resource-constrained project scheduling:
//! integer variables, fixed-size interval variables, difference
//! constraints (`lhs >= rhs + offset`), a no-overlap-on-tracks capacity
//! constraint and a minimize-max objective.
//!
//! [`CpSolver`] is the engine seam; [`PumpkinSolver`] posts the model into
//! `pumpkin-solver` and turns its answer into concrete tracks.
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

mod model;
mod pumpkin;
mod solver;
mod tracks;

pub use model::{
    CpConstraint, CpModel, IntVar, IntervalId, IntervalVar, Objective, Term, TrackMember, VarId,
};
pub use pumpkin::PumpkinSolver;
pub use solver::{default_workers, CpSolution, CpSolver, SolverConfig, SolverStats, SolverStatus};
