//! Solver invocation.
//!
//! Submits a built model to a [`CpSolver`] under a wall-clock deadline and
//! collects the verdict together with diagnostics describing what was
//! submitted. The verdict is mapped to a result by the optimizer:
//!
//! | Verdict | Result |
//! |---------|--------|
//! | `OPTIMAL` | schedule |
//! | `FEASIBLE` | schedule flagged as not proven optimal |
//! | `INFEASIBLE` | [`ScheduleError::ModelInfeasible`](crate::ScheduleError::ModelInfeasible) |
//! | `UNKNOWN` | [`ScheduleError::SolveTimedOut`](crate::ScheduleError::SolveTimedOut) |

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::builder::{BuiltModel, GroupSummary, ModeledLink, SkippedLink};
use crate::cp::{CpSolution, CpSolver, SolverConfig, SolverStatus};

/// Deadline and parallelism for one solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveBudget {
    pub deadline: Duration,
    pub workers: usize,
}

impl Default for SolveBudget {
    fn default() -> Self {
        let defaults = SolverConfig::default();
        Self {
            deadline: defaults.time_limit,
            workers: defaults.num_workers,
        }
    }
}

impl SolveBudget {
    pub fn new(deadline: Duration, workers: usize) -> Self {
        Self { deadline, workers }
    }

    fn solver_config(&self) -> SolverConfig {
        SolverConfig::default()
            .with_time_limit(self.deadline)
            .with_workers(self.workers.max(1))
    }
}

/// What was submitted and how the solver ended.
///
/// Attached to solver-terminal errors so a caller can retry with another
/// pool size or scenario, or find the link that made the model infeasible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    pub scenario: String,
    /// Default tracks per group (`N`).
    pub pool_size: i64,
    /// Tracks and members per group, as submitted.
    pub groups: Vec<GroupSummary>,
    pub free_tasks: usize,
    /// Encoded links with their lags in work units.
    pub links: Vec<ModeledLink>,
    /// Links left out, with the reason.
    pub skipped_links: Vec<SkippedLink>,
    pub release: i64,
    pub horizon: i64,
    pub status: SolverStatus,
    pub elapsed: Duration,
}

impl ModelDiagnostics {
    /// Tracks of a group by name.
    pub fn tracks_of(&self, group: &str) -> Option<i64> {
        self.groups.iter().find(|g| g.name == group).map(|g| g.tracks)
    }
}

impl fmt::Display for ModelDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} after {:.1}s ({} scenario, N={}, {} free tasks, {} links, {} skipped, release {}, horizon {})",
            self.status,
            self.elapsed.as_secs_f64(),
            self.scenario,
            self.pool_size,
            self.free_tasks,
            self.links.len(),
            self.skipped_links.len(),
            self.release,
            self.horizon
        )?;
        for g in &self.groups {
            write!(f, "; {}: {} tracks, {} tasks", g.name, g.tracks, g.members)?;
            if g.fixed_members > 0 {
                write!(f, " ({} in progress)", g.fixed_members)?;
            }
        }
        Ok(())
    }
}

/// Verdict, solution values and diagnostics of one solve.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub solution: CpSolution,
    pub diagnostics: ModelDiagnostics,
}

impl SolveReport {
    #[inline]
    pub fn status(&self) -> SolverStatus {
        self.solution.status
    }
}

/// Submits a built model and waits for a terminal verdict.
pub fn solve_model<S: CpSolver + ?Sized>(
    built: &BuiltModel,
    solver: &S,
    budget: &SolveBudget,
) -> SolveReport {
    let config = budget.solver_config();
    debug!(
        solver = solver.name(),
        deadline_secs = config.time_limit.as_secs_f64(),
        workers = config.num_workers,
        "submitting model"
    );

    let solution = solver.solve(&built.model, &config);

    if solution.is_solution_found() {
        debug_assert!(
            built.model.violations(solution.values()).is_empty(),
            "solver returned an invalid assignment: {:?}",
            built.model.violations(solution.values())
        );
    }

    let diagnostics = ModelDiagnostics {
        scenario: built.scenario.clone(),
        pool_size: built.pool_size,
        groups: built.groups.clone(),
        free_tasks: built.free_count(),
        links: built.links.clone(),
        skipped_links: built.skipped_links.clone(),
        release: built.release,
        horizon: built.horizon,
        status: solution.status,
        elapsed: solution.stats.elapsed,
    };

    info!(
        status = ?solution.status,
        objective = solution.objective,
        elapsed_ms = solution.stats.elapsed.as_millis() as u64,
        strategy = %solution.stats.strategy,
        "solve finished"
    );

    SolveReport {
        solution,
        diagnostics,
    }
}
