//! Solver interface: configuration, verdicts and solutions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::model::{CpModel, Term, VarId};

/// Terminal verdict of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    /// Objective proven minimal.
    Optimal,
    /// Solution found; optimality not proven before the deadline.
    Feasible,
    /// Proven that no solution exists.
    Infeasible,
    /// No solution found before the deadline, infeasibility not proven.
    Unknown,
}

impl SolverStatus {
    /// Whether a solution is attached.
    #[inline]
    pub fn is_solution_found(self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }
}

/// Number of worker threads when none is configured: one per core.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Search budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock deadline for the whole search.
    pub time_limit: Duration,
    /// Parallel search workers.
    pub num_workers: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(20),
            num_workers: default_workers(),
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }
}

/// Search statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    pub elapsed: Duration,
    /// Workers that searched.
    pub workers: usize,
    /// Search strategy whose result was kept.
    pub strategy: String,
}

/// Result of a solve: verdict, variable values and statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpSolution {
    pub status: SolverStatus,
    /// Objective value of the attached solution.
    pub objective: Option<i64>,
    pub stats: SolverStats,
    values: Vec<i64>,
}

impl CpSolution {
    /// Creates a solution with values.
    pub fn new(status: SolverStatus, values: Vec<i64>, objective: Option<i64>, stats: SolverStats) -> Self {
        Self {
            status,
            objective,
            stats,
            values,
        }
    }

    /// Creates a verdict without values (`Infeasible` / `Unknown`).
    pub fn without_values(status: SolverStatus, stats: SolverStats) -> Self {
        Self::new(status, Vec::new(), None, stats)
    }

    pub fn is_solution_found(&self) -> bool {
        self.status.is_solution_found()
    }

    /// Value of a variable, if a solution is attached.
    pub fn value(&self, var: VarId) -> Option<i64> {
        self.values.get(var.index()).copied()
    }

    /// Value of a term; constants always evaluate.
    pub fn term_value(&self, term: Term) -> Option<i64> {
        match term {
            Term::Var(v) => self.value(v),
            Term::Const(c) => Some(c),
        }
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }
}

/// A constraint-programming engine.
///
/// Implementations must treat the model as read-only and must return a
/// terminal verdict no later than shortly after `config.time_limit`.
pub trait CpSolver: Send + Sync {
    /// Human-readable solver name.
    fn name(&self) -> &str;

    /// Solves the model within the configured budget.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_solution_found() {
        assert!(SolverStatus::Optimal.is_solution_found());
        assert!(SolverStatus::Feasible.is_solution_found());
        assert!(!SolverStatus::Infeasible.is_solution_found());
        assert!(!SolverStatus::Unknown.is_solution_found());
    }

    #[test]
    fn test_config_builder() {
        let c = SolverConfig::default()
            .with_time_limit(Duration::from_millis(250))
            .with_workers(3);
        assert_eq!(c.time_limit, Duration::from_millis(250));
        assert_eq!(c.num_workers, 3);
        assert!(SolverConfig::default().num_workers >= 1);
        assert_eq!(SolverConfig::default().num_workers, default_workers());
    }

    #[test]
    fn test_solution_accessors() {
        let mut m = CpModel::new("m", 10);
        let x = m.new_int_var(0, 10, "x");
        let sol = CpSolution::new(SolverStatus::Optimal, vec![4], Some(4), SolverStats::default());
        assert_eq!(sol.value(x), Some(4));
        assert_eq!(sol.term_value(Term::Const(9)), Some(9));
        assert!(sol.is_solution_found());

        let none = CpSolution::without_values(SolverStatus::Unknown, SolverStats::default());
        assert_eq!(none.value(x), None);
        assert!(!none.is_solution_found());
    }
}
