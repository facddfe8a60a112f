//! Error and warning types for an optimization run.
//!
//! Errors block a run. Validation-class errors (`Calendar`,
//! `InconsistentState`, `InvalidCapacity`, `Config`, `InvalidModel`) are
//! raised before anything is submitted to the solver. Solver-terminal
//! errors (`ModelInfeasible`, `SolveTimedOut`) carry [`ModelDiagnostics`]
//! so a caller can retry with a different pool size or scenario.
//!
//! Warnings never block a run; they are accumulated and returned next to
//! the successful schedule.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::output::OptimizedSchedule;
use crate::solve::ModelDiagnostics;
use crate::validation::ValidationError;

/// Errors produced by the optimization pipeline.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// The working-time rate is missing or unusable.
    #[error("calendar error: {0}")]
    Calendar(String),

    /// A task's completion state contradicts its dates.
    #[error("inconsistent state for task '{task_id}': {detail}")]
    InconsistentState { task_id: String, detail: String },

    /// Non-positive pool size or an empty track domain.
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),

    /// Configuration rejected before model construction.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Structural problems found in the normalized schedule model.
    #[error("invalid schedule model: {}", summarize(.0))]
    InvalidModel(Vec<ValidationError>),

    /// The solver proved that no assignment satisfies all constraints.
    #[error("model infeasible: {0}")]
    ModelInfeasible(Box<ModelDiagnostics>),

    /// The deadline elapsed without a proven optimum.
    ///
    /// `best` holds the best schedule found, if any (a `Feasible` verdict
    /// the caller chose not to accept).
    #[error("solve timed out: {diagnostics}")]
    SolveTimedOut {
        diagnostics: Box<ModelDiagnostics>,
        best: Option<Box<OptimizedSchedule>>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ScheduleError {
    pub(crate) fn inconsistent(task_id: &str, detail: impl Into<String>) -> Self {
        Self::InconsistentState {
            task_id: task_id.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether this error was raised before any solver submission.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Calendar(_)
                | Self::InconsistentState { .. }
                | Self::InvalidCapacity(_)
                | Self::Config(_)
                | Self::InvalidModel(_)
        )
    }

    /// Diagnostics attached to a solver-terminal error.
    pub fn diagnostics(&self) -> Option<&ModelDiagnostics> {
        match self {
            Self::ModelInfeasible(d) => Some(d),
            Self::SolveTimedOut { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Non-fatal findings accumulated during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleWarning {
    /// Sub-crew scenario: the task has no grouping key. It is still
    /// scheduled by precedence but occupies no track.
    UngroupableTask { task_id: String },
    /// A relationship endpoint is outside the optimized set.
    DanglingRelationship {
        predecessor: String,
        successor: String,
        reason: String,
    },
    /// A second link between the same pair of tasks was discarded.
    DuplicateRelationship {
        predecessor: String,
        successor: String,
    },
    /// The precedence graph has a cycle through this task.
    PrecedenceCycle { task_id: String },
}

impl fmt::Display for ScheduleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UngroupableTask { task_id } => {
                write!(f, "task '{task_id}' has no grouping key; excluded from sub-crew tracks")
            }
            Self::DanglingRelationship {
                predecessor,
                successor,
                reason,
            } => write!(f, "link {predecessor} -> {successor} ignored: {reason}"),
            Self::DuplicateRelationship {
                predecessor,
                successor,
            } => write!(f, "duplicate link {predecessor} -> {successor} discarded"),
            Self::PrecedenceCycle { task_id } => {
                write!(f, "precedence cycle through task '{task_id}'")
            }
        }
    }
}
