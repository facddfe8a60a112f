//! Task partitioning.
//!
//! Splits the normalized task list into what the optimizer may move and what
//! it must respect:
//!
//! | Task | Placement |
//! |------|-----------|
//! | Summary / hammock | dropped |
//! | Completed / in progress | [`Placement::Fixed`] from actual dates |
//! | Not started (incl. milestones) | [`Placement::Free`] with duration in work units |
//!
//! Milestones are free with zero duration. Zero-duration operational tasks
//! stay free but never compete for capacity. In-progress operational tasks
//! are fixed but still hold a track until they finish.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::ScheduleError;
use crate::models::{CalendarRate, ScheduleModel, Task, TaskKind, TaskStatus};

/// How a task enters the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Pinned by actual progress. Offsets are work units from the project
    /// start; dates are reported verbatim.
    Fixed {
        start: i64,
        end: i64,
        start_date: NaiveDate,
        finish_date: NaiveDate,
    },
    /// Decided by the solver.
    Free { duration: i64 },
}

/// A task that takes part in optimization.
#[derive(Debug, Clone)]
pub struct PlannedTask<'a> {
    pub task: &'a Task,
    pub placement: Placement,
}

impl PlannedTask<'_> {
    #[inline]
    pub fn id(&self) -> &str {
        &self.task.id
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        matches!(self.placement, Placement::Fixed { .. })
    }

    /// Duration in work units.
    pub fn duration(&self) -> i64 {
        match self.placement {
            Placement::Fixed { start, end, .. } => end - start,
            Placement::Free { duration } => duration,
        }
    }

    /// Whether the task occupies a track: free, operational, non-zero.
    pub fn needs_capacity(&self) -> bool {
        match self.placement {
            Placement::Free { duration } => {
                duration > 0 && self.task.kind == TaskKind::Operational
            }
            Placement::Fixed { .. } => false,
        }
    }

    /// Whether a fixed task holds a track of its group while it runs:
    /// in progress, operational, non-zero.
    pub fn blocks_capacity(&self) -> bool {
        match self.placement {
            Placement::Fixed { start, end, .. } => {
                end > start
                    && self.task.status == TaskStatus::InProgress
                    && self.task.kind == TaskKind::Operational
            }
            Placement::Free { .. } => false,
        }
    }

    /// Whether the task belongs in a resource group.
    #[inline]
    pub fn takes_track(&self) -> bool {
        self.needs_capacity() || self.blocks_capacity()
    }
}

/// Result of partitioning, in source task order.
#[derive(Debug, Clone, Default)]
pub struct PartitionedTasks<'a> {
    pub planned: Vec<PlannedTask<'a>>,
    /// Ids of summary/hammock tasks left out of optimization.
    pub dropped: Vec<&'a str>,
}

impl<'a> PartitionedTasks<'a> {
    /// Position of a planned task by id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.planned.iter().position(|p| p.task.id == id)
    }

    pub fn fixed(&self) -> impl Iterator<Item = &PlannedTask<'a>> {
        self.planned.iter().filter(|p| p.is_fixed())
    }

    pub fn free(&self) -> impl Iterator<Item = &PlannedTask<'a>> {
        self.planned.iter().filter(|p| !p.is_fixed())
    }

    /// Latest end among fixed tasks (work units).
    pub fn latest_fixed_end(&self) -> Option<i64> {
        self.planned
            .iter()
            .filter_map(|p| match p.placement {
                Placement::Fixed { end, .. } => Some(end),
                Placement::Free { .. } => None,
            })
            .max()
    }

    /// Sum of free durations (work units).
    pub fn total_free_duration(&self) -> i64 {
        self.free().map(PlannedTask::duration).sum()
    }

    pub fn len(&self) -> usize {
        self.planned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planned.is_empty()
    }
}

/// Partitions the model's tasks.
///
/// # Errors
/// [`ScheduleError::InconsistentState`] when a task's status contradicts
/// its dates:
/// - completed without both actual dates
/// - in progress without an actual start, or without any way to derive
///   its finish (actual finish, or data date plus remaining duration)
/// - actual finish before actual start
/// - not started but carrying actual dates
pub fn partition_tasks<'a>(
    model: &'a ScheduleModel,
    rate: &CalendarRate,
) -> Result<PartitionedTasks<'a>, ScheduleError> {
    let mut out = PartitionedTasks::default();

    for task in &model.tasks {
        if task.kind.is_rollup() {
            out.dropped.push(task.id.as_str());
            continue;
        }
        let placement = place(task, model, rate)?;
        out.planned.push(PlannedTask { task, placement });
    }

    debug!(
        planned = out.planned.len(),
        fixed = out.fixed().count(),
        dropped = out.dropped.len(),
        "partitioned tasks"
    );
    Ok(out)
}

fn place(task: &Task, model: &ScheduleModel, rate: &CalendarRate) -> Result<Placement, ScheduleError> {
    let origin = model.project_start;

    match task.status {
        TaskStatus::NotStarted => {
            if task.actual_start.is_some() || task.actual_finish.is_some() {
                return Err(ScheduleError::inconsistent(
                    &task.id,
                    "not started but has actual dates",
                ));
            }
            let duration = if task.is_milestone() {
                0
            } else {
                rate.days_to_units(task.duration_days).max(0)
            };
            Ok(Placement::Free { duration })
        }
        TaskStatus::Completed => {
            let (Some(start_date), Some(finish_date)) = (task.actual_start, task.actual_finish)
            else {
                return Err(ScheduleError::inconsistent(
                    &task.id,
                    "completed without actual start and finish",
                ));
            };
            fixed(task, origin, rate, start_date, finish_date)
        }
        TaskStatus::InProgress => {
            let Some(start_date) = task.actual_start else {
                return Err(ScheduleError::inconsistent(
                    &task.id,
                    "in progress without actual start",
                ));
            };
            let finish_date = match (task.actual_finish, model.data_date, task.remaining_days) {
                (Some(finish), _, _) => finish,
                (None, Some(data_date), Some(remaining)) => {
                    let end = rate.date_to_offset(origin, data_date) + rate.days_to_units(remaining);
                    rate.offset_to_date(origin, end)
                }
                _ => {
                    return Err(ScheduleError::inconsistent(
                        &task.id,
                        "in progress without actual finish, data date or remaining duration",
                    ))
                }
            };
            fixed(task, origin, rate, start_date, finish_date)
        }
    }
}

fn fixed(
    task: &Task,
    origin: NaiveDate,
    rate: &CalendarRate,
    start_date: NaiveDate,
    finish_date: NaiveDate,
) -> Result<Placement, ScheduleError> {
    if finish_date < start_date {
        return Err(ScheduleError::inconsistent(
            &task.id,
            format!("actual finish {finish_date} before actual start {start_date}"),
        ));
    }
    Ok(Placement::Fixed {
        start: rate.date_to_offset(origin, start_date),
        end: rate.date_to_offset(origin, finish_date),
        start_date,
        finish_date,
    })
}
