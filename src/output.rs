//! Output assembly and export.
//!
//! Merges fixed and solved tasks into an [`OptimizedSchedule`] in original
//! task order, computes the global makespan, and renders the schedule for
//! the presentation layer (JSON, or a tab-separated table with the columns
//! `Code, Name, Resource, Start Date, End Date`).
//!
//! # Resource labels
//!
//! | Task | Label |
//! |------|-------|
//! | Capacity member, including in-progress work | `<group> - Sub <k>` |
//! | Milestone / zero duration | own group key, unsuffixed |
//! | Ungrouped (sub-crew) | `Unassigned` |
//! | Other fixed | own group key |

use std::fmt::Write as _;

use tracing::debug;

pub use crate::models::{OptimizedSchedule, ScheduledTask, SolveSummary, Verdict};

use crate::cp::SolverStats;
use crate::error::{ScheduleError, ScheduleWarning};
use crate::grouping::GroupingPlan;
use crate::interpret::SolvedTask;
use crate::models::{CalendarRate, ScheduleModel, TaskKind};
use crate::partition::{PartitionedTasks, Placement};

/// Label for milestones without a group of their own.
const MILESTONE_LABEL: &str = "Milestone";

/// Label for fixed tasks without a group of their own.
const UNASSIGNED_LABEL: &str = "Unassigned";

/// Assembles the final schedule of a run.
pub struct OutputAssembler<'a> {
    model: &'a ScheduleModel,
    tasks: &'a PartitionedTasks<'a>,
    plan: &'a GroupingPlan,
    rate: CalendarRate,
}

impl<'a> OutputAssembler<'a> {
    pub fn new(
        model: &'a ScheduleModel,
        tasks: &'a PartitionedTasks<'a>,
        plan: &'a GroupingPlan,
        rate: CalendarRate,
    ) -> Self {
        Self {
            model,
            tasks,
            plan,
            rate,
        }
    }

    /// Builds the optimized schedule.
    ///
    /// `solved` must be parallel to the planned tasks, as returned by
    /// [`interpret`](crate::interpret::interpret).
    pub fn assemble(
        &self,
        solved: &[SolvedTask],
        verdict: Verdict,
        stats: &SolverStats,
        warnings: Vec<ScheduleWarning>,
    ) -> OptimizedSchedule {
        let origin = self.model.project_start;

        let tasks: Vec<ScheduledTask> = solved
            .iter()
            .map(|s| {
                let planned = &self.tasks.planned[s.planned];
                let task = planned.task;
                let (start_date, finish_date) = match planned.placement {
                    Placement::Fixed {
                        start_date,
                        finish_date,
                        ..
                    } => (start_date, finish_date),
                    Placement::Free { .. } => (
                        self.rate.offset_to_date(origin, s.start),
                        self.rate.offset_to_date(origin, s.end),
                    ),
                };
                let (resource, group) = match &s.track {
                    Some(track) => (track.label(), Some(track.group.clone())),
                    None => (self.unsuffixed_label(s), task.group_name().map(str::to_string)),
                };
                ScheduledTask {
                    task_id: task.id.clone(),
                    code: task.code.clone(),
                    name: task.name.clone(),
                    kind: task.kind,
                    fixed: s.fixed,
                    start_offset: s.start,
                    end_offset: s.end,
                    start_date,
                    finish_date,
                    resource,
                    group,
                    track: s.track.as_ref().map(|t| t.index),
                    excluded_from_tracks: s.track.is_none(),
                }
            })
            .collect();

        let makespan = tasks.iter().map(|t| t.end_offset).max().unwrap_or(0).max(0);
        let finish_date = tasks
            .iter()
            .map(|t| t.finish_date)
            .max()
            .unwrap_or(origin);

        debug!(tasks = tasks.len(), makespan, %finish_date, "assembled schedule");

        OptimizedSchedule {
            project_name: self.model.name.clone(),
            project_start: origin,
            hours_per_day: self.rate.hours_per_day(),
            scenario: self.plan.scenario.clone(),
            verdict,
            tasks,
            makespan,
            makespan_days: self.rate.units_to_days(makespan),
            finish_date,
            warnings,
            solver: SolveSummary {
                elapsed_ms: stats.elapsed.as_millis() as u64,
                workers: stats.workers,
                strategy: stats.strategy.clone(),
            },
        }
    }

    fn unsuffixed_label(&self, solved: &SolvedTask) -> String {
        let planned = &self.tasks.planned[solved.planned];
        let task = planned.task;
        if let Some(key) = task.group_name() {
            return key.to_string();
        }
        if solved.fixed {
            UNASSIGNED_LABEL.to_string()
        } else if task.kind == TaskKind::Milestone {
            MILESTONE_LABEL.to_string()
        } else {
            self.plan.fallback_label.clone()
        }
    }
}

/// Serializes a schedule to pretty JSON.
pub fn to_json(schedule: &OptimizedSchedule) -> Result<String, ScheduleError> {
    Ok(serde_json::to_string_pretty(schedule)?)
}

/// Renders the export table, one row per task in source order.
pub fn render_table(schedule: &OptimizedSchedule) -> String {
    let mut out = String::from("Code\tName\tResource\tStart Date\tEnd Date\n");
    for t in &schedule.tasks {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            t.code, t.name, t.resource, t.start_date, t.finish_date
        );
    }
    out
}
