//! Optimized schedule (solution) model.
//!
//! An optimized schedule lists every optimized task with its solved (or
//! pinned) offsets, calendar dates and resource-track label, plus the
//! project makespan. It is what the export and visualization layers consume.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::TaskKind;
use crate::error::ScheduleWarning;

/// Quality of the solver verdict behind a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Minimum makespan proven.
    Optimal,
    /// Valid schedule; optimality not proven before the deadline.
    Feasible,
}

/// One task of the optimized schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,
    pub code: String,
    pub name: String,
    pub kind: TaskKind,
    /// Dates were taken from actual progress, not solved.
    pub fixed: bool,
    /// Start offset from the project start (work units).
    pub start_offset: i64,
    /// End offset from the project start (work units).
    pub end_offset: i64,
    pub start_date: NaiveDate,
    pub finish_date: NaiveDate,
    /// Resource-track label, e.g. `Crew A - Sub 2`.
    pub resource: String,
    /// Resource group the task was optimized in.
    pub group: Option<String>,
    /// Track index inside the group.
    pub track: Option<usize>,
    /// Zero-capacity task (milestone, zero duration, ungrouped, fixed):
    /// listed, but not drawn on a resource track.
    pub excluded_from_tracks: bool,
}

impl ScheduledTask {
    /// Duration in work units.
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end_offset - self.start_offset
    }

    /// Whether two tasks overlap in time (half-open intervals).
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_offset < other.end_offset && other.start_offset < self.end_offset
    }
}

/// Search statistics attached to a schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveSummary {
    pub elapsed_ms: u64,
    pub workers: usize,
    /// Search strategy whose answer was kept.
    pub strategy: String,
}

/// A complete optimized schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedSchedule {
    pub project_name: String,
    pub project_start: NaiveDate,
    pub hours_per_day: f64,
    /// Scenario label (`auto-assign` or `sub-crew`).
    pub scenario: String,
    pub verdict: Verdict,
    /// Tasks in source order.
    pub tasks: Vec<ScheduledTask>,
    /// Latest end offset across all tasks (work units).
    pub makespan: i64,
    /// Makespan in working days.
    pub makespan_days: f64,
    /// Date of the latest finish.
    pub finish_date: NaiveDate,
    pub warnings: Vec<ScheduleWarning>,
    pub solver: SolveSummary,
}

impl OptimizedSchedule {
    /// Finds a task by id.
    pub fn task(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// Tasks drawn on the given resource-track label.
    pub fn tasks_on_track(&self, label: &str) -> Vec<&ScheduledTask> {
        self.tasks
            .iter()
            .filter(|t| !t.excluded_from_tracks && t.resource == label)
            .collect()
    }

    /// Track-loaded tasks grouped by label, labels sorted.
    pub fn track_loads(&self) -> BTreeMap<&str, Vec<&ScheduledTask>> {
        let mut map: BTreeMap<&str, Vec<&ScheduledTask>> = BTreeMap::new();
        for t in self.tasks.iter().filter(|t| !t.excluded_from_tracks) {
            map.entry(t.resource.as_str()).or_default().push(t);
        }
        map
    }

    /// Busy time of a track divided by the makespan.
    ///
    /// Returns `None` if the makespan is zero.
    pub fn track_utilization(&self, label: &str) -> Option<f64> {
        if self.makespan <= 0 {
            return None;
        }
        let busy: i64 = self.tasks_on_track(label).iter().map(|t| t.duration()).sum();
        Some(busy as f64 / self.makespan as f64)
    }

    /// Whether the verdict is a proven optimum.
    pub fn is_optimal(&self) -> bool {
        self.verdict == Verdict::Optimal
    }

    /// Number of listed tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn task(id: &str, start: i64, end: i64, resource: &str, excluded: bool) -> ScheduledTask {
        ScheduledTask {
            task_id: id.into(),
            code: id.into(),
            name: String::new(),
            kind: TaskKind::Operational,
            fixed: false,
            start_offset: start,
            end_offset: end,
            start_date: date(1),
            finish_date: date(1),
            resource: resource.into(),
            group: None,
            track: None,
            excluded_from_tracks: excluded,
        }
    }

    fn sample() -> OptimizedSchedule {
        OptimizedSchedule {
            project_name: "P".into(),
            project_start: date(1),
            hours_per_day: 8.0,
            scenario: "sub-crew".into(),
            verdict: Verdict::Optimal,
            tasks: vec![
                task("A", 0, 40, "Crew - Sub 1", false),
                task("B", 40, 80, "Crew - Sub 1", false),
                task("C", 0, 20, "Crew - Sub 2", false),
                task("M", 80, 80, "Crew", true),
            ],
            makespan: 80,
            makespan_days: 10.0,
            finish_date: date(11),
            warnings: Vec::new(),
            solver: SolveSummary::default(),
        }
    }

    #[test]
    fn test_tasks_on_track() {
        let s = sample();
        assert_eq!(s.tasks_on_track("Crew - Sub 1").len(), 2);
        assert!(s.tasks_on_track("Crew").is_empty()); // milestone excluded
    }

    #[test]
    fn test_track_loads_sorted() {
        let s = sample();
        let labels: Vec<&str> = s.track_loads().keys().copied().collect();
        assert_eq!(labels, vec!["Crew - Sub 1", "Crew - Sub 2"]);
    }

    #[test]
    fn test_track_utilization() {
        let s = sample();
        assert!((s.track_utilization("Crew - Sub 1").unwrap() - 1.0).abs() < 1e-10);
        assert!((s.track_utilization("Crew - Sub 2").unwrap() - 0.25).abs() < 1e-10);
    }

    #[test]
    fn test_overlap() {
        let a = task("A", 0, 40, "X", false);
        let b = task("B", 40, 80, "X", false);
        let c = task("C", 39, 41, "X", false);
        assert!(!a.overlaps(&b)); // touching
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }
}
