//! Schedule quality metrics (KPIs).
//!
//! Computes performance indicators from an optimized schedule.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan (C_max) | Latest end offset |
//! | Track Utilization | Busy time of a track / makespan |
//! | Avg Utilization | Mean over tracks in use |
//! | Peak Concurrency | Most tasks of one group running at once |
//! | Fixed / Free | Tasks pinned by progress vs. solved |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::OptimizedSchedule;

/// Schedule performance indicators.
///
/// Time values are in work units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// Makespan: latest end offset.
    pub makespan: i64,
    /// Makespan in working days.
    pub makespan_days: f64,
    /// Average track utilization (0.0..1.0).
    pub avg_utilization: f64,
    /// Per-track utilization, by label.
    pub utilization_by_track: BTreeMap<String, f64>,
    /// Maximum number of simultaneously running tasks, by group.
    pub peak_concurrency: BTreeMap<String, usize>,
    pub fixed_tasks: usize,
    pub free_tasks: usize,
}

impl ScheduleKpi {
    /// Computes KPIs from an optimized schedule.
    pub fn calculate(schedule: &OptimizedSchedule) -> Self {
        let mut utilization_by_track = BTreeMap::new();
        for label in schedule.track_loads().keys() {
            if let Some(u) = schedule.track_utilization(label) {
                utilization_by_track.insert(label.to_string(), u);
            }
        }

        let avg_utilization = if utilization_by_track.is_empty() {
            0.0
        } else {
            let sum: f64 = utilization_by_track.values().sum();
            sum / utilization_by_track.len() as f64
        };

        let mut by_group: BTreeMap<&str, Vec<(i64, i64)>> = BTreeMap::new();
        for t in schedule.tasks.iter().filter(|t| !t.excluded_from_tracks) {
            if let Some(group) = &t.group {
                by_group
                    .entry(group.as_str())
                    .or_default()
                    .push((t.start_offset, t.end_offset));
            }
        }
        let peak_concurrency = by_group
            .into_iter()
            .map(|(g, spans)| (g.to_string(), peak(spans)))
            .collect();

        let fixed_tasks = schedule.tasks.iter().filter(|t| t.fixed).count();

        Self {
            makespan: schedule.makespan,
            makespan_days: schedule.makespan_days,
            avg_utilization,
            utilization_by_track,
            peak_concurrency,
            fixed_tasks,
            free_tasks: schedule.tasks.len() - fixed_tasks,
        }
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_makespan: i64, min_utilization: f64) -> bool {
        self.makespan <= max_makespan && self.avg_utilization >= min_utilization
    }
}

/// Maximum overlap of half-open spans (sweep line).
fn peak(spans: Vec<(i64, i64)>) -> usize {
    let mut events: Vec<(i64, i32)> = Vec::with_capacity(spans.len() * 2);
    for (s, e) in spans {
        if e > s {
            events.push((s, 1));
            events.push((e, -1));
        }
    }
    // ends before starts at the same instant
    events.sort();
    let mut current = 0i32;
    let mut best = 0i32;
    for (_, delta) in events {
        current += delta;
        best = best.max(current);
    }
    best as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScheduledTask, SolveSummary, TaskKind, Verdict};
    use chrono::NaiveDate;

    fn task(id: &str, start: i64, end: i64, track: usize) -> ScheduledTask {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ScheduledTask {
            task_id: id.into(),
            code: id.into(),
            name: String::new(),
            kind: TaskKind::Operational,
            fixed: false,
            start_offset: start,
            end_offset: end,
            start_date: d,
            finish_date: d,
            resource: format!("Crew - Sub {}", track + 1),
            group: Some("Crew".into()),
            track: Some(track),
            excluded_from_tracks: false,
        }
    }

    fn schedule(tasks: Vec<ScheduledTask>, makespan: i64) -> OptimizedSchedule {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        OptimizedSchedule {
            project_name: String::new(),
            project_start: d,
            hours_per_day: 8.0,
            scenario: "auto-assign".into(),
            verdict: Verdict::Optimal,
            tasks,
            makespan,
            makespan_days: makespan as f64 / 8.0,
            finish_date: d,
            warnings: Vec::new(),
            solver: SolveSummary::default(),
        }
    }

    #[test]
    fn test_kpi_basic() {
        let s = schedule(
            vec![task("A", 0, 8, 0), task("B", 8, 16, 0), task("C", 0, 8, 1)],
            16,
        );
        let kpi = ScheduleKpi::calculate(&s);
        assert_eq!(kpi.makespan, 16);
        assert!((kpi.utilization_by_track["Crew - Sub 1"] - 1.0).abs() < 1e-10);
        assert!((kpi.utilization_by_track["Crew - Sub 2"] - 0.5).abs() < 1e-10);
        assert!((kpi.avg_utilization - 0.75).abs() < 1e-10);
        assert_eq!(kpi.peak_concurrency["Crew"], 2);
        assert_eq!(kpi.free_tasks, 3);
    }

    #[test]
    fn test_peak_touching_spans() {
        assert_eq!(peak(vec![(0, 5), (5, 10)]), 1);
        assert_eq!(peak(vec![(0, 5), (4, 10), (4, 6)]), 3);
        assert_eq!(peak(vec![]), 0);
    }

    #[test]
    fn test_meets_thresholds() {
        let s = schedule(vec![task("A", 0, 8, 0)], 8);
        let kpi = ScheduleKpi::calculate(&s);
        assert!(kpi.meets_thresholds(8, 0.9));
        assert!(!kpi.meets_thresholds(7, 0.9));
    }
}
