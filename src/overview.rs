//! Project overview for sizing a run.
//!
//! Summarizes a normalized model before optimization: task counts by kind
//! and status, and per-group counts of not-started work. The not-started
//! count of a group is the largest sub-crew count that can still make a
//! difference, which makes it a natural upper bound when choosing `N`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{ScheduleModel, TaskKind, TaskStatus};

/// Task counts of one resource group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOverview {
    pub name: String,
    pub total: usize,
    pub not_started: usize,
}

/// Summary of a schedule model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectOverview {
    pub name: String,
    pub project_start: NaiveDate,
    pub data_date: Option<NaiveDate>,
    pub hours_per_day: Option<f64>,
    pub tasks: usize,
    pub relationships: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    /// Groups in first-appearance order.
    pub groups: Vec<GroupOverview>,
    /// Not-started operational tasks without a grouping key.
    pub ungrouped_not_started: usize,
}

impl ProjectOverview {
    pub fn from_model(model: &ScheduleModel) -> Self {
        let mut by_kind = BTreeMap::new();
        let mut by_status = BTreeMap::new();
        let mut groups: Vec<GroupOverview> = Vec::new();
        let mut ungrouped_not_started = 0;

        for task in &model.tasks {
            *by_kind.entry(kind_label(task.kind).to_string()).or_insert(0) += 1;
            *by_status
                .entry(status_label(task.status).to_string())
                .or_insert(0) += 1;

            if task.kind != TaskKind::Operational {
                continue;
            }
            let not_started = task.status == TaskStatus::NotStarted;
            match task.group_name() {
                Some(name) => {
                    let idx = match groups.iter().position(|g| g.name == name) {
                        Some(i) => i,
                        None => {
                            groups.push(GroupOverview {
                                name: name.to_string(),
                                ..GroupOverview::default()
                            });
                            groups.len() - 1
                        }
                    };
                    groups[idx].total += 1;
                    groups[idx].not_started += usize::from(not_started);
                }
                None => ungrouped_not_started += usize::from(not_started),
            }
        }

        Self {
            name: model.name.clone(),
            project_start: model.project_start,
            data_date: model.data_date,
            hours_per_day: model.default_calendar.as_ref().map(|c| c.hours_per_day),
            tasks: model.tasks.len(),
            relationships: model.relationships.len(),
            by_kind,
            by_status,
            groups,
            ungrouped_not_started,
        }
    }

    /// Suggested sub-crew count per group: its not-started task count.
    pub fn suggested_sub_crews(&self) -> BTreeMap<String, usize> {
        self.groups
            .iter()
            .filter(|g| g.not_started > 0)
            .map(|g| (g.name.clone(), g.not_started))
            .collect()
    }
}

fn kind_label(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Operational => "operational",
        TaskKind::Milestone => "milestone",
        TaskKind::Summary => "summary",
        TaskKind::Hammock => "hammock",
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::NotStarted => "not_started",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Completed => "completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;

    #[test]
    fn test_overview_counts() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let m = ScheduleModel::new(d)
            .with_task(Task::new("A").with_duration_days(1.0).with_resource("Civil"))
            .with_task(Task::new("B").with_resource("Civil").completed(d, d))
            .with_task(Task::new("C").with_duration_days(1.0).with_resource("Steel"))
            .with_task(Task::new("D").with_duration_days(1.0))
            .with_task(Task::milestone("M"))
            .with_task(Task::new("S").with_kind(TaskKind::Summary));
        let o = ProjectOverview::from_model(&m);

        assert_eq!(o.tasks, 6);
        assert_eq!(o.by_kind["operational"], 4);
        assert_eq!(o.by_status["completed"], 1);
        assert_eq!(o.groups.len(), 2);
        assert_eq!(o.groups[0].name, "Civil");
        assert_eq!(o.groups[0].total, 2);
        assert_eq!(o.groups[0].not_started, 1);
        assert_eq!(o.ungrouped_not_started, 1);
        assert_eq!(o.suggested_sub_crews()["Steel"], 1);
    }
}
