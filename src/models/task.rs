//! Task model.
//!
//! A task is one activity of the source schedule: an operational work item,
//! a milestone, or a summary/hammock roll-up that only exists for reporting.
//!
//! # Time Representation
//! Durations arrive in calendar days (as the ingestion adapter reports them)
//! and are converted to integer work units by
//! [`CalendarRate`](super::CalendarRate). Actual dates are plain calendar
//! dates.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Classification of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Ordinary work item; consumes a track while it runs.
    #[default]
    Operational,
    /// Zero-duration anchor.
    Milestone,
    /// WBS roll-up; never optimized.
    Summary,
    /// Level-of-effort span; never optimized.
    Hammock,
}

impl TaskKind {
    /// Whether tasks of this kind are dropped before optimization.
    #[inline]
    pub fn is_rollup(self) -> bool {
        matches!(self, Self::Summary | Self::Hammock)
    }
}

/// Progress state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// Key used to group tasks into resource groups.
///
/// Source formats expose the crew either as a resource assignment or as a
/// user-defined field on the task. The adapter resolves whichever one the
/// file carries into this enum once; downstream code only ever looks at
/// [`GroupingKey::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum GroupingKey {
    /// Primary resource assignment (resource name or id).
    ResourceId { id: String },
    /// Value of a user-defined field (e.g. `ResAllocation`).
    UserDefinedField { label: String, value: String },
}

impl GroupingKey {
    /// Creates a resource-based key.
    pub fn resource(id: impl Into<String>) -> Self {
        Self::ResourceId { id: id.into() }
    }

    /// Creates a UDF-based key.
    pub fn udf(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UserDefinedField {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Normalized group name (trimmed resource id or UDF value).
    pub fn normalized(&self) -> &str {
        match self {
            Self::ResourceId { id } => id.trim(),
            Self::UserDefinedField { value, .. } => value.trim(),
        }
    }

    /// Whether the key carries no usable value.
    pub fn is_blank(&self) -> bool {
        self.normalized().is_empty()
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.normalized())
    }
}

/// A task of the normalized schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Short activity code shown in exports.
    #[serde(default)]
    pub code: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: TaskKind,
    #[serde(default)]
    pub status: TaskStatus,
    /// Planned duration in calendar days.
    #[serde(default)]
    pub duration_days: f64,
    /// Remaining duration in calendar days (in-progress tasks).
    #[serde(default)]
    pub remaining_days: Option<f64>,
    #[serde(default)]
    pub actual_start: Option<NaiveDate>,
    #[serde(default)]
    pub actual_finish: Option<NaiveDate>,
    /// Crew / resource group the task belongs to.
    #[serde(default)]
    pub grouping_key: Option<GroupingKey>,
}

impl Task {
    /// Creates a not-started operational task with zero duration.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            code: id.clone(),
            id,
            name: String::new(),
            kind: TaskKind::Operational,
            status: TaskStatus::NotStarted,
            duration_days: 0.0,
            remaining_days: None,
            actual_start: None,
            actual_finish: None,
            grouping_key: None,
        }
    }

    /// Creates a milestone.
    pub fn milestone(id: impl Into<String>) -> Self {
        Self::new(id).with_kind(TaskKind::Milestone)
    }

    /// Sets the activity code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Sets the task name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the task kind.
    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the planned duration (calendar days).
    pub fn with_duration_days(mut self, days: f64) -> Self {
        self.duration_days = days;
        self
    }

    /// Sets the remaining duration (calendar days).
    pub fn with_remaining_days(mut self, days: f64) -> Self {
        self.remaining_days = Some(days);
        self
    }

    /// Marks the task in progress since `start`.
    pub fn started(mut self, start: NaiveDate) -> Self {
        self.status = TaskStatus::InProgress;
        self.actual_start = Some(start);
        self
    }

    /// Marks the task completed over `[start, finish]`.
    pub fn completed(mut self, start: NaiveDate, finish: NaiveDate) -> Self {
        self.status = TaskStatus::Completed;
        self.actual_start = Some(start);
        self.actual_finish = Some(finish);
        self
    }

    /// Sets the actual finish date.
    pub fn with_actual_finish(mut self, finish: NaiveDate) -> Self {
        self.actual_finish = Some(finish);
        self
    }

    /// Assigns the task to a resource.
    pub fn with_resource(mut self, id: impl Into<String>) -> Self {
        self.grouping_key = Some(GroupingKey::resource(id));
        self
    }

    /// Assigns the task to a crew through a user-defined field.
    pub fn with_udf(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.grouping_key = Some(GroupingKey::udf(label, value));
        self
    }

    /// Whether the task is a milestone.
    #[inline]
    pub fn is_milestone(&self) -> bool {
        self.kind == TaskKind::Milestone
    }

    /// Normalized grouping key, if the task has a usable one.
    pub fn group_name(&self) -> Option<&str> {
        self.grouping_key
            .as_ref()
            .filter(|k| !k.is_blank())
            .map(GroupingKey::normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_task_builder() {
        let task = Task::new("A100")
            .with_code("A-100")
            .with_name("Excavation")
            .with_duration_days(5.0)
            .with_resource("Earthworks");

        assert_eq!(task.id, "A100");
        assert_eq!(task.code, "A-100");
        assert_eq!(task.kind, TaskKind::Operational);
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.group_name(), Some("Earthworks"));
    }

    #[test]
    fn test_progress_builders() {
        let t = Task::new("A").started(date(2024, 3, 1));
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(t.actual_start, Some(date(2024, 3, 1)));
        assert!(t.actual_finish.is_none());

        let c = Task::new("B").completed(date(2024, 3, 1), date(2024, 3, 4));
        assert_eq!(c.status, TaskStatus::Completed);
        assert_eq!(c.actual_finish, Some(date(2024, 3, 4)));
    }

    #[test]
    fn test_grouping_key_normalized() {
        let udf = GroupingKey::udf("ResAllocation", "  Crew A ");
        assert_eq!(udf.normalized(), "Crew A");
        assert_eq!(udf.to_string(), "Crew A");

        let blank = Task::new("X").with_resource("   ");
        assert_eq!(blank.group_name(), None);
    }

    #[test]
    fn test_rollup_kinds() {
        assert!(TaskKind::Summary.is_rollup());
        assert!(TaskKind::Hammock.is_rollup());
        assert!(!TaskKind::Milestone.is_rollup());
        assert!(Task::milestone("M").is_milestone());
    }

    #[test]
    fn test_task_json_defaults() {
        let t: Task = serde_json::from_str(r#"{"id": "T1", "duration_days": 2.5}"#).unwrap();
        assert_eq!(t.kind, TaskKind::Operational);
        assert_eq!(t.status, TaskStatus::NotStarted);
        assert!(t.grouping_key.is_none());

        let keyed: Task = serde_json::from_str(
            r#"{"id": "T2", "kind": "milestone",
                "grouping_key": {"source": "user_defined_field", "label": "ResAllocation", "value": "Crew B"}}"#,
        )
        .unwrap();
        assert!(keyed.is_milestone());
        assert_eq!(keyed.group_name(), Some("Crew B"));
    }
}
