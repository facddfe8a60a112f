//! Normalized schedule model and the ingestion interface.
//!
//! The ingestion adapter parses native project files and produces a
//! [`ScheduleModel`]. Format-specific parsing lives outside this crate;
//! [`JsonScheduleSource`] reads the normalized model from JSON.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Relationship, Task, WorkCalendar};
use crate::error::ScheduleError;

/// A parsed project schedule.
///
/// Read-only for the duration of an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleModel {
    /// Project name.
    #[serde(default)]
    pub name: String,
    /// Declared project start; offset 0.
    pub project_start: NaiveDate,
    /// Status date of the last progress update.
    #[serde(default)]
    pub data_date: Option<NaiveDate>,
    /// Default calendar of the project.
    #[serde(default)]
    pub default_calendar: Option<WorkCalendar>,
    /// Tasks in source order.
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl ScheduleModel {
    /// Creates an empty model on the standard calendar.
    pub fn new(project_start: NaiveDate) -> Self {
        Self {
            name: String::new(),
            project_start,
            data_date: None,
            default_calendar: Some(WorkCalendar::standard()),
            tasks: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Sets the project name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the data date.
    pub fn with_data_date(mut self, date: NaiveDate) -> Self {
        self.data_date = Some(date);
        self
    }

    /// Sets (or clears) the default calendar.
    pub fn with_calendar(mut self, calendar: Option<WorkCalendar>) -> Self {
        self.default_calendar = calendar;
        self
    }

    /// Adds a task.
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Adds a relationship.
    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Finds a task by id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Index of each task id in source order.
    pub fn task_index(&self) -> HashMap<&str, usize> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect()
    }

    /// Parses a model from JSON.
    pub fn from_json(json: &str) -> Result<Self, ScheduleError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the model to pretty JSON.
    pub fn to_json(&self) -> Result<String, ScheduleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Source of a normalized schedule model.
pub trait ScheduleSource {
    /// Loads the model.
    fn load(&self) -> Result<ScheduleModel, ScheduleError>;
}

/// Reads a [`ScheduleModel`] serialized as JSON.
#[derive(Debug, Clone)]
pub struct JsonScheduleSource {
    path: PathBuf,
}

impl JsonScheduleSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ScheduleSource for JsonScheduleSource {
    fn load(&self) -> Result<ScheduleModel, ScheduleError> {
        let content = std::fs::read_to_string(&self.path)?;
        let model = ScheduleModel::from_json(&content)?;
        tracing::debug!(
            path = %self.path.display(),
            tasks = model.tasks.len(),
            relationships = model.relationships.len(),
            "loaded schedule model"
        );
        Ok(model)
    }
}
