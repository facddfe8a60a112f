//! Input validation for schedule models.
//!
//! Checks structural integrity of the normalized model before any
//! optimization work. Detects:
//! - Duplicate task IDs
//! - Links from a task to itself
//! - Negative or non-finite durations, non-finite lags
//! - Circular precedence dependencies (reported as warnings: a cycle with
//!   non-positive total lag can still be satisfied, so only the solver can
//!   decide feasibility)
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};

use crate::error::ScheduleWarning;
use crate::models::ScheduleModel;

/// Validation result: warnings on success, every detected error otherwise.
pub type ValidationResult = Result<Vec<ScheduleWarning>, Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two tasks share the same ID.
    DuplicateId,
    /// A relationship links a task to itself.
    SelfLink,
    /// A duration is negative, NaN or infinite.
    InvalidDuration,
    /// A lag is NaN or infinite.
    InvalidLag,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a schedule model.
///
/// Checks:
/// 1. No duplicate task IDs
/// 2. Durations are finite and non-negative
/// 3. Lags are finite
/// 4. No relationship links a task to itself
/// 5. Precedence cycles (warning only)
///
/// # Returns
/// `Ok(warnings)` if no errors were found, `Err(errors)` with all detected
/// errors otherwise.
pub fn validate_model(model: &ScheduleModel) -> ValidationResult {
    let mut errors = Vec::new();

    let mut task_ids = HashSet::new();
    for task in &model.tasks {
        if !task_ids.insert(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }

        let durations = std::iter::once(task.duration_days).chain(task.remaining_days);
        for d in durations {
            if !d.is_finite() || d < 0.0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidDuration,
                    format!("Task '{}' has invalid duration {d}", task.id),
                ));
            }
        }
    }

    for rel in &model.relationships {
        if rel.predecessor == rel.successor {
            errors.push(ValidationError::new(
                ValidationErrorKind::SelfLink,
                format!("Task '{}' links to itself", rel.successor),
            ));
        }
        if !rel.lag_days.is_finite() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidLag,
                format!(
                    "Link {} -> {} has invalid lag {}",
                    rel.predecessor, rel.successor, rel.lag_days
                ),
            ));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(detect_cycles(model)
        .into_iter()
        .map(|task_id| ScheduleWarning::PrecedenceCycle { task_id })
        .collect())
}

/// Detects cycles in the precedence graph using DFS.
///
/// Returns one task per detected back edge, in source task order.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
fn detect_cycles(model: &ScheduleModel) -> Vec<String> {
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for rel in &model.relationships {
        adj.entry(rel.predecessor.as_str())
            .or_default()
            .push(rel.successor.as_str());
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();
    let mut found = Vec::new();

    for task in &model.tasks {
        let node = task.id.as_str();
        if !visited.contains(node) {
            cycle_dfs(node, &adj, &mut visited, &mut in_stack, &mut found);
        }
    }

    found
}

fn cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
    found: &mut Vec<String>,
) {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                if !found.iter().any(|f| f == next) {
                    found.push(next.to_string());
                }
            } else if !visited.contains(next) {
                cycle_dfs(next, adj, visited, in_stack, found);
            }
        }
    }

    in_stack.remove(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Relationship, Task};
    use chrono::NaiveDate;

    fn model() -> ScheduleModel {
        ScheduleModel::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn test_valid_model() {
        let m = model()
            .with_task(Task::new("A").with_duration_days(1.0))
            .with_task(Task::new("B").with_duration_days(2.0))
            .with_relationship(Relationship::finish_to_start("A", "B"));
        assert_eq!(validate_model(&m).unwrap(), vec![]);
    }

    #[test]
    fn test_duplicate_task_id() {
        let m = model().with_task(Task::new("A")).with_task(Task::new("A"));
        let errors = validate_model(&m).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::DuplicateId));
    }

    #[test]
    fn test_invalid_duration() {
        let m = model()
            .with_task(Task::new("A").with_duration_days(-1.0))
            .with_task(Task::new("B").with_duration_days(f64::NAN))
            .with_task(Task::new("C").with_remaining_days(f64::INFINITY));
        let errors = validate_model(&m).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::InvalidDuration)
                .count(),
            3
        );
    }

    #[test]
    fn test_self_link_and_bad_lag() {
        let m = model()
            .with_task(Task::new("A"))
            .with_task(Task::new("B"))
            .with_relationship(Relationship::finish_to_start("A", "A"))
            .with_relationship(Relationship::finish_to_start("A", "B").with_lag_days(f64::NAN));
        let errors = validate_model(&m).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::SelfLink));
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::InvalidLag));
    }

    #[test]
    fn test_cycle_is_warning() {
        // A → B → C → A
        let m = model()
            .with_task(Task::new("A"))
            .with_task(Task::new("B"))
            .with_task(Task::new("C"))
            .with_relationship(Relationship::finish_to_start("A", "B"))
            .with_relationship(Relationship::finish_to_start("B", "C"))
            .with_relationship(Relationship::finish_to_start("C", "A"));
        let warnings = validate_model(&m).unwrap();
        assert_eq!(
            warnings,
            vec![ScheduleWarning::PrecedenceCycle {
                task_id: "A".into()
            }]
        );
    }

    #[test]
    fn test_no_cycle_in_chain() {
        let m = model()
            .with_task(Task::new("A"))
            .with_task(Task::new("B"))
            .with_task(Task::new("C"))
            .with_relationship(Relationship::finish_to_start("A", "B"))
            .with_relationship(Relationship::finish_to_start("B", "C"))
            .with_relationship(Relationship::finish_to_start("A", "C"));
        assert!(validate_model(&m).unwrap().is_empty());
    }

    #[test]
    fn test_multiple_errors() {
        let m = model()
            .with_task(Task::new("A").with_duration_days(-2.0))
            .with_task(Task::new("A"));
        let errors = validate_model(&m).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
