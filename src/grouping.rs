//! Resource grouping strategies.
//!
//! A strategy decides which tasks compete for which tracks:
//!
//! - **Auto-assign** (Scenario 1): one global pool of `N` interchangeable
//!   tracks shared by every capacity-consuming task.
//! - **Sub-crew** (Scenario 2): tasks are grouped by their normalized
//!   grouping key and each group gets its own `N` tracks. Tasks of different
//!   groups never compete.
//!
//! In-progress tasks join their group like free ones: they hold a track
//! until they finish. Without a grouping key they hold nothing.
//!
//! Groups are ordered by first appearance in source order; members keep
//! source order. Both matter for deterministic track assignment.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ScheduleError, ScheduleWarning};
use crate::partition::PartitionedTasks;

/// Track label used when the pool name is not configured.
pub const DEFAULT_POOL_NAME: &str = "Crew";

/// One track of a resource group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubCrewTrack {
    pub group: String,
    /// Zero-based track index.
    pub index: usize,
}

impl SubCrewTrack {
    /// Display label, `<group> - Sub <index + 1>`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SubCrewTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - Sub {}", self.group, self.index + 1)
    }
}

/// Tasks competing for the same set of tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroup {
    pub name: String,
    /// Number of tracks (`N`).
    pub tracks: i64,
    /// Indices into [`PartitionedTasks::planned`].
    pub members: Vec<usize>,
}

impl ResourceGroup {
    /// Track `index` of this group.
    pub fn track(&self, index: usize) -> SubCrewTrack {
        SubCrewTrack {
            group: self.name.clone(),
            index,
        }
    }

    /// All track labels, in index order.
    pub fn track_labels(&self) -> Vec<String> {
        (0..self.tracks.max(0) as usize)
            .map(|i| self.track(i).label())
            .collect()
    }
}

/// Output of a grouping strategy.
#[derive(Debug, Clone, Default)]
pub struct GroupingPlan {
    /// Scenario label.
    pub scenario: String,
    /// Default tracks per group.
    pub pool_size: i64,
    pub groups: Vec<ResourceGroup>,
    /// Capacity-consuming tasks without a group (sub-crew only).
    pub ungrouped: Vec<usize>,
    /// Label for free tasks that carry no group of their own.
    pub fallback_label: String,
    pub warnings: Vec<ScheduleWarning>,
}

impl GroupingPlan {
    /// Group and position of a planned task, if it is a capacity member.
    pub fn group_of(&self, planned: usize) -> Option<usize> {
        self.groups
            .iter()
            .position(|g| g.members.contains(&planned))
    }

    /// Total number of tracks across groups.
    pub fn track_count(&self) -> i64 {
        self.groups.iter().map(|g| g.tracks).sum()
    }
}

/// How free tasks are mapped to tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scenario", rename_all = "kebab-case")]
pub enum GroupingStrategy {
    /// One global pool of `pool_size` tracks.
    AutoAssign { pool_size: i64, pool_name: String },
    /// One group per grouping key, `default_size` tracks each unless
    /// overridden per group.
    SubCrew {
        default_size: i64,
        overrides: BTreeMap<String, i64>,
    },
}

impl GroupingStrategy {
    /// Auto-assign over the default pool name.
    pub fn auto_assign(pool_size: i64) -> Self {
        Self::AutoAssign {
            pool_size,
            pool_name: DEFAULT_POOL_NAME.to_string(),
        }
    }

    /// Sub-crew with a uniform track count.
    pub fn sub_crew(default_size: i64) -> Self {
        Self::SubCrew {
            default_size,
            overrides: BTreeMap::new(),
        }
    }

    /// Adds a per-group override (sub-crew only).
    pub fn with_override(mut self, group: impl Into<String>, tracks: i64) -> Self {
        if let Self::SubCrew { overrides, .. } = &mut self {
            overrides.insert(group.into().trim().to_string(), tracks);
        }
        self
    }

    /// Scenario label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AutoAssign { .. } => "auto-assign",
            Self::SubCrew { .. } => "sub-crew",
        }
    }

    /// Builds resource groups for the capacity-consuming tasks, free or
    /// in progress.
    ///
    /// # Errors
    /// - [`ScheduleError::InvalidCapacity`] if a group would get fewer than
    ///   one track
    /// - [`ScheduleError::Config`] if sub-crew grouping finds no grouping key
    ///   on any capacity-consuming task
    pub fn group(&self, tasks: &PartitionedTasks<'_>) -> Result<GroupingPlan, ScheduleError> {
        let candidates: Vec<usize> = tasks
            .planned
            .iter()
            .enumerate()
            .filter(|(_, p)| p.takes_track())
            .map(|(i, _)| i)
            .collect();

        let plan = match self {
            Self::AutoAssign {
                pool_size,
                pool_name,
            } => {
                if *pool_size < 1 {
                    return Err(ScheduleError::InvalidCapacity(format!(
                        "resource pool size must be at least 1, got {pool_size}"
                    )));
                }
                GroupingPlan {
                    scenario: self.name().to_string(),
                    pool_size: *pool_size,
                    groups: vec![ResourceGroup {
                        name: pool_name.clone(),
                        tracks: *pool_size,
                        members: candidates,
                    }],
                    ungrouped: Vec::new(),
                    fallback_label: pool_name.clone(),
                    warnings: Vec::new(),
                }
            }
            Self::SubCrew {
                default_size,
                overrides,
            } => Self::group_by_key(tasks, candidates, *default_size, overrides)?,
        };

        debug!(
            scenario = %plan.scenario,
            groups = plan.groups.len(),
            tracks = plan.track_count(),
            ungrouped = plan.ungrouped.len(),
            "grouped tasks"
        );
        Ok(plan)
    }

    fn group_by_key(
        tasks: &PartitionedTasks<'_>,
        candidates: Vec<usize>,
        default_size: i64,
        overrides: &BTreeMap<String, i64>,
    ) -> Result<GroupingPlan, ScheduleError> {
        if default_size < 1 {
            return Err(ScheduleError::InvalidCapacity(format!(
                "sub-crew count must be at least 1, got {default_size}"
            )));
        }

        let mut groups: Vec<ResourceGroup> = Vec::new();
        let mut ungrouped = Vec::new();
        let mut warnings = Vec::new();

        for i in candidates {
            let planned = &tasks.planned[i];
            let task = planned.task;
            let Some(key) = task.group_name() else {
                if planned.is_fixed() {
                    continue;
                }
                ungrouped.push(i);
                warnings.push(ScheduleWarning::UngroupableTask {
                    task_id: task.id.clone(),
                });
                continue;
            };
            match groups.iter_mut().find(|g| g.name == key) {
                Some(group) => group.members.push(i),
                None => {
                    let tracks = overrides.get(key).copied().unwrap_or(default_size);
                    if tracks < 1 {
                        return Err(ScheduleError::InvalidCapacity(format!(
                            "group '{key}' has {tracks} sub-crews; at least 1 is required"
                        )));
                    }
                    groups.push(ResourceGroup {
                        name: key.to_string(),
                        tracks,
                        members: vec![i],
                    });
                }
            }
        }

        if groups.is_empty() && !ungrouped.is_empty() {
            return Err(ScheduleError::Config(
                "sub-crew scenario requires grouping keys, but no task has one".into(),
            ));
        }

        for name in overrides.keys() {
            if !groups.iter().any(|g| &g.name == name) {
                debug!(group = %name, "sub-crew override matches no group");
            }
        }

        Ok(GroupingPlan {
            scenario: "sub-crew".to_string(),
            pool_size: default_size,
            groups,
            ungrouped,
            fallback_label: "Unassigned".to_string(),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalendarRate, ScheduleModel, Task};
    use crate::partition::partition_tasks;
    use chrono::NaiveDate;

    fn model() -> ScheduleModel {
        ScheduleModel::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_task(Task::new("A").with_duration_days(2.0).with_resource("Steel"))
            .with_task(Task::new("B").with_duration_days(1.0).with_udf("Crew", " Civil "))
            .with_task(Task::new("C").with_duration_days(3.0).with_resource("Steel"))
            .with_task(Task::milestone("M").with_resource("Steel"))
            .with_task(Task::new("Z").with_resource("Civil"))
    }

    fn rate() -> CalendarRate {
        CalendarRate::from_hours_per_day(8.0).unwrap()
    }

    #[test]
    fn test_track_label() {
        let t = SubCrewTrack {
            group: "Steel".into(),
            index: 0,
        };
        assert_eq!(t.label(), "Steel - Sub 1");
    }

    #[test]
    fn test_auto_assign_single_pool() {
        let m = model();
        let p = partition_tasks(&m, &rate()).unwrap();
        let plan = GroupingStrategy::auto_assign(2).group(&p).unwrap();
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].name, DEFAULT_POOL_NAME);
        // milestone and zero-duration task excluded
        assert_eq!(plan.groups[0].members, vec![0, 1, 2]);
        assert_eq!(plan.groups[0].track_labels(), vec!["Crew - Sub 1", "Crew - Sub 2"]);
    }

    #[test]
    fn test_sub_crew_groups_in_first_appearance_order() {
        let m = model();
        let p = partition_tasks(&m, &rate()).unwrap();
        let plan = GroupingStrategy::sub_crew(1)
            .with_override("Civil", 3)
            .group(&p)
            .unwrap();
        let names: Vec<&str> = plan.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Steel", "Civil"]);
        assert_eq!(plan.groups[0].members, vec![0, 2]);
        assert_eq!(plan.groups[0].tracks, 1);
        assert_eq!(plan.groups[1].tracks, 3);
        assert_eq!(plan.group_of(2), Some(0));
        assert_eq!(plan.group_of(3), None);
    }

    #[test]
    fn test_ungrouped_task_warns() {
        let m = model().with_task(Task::new("U").with_duration_days(1.0));
        let p = partition_tasks(&m, &rate()).unwrap();
        let plan = GroupingStrategy::sub_crew(1).group(&p).unwrap();
        assert_eq!(plan.ungrouped, vec![5]);
        assert_eq!(
            plan.warnings,
            vec![ScheduleWarning::UngroupableTask {
                task_id: "U".into()
            }]
        );
    }

    #[test]
    fn test_in_progress_tasks_join_their_group() {
        let (d1, d2) = (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        let m = model()
            .with_task(Task::new("P").started(d1).with_actual_finish(d2).with_resource("Steel"))
            .with_task(Task::new("Q").started(d1).with_actual_finish(d2))
            .with_task(Task::new("D").completed(d1, d2).with_resource("Steel"));
        let p = partition_tasks(&m, &rate()).unwrap();

        let plan = GroupingStrategy::sub_crew(1).group(&p).unwrap();
        assert_eq!(plan.groups[0].members, vec![0, 2, 5]);
        // no key: holds no track, no warning
        assert!(plan.ungrouped.is_empty());
        assert!(plan.warnings.is_empty());
        assert_eq!(plan.group_of(7), None);

        let pool = GroupingStrategy::auto_assign(2).group(&p).unwrap();
        assert_eq!(pool.groups[0].members, vec![0, 1, 2, 5, 6]);
    }

    #[test]
    fn test_zero_tracks_rejected() {
        let m = model();
        let p = partition_tasks(&m, &rate()).unwrap();
        assert!(matches!(
            GroupingStrategy::auto_assign(0).group(&p),
            Err(ScheduleError::InvalidCapacity(_))
        ));
        assert!(matches!(
            GroupingStrategy::sub_crew(1).with_override("Steel", 0).group(&p),
            Err(ScheduleError::InvalidCapacity(_))
        ));
    }

    #[test]
    fn test_sub_crew_without_keys_is_config_error() {
        let m = ScheduleModel::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_task(Task::new("A").with_duration_days(1.0));
        let p = partition_tasks(&m, &rate()).unwrap();
        assert!(matches!(
            GroupingStrategy::sub_crew(2).group(&p),
            Err(ScheduleError::Config(_))
        ));
    }
}
