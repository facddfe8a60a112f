//! CP model construction.
//!
//! Translates partitioned tasks, relationships and resource groups into a
//! [`CpModel`]:
//!
//! - Free task: `start`, `end` in `[release, horizon]` and an interval with
//!   `end = start + duration`
//! - Capacity member: a track variable in `[0, N)`; per group, members on
//!   the same track never overlap
//! - Fixed task: its offsets enter constraints as constants. An in-progress
//!   group member still running at the release also gets a constant
//!   interval over `[max(start, release), end)` and a track, so free tasks
//!   of its group work around it
//! - Relationship: one difference constraint per link (see
//!   [`LinkType`](crate::models::LinkType))
//! - Objective: minimize the latest end, with the latest fixed end as a
//!   constant floor
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cp::{CpModel, IntervalId, Term, TrackMember, VarId};
use crate::error::{ScheduleError, ScheduleWarning};
use crate::grouping::GroupingPlan;
use crate::models::{CalendarRate, LinkType, Relationship, ScheduleModel};
use crate::partition::{PartitionedTasks, Placement};

/// Decision variables (or constants) of one planned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskVars {
    Fixed {
        start: i64,
        end: i64,
        /// Constant interval of a task holding a track past the release.
        interval: Option<IntervalId>,
        track: Option<(usize, VarId)>,
    },
    Free {
        start: VarId,
        end: VarId,
        interval: IntervalId,
        /// Group index and track variable of a capacity member.
        track: Option<(usize, VarId)>,
    },
}

impl TaskVars {
    pub fn start_term(&self) -> Term {
        match *self {
            Self::Fixed { start, .. } => Term::Const(start),
            Self::Free { start, .. } => Term::Var(start),
        }
    }

    pub fn end_term(&self) -> Term {
        match *self {
            Self::Fixed { end, .. } => Term::Const(end),
            Self::Free { end, .. } => Term::Var(end),
        }
    }

    /// Interval and track of a member on its group's timeline.
    pub fn track_member(&self) -> Option<(usize, TrackMember)> {
        match *self {
            Self::Fixed {
                interval: Some(interval),
                track: Some((g, track)),
                ..
            }
            | Self::Free {
                interval,
                track: Some((g, track)),
                ..
            } => Some((g, TrackMember { interval, track })),
            _ => None,
        }
    }
}

/// Size of one resource group as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    pub tracks: i64,
    pub members: usize,
    /// Members in progress, pinned to their recorded span.
    pub fixed_members: usize,
}

/// A relationship as encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeledLink {
    pub predecessor: String,
    pub successor: String,
    pub link: LinkType,
    /// Lag in work units.
    pub lag: i64,
}

impl fmt::Display for ModeledLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -{}-> {}", self.predecessor, self.link, self.successor)?;
        if self.lag != 0 {
            write!(f, " ({:+})", self.lag)?;
        }
        Ok(())
    }
}

/// Why a relationship was not encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// A link between the same pair was encoded already.
    Duplicate,
    /// An endpoint is not optimized (unknown, summary or hammock).
    Dangling { missing: String },
    /// Both endpoints are pinned; there is nothing to decide.
    BothFixed,
}

/// A relationship left out of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLink {
    pub predecessor: String,
    pub successor: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// A model ready for submission, with the mapping back to tasks.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    pub model: CpModel,
    pub scenario: String,
    pub pool_size: i64,
    pub horizon: i64,
    /// Earliest start of free tasks (work units).
    pub release: i64,
    /// Parallel to [`PartitionedTasks::planned`].
    pub tasks: Vec<TaskVars>,
    pub groups: Vec<GroupSummary>,
    /// Relationships encoded as constraints, in source order.
    pub links: Vec<ModeledLink>,
    pub skipped_links: Vec<SkippedLink>,
    pub warnings: Vec<ScheduleWarning>,
}

impl BuiltModel {
    /// Number of decision-carrying (free) tasks.
    pub fn free_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| matches!(t, TaskVars::Free { .. }))
            .count()
    }

    /// Number of relationships encoded as constraints.
    #[inline]
    pub fn active_links(&self) -> usize {
        self.links.len()
    }
}

/// Builds a CP model from the partitioned schedule.
///
/// # Example
/// ```no_run
/// use crew_schedule::builder::ScheduleCpBuilder;
/// use crew_schedule::grouping::GroupingStrategy;
/// use crew_schedule::models::{CalendarRate, ScheduleModel};
/// use crew_schedule::partition::partition_tasks;
///
/// # fn run(model: &ScheduleModel) -> Result<(), crew_schedule::ScheduleError> {
/// let rate = CalendarRate::resolve(model.default_calendar.as_ref())?;
/// let tasks = partition_tasks(model, &rate)?;
/// let plan = GroupingStrategy::auto_assign(2).group(&tasks)?;
/// let built = ScheduleCpBuilder::new(model, &tasks, &plan, rate).build()?;
/// # Ok(())
/// # }
/// ```
pub struct ScheduleCpBuilder<'a> {
    model: &'a ScheduleModel,
    tasks: &'a PartitionedTasks<'a>,
    plan: &'a GroupingPlan,
    rate: CalendarRate,
    release: i64,
}

impl<'a> ScheduleCpBuilder<'a> {
    /// Creates a new builder.
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
            release: 0,
        }
    }

    /// Earliest start for free tasks (work units), e.g. the data date.
    pub fn with_release(mut self, release: i64) -> Self {
        self.release = release.max(0);
        self
    }

    /// Upper bound of every time variable.
    ///
    /// Starting after the latest fixed end (or the release), running every
    /// free task back to back and honoring every positive lag always fits.
    pub fn horizon(&self) -> i64 {
        let floor = self.tasks.latest_fixed_end().unwrap_or(0).max(self.release);
        let lags: i64 = self
            .model
            .relationships
            .iter()
            .map(|r| self.rate.days_to_units(r.lag_days).max(0))
            .sum();
        floor + self.tasks.total_free_duration() + lags
    }

    /// Span a fixed group member holds on its track, if any remains.
    fn blocked_span(&self, planned: usize) -> Option<(i64, i64)> {
        match self.tasks.planned[planned].placement {
            Placement::Fixed { start, end, .. } => {
                let from = start.max(self.release);
                (end > from).then_some((from, end))
            }
            Placement::Free { .. } => None,
        }
    }

    /// Builds the model.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidCapacity`] if a group has an empty track
    /// domain, or more in-progress tasks running at once than tracks.
    pub fn build(&self) -> Result<BuiltModel, ScheduleError> {
        let horizon = self.horizon();
        let mut model = CpModel::new(self.model.name.clone(), horizon);
        let mut warnings = Vec::new();

        for group in &self.plan.groups {
            if group.tracks < 1 && !group.members.is_empty() {
                return Err(ScheduleError::InvalidCapacity(format!(
                    "group '{}' has no tracks for {} tasks",
                    group.name,
                    group.members.len()
                )));
            }
            let spans: Vec<(i64, i64)> = group
                .members
                .iter()
                .filter_map(|&i| self.blocked_span(i))
                .collect();
            let peak = peak_overlap(&spans);
            if peak as i64 > group.tracks {
                return Err(ScheduleError::InvalidCapacity(format!(
                    "group '{}' has {peak} in-progress tasks running at once but {} tracks",
                    group.name, group.tracks
                )));
            }
        }

        // Variables
        let mut vars = Vec::with_capacity(self.tasks.len());
        for (i, planned) in self.tasks.planned.iter().enumerate() {
            let id = planned.id();
            let track_var = |model: &mut CpModel| {
                self.plan.group_of(i).map(|g| {
                    let tracks = self.plan.groups[g].tracks;
                    (g, model.new_int_var(0, tracks - 1, format!("{id}.track")))
                })
            };
            let v = match planned.placement {
                Placement::Fixed { start, end, .. } => {
                    let blocked = self
                        .plan
                        .group_of(i)
                        .and_then(|_| self.blocked_span(i));
                    match blocked {
                        Some((from, to)) => {
                            let s = model.new_int_var(from, from, format!("{id}.start"));
                            let e = model.new_int_var(to, to, format!("{id}.end"));
                            let interval = model.new_interval(s, e, to - from, id);
                            TaskVars::Fixed {
                                start,
                                end,
                                interval: Some(interval),
                                track: track_var(&mut model),
                            }
                        }
                        None => TaskVars::Fixed {
                            start,
                            end,
                            interval: None,
                            track: None,
                        },
                    }
                }
                Placement::Free { duration } => {
                    let start = model.new_int_var(self.release, horizon, format!("{id}.start"));
                    let end = model.new_int_var(self.release, horizon, format!("{id}.end"));
                    let interval = model.new_interval(start, end, duration, id);
                    TaskVars::Free {
                        start,
                        end,
                        interval,
                        track: track_var(&mut model),
                    }
                }
            };
            vars.push(v);
        }

        // Precedence
        let (links, skipped_links) = self.add_precedences(&mut model, &vars, &mut warnings);

        // Capacity
        for (g, group) in self.plan.groups.iter().enumerate() {
            let members: Vec<TrackMember> = group
                .members
                .iter()
                .filter_map(|&i| vars[i].track_member())
                .filter(|(tg, _)| *tg == g)
                .map(|(_, m)| m)
                .collect();
            if !members.is_empty() {
                model.add_no_overlap_on_tracks(group.tracks, members);
            }
        }

        // Objective: makespan
        let mut terms: Vec<Term> = vars
            .iter()
            .filter(|v| matches!(v, TaskVars::Free { .. }))
            .map(TaskVars::end_term)
            .collect();
        terms.push(Term::Const(self.tasks.latest_fixed_end().unwrap_or(0)));
        model.minimize_max(terms);

        let groups = self
            .plan
            .groups
            .iter()
            .map(|g| GroupSummary {
                name: g.name.clone(),
                tracks: g.tracks,
                members: g.members.len(),
                fixed_members: g
                    .members
                    .iter()
                    .filter(|&&i| self.tasks.planned[i].is_fixed())
                    .count(),
            })
            .collect();

        debug!(
            horizon,
            vars = model.var_count(),
            intervals = model.interval_count(),
            constraints = model.constraint_count(),
            links = links.len(),
            skipped = skipped_links.len(),
            "built constraint model"
        );

        Ok(BuiltModel {
            model,
            scenario: self.plan.scenario.clone(),
            pool_size: self.plan.pool_size,
            horizon,
            release: self.release,
            tasks: vars,
            groups,
            links,
            skipped_links,
            warnings,
        })
    }

    /// Posts one constraint per usable relationship.
    fn add_precedences(
        &self,
        model: &mut CpModel,
        vars: &[TaskVars],
        warnings: &mut Vec<ScheduleWarning>,
    ) -> (Vec<ModeledLink>, Vec<SkippedLink>) {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut links = Vec::new();
        let mut skipped = Vec::new();
        let skip = |rel: &Relationship, reason| SkippedLink {
            predecessor: rel.predecessor.clone(),
            successor: rel.successor.clone(),
            reason,
        };

        for rel in &self.model.relationships {
            if !seen.insert((rel.predecessor.as_str(), rel.successor.as_str())) {
                warnings.push(ScheduleWarning::DuplicateRelationship {
                    predecessor: rel.predecessor.clone(),
                    successor: rel.successor.clone(),
                });
                skipped.push(skip(rel, SkipReason::Duplicate));
                continue;
            }

            let (pred, succ) = match (
                self.tasks.position(&rel.predecessor),
                self.tasks.position(&rel.successor),
            ) {
                (Some(p), Some(s)) => (vars[p], vars[s]),
                (p, _) => {
                    let missing = if p.is_none() {
                        &rel.predecessor
                    } else {
                        &rel.successor
                    };
                    warnings.push(dangling(rel, missing));
                    skipped.push(skip(
                        rel,
                        SkipReason::Dangling {
                            missing: missing.clone(),
                        },
                    ));
                    continue;
                }
            };

            if matches!(
                (pred, succ),
                (TaskVars::Fixed { .. }, TaskVars::Fixed { .. })
            ) {
                skipped.push(skip(rel, SkipReason::BothFixed));
                continue;
            }

            let lhs = if rel.link.to_succ_finish() {
                succ.end_term()
            } else {
                succ.start_term()
            };
            let rhs = if rel.link.from_pred_finish() {
                pred.end_term()
            } else {
                pred.start_term()
            };
            let lag = self.rate.days_to_units(rel.lag_days);
            model.add_greater_or_equal(lhs, rhs, lag);
            links.push(ModeledLink {
                predecessor: rel.predecessor.clone(),
                successor: rel.successor.clone(),
                link: rel.link,
                lag,
            });
        }

        (links, skipped)
    }
}

fn dangling(rel: &Relationship, missing: &str) -> ScheduleWarning {
    ScheduleWarning::DanglingRelationship {
        predecessor: rel.predecessor.clone(),
        successor: rel.successor.clone(),
        reason: format!("task '{missing}' is not optimized"),
    }
}

/// Largest number of half-open spans covering one instant.
fn peak_overlap(spans: &[(i64, i64)]) -> usize {
    let mut events: Vec<(i64, i32)> = spans
        .iter()
        .flat_map(|&(s, e)| [(s, 1), (e, -1)])
        .collect();
    // ends sort before starts at the same instant
    events.sort_unstable();
    let mut running = 0i32;
    let mut peak = 0i32;
    for (_, delta) in events {
        running += delta;
        peak = peak.max(running);
    }
    peak as usize
}
