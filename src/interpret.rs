//! Solution interpretation.
//!
//! Reads solved start/end/track values back out of a [`CpSolution`].
//! Fixed tasks keep their pinned offsets; in-progress ones holding a track
//! report the track the solution gave them.

use crate::builder::{BuiltModel, TaskVars};
use crate::cp::{CpSolution, VarId};
use crate::grouping::{GroupingPlan, SubCrewTrack};

/// Solved placement of one planned task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedTask {
    /// Index into [`PartitionedTasks::planned`](crate::partition::PartitionedTasks).
    pub planned: usize,
    pub start: i64,
    pub end: i64,
    /// Track of a capacity member.
    pub track: Option<SubCrewTrack>,
    pub fixed: bool,
}

impl SolvedTask {
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }
}

/// Maps a solution back to planned tasks, in planned order.
///
/// The solution must carry values (`Optimal` or `Feasible`).
pub fn interpret(built: &BuiltModel, plan: &GroupingPlan, solution: &CpSolution) -> Vec<SolvedTask> {
    let value = |v: VarId| {
        solution
            .value(v)
            .unwrap_or_else(|| built.model.var(v).lb)
    };

    let track_of = |track: Option<(usize, VarId)>| {
        track.map(|(g, var)| plan.groups[g].track(value(var).max(0) as usize))
    };

    built
        .tasks
        .iter()
        .enumerate()
        .map(|(planned, vars)| match *vars {
            TaskVars::Fixed {
                start, end, track, ..
            } => SolvedTask {
                planned,
                start,
                end,
                track: track_of(track),
                fixed: true,
            },
            TaskVars::Free {
                start, end, track, ..
            } => SolvedTask {
                planned,
                start: value(start),
                end: value(end),
                track: track_of(track),
                fixed: false,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ScheduleCpBuilder;
    use crate::cp::{CpSolver, PumpkinSolver, SolverConfig};
    use crate::grouping::GroupingStrategy;
    use crate::models::{CalendarRate, ScheduleModel, Task};
    use crate::partition::partition_tasks;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_interpret_parallel_tracks() {
        let m = ScheduleModel::new(date(1))
            .with_task(Task::new("A").with_duration_days(2.0).with_resource("Crew A"))
            .with_task(Task::new("B").with_duration_days(2.0).with_resource("Crew A"))
            .with_task(Task::new("D").completed(date(1), date(2)));
        let rate = CalendarRate::from_hours_per_day(8.0).unwrap();
        let tasks = partition_tasks(&m, &rate).unwrap();
        let plan = GroupingStrategy::sub_crew(2).group(&tasks).unwrap();
        let built = ScheduleCpBuilder::new(&m, &tasks, &plan, rate).build().unwrap();
        let solution = PumpkinSolver::new().solve(&built.model, &SolverConfig::default());

        let solved = interpret(&built, &plan, &solution);
        assert_eq!(solved.len(), 3);
        assert_eq!((solved[0].start, solved[0].end), (0, 16));
        assert_eq!((solved[1].start, solved[1].end), (0, 16));
        assert_eq!(solved[0].track.as_ref().unwrap().label(), "Crew A - Sub 1");
        assert_eq!(solved[1].track.as_ref().unwrap().label(), "Crew A - Sub 2");
        assert!(solved[2].fixed);
        assert_eq!((solved[2].start, solved[2].end), (0, 8));
    }

    #[test]
    fn test_in_progress_task_keeps_its_track() {
        let m = ScheduleModel::new(date(1))
            .with_task(Task::new("A").with_duration_days(2.0).with_resource("Crew A"))
            .with_task(Task::new("P").started(date(1)).with_actual_finish(date(3)).with_resource("Crew A"));
        let rate = CalendarRate::from_hours_per_day(8.0).unwrap();
        let tasks = partition_tasks(&m, &rate).unwrap();
        let plan = GroupingStrategy::sub_crew(1).group(&tasks).unwrap();
        let built = ScheduleCpBuilder::new(&m, &tasks, &plan, rate).build().unwrap();
        let solution = PumpkinSolver::new().solve(&built.model, &SolverConfig::default());

        let solved = interpret(&built, &plan, &solution);
        assert!(solved[1].fixed);
        assert_eq!((solved[1].start, solved[1].end), (0, 16));
        assert_eq!(solved[1].track.as_ref().unwrap().label(), "Crew A - Sub 1");
        // one track, so A waits for P
        assert_eq!((solved[0].start, solved[0].end), (16, 32));
    }
}
