//! End-to-end optimization pipeline.
//!
//! ```text
//! ScheduleModel ─ validate ─ CalendarRate ─ partition ─ group ─ build ─ solve ─ interpret ─ assemble
//! ```
//!
//! Every stage before `solve` fails fast with a validation-class
//! [`ScheduleError`]; nothing is submitted to the solver unless the whole
//! model is consistent. A run owns all of its intermediate state, so
//! [`optimize`] is a pure function of (model, configuration, solver).

use tracing::{info, info_span, warn};

use crate::builder::ScheduleCpBuilder;
use crate::config::OptimizerConfig;
use crate::cp::{CpSolver, PumpkinSolver, SolverStatus};
use crate::error::ScheduleError;
use crate::interpret::interpret;
use crate::models::{CalendarRate, ScheduleModel};
use crate::output::{OptimizedSchedule, OutputAssembler, Verdict};
use crate::partition::partition_tasks;
use crate::solve::solve_model;
use crate::validation::validate_model;

/// Optimizes a schedule with the bundled solver.
pub fn optimize(
    model: &ScheduleModel,
    config: &OptimizerConfig,
) -> Result<OptimizedSchedule, ScheduleError> {
    Optimizer::new(PumpkinSolver::new()).optimize(model, config)
}

/// Optimization pipeline over a CP engine.
#[derive(Debug, Clone, Default)]
pub struct Optimizer<S> {
    solver: S,
}

impl<S: CpSolver> Optimizer<S> {
    pub fn new(solver: S) -> Self {
        Self { solver }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Runs the full pipeline.
    ///
    /// # Errors
    /// - validation-class errors (see [`ScheduleError::is_validation`])
    ///   before any solver submission
    /// - [`ScheduleError::ModelInfeasible`] if the solver proves infeasibility
    /// - [`ScheduleError::SolveTimedOut`] if the deadline passes without a
    ///   solution, or with an unproven one when `accept_feasible` is off
    pub fn optimize(
        &self,
        model: &ScheduleModel,
        config: &OptimizerConfig,
    ) -> Result<OptimizedSchedule, ScheduleError> {
        let span = info_span!("optimize", project = %model.name, scenario = %config.scenario);
        let _enter = span.enter();

        config.validate()?;
        let mut warnings = validate_model(model).map_err(ScheduleError::InvalidModel)?;
        let rate = CalendarRate::resolve(model.default_calendar.as_ref())?;
        let tasks = partition_tasks(model, &rate)?;
        let plan = config.strategy().group(&tasks)?;
        warnings.extend(plan.warnings.iter().cloned());

        let release = match (config.respect_data_date, model.data_date) {
            (true, Some(date)) => rate.date_to_offset(model.project_start, date).max(0),
            _ => 0,
        };
        let built = ScheduleCpBuilder::new(model, &tasks, &plan, rate)
            .with_release(release)
            .build()?;
        warnings.extend(built.warnings.iter().cloned());
        for w in &warnings {
            warn!("{w}");
        }

        let report = solve_model(&built, &self.solver, &config.budget());
        let verdict = match report.status() {
            SolverStatus::Optimal => Verdict::Optimal,
            SolverStatus::Feasible => Verdict::Feasible,
            SolverStatus::Infeasible => {
                return Err(ScheduleError::ModelInfeasible(Box::new(report.diagnostics)))
            }
            SolverStatus::Unknown => {
                return Err(ScheduleError::SolveTimedOut {
                    diagnostics: Box::new(report.diagnostics),
                    best: None,
                })
            }
        };

        let solved = interpret(&built, &plan, &report.solution);
        let schedule = OutputAssembler::new(model, &tasks, &plan, rate).assemble(
            &solved,
            verdict,
            &report.solution.stats,
            warnings,
        );

        if verdict == Verdict::Feasible && !config.accept_feasible {
            return Err(ScheduleError::SolveTimedOut {
                diagnostics: Box::new(report.diagnostics),
                best: Some(Box::new(schedule)),
            });
        }

        info!(
            ?verdict,
            makespan_days = schedule.makespan_days,
            finish = %schedule.finish_date,
            "optimization finished"
        );
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scenario;
    use crate::cp::{CpModel, CpSolution, SolverConfig, SolverStats};
    use crate::models::{Relationship, Task};
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn config() -> OptimizerConfig {
        OptimizerConfig::default().with_threads(2)
    }

    /// Solver that never finds anything.
    struct GiveUp;

    impl CpSolver for GiveUp {
        fn name(&self) -> &str {
            "give-up"
        }

        fn solve(&self, _model: &CpModel, _config: &SolverConfig) -> CpSolution {
            CpSolution::without_values(SolverStatus::Unknown, SolverStats::default())
        }
    }

    /// Wraps the bundled solver and downgrades its verdict.
    struct Unproven;

    impl CpSolver for Unproven {
        fn name(&self) -> &str {
            "unproven"
        }

        fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
            let mut sol = PumpkinSolver::new().solve(model, config);
            sol.status = SolverStatus::Feasible;
            sol
        }
    }

    fn model() -> ScheduleModel {
        ScheduleModel::new(date(1))
            .with_task(Task::new("A").with_duration_days(1.0).with_resource("R"))
            .with_task(Task::new("B").with_duration_days(1.0).with_resource("R"))
            .with_relationship(Relationship::finish_to_start("A", "B"))
    }

    #[test]
    fn test_optimize_chain() {
        let s = optimize(&model(), &config()).unwrap();
        assert_eq!(s.makespan, 16);
        assert!(s.is_optimal());
        assert_eq!(s.scenario, "sub-crew");
    }

    #[test]
    fn test_validation_before_solve() {
        let m = model().with_task(Task::new("A"));
        let err = Optimizer::new(GiveUp).optimize(&m, &config()).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidModel(_)));
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_calendar() {
        let m = model().with_calendar(None);
        let err = optimize(&m, &config()).unwrap_err();
        assert!(matches!(err, ScheduleError::Calendar(_)));
    }

    #[test]
    fn test_unknown_is_timeout() {
        let err = Optimizer::new(GiveUp).optimize(&model(), &config()).unwrap_err();
        match err {
            ScheduleError::SolveTimedOut { diagnostics, best } => {
                assert!(best.is_none());
                assert_eq!(diagnostics.status, SolverStatus::Unknown);
                assert_eq!(diagnostics.free_tasks, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_feasible_verdict_policy() {
        let accepted = Optimizer::new(Unproven).optimize(&model(), &config()).unwrap();
        assert_eq!(accepted.verdict, Verdict::Feasible);

        let strict = OptimizerConfig {
            accept_feasible: false,
            ..config()
        };
        match Optimizer::new(Unproven).optimize(&model(), &strict) {
            Err(ScheduleError::SolveTimedOut { best: Some(best), .. }) => {
                assert_eq!(best.makespan, 16);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_data_date_release() {
        let m = model().with_data_date(date(3));
        let s = optimize(&m, &config()).unwrap();
        assert_eq!(s.task("A").unwrap().start_date, date(3));

        let ignore = OptimizerConfig {
            respect_data_date: false,
            ..config()
        };
        let s = optimize(&m, &ignore).unwrap();
        assert_eq!(s.task("A").unwrap().start_date, date(1));
    }

    #[test]
    fn test_auto_assign_scenario() {
        let cfg = config().with_scenario(Scenario::AutoAssign).with_pool_size(2);
        let s = optimize(&model(), &cfg).unwrap();
        assert_eq!(s.scenario, "auto-assign");
        assert_eq!(s.task("B").unwrap().resource, "Crew - Sub 1");
    }
}
