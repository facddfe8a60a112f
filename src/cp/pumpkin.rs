//! Adapter onto the Pumpkin lazy-clause-generation solver.
//!
//! # Encoding
//!
//! | Model                      | Pumpkin                                      |
//! |----------------------------|----------------------------------------------|
//! | integer variable `[lb, ub]`| bounded integer                              |
//! | interval `end = start + n` | two linear inequalities                      |
//! | `lhs >= rhs + offset`      | `greater_than_or_equals` over scaled views   |
//! | no-overlap on `N` tracks   | `cumulative`, unit demand, capacity `N`      |
//! | minimize max               | makespan variable above every term, minimised|
//!
//! Track variables are not searched. The cumulative constraint bounds the
//! number of members running at once, and [`super::tracks`] turns that into
//! concrete tracks once a solution is known.
//!
//! Workers form a small portfolio over one encoding: the first improves
//! solutions from above (linear SAT-UNSAT), the second raises the bound from
//! below (linear UNSAT-SAT). The first proof stops the other worker.
//!
//! A second phase holds the objective at the value found and minimises the
//! sum of the objective terms, so tasks finish as early as the makespan
//! allows. It runs on whatever remains of the time budget; when it finds
//! nothing the first-phase solution stands.
//!
//! # Reference
//! - Schutt et al. (2011), "Explaining the cumulative propagator"
//! - Flippo et al. (2024), "A Multi-Stage Proof Logging Framework to Certify
//!   the Correctness of CP Solvers"

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pumpkin_solver::constraints as cp;
use pumpkin_solver::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_solver::optimisation::linear_unsat_sat::LinearUnsatSat;
use pumpkin_solver::optimisation::OptimisationDirection;
use pumpkin_solver::results::{OptimisationResult, ProblemSolution, SolutionReference};
use pumpkin_solver::termination::{TerminationCondition, TimeBudget};
use pumpkin_solver::variables::{DomainId, TransformableVariable};
use pumpkin_solver::Solver;
use tracing::{debug, warn};

use super::model::{CpConstraint, CpModel, Objective, Term};
use super::solver::{CpSolution, CpSolver, SolverConfig, SolverStats, SolverStatus};
use super::tracks;

/// Search strategies, in the order workers pick them.
const PORTFOLIO: [Strategy; 2] = [Strategy::SatUnsat, Strategy::UnsatSat];

/// CP solver backed by `pumpkin-solver`.
///
/// Ties between tracks are broken deterministically: members are assigned,
/// in order of start and then insertion, to the lowest-numbered free track.
/// Every variable is moved to its earliest value that keeps the track
/// sequences, so equal models give equal schedules.
#[derive(Debug, Clone, Default)]
pub struct PumpkinSolver;

impl PumpkinSolver {
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for PumpkinSolver {
    fn name(&self) -> &str {
        "pumpkin"
    }

    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();
        let workers = config.num_workers.clamp(1, PORTFOLIO.len());
        let finding = portfolio(model, Goal::Makespan, config.time_limit, workers);

        let mut stats = SolverStats {
            elapsed: started.elapsed(),
            workers,
            strategy: String::new(),
        };
        let Some(Finding {
            status,
            mut values,
            strategy,
        }) = finding
        else {
            return CpSolution::without_values(SolverStatus::Unknown, stats);
        };
        stats.strategy = strategy.name().to_string();

        if !status.is_solution_found() {
            debug!(?status, strategy = strategy.name(), "search finished without solution");
            return CpSolution::without_values(status, stats);
        }

        let remaining = config.time_limit.saturating_sub(started.elapsed());
        if let Some(bound) = model.objective_value(&values).filter(|_| !remaining.is_zero()) {
            let never = AtomicBool::new(false);
            let (compact, compacted) =
                search(model, Strategy::SatUnsat, Goal::Compact { bound }, remaining, &never);
            if compact.is_solution_found() {
                values = compacted;
            } else {
                debug!(?compact, "compaction found nothing, keeping first solution");
            }
        }

        tracks::assign_tracks(model, &mut values);
        if tracks::left_justify(model, &mut values) {
            tracks::assign_tracks(model, &mut values);
        } else {
            warn!(model = model.name(), "solver assignment violates the model, kept as is");
        }
        let objective = model.objective_value(&values);
        stats.elapsed = started.elapsed();
        debug!(?status, ?objective, strategy = strategy.name(), "search finished");
        CpSolution::new(status, values, objective, stats)
    }
}

/// Runs one worker per strategy and keeps the best finding.
fn portfolio(model: &CpModel, goal: Goal, budget: Duration, workers: usize) -> Option<Finding> {
    let stop = AtomicBool::new(false);
    let kept: Mutex<Option<Finding>> = Mutex::new(None);

    std::thread::scope(|scope| {
        let mut spawned = 0usize;
        for &strategy in &PORTFOLIO[..workers] {
            let (stop, kept) = (&stop, &kept);
            let handle = std::thread::Builder::new()
                .name(format!("cp-{}", strategy.name()))
                .spawn_scoped(scope, move || run_worker(model, strategy, goal, budget, stop, kept));
            match handle {
                Ok(_) => spawned += 1,
                Err(e) => warn!(strategy = strategy.name(), error = %e, "failed to spawn search worker"),
            }
        }
        if spawned == 0 {
            run_worker(model, PORTFOLIO[0], goal, budget, &stop, &kept);
        }
    });

    kept.into_inner()
}

/// What a search minimises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Goal {
    /// The model objective.
    Makespan,
    /// The sum of objective terms, with the objective held at `bound`.
    Compact { bound: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    SatUnsat,
    UnsatSat,
}

impl Strategy {
    fn name(self) -> &'static str {
        match self {
            Self::SatUnsat => "linear-sat-unsat",
            Self::UnsatSat => "linear-unsat-sat",
        }
    }
}

/// Outcome of one worker.
struct Finding {
    status: SolverStatus,
    values: Vec<i64>,
    strategy: Strategy,
}

impl Finding {
    /// Proofs beat solutions, solutions beat nothing.
    fn rank(&self) -> u8 {
        match self.status {
            SolverStatus::Optimal | SolverStatus::Infeasible => 2,
            SolverStatus::Feasible => 1,
            SolverStatus::Unknown => 0,
        }
    }

    fn better_than(&self, model: &CpModel, other: &Finding) -> bool {
        match self.rank().cmp(&other.rank()) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            // only unproven solutions compete on their objective
            std::cmp::Ordering::Equal if self.status == SolverStatus::Feasible => {
                let mine = model.objective_value(&self.values);
                let theirs = model.objective_value(&other.values);
                matches!((mine, theirs), (Some(a), Some(b)) if a < b)
            }
            std::cmp::Ordering::Equal => false,
        }
    }
}

fn run_worker(
    model: &CpModel,
    strategy: Strategy,
    goal: Goal,
    budget: Duration,
    stop: &AtomicBool,
    kept: &Mutex<Option<Finding>>,
) {
    let (status, values) = search(model, strategy, goal, budget, stop);
    debug!(strategy = strategy.name(), ?status, "worker finished");
    if matches!(status, SolverStatus::Optimal | SolverStatus::Infeasible) {
        stop.store(true, Ordering::SeqCst);
    }
    let finding = Finding {
        status,
        values,
        strategy,
    };
    let mut kept = kept.lock();
    if kept.as_ref().map_or(true, |k| finding.better_than(model, k)) {
        *kept = Some(finding);
    }
}

/// Stops on the time budget or when another worker has a proof.
struct Interruptible<'a> {
    budget: TimeBudget,
    stop: &'a AtomicBool,
}

impl TerminationCondition for Interruptible<'_> {
    fn should_stop(&mut self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.budget.should_stop()
    }
}

fn ignore_solution<B>(_: &Solver, _: SolutionReference, _: &B) {}

fn search(
    model: &CpModel,
    strategy: Strategy,
    goal: Goal,
    budget: Duration,
    stop: &AtomicBool,
) -> (SolverStatus, Vec<i64>) {
    let Encoded {
        mut solver,
        vars,
        target,
    } = match encode(model, goal) {
        Ok(encoded) => encoded,
        Err(EncodeError::Infeasible) => return (SolverStatus::Infeasible, Vec::new()),
        Err(EncodeError::OutOfRange(what)) => {
            warn!(model = model.name(), %what, "value does not fit the solver's 32-bit domains");
            return (SolverStatus::Unknown, Vec::new());
        }
    };

    let mut brancher = solver.default_brancher();
    let mut termination = Interruptible {
        budget: TimeBudget::starting_now(budget),
        stop,
    };
    let result = match strategy {
        Strategy::SatUnsat => solver.optimise(
            &mut brancher,
            &mut termination,
            LinearSatUnsat::new(OptimisationDirection::Minimise, target, ignore_solution),
        ),
        Strategy::UnsatSat => solver.optimise(
            &mut brancher,
            &mut termination,
            LinearUnsatSat::new(OptimisationDirection::Minimise, target, ignore_solution),
        ),
    };

    match result {
        OptimisationResult::Optimal(solution) => (SolverStatus::Optimal, read_values(&solution, &vars)),
        OptimisationResult::Satisfiable(solution) => {
            (SolverStatus::Feasible, read_values(&solution, &vars))
        }
        OptimisationResult::Unsatisfiable => (SolverStatus::Infeasible, Vec::new()),
        OptimisationResult::Unknown => (SolverStatus::Unknown, Vec::new()),
    }
}

fn read_values<S: ProblemSolution>(solution: &S, vars: &[DomainId]) -> Vec<i64> {
    vars.iter()
        .map(|&v| i64::from(solution.get_integer_value(v)))
        .collect()
}

/// A model posted into a fresh Pumpkin solver.
struct Encoded {
    solver: Solver,
    /// Pumpkin variable per model variable, by index.
    vars: Vec<DomainId>,
    /// Variable to minimise.
    target: DomainId,
}

#[derive(Debug)]
enum EncodeError {
    /// Proven at posting time.
    Infeasible,
    /// A bound or size outside `i32`.
    OutOfRange(String),
}

fn narrow(value: i64, what: &str) -> Result<i32, EncodeError> {
    i32::try_from(value).map_err(|_| EncodeError::OutOfRange(format!("{what} = {value}")))
}

fn posted<E>(result: Result<(), E>) -> Result<(), EncodeError> {
    result.map_err(|_| EncodeError::Infeasible)
}

fn encode(model: &CpModel, goal: Goal) -> Result<Encoded, EncodeError> {
    let mut solver = Solver::default();
    let tag = solver.new_constraint_tag();

    let mut vars = Vec::with_capacity(model.var_count());
    for var in model.vars() {
        if var.lb > var.ub {
            return Err(EncodeError::Infeasible);
        }
        let lb = narrow(var.lb, &var.name)?;
        let ub = narrow(var.ub, &var.name)?;
        vars.push(solver.new_bounded_integer(lb, ub));
    }

    for iv in model.intervals() {
        let (start, end) = (vars[iv.start.index()], vars[iv.end.index()]);
        let size = narrow(iv.size, &iv.name)?;
        posted(
            solver
                .add_constraint(cp::greater_than_or_equals(
                    vec![end.scaled(1), start.scaled(-1)],
                    size,
                    tag,
                ))
                .post(),
        )?;
        posted(
            solver
                .add_constraint(cp::greater_than_or_equals(
                    vec![start.scaled(1), end.scaled(-1)],
                    -size,
                    tag,
                ))
                .post(),
        )?;
    }

    for constraint in model.constraints() {
        match constraint {
            CpConstraint::GreaterOrEqual { lhs, rhs, offset } => {
                // lhs - rhs >= offset
                if lhs == rhs {
                    if *offset > 0 {
                        return Err(EncodeError::Infeasible);
                    }
                    continue;
                }
                let mut terms = Vec::with_capacity(2);
                let mut bound = *offset;
                match *lhs {
                    Term::Var(v) => terms.push(vars[v.index()].scaled(1)),
                    Term::Const(c) => bound -= c,
                }
                match *rhs {
                    Term::Var(v) => terms.push(vars[v.index()].scaled(-1)),
                    Term::Const(c) => bound += c,
                }
                if terms.is_empty() {
                    if bound > 0 {
                        return Err(EncodeError::Infeasible);
                    }
                    continue;
                }
                let bound = narrow(bound, "offset")?;
                posted(
                    solver
                        .add_constraint(cp::greater_than_or_equals(terms, bound, tag))
                        .post(),
                )?;
            }
            CpConstraint::NoOverlapOnTracks { tracks, members } => {
                let mut starts = Vec::with_capacity(members.len());
                let mut durations = Vec::with_capacity(members.len());
                for member in members {
                    let iv = model.interval(member.interval);
                    if iv.size <= 0 {
                        continue;
                    }
                    starts.push(vars[iv.start.index()]);
                    durations.push(narrow(iv.size, &iv.name)?);
                }
                if starts.is_empty() {
                    continue;
                }
                if *tracks < 1 {
                    return Err(EncodeError::Infeasible);
                }
                let demands = vec![1; starts.len()];
                let capacity = narrow(*tracks, "tracks")?;
                posted(
                    solver
                        .add_constraint(cp::cumulative(starts, durations, demands, capacity, tag))
                        .post(),
                )?;
            }
        }
    }

    let mut floor: Option<i64> = None;
    let mut terms = Vec::new();
    if let Some(Objective::MinimizeMax(objective)) = model.objective() {
        for term in objective {
            match *term {
                Term::Var(v) => terms.push(v),
                Term::Const(c) => floor = Some(floor.map_or(c, |f| f.max(c))),
            }
        }
    }
    let lb = floor
        .or_else(|| terms.iter().map(|v| model.var(*v).lb).min())
        .unwrap_or(0);
    let ub = terms
        .iter()
        .map(|v| model.var(*v).ub)
        .chain(floor)
        .fold(model.horizon().max(lb), i64::max);
    let makespan = solver.new_bounded_integer(narrow(lb, "makespan")?, narrow(ub, "makespan")?);
    for v in &terms {
        posted(
            solver
                .add_constraint(cp::greater_than_or_equals(
                    vec![makespan.scaled(1), vars[v.index()].scaled(-1)],
                    0,
                    tag,
                ))
                .post(),
        )?;
    }

    let target = match goal {
        Goal::Makespan => makespan,
        Goal::Compact { bound } => {
            // makespan <= bound
            posted(
                solver
                    .add_constraint(cp::greater_than_or_equals(
                        vec![makespan.scaled(-1)],
                        narrow(-bound, "bound")?,
                        tag,
                    ))
                    .post(),
            )?;
            let lo: i64 = terms.iter().map(|v| model.var(*v).lb).sum();
            let hi: i64 = terms.iter().map(|v| model.var(*v).ub).sum();
            let total = solver.new_bounded_integer(narrow(lo, "sum")?, narrow(hi, "sum")?);
            let mut sum = Vec::with_capacity(terms.len() + 1);
            sum.push(total.scaled(1));
            sum.extend(terms.iter().map(|v| vars[v.index()].scaled(-1)));
            posted(
                solver
                    .add_constraint(cp::greater_than_or_equals(sum, 0, tag))
                    .post(),
            )?;
            total
        }
    };

    Ok(Encoded {
        solver,
        vars,
        target,
    })
}
