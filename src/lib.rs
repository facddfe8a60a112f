//! Resource-constrained schedule optimization for construction crews.
//!
//! Turns a normalized project schedule (tasks, durations, precedence links,
//! resource assignments, calendars) into a constraint model, minimizes the
//! project makespan under crew capacity, and maps the solution back into
//! dates and `<group> - Sub <k>` track labels.
//!
//! # Modules
//!
//! - **`models`**: Normalized schedule (`ScheduleModel`, `Task`,
//!   `Relationship`, `WorkCalendar`) and the optimized result
//!   (`OptimizedSchedule`)
//! - **`validation`**: Input integrity checks (duplicate IDs, self-links,
//!   invalid durations, precedence cycles)
//! - **`partition`**: Fixed vs. free tasks, summary/hammock exclusion
//! - **`grouping`**: Auto-assign pool and sub-crew grouping strategies
//! - **`builder`**: CP model construction
//! - **`cp`**: Constraint engine (`CpModel`, `CpSolver`, `PumpkinSolver`)
//! - **`solve`**: Solver invocation and diagnostics
//! - **`interpret`** / **`output`**: Solution decoding, labels, export
//! - **`optimizer`**: The end-to-end pipeline
//! - **`config`**: Run configuration (TOML)
//! - **`kpi`** / **`overview`**: Schedule metrics and pre-run summary
//!
//! # Example
//! ```no_run
//! use crew_schedule::config::{OptimizerConfig, Scenario};
//! use crew_schedule::models::{JsonScheduleSource, ScheduleSource};
//!
//! # fn main() -> Result<(), crew_schedule::ScheduleError> {
//! let model = JsonScheduleSource::new("project.json").load()?;
//! let config = OptimizerConfig::default()
//!     .with_scenario(Scenario::SubCrew)
//!     .with_pool_size(2);
//! let schedule = crew_schedule::optimize(&model, &config)?;
//! println!("{}", crew_schedule::output::render_table(&schedule));
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Brucker (2007), "Scheduling Algorithms"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

pub mod builder;
pub mod config;
pub mod cp;
pub mod error;
pub mod grouping;
pub mod interpret;
pub mod kpi;
pub mod models;
pub mod optimizer;
pub mod output;
pub mod overview;
pub mod partition;
pub mod solve;
pub mod validation;

pub use error::{ScheduleError, ScheduleWarning};
pub use optimizer::{optimize, Optimizer};
