//! Optimizer configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! scenario = "sub-crew"
//! resource_pool_size = 2
//! solve_deadline_secs = 20.0
//! solver_threads = 4
//! respect_data_date = true
//! accept_feasible = true
//!
//! [sub_crews]
//! "Crew A" = 3
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cp;
use crate::error::ScheduleError;
use crate::grouping::{GroupingStrategy, DEFAULT_POOL_NAME};
use crate::solve::SolveBudget;

/// Longest accepted solver deadline: one day.
pub const MAX_DEADLINE_SECS: f64 = 86_400.0;

/// Assignment strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Scenario 1: one global pool of interchangeable tracks.
    AutoAssign,
    /// Scenario 2: each resource group gets its own tracks.
    #[default]
    SubCrew,
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AutoAssign => "auto-assign",
            Self::SubCrew => "sub-crew",
        })
    }
}

impl FromStr for Scenario {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto-assign" | "auto" | "1" => Ok(Self::AutoAssign),
            "sub-crew" | "subcrew" | "2" => Ok(Self::SubCrew),
            other => Err(ScheduleError::Config(format!(
                "unknown scenario '{other}'; expected 'auto-assign' or 'sub-crew'"
            ))),
        }
    }
}

/// Configuration of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub scenario: Scenario,
    /// Tracks in the global pool (auto-assign) or per group (sub-crew).
    pub resource_pool_size: i64,
    /// Per-group track counts overriding `resource_pool_size` (sub-crew).
    pub sub_crews: BTreeMap<String, i64>,
    /// Group name of the auto-assign pool, used in track labels.
    pub pool_name: String,
    /// Wall-clock solver deadline.
    pub solve_deadline_secs: f64,
    /// Solver worker threads (defaults to the number of CPU cores).
    pub solver_threads: Option<usize>,
    /// Free tasks cannot start before the data date.
    pub respect_data_date: bool,
    /// Return a non-proven (`Feasible`) schedule instead of failing.
    pub accept_feasible: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::default(),
            resource_pool_size: 1,
            sub_crews: BTreeMap::new(),
            pool_name: DEFAULT_POOL_NAME.to_string(),
            solve_deadline_secs: 20.0,
            solver_threads: None,
            respect_data_date: true,
            accept_feasible: true,
        }
    }
}

impl OptimizerConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ScheduleError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScheduleError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ScheduleError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn with_pool_size(mut self, size: i64) -> Self {
        self.resource_pool_size = size;
        self
    }

    pub fn with_sub_crews(mut self, group: impl Into<String>, tracks: i64) -> Self {
        self.sub_crews.insert(group.into(), tracks);
        self
    }

    pub fn with_deadline_secs(mut self, secs: f64) -> Self {
        self.solve_deadline_secs = secs;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.solver_threads = Some(threads);
        self
    }

    /// Rejects invalid settings before any model is built.
    ///
    /// # Errors
    /// - [`ScheduleError::InvalidCapacity`] for pool or sub-crew sizes below 1
    /// - [`ScheduleError::Config`] for everything else
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.resource_pool_size < 1 {
            return Err(ScheduleError::InvalidCapacity(format!(
                "resource_pool_size must be at least 1, got {}",
                self.resource_pool_size
            )));
        }
        if let Some((group, n)) = self.sub_crews.iter().find(|(_, &n)| n < 1) {
            return Err(ScheduleError::InvalidCapacity(format!(
                "sub_crews for '{group}' must be at least 1, got {n}"
            )));
        }
        if self.scenario == Scenario::AutoAssign && !self.sub_crews.is_empty() {
            return Err(ScheduleError::Config(
                "sub_crews only apply to the sub-crew scenario".into(),
            ));
        }
        if self.pool_name.trim().is_empty() {
            return Err(ScheduleError::Config("pool_name must not be empty".into()));
        }
        if !(0.0..=MAX_DEADLINE_SECS).contains(&self.solve_deadline_secs) {
            return Err(ScheduleError::Config(format!(
                "solve_deadline_secs must be between 0 and {MAX_DEADLINE_SECS}, got {}",
                self.solve_deadline_secs
            )));
        }
        if self.solver_threads == Some(0) {
            return Err(ScheduleError::Config(
                "solver_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolves the number of solver threads.
    pub fn resolve_threads(&self) -> usize {
        self.solver_threads.unwrap_or_else(cp::default_workers)
    }

    /// Grouping strategy for the configured scenario.
    pub fn strategy(&self) -> GroupingStrategy {
        match self.scenario {
            Scenario::AutoAssign => GroupingStrategy::AutoAssign {
                pool_size: self.resource_pool_size,
                pool_name: self.pool_name.trim().to_string(),
            },
            Scenario::SubCrew => GroupingStrategy::SubCrew {
                default_size: self.resource_pool_size,
                overrides: self
                    .sub_crews
                    .iter()
                    .map(|(k, &v)| (k.trim().to_string(), v))
                    .collect(),
            },
        }
    }

    /// Solver budget for the configured deadline and threads.
    ///
    /// Deadlines outside what [`validate`](Self::validate) accepts are
    /// clamped into `[0, MAX_DEADLINE_SECS]`; NaN becomes zero.
    pub fn budget(&self) -> SolveBudget {
        let secs = self.solve_deadline_secs.clamp(0.0, MAX_DEADLINE_SECS);
        SolveBudget::new(
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO),
            self.resolve_threads(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = OptimizerConfig::default();
        assert_eq!(c.scenario, Scenario::SubCrew);
        assert_eq!(c.resource_pool_size, 1);
        assert!(c.accept_feasible);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let c = OptimizerConfig::from_toml(
            r#"
scenario = "auto-assign"
resource_pool_size = 3
solve_deadline_secs = 5.5
solver_threads = 2
"#,
        )
        .unwrap();
        assert_eq!(c.scenario, Scenario::AutoAssign);
        assert_eq!(c.resource_pool_size, 3);
        assert_eq!(c.resolve_threads(), 2);
        assert_eq!(c.budget().deadline, Duration::from_millis(5500));
        assert!(c.respect_data_date);
    }

    #[test]
    fn test_sub_crew_overrides() {
        let c = OptimizerConfig::from_toml(
            r#"
resource_pool_size = 2

[sub_crews]
" Crew A " = 4
"#,
        )
        .unwrap();
        match c.strategy() {
            GroupingStrategy::SubCrew {
                default_size,
                overrides,
            } => {
                assert_eq!(default_size, 2);
                assert_eq!(overrides.get("Crew A"), Some(&4));
            }
            other => panic!("unexpected strategy {other:?}"),
        }
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            OptimizerConfig::from_toml("resource_pool_size = \"many\""),
            Err(ScheduleError::Toml(_))
        ));
    }

    #[test]
    fn test_validate_rejects() {
        let zero = OptimizerConfig::default().with_pool_size(0);
        assert!(matches!(zero.validate(), Err(ScheduleError::InvalidCapacity(_))));

        let bad_override = OptimizerConfig::default().with_sub_crews("X", 0);
        assert!(matches!(
            bad_override.validate(),
            Err(ScheduleError::InvalidCapacity(_))
        ));

        let mixed = OptimizerConfig::default()
            .with_scenario(Scenario::AutoAssign)
            .with_sub_crews("X", 2);
        assert!(matches!(mixed.validate(), Err(ScheduleError::Config(_))));

        let threads = OptimizerConfig::default().with_threads(0);
        assert!(matches!(threads.validate(), Err(ScheduleError::Config(_))));

        let deadline = OptimizerConfig::default().with_deadline_secs(f64::NAN);
        assert!(deadline.validate().is_err());
    }

    #[test]
    fn test_huge_deadline_rejected_and_clamped() {
        let huge = OptimizerConfig::default().with_deadline_secs(1e300);
        assert!(matches!(huge.validate(), Err(ScheduleError::Config(ref m)) if m.contains("solve_deadline_secs")));
        assert_eq!(huge.budget().deadline, Duration::from_secs(86_400));

        let inf = OptimizerConfig::default().with_deadline_secs(f64::INFINITY);
        assert!(inf.validate().is_err());
        assert_eq!(inf.budget().deadline, Duration::from_secs(86_400));

        let nan = OptimizerConfig::default().with_deadline_secs(f64::NAN);
        assert_eq!(nan.budget().deadline, Duration::ZERO);

        let day = OptimizerConfig::default().with_deadline_secs(MAX_DEADLINE_SECS);
        assert!(day.validate().is_ok());
    }

    #[test]
    fn test_default_threads_match_solver_default() {
        let c = OptimizerConfig::default();
        assert_eq!(c.resolve_threads(), cp::SolverConfig::default().num_workers);
        assert_eq!(c.budget().workers, cp::default_workers());
    }

    #[test]
    fn test_scenario_from_str() {
        assert_eq!("Auto-Assign".parse::<Scenario>().unwrap(), Scenario::AutoAssign);
        assert_eq!("2".parse::<Scenario>().unwrap(), Scenario::SubCrew);
        assert!("both".parse::<Scenario>().is_err());
        assert_eq!(Scenario::SubCrew.to_string(), "sub-crew");
    }
}
