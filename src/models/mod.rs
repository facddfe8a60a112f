//! Normalized schedule model.
//!
//! Data types produced by the ingestion adapter and consumed by every
//! downstream stage, plus the optimized schedule handed to the export layer.
//!
//! # Mappings
//!
//! | crew-schedule | Primavera P6 | MS Project |
//! |---------------|--------------|------------|
//! | Task | Activity | Task |
//! | Relationship | Relationship | Predecessor link |
//! | GroupingKey | UDF value / resource | Resource assignment |
//! | WorkCalendar | Calendar (`day_hr_cnt`) | Default calendar |

mod calendar;
mod project;
mod relationship;
mod schedule;
mod task;

pub use calendar::{CalendarRate, WorkCalendar};
pub use project::{JsonScheduleSource, ScheduleModel, ScheduleSource};
pub use relationship::{LinkType, ParseLinkTypeError, Relationship};
pub use schedule::{OptimizedSchedule, ScheduledTask, SolveSummary, Verdict};
pub use task::{GroupingKey, Task, TaskKind, TaskStatus};
