//! Working calendar and the calendar rate resolver.
//!
//! A project's default calendar is reduced to one constant rate
//! (hours per working day). All durations and lags are converted to integer
//! work units (hours) with that rate, and solved offsets are mapped back to
//! dates with it.
//!
//! # Time Model
//! Offsets are work units counted from the project start. One working day
//! maps onto one calendar day: there are no weekends, holidays or other gaps.
//! This is a declared simplification of the engine.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// A working calendar as reported by the ingestion adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    /// Calendar identifier or name.
    pub id: String,
    /// Working hours per day.
    pub hours_per_day: f64,
}

impl WorkCalendar {
    /// Creates a calendar with the given daily hours.
    pub fn new(id: impl Into<String>, hours_per_day: f64) -> Self {
        Self {
            id: id.into(),
            hours_per_day,
        }
    }

    /// The common 8-hour calendar.
    pub fn standard() -> Self {
        Self::new("Standard", 8.0)
    }
}

/// Constant working-time rate used for every duration conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalendarRate {
    hours_per_day: f64,
}

impl CalendarRate {
    /// Resolves the rate from the project's default calendar.
    ///
    /// # Errors
    /// [`ScheduleError::Calendar`] if the calendar is absent or its rate is
    /// zero, negative or not finite.
    pub fn resolve(calendar: Option<&WorkCalendar>) -> Result<Self, ScheduleError> {
        let calendar = calendar
            .ok_or_else(|| ScheduleError::Calendar("project has no default calendar".into()))?;
        Self::from_hours_per_day(calendar.hours_per_day).map_err(|_| {
            ScheduleError::Calendar(format!(
                "calendar '{}' has unusable hours per day: {}",
                calendar.id, calendar.hours_per_day
            ))
        })
    }

    /// Creates a rate directly.
    pub fn from_hours_per_day(hours_per_day: f64) -> Result<Self, ScheduleError> {
        if !hours_per_day.is_finite() || hours_per_day <= 0.0 {
            return Err(ScheduleError::Calendar(format!(
                "hours per day must be positive, got {hours_per_day}"
            )));
        }
        Ok(Self { hours_per_day })
    }

    /// Hours per working day.
    #[inline]
    pub fn hours_per_day(&self) -> f64 {
        self.hours_per_day
    }

    /// Converts calendar days to work units, rounding to the nearest unit.
    #[inline]
    pub fn days_to_units(&self, days: f64) -> i64 {
        (days * self.hours_per_day).round() as i64
    }

    /// Converts work units to (fractional) days.
    #[inline]
    pub fn units_to_days(&self, units: i64) -> f64 {
        units as f64 / self.hours_per_day
    }

    /// Maps a work-unit offset to the calendar date it falls on.
    ///
    /// Partial days are truncated toward the project start. Negative
    /// offsets clamp to the project start.
    pub fn offset_to_date(&self, project_start: NaiveDate, units: i64) -> NaiveDate {
        let whole_days = self.units_to_days(units.max(0)).floor() as u64;
        project_start
            .checked_add_days(Days::new(whole_days))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Maps a date to its work-unit offset from the project start.
    ///
    /// Dates before the start produce negative offsets.
    pub fn date_to_offset(&self, project_start: NaiveDate, date: NaiveDate) -> i64 {
        let days = (date - project_start).num_days();
        self.days_to_units(days as f64)
    }
}
