//! Recurrence rules for repeating events.
//!
//! A [`RecurrenceRule`] is a pure value describing how an event repeats:
//! a pattern, an interval, pattern-specific fields, and at most one bound.
//! Expansion into concrete occurrences lives in [`crate::event::expand`].

use chrono::{DateTime, Utc, Weekday};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How an event repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePattern {
    /// Every `interval` days.
    #[default]
    Daily,
    /// Every `interval` weeks, optionally on specific weekdays.
    Weekly,
    /// Every `interval` months.
    Monthly,
    /// Every `interval` years.
    Yearly,
    /// Every Monday through Friday.
    Weekdays,
    /// No distinct semantics upstream; expands like `Daily`.
    Custom,
}

impl RecurrencePattern {
    /// Get a human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            RecurrencePattern::Daily => "Daily",
            RecurrencePattern::Weekly => "Weekly",
            RecurrencePattern::Monthly => "Monthly",
            RecurrencePattern::Yearly => "Yearly",
            RecurrencePattern::Weekdays => "Weekdays",
            RecurrencePattern::Custom => "Custom",
        }
    }
}

impl std::fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Recurrence configuration for repeating events.
///
/// At most one of `end_after` / `end_date` may be set. With neither, expansion
/// is capped by the safety horizon (two years from the anchor by default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecurrenceRule {
    /// The recurrence pattern.
    pub pattern: RecurrencePattern,
    /// Interval (e.g., every 2 weeks).
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Days of week for weekly patterns. 0 = Sunday, 6 = Saturday.
    /// Empty means "same weekday as the anchor, every `interval` weeks".
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    /// Day of month for monthly/yearly patterns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u32>,
    /// Month of year for yearly patterns. 1 = January.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_of_year: Option<u32>,
    /// Stop after this many occurrences (anchor excluded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_after: Option<u32>,
    /// Inclusive date horizon for occurrences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

fn default_interval() -> u32 {
    1
}

impl RecurrenceRule {
    fn with_pattern(pattern: RecurrencePattern) -> Self {
        Self {
            pattern,
            interval: 1,
            days_of_week: Vec::new(),
            day_of_month: None,
            month_of_year: None,
            end_after: None,
            end_date: None,
        }
    }

    /// Create a daily recurrence.
    pub fn daily() -> Self {
        Self::with_pattern(RecurrencePattern::Daily)
    }

    /// Create a weekly recurrence on the anchor's weekday.
    pub fn weekly() -> Self {
        Self::with_pattern(RecurrencePattern::Weekly)
    }

    /// Create a weekly recurrence on specific days.
    pub fn weekly_on(days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            days_of_week: days
                .into_iter()
                .map(|d| d.num_days_from_sunday() as u8)
                .collect(),
            ..Self::with_pattern(RecurrencePattern::Weekly)
        }
    }

    /// Create a monthly recurrence.
    pub fn monthly() -> Self {
        Self::with_pattern(RecurrencePattern::Monthly)
    }

    /// Create a yearly recurrence.
    pub fn yearly() -> Self {
        Self::with_pattern(RecurrencePattern::Yearly)
    }

    /// Create a Monday-through-Friday recurrence.
    ///
    /// Sugar for a weekly rule on Mon..Fri; the expander skips weekends
    /// directly, so `days_of_week` stays empty.
    pub fn weekdays() -> Self {
        Self::with_pattern(RecurrencePattern::Weekdays)
    }

    /// Set the interval.
    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    /// Pin occurrences to a day of the month (monthly/yearly).
    pub fn on_day(mut self, day: u32) -> Self {
        self.day_of_month = Some(day);
        self
    }

    /// Pin occurrences to a month of the year (yearly).
    pub fn in_month(mut self, month: u32) -> Self {
        self.month_of_year = Some(month);
        self
    }

    /// Bound the series by occurrence count.
    pub fn times(mut self, count: u32) -> Self {
        self.end_after = Some(count);
        self
    }

    /// Bound the series by an inclusive end date.
    pub fn until(mut self, date: DateTime<Utc>) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Whether the rule carries an explicit bound.
    pub fn is_bounded(&self) -> bool {
        self.end_after.is_some() || self.end_date.is_some()
    }

    /// Validate the rule's fields.
    ///
    /// An empty `days_of_week` on a weekly rule is valid and falls back to
    /// the anchor's weekday.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval < 1 {
            return Err(ValidationError::Interval(self.interval));
        }

        if self.end_after.is_some() && self.end_date.is_some() {
            return Err(ValidationError::ConflictingBounds);
        }

        if let Some(count) = self.end_after {
            if count < 1 {
                return Err(ValidationError::EndAfter(count));
            }
        }

        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(ValidationError::DayOfMonth(day));
            }
        }

        if let Some(month) = self.month_of_year {
            if !(1..=12).contains(&month) {
                return Err(ValidationError::MonthOfYear(month));
            }
        }

        for &day in &self.days_of_week {
            if day > 6 {
                return Err(ValidationError::DayOfWeek(day));
            }
        }

        Ok(())
    }
}
