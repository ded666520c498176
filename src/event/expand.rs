//! Occurrence expansion for recurrence rules.
//!
//! [`Occurrences`] turns an anchor event's `(start, end)` plus a validated
//! [`RecurrenceRule`] into a lazy, finite stream of `(start, end)` pairs.
//! The anchor itself is never yielded; the first item is the occurrence
//! after the anchor. Every yielded occurrence keeps the anchor's duration
//! and time of day.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};

use crate::event::recurrence::{RecurrencePattern, RecurrenceRule};

/// Default safety horizon for unbounded rules, in days.
pub const DEFAULT_SAFETY_HORIZON_DAYS: i64 = 730;

/// Lazy iterator over the occurrences of a recurrence rule.
///
/// Bounded rules stop at `end_after` occurrences or past the inclusive
/// `end_date`; unbounded rules stop at the safety horizon. A candidate that
/// would leave chrono's representable range ends the stream early. Clone
/// before consuming to restart from the anchor.
#[derive(Debug, Clone)]
pub struct Occurrences {
    rule: RecurrenceRule,
    duration: Duration,
    current: DateTime<Utc>,
    anchor_day: u32,
    anchor_month: u32,
    anchor_time: NaiveTime,
    horizon: DateTime<Utc>,
    emitted: u32,
}

impl Occurrences {
    /// Expand from an anchor `(start, end)` with the default safety horizon.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, rule: RecurrenceRule) -> Self {
        Self::with_horizon(start, end, rule, DEFAULT_SAFETY_HORIZON_DAYS)
    }

    /// Expand with an explicit safety horizon (days past the anchor).
    ///
    /// The horizon only applies to rules with neither `end_after` nor
    /// `end_date` set.
    pub fn with_horizon(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rule: RecurrenceRule,
        horizon_days: i64,
    ) -> Self {
        Self {
            duration: end - start,
            current: start,
            anchor_day: start.day(),
            anchor_month: start.month(),
            anchor_time: start.time(),
            horizon: Duration::try_days(horizon_days)
                .and_then(|days| start.checked_add_signed(days))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            emitted: 0,
            rule,
        }
    }

    /// Compute the occurrence after `current`, or `None` if date arithmetic
    /// cannot produce one.
    fn advance(&self, current: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let interval = self.rule.interval as i64;
        match self.rule.pattern {
            // Custom carries no distinct semantics and repeats daily.
            RecurrencePattern::Daily | RecurrencePattern::Custom => {
                current.checked_add_signed(Duration::days(interval))
            }
            RecurrencePattern::Weekly => self.advance_weekly(current),
            RecurrencePattern::Weekdays => {
                let mut candidate = current.checked_add_signed(Duration::days(1))?;
                while is_weekend(candidate.weekday()) {
                    candidate = candidate.checked_add_signed(Duration::days(1))?;
                }
                Some(candidate)
            }
            RecurrencePattern::Monthly => {
                let mut year = current.year();
                let mut month = current.month() as i64 + interval;
                while month > 12 {
                    month -= 12;
                    year += 1;
                }
                let day = self.rule.day_of_month.unwrap_or(self.anchor_day);
                self.date_on(year, month as u32, day)
            }
            RecurrencePattern::Yearly => {
                let years = i32::try_from(self.rule.interval).ok()?;
                let year = current.year().checked_add(years)?;
                let month = self.rule.month_of_year.unwrap_or(self.anchor_month);
                let day = self.rule.day_of_month.unwrap_or(self.anchor_day);
                self.date_on(year, month, day)
            }
        }
    }

    fn advance_weekly(&self, current: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.rule.days_of_week.is_empty() {
            // Same weekday as the anchor, every interval weeks.
            return current.checked_add_signed(Duration::days(7 * self.rule.interval as i64));
        }

        // Scan forward for the next listed weekday. Any non-empty valid day
        // set matches within a week; the bound guards against a malformed one.
        let max_scan = 7 * 10 * self.rule.interval as i64;
        let mut candidate = current.checked_add_signed(Duration::days(1))?;
        for _ in 0..max_scan {
            if self
                .rule
                .days_of_week
                .contains(&(candidate.weekday().num_days_from_sunday() as u8))
            {
                return Some(candidate);
            }
            candidate = candidate.checked_add_signed(Duration::days(1))?;
        }
        current.checked_add_signed(Duration::days(7 * self.rule.interval as i64))
    }

    /// Build a date at the anchor's time of day, clamping `day` to the
    /// target month's length (Jan 31 + 1 month = Feb 28/29).
    fn date_on(&self, year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
        let day = day.min(days_in_month(year, month));
        NaiveDate::from_ymd_opt(year, month, day)
            .map(|date| DateTime::from_naive_utc_and_offset(date.and_time(self.anchor_time), Utc))
    }
}

impl Iterator for Occurrences {
    type Item = (DateTime<Utc>, DateTime<Utc>);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(count) = self.rule.end_after {
            if self.emitted >= count {
                return None;
            }
        }

        let candidate = self.advance(self.current)?;

        // end_date is an inclusive, date-granular horizon.
        if let Some(end_date) = self.rule.end_date {
            if candidate.date_naive() > end_date.date_naive() {
                return None;
            }
        } else if self.rule.end_after.is_none() && candidate > self.horizon {
            return None;
        }

        let end = candidate.checked_add_signed(self.duration)?;
        self.current = candidate;
        self.emitted += 1;
        Some((candidate, end))
    }
}

fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// Get the number of days in a month.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}
