//! Event model and recurrence expansion.
//!
//! This module provides the calendar's core value types:
//!
//! - **Event records**: a single entity covering plain events, series
//!   templates, and materialized instances
//! - **Recurrence rules**: pattern, interval, and bounding configuration
//! - **Occurrence expansion**: turning a rule plus an anchor into concrete
//!   `(start, end)` pairs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Event Layer                               │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │              RecurrenceRule                               │  │
//! │  │  - Pattern (daily/weekly/monthly/yearly/weekdays)         │  │
//! │  │  - Interval and pattern-specific fields                   │  │
//! │  │  - Bound: occurrence count or inclusive end date          │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                           │                                      │
//! │                           ▼                                      │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │              Occurrences (expander)                       │  │
//! │  │  - Lazy iterator over (start, end) pairs                  │  │
//! │  │  - Anchor excluded, duration preserved                    │  │
//! │  │  - Day clamping for short months                          │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                           │                                      │
//! │                           ▼                                      │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │              Event / NewEvent / EventUpdate               │  │
//! │  │  (template, instance, and single-event records)           │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence::event::{NewEvent, RecurrenceRule, Occurrences};
//!
//! let rule = RecurrenceRule::weekly_on([chrono::Weekday::Tue]).times(3);
//! rule.validate()?;
//!
//! for (start, end) in Occurrences::new(anchor_start, anchor_end, rule) {
//!     println!("{start} - {end}");
//! }
//! ```

pub mod expand;
pub mod recurrence;
pub mod types;

pub use expand::{Occurrences, DEFAULT_SAFETY_HORIZON_DAYS};
pub use recurrence::{RecurrencePattern, RecurrenceRule};
pub use types::{
    Caller, Event, EventFilter, EventRole, EventUpdate, Invitee, NewEvent, Privacy, Rsvp,
};
