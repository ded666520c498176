//! Cadence: recurring-event engine for a calendar portal
//!
//! A rule-interpreter and series-consistency core: recurrence rules are
//! expanded into concrete occurrences, occurrences are materialized as
//! independently addressable instance records, and series support
//! "this occurrence" vs "this and future occurrences" edits and deletes
//! while preserving history.

pub mod config;
pub mod directory;
pub mod error;
pub mod event;
pub mod manager;
pub mod series;
pub mod store;

pub use config::Config;
pub use directory::{DirectoryUser, StaticDirectory, UserDirectory};
pub use error::{
    CadenceError, ConfigError, NotFoundError, PermissionError, Result, StorageError,
    ValidationError,
};
pub use event::{
    Caller, Event, EventFilter, EventRole, EventUpdate, Invitee, NewEvent, Occurrences, Privacy,
    RecurrencePattern, RecurrenceRule, Rsvp,
};
pub use manager::{
    base_event_id, CreateOutcome, DeleteOutcome, DeleteScope, EventManager, UpdateOutcome,
    UpdateScope,
};
pub use series::{
    FutureEditOutcome, InstanceMaterializer, MaterializeOutcome, SeriesEditor, SeriesPruner,
};
pub use store::{EventQuery, EventStore, MemoryEventStore};
