//! Series materialization, editing, and pruning.
//!
//! A series is a hidden template plus the instance records expanded from
//! its recurrence rule. This module provides the three operations that are
//! allowed to touch a series as a whole:
//!
//! - **Materialization**: persist one instance per expanded occurrence and
//!   hide the template
//! - **Editing**: apply a field patch to one record, or to the template and
//!   every instance from a cutoff forward
//! - **Pruning**: hard-delete one record, or every series record from a
//!   cutoff forward
//!
//! Batch mutation is best-effort: a failure on one record is logged and the
//! loop continues, so results carry partial counts.

mod edit;
mod materialize;
mod prune;

pub use edit::{FutureEditOutcome, SeriesEditor};
pub use materialize::{InstanceMaterializer, MaterializeOutcome};
pub use prune::SeriesPruner;

use tokio::sync::RwLock;

use crate::error::{NotFoundError, Result};
use crate::event::Event;
use crate::store::EventStore;

/// Resolve the template behind `origin`.
///
/// An instance is followed through its back-reference; a template or a
/// plain single event resolves to itself.
pub(crate) async fn resolve_template<S: EventStore>(
    store: &RwLock<S>,
    origin: &Event,
) -> Result<Event> {
    match &origin.original_event_id {
        Some(template_id) => {
            let store = store.read().await;
            store
                .get(template_id)
                .await?
                .ok_or_else(|| NotFoundError::Template(template_id.clone()).into())
        }
        None => Ok(origin.clone()),
    }
}
