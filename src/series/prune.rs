//! Scoped hard deletion for events and series.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::Result;
use crate::event::Event;
use crate::series::resolve_template;
use crate::store::{EventQuery, EventStore};

/// Hard-deletes single records or the forward part of a series.
///
/// There is no tombstone: a pruned record is gone. Records starting before
/// the cutoff survive, including the template when its start predates the
/// cutoff, so a series' history stays intact.
pub struct SeriesPruner<S: EventStore> {
    /// The underlying event store.
    store: Arc<RwLock<S>>,
}

impl<S: EventStore> SeriesPruner<S> {
    pub fn new(store: Arc<RwLock<S>>) -> Self {
        Self { store }
    }

    /// Delete exactly one record. Sibling instances and the template are
    /// never touched.
    pub async fn delete_single(&self, event: &Event) -> Result<bool> {
        let store = self.store.read().await;
        let removed = store.delete(&event.id).await?;
        if removed {
            debug!("Deleted event {}", event.id);
        }
        Ok(removed)
    }

    /// Delete `origin`'s series from `origin.start` forward.
    ///
    /// The template is part of the doomed set only when its own start is at
    /// or after the cutoff. Deletion is best-effort: a failed record is
    /// logged and skipped, and the returned count covers what was actually
    /// removed.
    pub async fn delete_future(&self, origin: &Event) -> Result<usize> {
        let template = resolve_template(&self.store, origin).await?;
        let cutoff = origin.start;

        let doomed = {
            let store = self.store.read().await;
            store
                .find(
                    EventQuery::new()
                        .series_of(&template.id)
                        .starts_at_or_after(cutoff),
                )
                .await?
        };

        let mut deleted = 0;
        for event in doomed {
            let store = self.store.read().await;
            match store.delete(&event.id).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => warn!("Failed to delete series record {}: {}", event.id, e),
            }
        }

        debug!(
            "Deleted {} records of series {} from {} forward",
            deleted, template.id, cutoff
        );
        Ok(deleted)
    }
}
