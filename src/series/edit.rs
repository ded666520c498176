//! Scoped edits for events and series.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{Result, ValidationError};
use crate::event::expand::DEFAULT_SAFETY_HORIZON_DAYS;
use crate::event::{Event, EventUpdate};
use crate::series::{resolve_template, InstanceMaterializer};
use crate::store::{EventQuery, EventStore};

/// Result of a this-and-future edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FutureEditOutcome {
    /// Records whose fields were updated (template included).
    pub updated: usize,
    /// Stale instances discarded ahead of regeneration.
    pub pruned: usize,
    /// Instances created by regeneration under a changed rule.
    pub materialized: usize,
}

/// Applies field changes to a single record or to a series from a cutoff
/// forward.
///
/// A future-scoped edit resolves the origin's template, moves the series
/// anchor up to the origin's start, and propagates the patch to every
/// instance at or after the cutoff. When the patch replaces the recurrence
/// rule with one of a different shape, the forward instances are discarded
/// and regenerated from the new anchor instead; instances before the cutoff
/// are never touched.
pub struct SeriesEditor<S: EventStore> {
    /// The underlying event store.
    store: Arc<RwLock<S>>,
    /// Safety horizon handed to regeneration.
    horizon_days: i64,
}

impl<S: EventStore> SeriesEditor<S> {
    /// Create an editor with the default safety horizon.
    pub fn new(store: Arc<RwLock<S>>) -> Self {
        Self {
            store,
            horizon_days: DEFAULT_SAFETY_HORIZON_DAYS,
        }
    }

    /// Override the safety horizon used for regeneration.
    pub fn with_horizon_days(mut self, days: i64) -> Self {
        self.horizon_days = days;
        self
    }

    /// Apply a patch to exactly one record.
    ///
    /// An instance edited in isolation is flagged as modified so later
    /// series edits can tell it diverged from its template. Editing a
    /// template that was never expanded behaves like a plain event edit.
    /// A patch that inverts the merged record's window is rejected
    /// before the write.
    pub async fn apply_single(&self, target: &Event, update: &EventUpdate) -> Result<Event> {
        let mut updated = target.clone();
        update.apply_to(&mut updated);

        if update.clear_recurrence {
            updated.recurrence = None;
        } else if let Some(rule) = &update.recurrence {
            updated.recurrence = Some(rule.clone());
        }

        if target.is_instance() {
            updated.is_modified_instance = true;
        }

        ensure_ordered_window(&updated)?;
        let store = self.store.read().await;
        let saved = store.update(updated).await?;
        debug!("Applied single edit to event {}", saved.id);
        Ok(saved)
    }

    /// Apply a patch to `origin`'s series from `origin.start` forward.
    ///
    /// The whole edit is rejected before anything is written when the
    /// patched template's window inverts. Instance updates are
    /// best-effort: a failed record is logged and skipped, and the
    /// outcome reports partial counts.
    pub async fn apply_future(
        &self,
        origin: &Event,
        update: &EventUpdate,
    ) -> Result<FutureEditOutcome> {
        let mut template = resolve_template(&self.store, origin).await?;
        let cutoff = origin.start;
        let previous_rule = template.recurrence.clone();

        update.apply_to(&mut template);

        // The series anchor moves forward to the edited occurrence.
        if cutoff > template.start {
            let duration = template.end - template.start;
            template.start = cutoff;
            template.end = cutoff + duration;
        }

        let mut regenerate = false;
        if update.clear_recurrence {
            template.recurrence = None;
            // No longer a series anchor; show it as a plain event.
            template.is_active = true;
            regenerate = previous_rule.is_some();
        } else if let Some(new_rule) = &update.recurrence {
            if previous_rule.as_ref() != Some(new_rule) {
                template.recurrence = Some(new_rule.clone());
                regenerate = true;
            }
        }

        ensure_ordered_window(&template)?;
        {
            let store = self.store.read().await;
            store.update(template.clone()).await?;
        }
        let mut outcome = FutureEditOutcome {
            updated: 1,
            ..Default::default()
        };

        if regenerate {
            outcome.pruned = self.discard_forward(&template.id, cutoff).await?;
            if template.recurrence.is_some() {
                let materializer = InstanceMaterializer::new(self.store.clone())
                    .with_horizon_days(self.horizon_days);
                outcome.materialized = materializer.materialize(&template).await?.created;
            }
        } else {
            outcome.updated += self.propagate_forward(&template.id, cutoff, update).await?;
        }

        debug!(
            "Applied future edit to series {} from {}: {} updated, {} pruned, {} materialized",
            template.id, cutoff, outcome.updated, outcome.pruned, outcome.materialized
        );
        Ok(outcome)
    }

    /// Apply `update` to every instance at or after `cutoff`, skipping
    /// any record the patch would invert.
    async fn propagate_forward(
        &self,
        template_id: &str,
        cutoff: DateTime<Utc>,
        update: &EventUpdate,
    ) -> Result<usize> {
        let future = {
            let store = self.store.read().await;
            store
                .find(
                    EventQuery::new()
                        .instances_of(template_id)
                        .starts_at_or_after(cutoff),
                )
                .await?
        };

        let mut updated = 0;
        for mut instance in future {
            update.apply_to(&mut instance);
            if instance.start >= instance.end {
                warn!(
                    "Skipping instance {}: patch inverts its start/end window",
                    instance.id
                );
                continue;
            }
            let store = self.store.read().await;
            match store.update(instance).await {
                Ok(_) => updated += 1,
                Err(e) => warn!("Failed to update instance of series {}: {}", template_id, e),
            }
        }
        Ok(updated)
    }

    /// Hard-delete every instance at or after `cutoff`.
    async fn discard_forward(&self, template_id: &str, cutoff: DateTime<Utc>) -> Result<usize> {
        let stale = {
            let store = self.store.read().await;
            store
                .find(
                    EventQuery::new()
                        .instances_of(template_id)
                        .starts_at_or_after(cutoff),
                )
                .await?
        };

        let mut removed = 0;
        for instance in stale {
            let store = self.store.read().await;
            match store.delete(&instance.id).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!("Failed to discard instance {}: {}", instance.id, e),
            }
        }
        Ok(removed)
    }
}

/// Reject a merged record whose window inverted.
///
/// `EventUpdate::validate` only compares endpoints that are both in the
/// patch; a single-endpoint patch is checked here against the stored
/// record it merges into.
fn ensure_ordered_window(event: &Event) -> Result<()> {
    if event.start >= event.end {
        return Err(ValidationError::StartNotBeforeEnd {
            start: event.start,
            end: event.end,
        }
        .into());
    }
    Ok(())
}
