//! Instance materialization for recurring series.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::event::expand::DEFAULT_SAFETY_HORIZON_DAYS;
use crate::event::{Event, Occurrences};
use crate::store::{EventQuery, EventStore};

/// Result of a materialization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeOutcome {
    /// Instances actually persisted.
    pub created: usize,
    /// Occurrences whose instance failed to persist.
    pub failed: usize,
}

/// Expands a template's recurrence rule into persisted instance records.
///
/// Materialization runs once per template: a template that already has
/// instances at or after its start is left untouched, so repeated calls
/// cannot double a series. Once instances exist the template is marked
/// inactive and disappears from listings.
pub struct InstanceMaterializer<S: EventStore> {
    /// The underlying event store.
    store: Arc<RwLock<S>>,
    /// Expansion cap for rules with no explicit bound, in days past the anchor.
    horizon_days: i64,
}

impl<S: EventStore> InstanceMaterializer<S> {
    /// Create a materializer with the default safety horizon.
    pub fn new(store: Arc<RwLock<S>>) -> Self {
        Self {
            store,
            horizon_days: DEFAULT_SAFETY_HORIZON_DAYS,
        }
    }

    /// Override the safety horizon.
    pub fn with_horizon_days(mut self, days: i64) -> Self {
        self.horizon_days = days;
        self
    }

    /// Materialize `template`'s occurrences as instance records.
    ///
    /// Creation is a best-effort loop: a failed instance is logged and
    /// skipped, and the outcome reports partial counts. The template goes
    /// inactive only if at least one instance was created.
    pub async fn materialize(&self, template: &Event) -> Result<MaterializeOutcome> {
        let Some(rule) = &template.recurrence else {
            return Ok(MaterializeOutcome::default());
        };

        if self.already_materialized(template).await? {
            debug!("Series {} already materialized, skipping", template.id);
            return Ok(MaterializeOutcome::default());
        }

        let occurrences = Occurrences::with_horizon(
            template.start,
            template.end,
            rule.clone(),
            self.horizon_days,
        );

        let mut outcome = MaterializeOutcome::default();
        for (start, end) in occurrences {
            let instance = instance_from_template(template, start, end);
            let store = self.store.read().await;
            match store.create(instance).await {
                Ok(_) => outcome.created += 1,
                Err(e) => {
                    warn!(
                        "Failed to materialize occurrence {} of series {}: {}",
                        start, template.id, e
                    );
                    outcome.failed += 1;
                }
            }
        }

        if outcome.created > 0 {
            self.deactivate(template).await?;
        }

        debug!(
            "Materialized {} instances for series {} ({} failed)",
            outcome.created, template.id, outcome.failed
        );
        Ok(outcome)
    }

    /// Whether `template` already has instances at or after its start.
    async fn already_materialized(&self, template: &Event) -> Result<bool> {
        let store = self.store.read().await;
        let existing = store
            .find(
                EventQuery::new()
                    .instances_of(&template.id)
                    .starts_at_or_after(template.start)
                    .limit(1),
            )
            .await?;
        Ok(!existing.is_empty())
    }

    /// Hide the template from listings.
    async fn deactivate(&self, template: &Event) -> Result<()> {
        let mut hidden = template.clone();
        hidden.is_active = false;
        hidden.updated_at = Utc::now();

        let store = self.store.read().await;
        store.update(hidden).await?;
        Ok(())
    }
}

/// Build an instance record from its template and an occurrence window.
fn instance_from_template(
    template: &Event,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4().to_string(),
        start,
        end,
        is_recurring_instance: true,
        original_event_id: Some(template.id.clone()),
        is_modified_instance: false,
        is_deleted: false,
        is_active: true,
        created_at: now,
        updated_at: now,
        ..template.clone()
    }
}
