//! Event manager facade.
//!
//! [`EventManager`] is the boundary the host application's route handlers
//! call: create, scoped update, scoped delete, visible listings, and
//! invitation replies. It validates input before any write, enforces
//! ownership, and routes series work through the materializer, editor,
//! and pruner.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::Config;
use crate::directory::UserDirectory;
use crate::error::{NotFoundError, PermissionError, Result};
use crate::event::expand::DEFAULT_SAFETY_HORIZON_DAYS;
use crate::event::{Caller, Event, EventFilter, EventUpdate, NewEvent, Rsvp};
use crate::series::{FutureEditOutcome, InstanceMaterializer, SeriesEditor, SeriesPruner};
use crate::store::{EventQuery, EventStore};

// ============================================================================
// Scopes and Outcomes
// ============================================================================

/// How far an update reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpdateScope {
    /// Only the addressed record.
    Single,
    /// The addressed record and every series sibling from its start forward.
    Future,
}

/// How far a delete reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeleteScope {
    /// Only the addressed record.
    Single,
    /// The series from the addressed record's start forward.
    Series,
}

/// Result of [`EventManager::create`].
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    /// The stored event (the template, for a recurring definition).
    pub event: Event,
    /// Instances materialized alongside a recurring event.
    pub instances_created: usize,
}

/// Result of [`EventManager::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Records whose fields were updated.
    pub updated: usize,
    /// Stale instances discarded by a rule change.
    pub pruned: usize,
    /// Instances regenerated under a changed rule.
    pub materialized: usize,
}

impl From<FutureEditOutcome> for UpdateOutcome {
    fn from(outcome: FutureEditOutcome) -> Self {
        Self {
            updated: outcome.updated,
            pruned: outcome.pruned,
            materialized: outcome.materialized,
        }
    }
}

/// Result of [`EventManager::delete`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Records removed.
    pub deleted: usize,
}

/// Recover the storable id from an instance reference.
///
/// Some callers address an occurrence as `"<templateId>_<n>"`; everything
/// after the first underscore is presentation-only. Plain ids pass through
/// unchanged.
pub fn base_event_id(reference: &str) -> &str {
    reference
        .split_once('_')
        .map(|(id, _)| id)
        .unwrap_or(reference)
}

// ============================================================================
// Event Manager
// ============================================================================

/// Manager for calendar events, series included.
pub struct EventManager<S: EventStore> {
    /// The underlying event store.
    store: Arc<RwLock<S>>,
    /// Optional directory for resolving invitee references.
    directory: Option<Arc<dyn UserDirectory>>,
    /// Expansion cap for unbounded rules, in days past the anchor.
    horizon_days: i64,
    /// Listing page size when the filter does not set one.
    default_limit: usize,
}

impl<S: EventStore> EventManager<S> {
    /// Create a manager with default expansion and listing settings.
    pub fn new(store: Arc<RwLock<S>>) -> Self {
        Self {
            store,
            directory: None,
            horizon_days: DEFAULT_SAFETY_HORIZON_DAYS,
            default_limit: 100,
        }
    }

    /// Attach a user directory for invitee resolution.
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Apply expansion and listing settings from configuration.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.horizon_days = i64::from(config.expansion.safety_horizon_days);
        self.default_limit = config.listing.default_limit;
        self
    }

    fn materializer(&self) -> InstanceMaterializer<S> {
        InstanceMaterializer::new(self.store.clone()).with_horizon_days(self.horizon_days)
    }

    fn editor(&self) -> SeriesEditor<S> {
        SeriesEditor::new(self.store.clone()).with_horizon_days(self.horizon_days)
    }

    fn pruner(&self) -> SeriesPruner<S> {
        SeriesPruner::new(self.store.clone())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Create an event owned by `caller`.
    ///
    /// A definition carrying a recurrence rule becomes a series: the stored
    /// record is the template, its occurrences are materialized immediately,
    /// and the template is hidden from listings. Validation runs before any
    /// write.
    pub async fn create(&self, definition: NewEvent, caller: &Caller) -> Result<CreateOutcome> {
        definition.validate()?;
        let definition = self.resolve_invitees(definition).await?;

        let event = Event::new(definition, caller);
        {
            let store = self.store.read().await;
            store.create(event.clone()).await?;
        }
        debug!("Created event: {} ({})", event.title, event.id);

        if event.recurrence.is_none() {
            return Ok(CreateOutcome {
                event,
                instances_created: 0,
            });
        }

        let outcome = self.materializer().materialize(&event).await?;
        let store = self.store.read().await;
        let event = store.get(&event.id).await?.unwrap_or(event);
        Ok(CreateOutcome {
            event,
            instances_created: outcome.created,
        })
    }

    /// Get an event by id or instance reference.
    pub async fn get(&self, reference: &str) -> Result<Option<Event>> {
        let store = self.store.read().await;
        store.get(base_event_id(reference)).await
    }

    /// Update an event with the given scope. Owner only.
    pub async fn update(
        &self,
        reference: &str,
        update: EventUpdate,
        scope: UpdateScope,
        caller: &Caller,
    ) -> Result<UpdateOutcome> {
        update.validate()?;
        let origin = self.require_event(reference).await?;
        self.require_owner(&origin, caller)?;

        match scope {
            UpdateScope::Single => {
                self.editor().apply_single(&origin, &update).await?;
                Ok(UpdateOutcome {
                    updated: 1,
                    ..Default::default()
                })
            }
            UpdateScope::Future => {
                let outcome = self.editor().apply_future(&origin, &update).await?;
                Ok(outcome.into())
            }
        }
    }

    /// Delete an event with the given scope. Owner only.
    pub async fn delete(
        &self,
        reference: &str,
        scope: DeleteScope,
        caller: &Caller,
    ) -> Result<DeleteOutcome> {
        let origin = self.require_event(reference).await?;
        self.require_owner(&origin, caller)?;

        let deleted = match scope {
            DeleteScope::Single => usize::from(self.pruner().delete_single(&origin).await?),
            DeleteScope::Series => self.pruner().delete_future(&origin).await?,
        };
        Ok(DeleteOutcome { deleted })
    }

    /// List events visible to `viewer`, in calendar order.
    ///
    /// Templates and soft-deleted records never appear; private and
    /// invite-only events appear only for their owner and invitees.
    pub async fn list_visible(&self, viewer: &Caller, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut query = EventQuery::new().visible_only();
        query.starts_at_or_after = filter.starts_after;
        query.starts_before = filter.starts_before;

        let candidates = {
            let store = self.store.read().await;
            store.find(query).await?
        };

        let events = candidates
            .into_iter()
            .filter(|event| event.visible_to(viewer))
            .filter(|event| filter.matches(event))
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(self.default_limit))
            .collect();
        Ok(events)
    }

    /// Record `user_id`'s reply to an invitation.
    pub async fn respond(&self, reference: &str, user_id: &str, rsvp: Rsvp) -> Result<Event> {
        let mut event = self.require_event(reference).await?;

        let invitee = event
            .invited_users
            .iter_mut()
            .find(|i| i.user_id == user_id)
            .ok_or_else(|| NotFoundError::Invitation {
                event_id: event.id.clone(),
                user_id: user_id.to_string(),
            })?;
        invitee.rsvp = rsvp;
        invitee.responded_at = Some(chrono::Utc::now());
        event.updated_at = chrono::Utc::now();

        let store = self.store.read().await;
        let saved = store.update(event).await?;
        debug!("Recorded {:?} from {} on event {}", rsvp, user_id, saved.id);
        Ok(saved)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn require_event(&self, reference: &str) -> Result<Event> {
        let id = base_event_id(reference);
        let store = self.store.read().await;
        store
            .get(id)
            .await?
            .ok_or_else(|| NotFoundError::Event(id.to_string()).into())
    }

    fn require_owner(&self, event: &Event, caller: &Caller) -> Result<()> {
        if !event.is_owned_by(caller) {
            return Err(PermissionError::NotOwner {
                event_id: event.id.clone(),
                email: caller.email.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Swap invitee references for directory-resolved user ids.
    ///
    /// Without a directory the references are trusted as user ids.
    /// References the directory does not know are dropped.
    async fn resolve_invitees(&self, mut definition: NewEvent) -> Result<NewEvent> {
        let Some(directory) = &self.directory else {
            return Ok(definition);
        };
        if definition.invited_users.is_empty() {
            return Ok(definition);
        }

        let resolved = directory.resolve(&definition.invited_users).await?;
        if resolved.len() < definition.invited_users.len() {
            debug!(
                "Resolved {} of {} invitee references",
                resolved.len(),
                definition.invited_users.len()
            );
        }

        let mut ids: Vec<String> = Vec::with_capacity(resolved.len());
        for user in resolved {
            if !ids.contains(&user.user_id) {
                ids.push(user.user_id);
            }
        }
        definition.invited_users = ids;
        Ok(definition)
    }
}
