//! Event storage trait and implementations.
//!
//! This module provides the persistence abstraction the engine talks to.
//! The host application supplies its own backend; [`MemoryEventStore`] is
//! the embedded implementation used standalone and in tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, RwLock};

use crate::error::{CadenceError, NotFoundError, Result, StorageError};
use crate::event::Event;

// ============================================================================
// Query
// ============================================================================

/// Storage-level filter for event records.
///
/// The default query matches every record, templates and soft-deleted
/// records included; visibility trimming is opted into with
/// [`EventQuery::visible_only`].
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Match a whole series: the template with this id plus its instances.
    pub series_of: Option<String>,
    /// Match only instances whose back-reference is this template id.
    pub instances_of: Option<String>,
    /// Only records with `start >= this`.
    pub starts_at_or_after: Option<DateTime<Utc>>,
    /// Only records with `start < this`.
    pub starts_before: Option<DateTime<Utc>>,
    /// Exclude inactive and soft-deleted records.
    pub visible_only: bool,
    /// Maximum number of results; `None` returns everything that matches.
    pub limit: Option<usize>,
    /// Number of results to skip.
    pub offset: usize,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the template with `id` and every instance pointing at it.
    pub fn series_of(mut self, id: impl Into<String>) -> Self {
        self.series_of = Some(id.into());
        self
    }

    /// Select only the instances of template `id`.
    pub fn instances_of(mut self, id: impl Into<String>) -> Self {
        self.instances_of = Some(id.into());
        self
    }

    /// Restrict to records starting at or after `time`.
    pub fn starts_at_or_after(mut self, time: DateTime<Utc>) -> Self {
        self.starts_at_or_after = Some(time);
        self
    }

    /// Restrict to records starting before `time`.
    pub fn starts_before(mut self, time: DateTime<Utc>) -> Self {
        self.starts_before = Some(time);
        self
    }

    /// Exclude inactive and soft-deleted records.
    pub fn visible_only(mut self) -> Self {
        self.visible_only = true;
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Check if an event matches this query.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(root) = &self.series_of {
            let in_series =
                &event.id == root || event.original_event_id.as_deref() == Some(root.as_str());
            if !in_series {
                return false;
            }
        }
        if let Some(template_id) = &self.instances_of {
            if event.original_event_id.as_deref() != Some(template_id.as_str()) {
                return false;
            }
        }
        if let Some(after) = self.starts_at_or_after {
            if event.start < after {
                return false;
            }
        }
        if let Some(before) = self.starts_before {
            if event.start >= before {
                return false;
            }
        }
        if self.visible_only && (!event.is_active || event.is_deleted) {
            return false;
        }
        true
    }
}

// ============================================================================
// EventStore Trait
// ============================================================================

/// Trait for event storage backends.
///
/// The engine performs all persistence through this interface; the host
/// application may back it with any database.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Create a new event record.
    async fn create(&self, event: Event) -> Result<Event>;

    /// Get an event by id.
    async fn get(&self, id: &str) -> Result<Option<Event>>;

    /// Replace an existing event record, keyed by `event.id`.
    async fn update(&self, event: Event) -> Result<Event>;

    /// Hard-delete an event by id. Returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Find events matching a query, ordered by start time.
    async fn find(&self, query: EventQuery) -> Result<Vec<Event>>;
}

// ============================================================================
// Internal Data Structure
// ============================================================================

/// Internal data storage structure.
#[derive(Debug, Default)]
struct EventData {
    /// Events indexed by id.
    events: HashMap<String, Event>,
    /// Index: template id -> instance ids.
    instances_by_template: HashMap<String, Vec<String>>,
}

impl EventData {
    /// Add an instance to the series index.
    fn index_instance(&mut self, event: &Event) {
        if let Some(template_id) = &event.original_event_id {
            self.instances_by_template
                .entry(template_id.clone())
                .or_default()
                .push(event.id.clone());
        }
    }

    /// Remove an instance from the series index.
    fn unindex_instance(&mut self, event: &Event) {
        if let Some(template_id) = &event.original_event_id {
            if let Some(ids) = self.instances_by_template.get_mut(template_id) {
                ids.retain(|id| id != &event.id);
            }
        }
    }

    /// Candidate ids for a query, using the series index when possible.
    fn candidates(&self, query: &EventQuery) -> Vec<String> {
        if let Some(template_id) = &query.instances_of {
            return self
                .instances_by_template
                .get(template_id)
                .cloned()
                .unwrap_or_default();
        }
        if let Some(root) = &query.series_of {
            let mut ids = self
                .instances_by_template
                .get(root)
                .cloned()
                .unwrap_or_default();
            if self.events.contains_key(root) {
                ids.push(root.clone());
            }
            return ids;
        }
        self.events.keys().cloned().collect()
    }
}

// ============================================================================
// Embedded Implementation
// ============================================================================

/// Persistence file layout.
#[derive(Debug, Serialize, Deserialize)]
struct PersistenceData {
    version: u32,
    events: Vec<Event>,
}

/// In-memory event store with optional persistence.
///
/// Events live in a HashMap behind a single RwLock, with a series index
/// for template-to-instance lookups and optional JSON file persistence.
pub struct MemoryEventStore {
    /// All data protected by a single RwLock for consistent access.
    data: RwLock<EventData>,
    /// Optional persistence file path.
    persistence_path: Option<std::path::PathBuf>,
    /// Mutex for persistence operations.
    persist_lock: AsyncMutex<()>,
}

impl MemoryEventStore {
    /// Create a new in-memory store without persistence.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(EventData::default()),
            persistence_path: None,
            persist_lock: AsyncMutex::new(()),
        }
    }

    /// Create a store with file persistence under `data_dir`.
    pub async fn with_persistence(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(StorageError::Io)?;

        let persistence_path = data_dir.join("events.json");
        let store = Self {
            data: RwLock::new(EventData::default()),
            persistence_path: Some(persistence_path.clone()),
            persist_lock: AsyncMutex::new(()),
        };

        // Load existing data if present
        if persistence_path.exists() {
            store.load_from_file(&persistence_path).await?;
        }

        Ok(store)
    }

    /// Load events from a JSON file.
    async fn load_from_file(&self, path: &Path) -> Result<()> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(CadenceError::Io)?;

        let persisted: PersistenceData =
            serde_json::from_str(&content).map_err(CadenceError::Serialization)?;

        let mut data = self.data.write().await;
        for event in persisted.events {
            data.index_instance(&event);
            data.events.insert(event.id.clone(), event);
        }

        tracing::info!(
            "Loaded {} events from {}",
            data.events.len(),
            path.display()
        );

        Ok(())
    }

    /// Persist events to file if persistence is enabled.
    async fn persist(&self) -> Result<()> {
        let Some(ref path) = self.persistence_path else {
            return Ok(());
        };

        let _lock = self.persist_lock.lock().await;

        let data = self.data.read().await;
        let events: Vec<Event> = data.events.values().cloned().collect();
        drop(data);

        let persisted = PersistenceData { version: 1, events };
        let content =
            serde_json::to_string_pretty(&persisted).map_err(CadenceError::Serialization)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(CadenceError::Io)?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(CadenceError::Io)?;

        Ok(())
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create(&self, event: Event) -> Result<Event> {
        let mut data = self.data.write().await;

        if data.events.contains_key(&event.id) {
            return Err(StorageError::DuplicateId(event.id).into());
        }

        data.index_instance(&event);
        data.events.insert(event.id.clone(), event.clone());

        drop(data);
        self.persist().await?;
        Ok(event)
    }

    async fn get(&self, id: &str) -> Result<Option<Event>> {
        let data = self.data.read().await;
        Ok(data.events.get(id).cloned())
    }

    async fn update(&self, event: Event) -> Result<Event> {
        let mut data = self.data.write().await;

        let previous = data
            .events
            .get(&event.id)
            .cloned()
            .ok_or_else(|| NotFoundError::Event(event.id.clone()))?;

        // Re-index if the series back-reference changed
        if previous.original_event_id != event.original_event_id {
            data.unindex_instance(&previous);
            data.index_instance(&event);
        }

        data.events.insert(event.id.clone(), event.clone());

        drop(data);
        self.persist().await?;
        Ok(event)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut data = self.data.write().await;

        let event = match data.events.remove(id) {
            Some(event) => event,
            None => return Ok(false),
        };
        // The template's index bucket stays: its instances may outlive it.
        data.unindex_instance(&event);

        drop(data);
        self.persist().await?;
        Ok(true)
    }

    async fn find(&self, query: EventQuery) -> Result<Vec<Event>> {
        let data = self.data.read().await;

        let mut results: Vec<Event> = data
            .candidates(&query)
            .iter()
            .filter_map(|id| data.events.get(id))
            .filter(|event| query.matches(event))
            .cloned()
            .collect();

        // Calendar order
        results.sort_by(|a, b| a.start.cmp(&b.start));

        let offset = query.offset;
        let results = results.into_iter().skip(offset);
        Ok(match query.limit {
            Some(limit) => results.take(limit).collect(),
            None => results.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Caller, NewEvent};
    use chrono::{Duration, TimeZone};

    fn event_at(title: &str, start: DateTime<Utc>) -> Event {
        Event::new(
            NewEvent::new(title, start, start + Duration::hours(1)),
            &Caller::new("user-1", "owner@example.com"),
        )
    }

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryEventStore::new();
        let event = event_at("Standup", t(2));

        let created = store.create(event.clone()).await.unwrap();
        assert_eq!(created.id, event.id);

        let fetched = store.get(&event.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Standup");
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let store = MemoryEventStore::new();
        let event = event_at("Standup", t(2));

        store.create(event.clone()).await.unwrap();
        let err = store.create(event).await.unwrap_err();
        assert!(matches!(
            err,
            CadenceError::Storage(StorageError::DuplicateId(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_event() {
        let store = MemoryEventStore::new();
        let err = store.update(event_at("Ghost", t(2))).await.unwrap_err();
        assert!(matches!(err, CadenceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_returns_presence() {
        let store = MemoryEventStore::new();
        let event = event_at("Standup", t(2));
        store.create(event.clone()).await.unwrap();

        assert!(store.delete(&event.id).await.unwrap());
        assert!(!store.delete(&event.id).await.unwrap());
        assert!(store.get(&event.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_instances_sorted_by_start() {
        let store = MemoryEventStore::new();

        let mut template = event_at("Series", t(1));
        template.is_active = false;
        store.create(template.clone()).await.unwrap();

        // Insert out of order; find returns calendar order.
        for day in [6, 2, 4] {
            let mut instance = event_at("Series", t(day));
            instance.is_recurring_instance = true;
            instance.original_event_id = Some(template.id.clone());
            store.create(instance).await.unwrap();
        }

        let instances = store
            .find(EventQuery::new().instances_of(&template.id))
            .await
            .unwrap();
        let starts: Vec<_> = instances.iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![t(2), t(4), t(6)]);

        let series = store
            .find(EventQuery::new().series_of(&template.id))
            .await
            .unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series[0].id, template.id);
    }

    #[tokio::test]
    async fn test_find_date_window() {
        let store = MemoryEventStore::new();
        for day in [1, 3, 5, 7] {
            store.create(event_at("E", t(day))).await.unwrap();
        }

        let found = store
            .find(
                EventQuery::new()
                    .starts_at_or_after(t(3))
                    .starts_before(t(7)),
            )
            .await
            .unwrap();
        let starts: Vec<_> = found.iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![t(3), t(5)]);
    }

    #[tokio::test]
    async fn test_visible_only_hides_inactive_and_deleted() {
        let store = MemoryEventStore::new();

        store.create(event_at("Visible", t(1))).await.unwrap();

        let mut inactive = event_at("Template", t(2));
        inactive.is_active = false;
        store.create(inactive).await.unwrap();

        let mut deleted = event_at("Deleted", t(3));
        deleted.is_deleted = true;
        store.create(deleted).await.unwrap();

        let visible = store.find(EventQuery::new().visible_only()).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "Visible");

        let all = store.find(EventQuery::new()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_limit_and_offset() {
        let store = MemoryEventStore::new();
        for day in 1..=5 {
            store.create(event_at("E", t(day))).await.unwrap();
        }

        let page = store
            .find(EventQuery::new().limit(2).offset(2))
            .await
            .unwrap();
        let starts: Vec<_> = page.iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![t(3), t(4)]);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let event = event_at("Persisted", t(2));
        {
            let store = MemoryEventStore::with_persistence(dir.path()).await.unwrap();
            store.create(event.clone()).await.unwrap();
        }

        let reopened = MemoryEventStore::with_persistence(dir.path()).await.unwrap();
        let fetched = reopened.get(&event.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Persisted");
        assert_eq!(fetched.start, event.start);
    }
}
