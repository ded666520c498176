//! Persistence and configuration tests for the embedded store.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::RwLock;

use cadence::{
    Caller, Config, DeleteScope, EventFilter, EventManager, MemoryEventStore, NewEvent,
    RecurrenceRule,
};

fn owner() -> Caller {
    Caller::new("user-1", "owner@example.com")
}

fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
}

async fn open_manager(dir: &TempDir) -> EventManager<MemoryEventStore> {
    let store = MemoryEventStore::with_persistence(dir.path()).await.unwrap();
    EventManager::new(Arc::new(RwLock::new(store)))
}

#[tokio::test]
async fn test_series_survives_restart() {
    let dir = TempDir::new().unwrap();

    let template_id = {
        let manager = open_manager(&dir).await;
        let created = manager
            .create(
                NewEvent::new("Standup", anchor(), anchor() + Duration::hours(1))
                    .with_recurrence(RecurrenceRule::daily().times(5)),
                &owner(),
            )
            .await
            .unwrap();
        assert_eq!(created.instances_created, 5);
        created.event.id
    };

    let reopened = open_manager(&dir).await;
    let listed = reopened
        .list_visible(&owner(), &EventFilter::new())
        .await
        .unwrap();
    assert_eq!(listed.len(), 5);
    assert!(listed.iter().all(|e| e.is_recurring_instance));

    // The template came back hidden, with its rule intact.
    let template = reopened.get(&template_id).await.unwrap().unwrap();
    assert!(!template.is_active);
    assert_eq!(template.recurrence, Some(RecurrenceRule::daily().times(5)));
}

#[tokio::test]
async fn test_pruned_series_stays_pruned_after_restart() {
    let dir = TempDir::new().unwrap();

    {
        let manager = open_manager(&dir).await;
        manager
            .create(
                NewEvent::new("Standup", anchor(), anchor() + Duration::hours(1))
                    .with_recurrence(RecurrenceRule::daily().times(6)),
                &owner(),
            )
            .await
            .unwrap();

        let cutoff = Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap();
        let origin = manager
            .list_visible(&owner(), &EventFilter::new())
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.start == cutoff)
            .unwrap();
        let deleted = manager
            .delete(&origin.id, DeleteScope::Series, &owner())
            .await
            .unwrap();
        assert_eq!(deleted.deleted, 3);
    }

    let reopened = open_manager(&dir).await;
    let starts: Vec<_> = reopened
        .list_visible(&owner(), &EventFilter::new())
        .await
        .unwrap()
        .iter()
        .map(|e| e.start)
        .collect();
    let jan = |d: u32| Utc.with_ymd_and_hms(2025, 1, d, 9, 0, 0).unwrap();
    assert_eq!(starts, vec![jan(2), jan(3), jan(4)]);
}

#[tokio::test]
async fn test_configured_safety_horizon() {
    let config = Config::from_str(
        r#"
        [expansion]
        safety_horizon_days = 10
        "#,
    )
    .unwrap();

    let store = Arc::new(RwLock::new(MemoryEventStore::new()));
    let manager = EventManager::new(store).with_config(&config);

    // An unbounded daily rule stops at the configured horizon.
    let created = manager
        .create(
            NewEvent::new("Open-ended", anchor(), anchor() + Duration::hours(1))
                .with_recurrence(RecurrenceRule::daily()),
            &owner(),
        )
        .await
        .unwrap();
    assert_eq!(created.instances_created, 10);
}

#[tokio::test]
async fn test_configured_listing_limit() {
    let config = Config::from_str(
        r#"
        [listing]
        default_limit = 4
        "#,
    )
    .unwrap();

    let store = Arc::new(RwLock::new(MemoryEventStore::new()));
    let manager = EventManager::new(store).with_config(&config);

    manager
        .create(
            NewEvent::new("Daily", anchor(), anchor() + Duration::hours(1))
                .with_recurrence(RecurrenceRule::daily().times(8)),
            &owner(),
        )
        .await
        .unwrap();

    let listed = manager
        .list_visible(&owner(), &EventFilter::new())
        .await
        .unwrap();
    assert_eq!(listed.len(), 4);
}
