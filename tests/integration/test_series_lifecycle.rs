//! End-to-end series lifecycle tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::RwLock;

use cadence::{
    Caller, DeleteScope, EventFilter, EventManager, EventQuery, EventStore, EventUpdate,
    InstanceMaterializer, MemoryEventStore, NewEvent, RecurrenceRule, Rsvp, UpdateScope,
};

fn owner() -> Caller {
    Caller::new("user-1", "owner@example.com")
}

fn setup() -> (EventManager<MemoryEventStore>, Arc<RwLock<MemoryEventStore>>) {
    let store = Arc::new(RwLock::new(MemoryEventStore::new()));
    (EventManager::new(store.clone()), store)
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

async fn visible_starts(manager: &EventManager<MemoryEventStore>) -> Vec<DateTime<Utc>> {
    manager
        .list_visible(&owner(), &EventFilter::new())
        .await
        .unwrap()
        .iter()
        .map(|e| e.start)
        .collect()
}

#[tokio::test]
async fn test_weekly_tuesday_series() {
    let (manager, _) = setup();

    // Anchor on a Tuesday, three occurrences, each a week apart.
    let anchor = at(2025, 1, 7, 10);
    let outcome = manager
        .create(
            NewEvent::new("Tuesday sync", anchor, anchor + Duration::hours(1))
                .with_recurrence(RecurrenceRule::weekly_on([chrono::Weekday::Tue]).times(3)),
            &owner(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.instances_created, 3);

    let starts = visible_starts(&manager).await;
    assert_eq!(
        starts,
        vec![at(2025, 1, 14, 10), at(2025, 1, 21, 10), at(2025, 1, 28, 10)]
    );
    assert!(starts.iter().all(|s| *s != anchor));
}

#[tokio::test]
async fn test_daily_series_exact_dates() {
    let (manager, _) = setup();

    let anchor = at(2025, 1, 1, 9);
    manager
        .create(
            NewEvent::new("Daily standup", anchor, anchor + Duration::minutes(30))
                .with_recurrence(RecurrenceRule::daily().times(5)),
            &owner(),
        )
        .await
        .unwrap();

    let starts = visible_starts(&manager).await;
    let want: Vec<_> = (2..=6).map(|d| at(2025, 1, d, 9)).collect();
    assert_eq!(starts, want);
}

#[tokio::test]
async fn test_monthly_day_31_clamps() {
    let (manager, _) = setup();

    let anchor = at(2025, 1, 31, 12);
    manager
        .create(
            NewEvent::new("Month-end report", anchor, anchor + Duration::hours(1))
                .with_recurrence(RecurrenceRule::monthly().on_day(31).times(3)),
            &owner(),
        )
        .await
        .unwrap();

    let starts = visible_starts(&manager).await;
    assert_eq!(
        starts,
        vec![at(2025, 2, 28, 12), at(2025, 3, 31, 12), at(2025, 4, 30, 12)]
    );
}

#[tokio::test]
async fn test_future_edit_splits_history() {
    let (manager, _) = setup();

    let anchor = at(2025, 1, 1, 9);
    let created = manager
        .create(
            NewEvent::new("Standup", anchor, anchor + Duration::hours(1))
                .with_recurrence(RecurrenceRule::daily().times(6)),
            &owner(),
        )
        .await
        .unwrap();

    let cutoff = at(2025, 1, 5, 9);
    let origin = manager
        .list_visible(&owner(), &EventFilter::new())
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.start == cutoff)
        .unwrap();

    let outcome = manager
        .update(
            &origin.id,
            EventUpdate::new().title("War room"),
            UpdateScope::Future,
            &owner(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.updated, 4);

    for event in manager.list_visible(&owner(), &EventFilter::new()).await.unwrap() {
        if event.start >= cutoff {
            assert_eq!(event.title, "War room");
        } else {
            assert_eq!(event.title, "Standup");
        }
    }

    // The template followed: fields patched, anchor advanced to the cutoff.
    let template = manager.get(&created.event.id).await.unwrap().unwrap();
    assert_eq!(template.title, "War room");
    assert_eq!(template.start, cutoff);
    assert!(!template.is_active);
}

#[tokio::test]
async fn test_delete_future_keeps_past_count() {
    let (manager, _) = setup();

    let anchor = at(2025, 1, 1, 9);
    manager
        .create(
            NewEvent::new("Standup", anchor, anchor + Duration::hours(1))
                .with_recurrence(RecurrenceRule::daily().times(6)),
            &owner(),
        )
        .await
        .unwrap();

    let cutoff = at(2025, 1, 5, 9);
    let before: Vec<_> = visible_starts(&manager)
        .await
        .into_iter()
        .filter(|s| *s < cutoff)
        .collect();

    let origin = manager
        .list_visible(&owner(), &EventFilter::new())
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.start == cutoff)
        .unwrap();
    manager
        .delete(&origin.id, DeleteScope::Series, &owner())
        .await
        .unwrap();

    let after = visible_starts(&manager).await;
    assert!(after.iter().all(|s| *s < cutoff));
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_materialization_cannot_double() {
    let (manager, store) = setup();

    let anchor = at(2025, 1, 1, 9);
    let created = manager
        .create(
            NewEvent::new("Standup", anchor, anchor + Duration::hours(1))
                .with_recurrence(RecurrenceRule::daily().times(4)),
            &owner(),
        )
        .await
        .unwrap();
    assert_eq!(created.instances_created, 4);

    // A repeated internal call finds the existing instances and backs off.
    let template = manager.get(&created.event.id).await.unwrap().unwrap();
    let rerun = InstanceMaterializer::new(store.clone())
        .materialize(&template)
        .await
        .unwrap();
    assert_eq!(rerun.created, 0);

    let instances = store
        .read()
        .await
        .find(EventQuery::new().instances_of(&template.id))
        .await
        .unwrap();
    assert_eq!(instances.len(), 4);
}

#[tokio::test]
async fn test_single_edit_then_future_edit() {
    let (manager, _) = setup();

    let anchor = at(2025, 1, 1, 9);
    manager
        .create(
            NewEvent::new("Standup", anchor, anchor + Duration::hours(1))
                .with_recurrence(RecurrenceRule::daily().times(5)),
            &owner(),
        )
        .await
        .unwrap();

    // Diverge the Jan 4 occurrence on its own.
    let divergent = manager
        .list_visible(&owner(), &EventFilter::new())
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.start == at(2025, 1, 4, 9))
        .unwrap();
    manager
        .update(
            &divergent.id,
            EventUpdate::new().location("Annex"),
            UpdateScope::Single,
            &owner(),
        )
        .await
        .unwrap();

    let stored = manager.get(&divergent.id).await.unwrap().unwrap();
    assert!(stored.is_modified_instance);
    assert_eq!(stored.location.as_deref(), Some("Annex"));

    // A later future edit from Jan 3 still reaches the divergent record.
    let origin = manager
        .list_visible(&owner(), &EventFilter::new())
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.start == at(2025, 1, 3, 9))
        .unwrap();
    manager
        .update(
            &origin.id,
            EventUpdate::new().title("Standup v2"),
            UpdateScope::Future,
            &owner(),
        )
        .await
        .unwrap();

    let stored = manager.get(&divergent.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Standup v2");
    assert_eq!(stored.location.as_deref(), Some("Annex"));
}

#[tokio::test]
async fn test_rsvp_is_per_instance() {
    let (manager, _) = setup();

    let anchor = at(2025, 1, 1, 9);
    manager
        .create(
            NewEvent::new("Review", anchor, anchor + Duration::hours(1))
                .with_invitees(["user-2"])
                .with_recurrence(RecurrenceRule::daily().times(3)),
            &owner(),
        )
        .await
        .unwrap();

    let instances = manager
        .list_visible(&owner(), &EventFilter::new())
        .await
        .unwrap();
    assert_eq!(instances.len(), 3);

    manager
        .respond(&instances[0].id, "user-2", Rsvp::Declined)
        .await
        .unwrap();

    let declined = manager.get(&instances[0].id).await.unwrap().unwrap();
    assert_eq!(declined.invited_users[0].rsvp, Rsvp::Declined);

    let untouched = manager.get(&instances[1].id).await.unwrap().unwrap();
    assert_eq!(untouched.invited_users[0].rsvp, Rsvp::Pending);
    assert!(untouched.invited_users[0].responded_at.is_none());
}

#[tokio::test]
async fn test_rule_change_regenerates_forward_only() {
    let (manager, _) = setup();

    let anchor = at(2025, 1, 1, 9);
    manager
        .create(
            NewEvent::new("Standup", anchor, anchor + Duration::hours(1))
                .with_recurrence(RecurrenceRule::daily().times(6)),
            &owner(),
        )
        .await
        .unwrap();

    // Switch the series to weekly from Jan 5 on.
    let cutoff = at(2025, 1, 5, 9);
    let origin = manager
        .list_visible(&owner(), &EventFilter::new())
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.start == cutoff)
        .unwrap();
    let outcome = manager
        .update(
            &origin.id,
            EventUpdate::new().recurrence(RecurrenceRule::weekly().times(2)),
            UpdateScope::Future,
            &owner(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.pruned, 3);
    assert_eq!(outcome.materialized, 2);

    let starts = visible_starts(&manager).await;
    assert_eq!(
        starts,
        vec![
            at(2025, 1, 2, 9),
            at(2025, 1, 3, 9),
            at(2025, 1, 4, 9),
            at(2025, 1, 12, 9),
            at(2025, 1, 19, 9),
        ]
    );
}
