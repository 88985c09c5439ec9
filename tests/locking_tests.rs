//! Row-lock behaviour of the workflow on the in-memory store
//!
//! A transaction opened directly on the store holds the row lock while the
//! workflow tries to mutate the same booking.

#[macro_use]
mod storage_harness;

use booking::core::error::BookingError;
use booking::core::store::{BookingStore, EntityKind, RowFilter};
use booking::storage::InMemoryBookingStore;
use serde_json::json;
use std::time::Duration;
use storage_harness::*;

async fn seeded() -> (InMemoryBookingStore, Harness, i64) {
    let store = InMemoryBookingStore::new();
    let h = harness_with_timeout(store.clone(), Duration::from_millis(100));
    let created = h
        .workflow
        .create(booking_params("Alice", 5551234, "2024-01-01T10:00:00+00:00"))
        .await
        .unwrap();
    (store, h, created.id)
}

#[tokio::test]
async fn test_update_conflicts_while_row_is_locked() {
    let (store, h, id) = seeded().await;

    let mut holder = store.begin().await.unwrap();
    assert!(
        holder
            .lock_row(EntityKind::Booking, RowFilter::Id(id), Duration::from_secs(1))
            .await
            .unwrap()
    );

    let err = h
        .workflow
        .update(id, params(json!({"note": "blocked"})))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Conflict(_)));
    assert!(err.is_retryable());

    holder.rollback().await.unwrap();
    holder.close().await.unwrap();

    let updated = h
        .workflow
        .update(id, params(json!({"note": "after"})))
        .await
        .unwrap();
    assert_eq!(updated.note.as_deref(), Some("after"));
}

#[tokio::test]
async fn test_delete_conflicts_while_row_is_locked() {
    let (store, h, id) = seeded().await;

    let mut holder = store.begin().await.unwrap();
    holder
        .lock_row(EntityKind::Booking, RowFilter::Id(id), Duration::from_secs(1))
        .await
        .unwrap();

    let err = h.workflow.delete(id).await.unwrap_err();
    assert!(matches!(err, BookingError::Conflict(_)));

    // the booking is still readable; the failed delete left nothing behind
    assert!(h.workflow.get(id).await.is_ok());

    holder.close().await.unwrap();
    h.workflow.delete(id).await.unwrap();
}

#[tokio::test]
async fn test_waiter_sees_delete_committed_by_holder() {
    let store = InMemoryBookingStore::new();
    let h = harness_with_timeout(store.clone(), Duration::from_secs(2));
    let id = h
        .workflow
        .create(booking_params("Alice", 5551234, "2024-01-01T10:00:00+00:00"))
        .await
        .unwrap()
        .id;

    let mut holder = store.begin().await.unwrap();
    holder
        .lock_row(EntityKind::Booking, RowFilter::Id(id), Duration::from_secs(1))
        .await
        .unwrap();

    let waiter = {
        let workflow = h.workflow.clone();
        tokio::spawn(async move { workflow.update(id, params(json!({"note": "late"}))).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    holder
        .soft_delete_booking(id, chrono::Utc::now())
        .await
        .unwrap();
    holder.commit().await.unwrap();
    holder.close().await.unwrap();

    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(err, BookingError::NotFound(_)));
}

#[tokio::test]
async fn test_sequential_updates_keep_every_change() {
    let (_store, h, id) = seeded().await;

    let mut handles = Vec::new();
    for (field, value) in [
        ("note", json!("ground floor")),
        ("status", json!("contacted")),
        ("phone", json!(5559876)),
    ] {
        let workflow = h.workflow.clone();
        handles.push(tokio::spawn(async move {
            // short lock timeout: retry until the row frees up
            loop {
                match workflow.update(id, params(json!({ field: value.clone() }))).await {
                    Err(err) if err.is_retryable() => tokio::task::yield_now().await,
                    other => break other,
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let fetched = h.workflow.get(id).await.unwrap();
    assert_eq!(fetched.note.as_deref(), Some("ground floor"));
    assert_eq!(fetched.status.as_str(), "contacted");
    assert_eq!(fetched.phone, 5559876);
}
