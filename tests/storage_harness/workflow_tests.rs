//! Macro-generated test suite for `BookingWorkflow` over a storage backend.
//!
//! The `workflow_tests!` macro generates a test module that drives the
//! workflow end to end against any `BookingStore` implementation: CRUD,
//! pagination, filters, soft-delete visibility, the daily summary,
//! notifications and serialised updates under the row lock.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use booking::storage::InMemoryBookingStore;
//!
//! workflow_tests!(InMemoryBookingStore::new());
//! ```
//!
//! # Generated Tests
//!
//! ## CRUD
//! - `test_create_and_get`: create then fetch, server-assigned fields set
//! - `test_create_missing_field`: required field absent, nothing stored
//! - `test_create_emits_event`: `booking_created` reaches the sink
//! - `test_create_survives_failed_notification`: a sink error never undoes the create
//! - `test_get_nonexistent`: unknown id is NotFound
//! - `test_update_existing`: supplied fields change, `updated_at` set
//! - `test_update_invalid_status`: status outside the allowed set
//! - `test_update_nonexistent`: unknown id is NotFound
//! - `test_delete_then_get`: deleted rows disappear, second delete is NotFound
//!
//! ## Listing
//! - `test_paginate_pages`: 25 rows in pages of 10
//! - `test_paginate_far_past_last_page`: an enormous page number is just empty
//! - `test_paginate_filters`: status and case-insensitive name filters
//! - `test_paginate_plain_date_range`: `YYYY-MM-DD` bounds cover whole days
//! - `test_paginate_hides_deleted`
//! - `test_summary_by_date`
//!
//! ## Concurrency
//! - `test_concurrent_updates_serialise`: parallel updates never lose a write

/// Generate a full `BookingWorkflow` conformance test suite.
///
/// `$factory` must be an expression evaluating to a `BookingStore`. It is
/// re-evaluated for each test to ensure isolation, and may contain `.await`.
#[macro_export]
macro_rules! workflow_tests {
    ($factory:expr) => {
        mod workflow_contract_tests {
            use super::*;
            use booking::core::booking::BookingStatus;
            use booking::core::error::BookingError;
            use booking::core::events::BookingEvent;
            use chrono::NaiveDate;
            use serde_json::json;
            use std::time::Duration;

            // ==================================================================
            // CRUD: Create & Get
            // ==================================================================

            #[tokio::test]
            async fn test_create_and_get() {
                let h = harness($factory);

                let created = h
                    .workflow
                    .create(booking_params("Alice", 5551234, "2024-01-01T10:00:00+00:00"))
                    .await
                    .unwrap();
                assert!(created.id > 0);
                assert_eq!(created.status, BookingStatus::New);
                assert!(created.updated_at.is_none());

                let fetched = h.workflow.get(created.id).await.unwrap();
                assert_eq!(fetched.customer_name, "Alice");
                assert_eq!(fetched.phone, 5551234);
                assert_eq!(
                    fetched.booking_date.to_rfc3339(),
                    "2024-01-01T10:00:00+00:00"
                );
                assert_eq!(fetched.status, BookingStatus::New);
                assert_eq!(fetched.created_at, created.created_at);
            }

            #[tokio::test]
            async fn test_create_missing_field() {
                let h = harness($factory);

                let err = h
                    .workflow
                    .create(params(json!({
                        "phone": 5551234,
                        "booking_date": "2024-01-01T10:00:00+00:00",
                    })))
                    .await
                    .unwrap_err();
                assert_eq!(err, BookingError::BadInput("customer_name is required".into()));

                let page = h.workflow.paginate(page_params(1, 10)).await.unwrap();
                assert_eq!(page.pagination.total, 0);
            }

            #[tokio::test]
            async fn test_create_emits_event() {
                let h = harness($factory);
                let mut rx = h.events.subscribe();

                let created = h
                    .workflow
                    .create(booking_params("Bob", 5550000, "2024-02-01T09:00:00+00:00"))
                    .await
                    .unwrap();

                let envelope = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                    .await
                    .expect("event should arrive")
                    .expect("bus should stay open");
                assert_eq!(
                    envelope.event,
                    BookingEvent::BookingCreated {
                        booking_id: created.id
                    }
                );
                assert_eq!(envelope.topic, "booking_events");
            }

            #[tokio::test]
            async fn test_create_survives_failed_notification() {
                let sink = std::sync::Arc::new(FailingSink::default());
                let workflow = workflow_with_sink($factory, TEST_LOCK_TIMEOUT, sink.clone());

                let created = workflow
                    .create(booking_params("Bob", 5550000, "2024-02-01T09:00:00+00:00"))
                    .await
                    .unwrap();

                let fetched = workflow.get(created.id).await.unwrap();
                assert_eq!(fetched, created);

                let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
                while sink.attempts() == 0 && tokio::time::Instant::now() < deadline {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                assert_eq!(sink.attempts(), 1);
                assert_eq!(workflow.get(created.id).await.unwrap(), created);
            }

            #[tokio::test]
            async fn test_get_nonexistent() {
                let h = harness($factory);
                let err = h.workflow.get(999_999).await.unwrap_err();
                assert!(matches!(err, BookingError::NotFound(_)));
            }

            // ==================================================================
            // CRUD: Update & Delete
            // ==================================================================

            #[tokio::test]
            async fn test_update_existing() {
                let h = harness($factory);
                let created = h
                    .workflow
                    .create(booking_params("Alice", 5551234, "2024-01-01T10:00:00+00:00"))
                    .await
                    .unwrap();

                let updated = h
                    .workflow
                    .update(
                        created.id,
                        params(json!({"status": "approved", "note": "window seat"})),
                    )
                    .await
                    .unwrap();
                assert_eq!(updated.status, BookingStatus::Approved);
                assert_eq!(updated.note.as_deref(), Some("window seat"));
                assert_eq!(updated.customer_name, "Alice");
                assert!(updated.updated_at.is_some());

                let fetched = h.workflow.get(created.id).await.unwrap();
                assert_eq!(fetched, updated);
            }

            #[tokio::test]
            async fn test_update_invalid_status() {
                let h = harness($factory);
                let created = h
                    .workflow
                    .create(booking_params("Alice", 5551234, "2024-01-01T10:00:00+00:00"))
                    .await
                    .unwrap();

                let err = h
                    .workflow
                    .update(created.id, params(json!({"status": "pending"})))
                    .await
                    .unwrap_err();
                assert!(matches!(&err, BookingError::BadInput(m) if m.contains("pending")));

                let fetched = h.workflow.get(created.id).await.unwrap();
                assert_eq!(fetched.status, BookingStatus::New);
                assert!(fetched.updated_at.is_none());
            }

            #[tokio::test]
            async fn test_update_nonexistent() {
                let h = harness($factory);
                let err = h
                    .workflow
                    .update(424_242, params(json!({"note": "x"})))
                    .await
                    .unwrap_err();
                assert!(matches!(err, BookingError::NotFound(_)));
            }

            #[tokio::test]
            async fn test_delete_then_get() {
                let h = harness($factory);
                let created = h
                    .workflow
                    .create(booking_params("Carol", 5551111, "2024-03-01T12:00:00+00:00"))
                    .await
                    .unwrap();

                h.workflow.delete(created.id).await.unwrap();

                let err = h.workflow.get(created.id).await.unwrap_err();
                assert!(matches!(err, BookingError::NotFound(_)));

                let again = h.workflow.delete(created.id).await.unwrap_err();
                assert!(matches!(again, BookingError::NotFound(_)));

                let update = h
                    .workflow
                    .update(created.id, params(json!({"note": "late"})))
                    .await
                    .unwrap_err();
                assert!(matches!(update, BookingError::NotFound(_)));
            }

            // ==================================================================
            // Listing
            // ==================================================================

            #[tokio::test]
            async fn test_paginate_pages() {
                let h = harness($factory);
                for i in 0..25 {
                    h.workflow
                        .create(booking_params(
                            &format!("Guest {i}"),
                            5550000 + i,
                            "2024-04-01T18:00:00+00:00",
                        ))
                        .await
                        .unwrap();
                }

                let first = h.workflow.paginate(page_params(1, 10)).await.unwrap();
                assert_eq!(first.data.len(), 10);
                assert_eq!(first.pagination.total, 25);
                assert_eq!(first.pagination.total_pages, 3);
                assert!(first.pagination.has_next);
                assert!(!first.pagination.has_previous);
                assert_eq!(first.data[0].customer_name, "Guest 24");

                let last = h.workflow.paginate(page_params(3, 10)).await.unwrap();
                assert_eq!(last.data.len(), 5);
                assert!(!last.pagination.has_next);
                assert!(last.pagination.has_previous);
                assert_eq!(last.pagination.previous_page, Some(2));

                let beyond = h.workflow.paginate(page_params(4, 10)).await.unwrap();
                assert!(beyond.data.is_empty());
                assert_eq!(beyond.pagination.total, 25);
            }

            #[tokio::test]
            async fn test_paginate_far_past_last_page() {
                let h = harness($factory);
                for i in 0..3 {
                    h.workflow
                        .create(booking_params("Guest", 5550000 + i, "2024-04-01T18:00:00+00:00"))
                        .await
                        .unwrap();
                }

                let page = h.workflow.paginate(page_params(i64::MAX, 20)).await.unwrap();
                assert!(page.data.is_empty());
                assert_eq!(page.pagination.total, 3);
                assert_eq!(page.pagination.total_pages, 1);
                assert!(!page.pagination.has_next);
                assert_eq!(page.pagination.current_page, i64::MAX as usize);
            }

            #[tokio::test]
            async fn test_paginate_plain_date_range() {
                let h = harness($factory);
                for (name, phone, date) in [
                    ("Early", 5550001, "2024-01-01T23:30:00+00:00"),
                    ("Morning", 5550002, "2024-01-02T00:00:00+00:00"),
                    ("Late", 5550003, "2024-01-03T23:59:59+00:00"),
                    ("Next", 5550004, "2024-01-04T00:00:00+00:00"),
                ] {
                    h.workflow
                        .create(booking_params(name, phone, date))
                        .await
                        .unwrap();
                }

                let dated = h
                    .workflow
                    .paginate(params(json!({
                        "booking_from": "2024-01-02",
                        "booking_to": "2024-01-03",
                        "page": 1,
                        "size": 20,
                    })))
                    .await
                    .unwrap();
                let mut names: Vec<_> = dated.data.iter().map(|b| b.customer_name.clone()).collect();
                names.sort();
                assert_eq!(names, vec!["Late", "Morning"]);

                let err = h
                    .workflow
                    .paginate(params(json!({"booking_from": "02/01/2024"})))
                    .await
                    .unwrap_err();
                assert!(matches!(err, BookingError::BadInput(ref m) if m == "booking_from is invalid"));
            }

            #[tokio::test]
            async fn test_paginate_filters() {
                let h = harness($factory);
                let alice = h
                    .workflow
                    .create(booking_params("Alice", 5551234, "2024-01-01T10:00:00+00:00"))
                    .await
                    .unwrap();
                h.workflow
                    .create(booking_params("Malik", 5559999, "2024-01-02T10:00:00+00:00"))
                    .await
                    .unwrap();
                h.workflow
                    .create(booking_params("Bob", 5550000, "2024-01-03T10:00:00+00:00"))
                    .await
                    .unwrap();
                h.workflow
                    .update(alice.id, params(json!({"status": "cancel"})))
                    .await
                    .unwrap();

                let cancelled = h
                    .workflow
                    .paginate(params(json!({"status": "cancel", "page": 1, "size": 20})))
                    .await
                    .unwrap();
                assert_eq!(cancelled.data.len(), 1);
                assert_eq!(cancelled.data[0].id, alice.id);

                let named = h
                    .workflow
                    .paginate(params(json!({"customer_name": "ali", "page": 1, "size": 20})))
                    .await
                    .unwrap();
                let mut names: Vec<_> = named.data.iter().map(|b| b.customer_name.clone()).collect();
                names.sort();
                assert_eq!(names, vec!["Alice", "Malik"]);

                let dated = h
                    .workflow
                    .paginate(params(json!({
                        "booking_from": "2024-01-02T00:00:00+00:00",
                        "booking_to": "2024-01-03T23:59:59+00:00",
                        "page": 1,
                        "size": 20,
                    })))
                    .await
                    .unwrap();
                assert_eq!(dated.pagination.total, 2);

                let by_phone = h
                    .workflow
                    .paginate(params(json!({"phone": 5550000, "page": 1, "size": 20})))
                    .await
                    .unwrap();
                assert_eq!(by_phone.data.len(), 1);
                assert_eq!(by_phone.data[0].customer_name, "Bob");
            }

            #[tokio::test]
            async fn test_paginate_hides_deleted() {
                let h = harness($factory);
                let first = h
                    .workflow
                    .create(booking_params("Dan", 5552222, "2024-05-01T10:00:00+00:00"))
                    .await
                    .unwrap();
                h.workflow
                    .create(booking_params("Eve", 5553333, "2024-05-01T11:00:00+00:00"))
                    .await
                    .unwrap();

                h.workflow.delete(first.id).await.unwrap();

                let page = h.workflow.paginate(page_params(1, 10)).await.unwrap();
                assert_eq!(page.pagination.total, 1);
                assert_eq!(page.data[0].customer_name, "Eve");
            }

            #[tokio::test]
            async fn test_summary_by_date() {
                let h = harness($factory);
                for date in [
                    "2024-06-01T08:00:00+00:00",
                    "2024-06-01T20:00:00+00:00",
                    "2024-06-02T09:30:00+00:00",
                ] {
                    h.workflow
                        .create(booking_params("Guest", 5554444, date))
                        .await
                        .unwrap();
                }
                let removed = h
                    .workflow
                    .create(booking_params("Gone", 5555555, "2024-06-03T09:30:00+00:00"))
                    .await
                    .unwrap();
                h.workflow.delete(removed.id).await.unwrap();

                let summary = h.workflow.summary_by_date().await.unwrap();
                let day = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
                assert_eq!(summary.len(), 2);
                assert_eq!(summary.get(&day(1)), Some(&2));
                assert_eq!(summary.get(&day(2)), Some(&1));
                assert!(summary.get(&day(3)).is_none());
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_updates_serialise() {
                let h = harness($factory);
                let created = h
                    .workflow
                    .create(booking_params("Alice", 5551234, "2024-01-01T10:00:00+00:00"))
                    .await
                    .unwrap();

                let a = {
                    let workflow = h.workflow.clone();
                    tokio::spawn(async move {
                        workflow
                            .update(created.id, params(json!({"note": "first"})))
                            .await
                    })
                };
                let b = {
                    let workflow = h.workflow.clone();
                    tokio::spawn(async move {
                        workflow
                            .update(created.id, params(json!({"status": "contacted"})))
                            .await
                    })
                };

                a.await.unwrap().unwrap();
                b.await.unwrap().unwrap();

                let fetched = h.workflow.get(created.id).await.unwrap();
                assert_eq!(fetched.note.as_deref(), Some("first"));
                assert_eq!(fetched.status, BookingStatus::Contacted);
            }
        }
    };
}
