//! Shared test harness for storage backend testing
//!
//! Provides helpers that build a [`BookingWorkflow`] over any
//! [`BookingStore`] with an [`EventBus`] sink, plus parameter builders for
//! the common booking payloads.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod workflow_tests;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use booking::core::error::{BookingError, Result};
use booking::core::events::{BookingEvent, EventBus, NotificationSink};
use booking::core::store::BookingStore;
use booking::core::transaction::LockingTransactionRunner;
use booking::core::validation::{Params, params_from_json};
use booking::workflow::BookingWorkflow;

/// Lock wait used by harness workflows
pub const TEST_LOCK_TIMEOUT: Duration = Duration::from_secs(3);

/// Workflow under test plus the bus its notifications land on
pub struct Harness {
    pub workflow: Arc<BookingWorkflow>,
    pub events: EventBus,
}

/// Build a workflow over `store` with a fresh event bus
pub fn harness(store: impl BookingStore + 'static) -> Harness {
    harness_with_timeout(store, TEST_LOCK_TIMEOUT)
}

pub fn harness_with_timeout(store: impl BookingStore + 'static, lock_timeout: Duration) -> Harness {
    let events = EventBus::new(64);
    let workflow = workflow_with_sink(store, lock_timeout, Arc::new(events.clone()));

    Harness { workflow, events }
}

/// Build a workflow whose notifications go to `sink`
pub fn workflow_with_sink(
    store: impl BookingStore + 'static,
    lock_timeout: Duration,
    sink: Arc<dyn NotificationSink>,
) -> Arc<BookingWorkflow> {
    let store: Arc<dyn BookingStore> = Arc::new(store);
    let runner = LockingTransactionRunner::new(Arc::clone(&store), lock_timeout);
    Arc::new(BookingWorkflow::new(store, runner, sink))
}

/// Sink that rejects every event, counting the attempts
#[derive(Debug, Default)]
pub struct FailingSink {
    attempts: std::sync::atomic::AtomicUsize,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for FailingSink {
    async fn send(&self, _topic: &str, _key: &str, _event: &BookingEvent) -> Result<()> {
        self.attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err(BookingError::Notification("broker unavailable".to_string()))
    }
}

/// Parameters for creating a booking
pub fn booking_params(customer_name: &str, phone: i64, booking_date: &str) -> Params {
    params(json!({
        "customer_name": customer_name,
        "phone": phone,
        "booking_date": booking_date,
    }))
}

pub fn params(value: Value) -> Params {
    params_from_json(value)
}

/// Listing parameters for `page` / `size`
pub fn page_params(page: i64, size: i64) -> Params {
    params(json!({"page": page, "size": size}))
}
