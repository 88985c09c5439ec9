//! Booking business logic
//!
//! [`BookingWorkflow`] receives parameters already bound by the HTTP layer,
//! re-validates them against the operation's schema, and talks to the
//! store. Updates and deletes run under a row lock through the
//! [`LockingTransactionRunner`]; creation emits a `booking_created`
//! notification once the row is committed.

pub mod schemas;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use crate::config::{BOOKING_TOPIC, DEFAULT_PAGE_LIMIT, DEFAULT_PAGE_NUMBER};
use crate::core::booking::{Booking, BookingChanges, BookingStatus, NewBooking};
use crate::core::error::{BookingError, Result};
use crate::core::events::{BookingEvent, NotificationSink};
use crate::core::query::{BookingFilter, PageRequest, PaginatedResponse};
use crate::core::store::{BookingStore, EntityKind, StoreTransaction};
use crate::core::transaction::{LockSpec, LockingTransactionRunner};
use crate::core::validation::{Params, SchemaValidator};

pub use schemas::{BOOKING_ID, BookingFields, BookingSchemas};

/// Parameters accepted by [`BookingWorkflow::paginate`]
///
/// Range bounds are RFC 3339 timestamps or plain `YYYY-MM-DD` dates. A
/// plain date covers the whole UTC day: `*_from` starts at midnight and
/// `*_to` ends at the last instant of that day.
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    customer_name: Option<String>,
    phone: Option<i64>,
    booking_from: Option<String>,
    booking_to: Option<String>,
    status: Option<BookingStatus>,
    created_from: Option<String>,
    created_to: Option<String>,
    page: Option<i64>,
    size: Option<i64>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        let page = self.page.unwrap_or(DEFAULT_PAGE_NUMBER as i64).max(1);
        let size = self.size.unwrap_or(DEFAULT_PAGE_LIMIT as i64).max(1);
        PageRequest::new(page as usize, size as usize)
    }

    fn into_filter(self) -> Result<BookingFilter> {
        Ok(BookingFilter {
            customer_name: self.customer_name,
            phone: self.phone,
            booking_from: range_bound("booking_from", self.booking_from, NaiveTime::MIN)?,
            booking_to: range_bound("booking_to", self.booking_to, end_of_day())?,
            status: self.status,
            created_from: range_bound("created_from", self.created_from, NaiveTime::MIN)?,
            created_to: range_bound("created_to", self.created_to, end_of_day())?,
        })
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

/// Parse a range bound, pinning a plain date to `time` UTC
fn range_bound(
    field: &str,
    raw: Option<String>,
    time: NaiveTime,
) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map(|day| Some(day.and_time(time).and_utc()))
        .map_err(|_| BookingError::bad_input(format!("{field} is invalid")))
}

/// Create, read, update, delete, list and summarise bookings
pub struct BookingWorkflow {
    store: Arc<dyn BookingStore>,
    runner: LockingTransactionRunner,
    sink: Arc<dyn NotificationSink>,
    validator: SchemaValidator,
    schemas: Arc<BookingSchemas>,
    row_lock: Vec<LockSpec>,
    topic: String,
}

impl BookingWorkflow {
    pub fn new(
        store: Arc<dyn BookingStore>,
        runner: LockingTransactionRunner,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            runner,
            sink,
            validator: SchemaValidator::new(),
            schemas: Arc::new(BookingSchemas::default()),
            row_lock: vec![LockSpec::by_id(EntityKind::Booking, BOOKING_ID)],
            topic: BOOKING_TOPIC.to_string(),
        }
    }

    /// Publish notifications on `topic` instead of the default one
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// List non-deleted bookings matching the filter parameters
    pub async fn paginate(&self, params: Params) -> Result<PaginatedResponse<Booking>> {
        let clean = self.validator.validate(&self.schemas.paginate, &params)?;
        let query: ListQuery = from_params(clean)?;
        let request = query.page_request();

        let page = self.store.list(&query.into_filter()?, request).await?;
        Ok(PaginatedResponse::new(page, request))
    }

    /// Insert a booking with status `new` and announce it
    pub async fn create(&self, params: Params) -> Result<Booking> {
        let clean = self.validator.validate(&self.schemas.create, &params)?;
        let new: NewBooking = from_params(clean)?;
        new.validate()?;

        let booking = self.store.insert(&new, Utc::now()).await?;
        tracing::info!(booking_id = booking.id, "booking created");

        self.notify(BookingEvent::BookingCreated {
            booking_id: booking.id,
        });
        Ok(booking)
    }

    pub async fn get(&self, id: i64) -> Result<Booking> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking not found"))
    }

    /// Overwrite the supplied fields of a booking under a row lock
    pub async fn update(&self, id: i64, mut params: Params) -> Result<Booking> {
        params.insert(BOOKING_ID.to_string(), Value::from(id));
        let validator = self.validator;
        let schemas = Arc::clone(&self.schemas);

        let booking = self
            .runner
            .run_locked(&self.row_lock, params, move |tx, params| {
                Box::pin(apply_update(tx, params, validator, schemas))
            })
            .await?;

        tracing::info!(booking_id = id, "booking updated");
        Ok(booking)
    }

    /// Soft-delete a booking under a row lock
    pub async fn delete(&self, id: i64) -> Result<()> {
        let params = Params::from([(BOOKING_ID.to_string(), Value::from(id))]);
        let validator = self.validator;
        let schemas = Arc::clone(&self.schemas);

        self.runner
            .run_locked(&self.row_lock, params, move |tx, params| {
                Box::pin(apply_delete(tx, params, validator, schemas))
            })
            .await?;

        tracing::info!(booking_id = id, "booking deleted");
        Ok(())
    }

    /// Number of non-deleted bookings per booking day
    pub async fn summary_by_date(&self) -> Result<BTreeMap<NaiveDate, i64>> {
        let counts = self.store.count_by_booking_date().await?;
        Ok(counts.into_iter().map(|c| (c.day, c.total)).collect())
    }

    /// Hand `event` to the sink without waiting for delivery
    fn notify(&self, event: BookingEvent) {
        let sink = Arc::clone(&self.sink);
        let topic = self.topic.clone();

        tokio::spawn(async move {
            let key = event.key();
            if let Err(err) = sink.send(&topic, &key, &event).await {
                tracing::error!(
                    target: "booking::notify",
                    topic = %topic,
                    key = %key,
                    event = event.name(),
                    error = %err,
                    "failed to publish booking event"
                );
            }
        });
    }
}

async fn apply_update(
    tx: &mut dyn StoreTransaction,
    params: Params,
    validator: SchemaValidator,
    schemas: Arc<BookingSchemas>,
) -> Result<Booking> {
    let clean = validator.validate(&schemas.update, &params)?;
    let id = booking_id(&clean)?;
    let changes: BookingChanges = from_params(clean)?;
    changes.validate()?;

    tx.update_booking(id, &changes, Utc::now()).await
}

async fn apply_delete(
    tx: &mut dyn StoreTransaction,
    params: Params,
    validator: SchemaValidator,
    schemas: Arc<BookingSchemas>,
) -> Result<()> {
    let clean = validator.validate(&schemas.delete, &params)?;
    let id = booking_id(&clean)?;

    tx.soft_delete_booking(id, Utc::now()).await
}

fn booking_id(params: &Params) -> Result<i64> {
    params
        .get(BOOKING_ID)
        .and_then(Value::as_i64)
        .ok_or_else(|| BookingError::bad_input(format!("{BOOKING_ID} is invalid")))
}

/// Deserialize schema-checked parameters into `T`
///
/// A failure is reported against the field that caused it, found by
/// dropping one key at a time until the error changes.
fn from_params<T: DeserializeOwned>(params: Params) -> Result<T> {
    let object = params.into_iter().collect::<serde_json::Map<_, _>>();
    serde_json::from_value(Value::Object(object.clone())).map_err(|err| {
        tracing::debug!(error = %err, "bound parameters do not fit their target");
        match offending_field::<T>(&object, &err.to_string()) {
            Some(field) => BookingError::bad_input(format!("{field} is invalid")),
            None => BookingError::from(err),
        }
    })
}

/// First key whose removal changes the deserialization error
fn offending_field<T: DeserializeOwned>(
    object: &serde_json::Map<String, Value>,
    baseline: &str,
) -> Option<String> {
    object.keys().find_map(|key| {
        let mut without = object.clone();
        without.remove(key);
        match serde_json::from_value::<T>(Value::Object(without)) {
            Ok(_) => Some(key.clone()),
            Err(err) if err.to_string() != baseline => Some(key.clone()),
            Err(_) => None,
        }
    })
}
