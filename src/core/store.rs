//! Storage capability traits
//!
//! The workflow never talks to a database directly. It talks to a
//! [`BookingStore`] for reads and inserts, and to a [`StoreTransaction`]
//! for everything that must happen under a row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use crate::core::booking::{Booking, BookingChanges, DateCount, NewBooking};
use crate::core::error::Result;
use crate::core::query::{BookingFilter, Page, PageRequest};

/// Kinds of rows a transaction can lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Booking,
}

impl EntityKind {
    /// Table backing this kind
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Booking => "booking",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Predicate selecting the single row to lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowFilter {
    Id(i64),
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowFilter::Id(id) => write!(f, "id = {id}"),
        }
    }
}

/// Non-transactional access to bookings
///
/// All read paths skip soft-deleted rows.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Open a transaction for locked mutations
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Insert a booking with status `new` and return the stored row
    async fn insert(&self, booking: &NewBooking, now: DateTime<Utc>) -> Result<Booking>;

    /// Get a non-deleted booking by ID
    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>>;

    /// List non-deleted bookings newest first (`created_at` desc, then `id` desc)
    async fn list(&self, filter: &BookingFilter, page: PageRequest) -> Result<Page<Booking>>;

    /// Count non-deleted bookings per calendar day of `booking_date` (UTC)
    async fn count_by_booking_date(&self) -> Result<Vec<DateCount>>;
}

/// A transactional session on the store
///
/// Writes become visible to other sessions only after [`commit`]. Row locks
/// are held until the session commits, rolls back or closes.
///
/// [`commit`]: StoreTransaction::commit
#[async_trait]
pub trait StoreTransaction: Send {
    /// Lock the non-deleted row matching `filter`
    ///
    /// Returns `Ok(false)` when no such row exists and
    /// [`BookingError::Conflict`](crate::core::error::BookingError::Conflict)
    /// when the lock is not granted within `timeout`.
    async fn lock_row(
        &mut self,
        kind: EntityKind,
        filter: RowFilter,
        timeout: Duration,
    ) -> Result<bool>;

    /// Overwrite the supplied fields of a locked booking
    async fn update_booking(
        &mut self,
        id: i64,
        changes: &BookingChanges,
        now: DateTime<Utc>,
    ) -> Result<Booking>;

    /// Flip the soft-delete flag of a locked booking
    async fn soft_delete_booking(&mut self, id: i64, now: DateTime<Utc>) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    /// Release the session and any lock still held
    ///
    /// Uncommitted writes are discarded.
    async fn close(&mut self) -> Result<()>;
}
