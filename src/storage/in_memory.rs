//! In-memory implementation of BookingStore for testing and development
//!
//! Committed rows live behind an `RwLock`. Each transaction takes real
//! per-row locks (`tokio::sync::Mutex`, acquired with a timeout) and stages
//! its writes privately until commit, so concurrent mutations behave like
//! they do against a database. A row's lock entry is dropped from the
//! registry once no transaction holds or waits on it.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use crate::core::booking::{Booking, BookingChanges, BookingStatus, DateCount, NewBooking};
use crate::core::error::{BookingError, Result};
use crate::core::query::{BookingFilter, Page, PageRequest};
use crate::core::store::{BookingStore, EntityKind, RowFilter, StoreTransaction};

#[derive(Debug, Default)]
struct Rows {
    bookings: BTreeMap<i64, Booking>,
    last_id: i64,
}

type LockKey = (EntityKind, i64);
type LockMap = HashMap<LockKey, Arc<RowLock<()>>>;
type LockRegistry = Arc<Mutex<LockMap>>;

fn registry(locks: &Mutex<LockMap>) -> Result<MutexGuard<'_, LockMap>> {
    locks
        .lock()
        .map_err(|e| BookingError::storage(format!("failed to acquire lock registry: {e}")))
}

fn read(rows: &RwLock<Rows>) -> Result<RwLockReadGuard<'_, Rows>> {
    rows.read()
        .map_err(|e| BookingError::storage(format!("failed to acquire read lock: {e}")))
}

fn write(rows: &RwLock<Rows>) -> Result<RwLockWriteGuard<'_, Rows>> {
    rows.write()
        .map_err(|e| BookingError::storage(format!("failed to acquire write lock: {e}")))
}

/// In-memory booking store
///
/// Cheap to clone; clones share the same rows and locks.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    rows: Arc<RwLock<Rows>>,
    locks: LockRegistry,
}

impl InMemoryBookingStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, soft-deleted ones included
    pub fn row_count(&self) -> Result<usize> {
        Ok(read(&self.rows)?.bookings.len())
    }

    /// Get a row by ID whether or not it is soft-deleted
    pub fn raw_row(&self, id: i64) -> Result<Option<Booking>> {
        Ok(read(&self.rows)?.bookings.get(&id).cloned())
    }

    /// Number of row locks currently tracked
    pub fn lock_count(&self) -> Result<usize> {
        Ok(registry(&self.locks)?.len())
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            rows: Arc::clone(&self.rows),
            locks: Arc::clone(&self.locks),
            held: Vec::new(),
            staged: BTreeMap::new(),
        }))
    }

    async fn insert(&self, booking: &NewBooking, now: DateTime<Utc>) -> Result<Booking> {
        let mut rows = write(&self.rows)?;
        rows.last_id += 1;

        let stored = Booking {
            id: rows.last_id,
            customer_name: booking.customer_name.clone(),
            phone: booking.phone,
            booking_date: booking.booking_date,
            status: BookingStatus::New,
            note: booking.note.clone(),
            created_at: now,
            updated_at: None,
            is_deleted: false,
        };
        rows.bookings.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>> {
        let rows = read(&self.rows)?;
        Ok(rows.bookings.get(&id).filter(|b| !b.is_deleted).cloned())
    }

    async fn list(&self, filter: &BookingFilter, page: PageRequest) -> Result<Page<Booking>> {
        let rows = read(&self.rows)?;

        let mut matching: Vec<&Booking> =
            rows.bookings.values().filter(|b| filter.matches(b)).collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .cloned()
            .collect();

        Ok(Page { items, total })
    }

    async fn count_by_booking_date(&self) -> Result<Vec<DateCount>> {
        let rows = read(&self.rows)?;

        let mut counts: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for booking in rows.bookings.values().filter(|b| !b.is_deleted) {
            *counts.entry(booking.booking_date.date_naive()).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(day, total)| DateCount { day, total })
            .collect())
    }
}

/// Transaction on an [`InMemoryBookingStore`]
pub struct InMemoryTransaction {
    rows: Arc<RwLock<Rows>>,
    locks: LockRegistry,
    held: Vec<(LockKey, OwnedMutexGuard<()>)>,
    staged: BTreeMap<i64, Booking>,
}

impl InMemoryTransaction {
    fn row_lock(&self, key: LockKey) -> Result<Arc<RowLock<()>>> {
        Ok(Arc::clone(registry(&self.locks)?.entry(key).or_default()))
    }

    /// Drop registry entries nobody holds or waits on
    fn prune<I: IntoIterator<Item = LockKey>>(&self, keys: I) -> Result<()> {
        let mut locks = registry(&self.locks)?;
        for key in keys {
            if locks.get(&key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(&key);
            }
        }
        Ok(())
    }

    fn unlock_all(&mut self) -> Result<()> {
        let keys: Vec<LockKey> = self.held.drain(..).map(|(key, _guard)| key).collect();
        self.prune(keys)
    }

    fn is_live(&self, id: i64) -> Result<bool> {
        Ok(read(&self.rows)?
            .bookings
            .get(&id)
            .is_some_and(|b| !b.is_deleted))
    }

    /// Latest version of a live row as seen by this transaction
    fn current(&self, id: i64) -> Result<Booking> {
        let row = match self.staged.get(&id) {
            Some(staged) => Some(staged.clone()),
            None => read(&self.rows)?.bookings.get(&id).cloned(),
        };
        row.filter(|b| !b.is_deleted)
            .ok_or_else(|| BookingError::not_found("booking not found"))
    }

    fn release(&mut self) -> Result<()> {
        self.staged.clear();
        self.unlock_all()
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn lock_row(
        &mut self,
        kind: EntityKind,
        filter: RowFilter,
        timeout: Duration,
    ) -> Result<bool> {
        let RowFilter::Id(id) = filter;
        if !self.is_live(id)? {
            return Ok(false);
        }

        let key = (kind, id);
        let lock = self.row_lock(key)?;
        let Ok(guard) = tokio::time::timeout(timeout, lock.lock_owned()).await else {
            self.prune([key])?;
            return Err(BookingError::conflict(format!(
                "{kind} {filter} is locked by another request"
            )));
        };

        // The previous holder may have deleted the row while we waited
        if !self.is_live(id)? {
            drop(guard);
            self.prune([key])?;
            return Ok(false);
        }

        self.held.push((key, guard));
        Ok(true)
    }

    async fn update_booking(
        &mut self,
        id: i64,
        changes: &BookingChanges,
        now: DateTime<Utc>,
    ) -> Result<Booking> {
        let mut booking = self.current(id)?;
        if changes.is_empty() {
            return Ok(booking);
        }

        changes.apply_to(&mut booking, now);
        self.staged.insert(id, booking.clone());
        Ok(booking)
    }

    async fn soft_delete_booking(&mut self, id: i64, now: DateTime<Utc>) -> Result<()> {
        let mut booking = self.current(id)?;
        booking.is_deleted = true;
        booking.updated_at = Some(now);
        self.staged.insert(id, booking);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        {
            let mut rows = write(&self.rows)?;
            for (id, booking) in std::mem::take(&mut self.staged) {
                rows.bookings.insert(id, booking);
            }
        }
        self.unlock_all()
    }

    async fn rollback(&mut self) -> Result<()> {
        self.release()
    }

    async fn close(&mut self) -> Result<()> {
        self.release()
    }
}
