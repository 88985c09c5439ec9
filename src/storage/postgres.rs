//! PostgreSQL storage backend using sqlx.
//!
//! Provides `PostgresBookingStore` backed by a PostgreSQL database via
//! `sqlx::PgPool`. Row locks are taken with `SELECT ... FOR UPDATE` after
//! setting a transaction-local `lock_timeout`, so a contended lock fails
//! with SQLSTATE `55P03` instead of waiting indefinitely.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! booking-rs = { version = "0.1", features = ["postgres"] }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Duration;

use crate::core::booking::{Booking, BookingChanges, DateCount, NewBooking};
use crate::core::error::{BookingError, Result};
use crate::core::query::{BookingFilter, Page, PageRequest};
use crate::core::store::{BookingStore, EntityKind, RowFilter, StoreTransaction};

/// SQLSTATE raised when `lock_timeout` expires
const LOCK_NOT_AVAILABLE: &str = "55P03";

const COLUMNS: &str =
    "id, customer_name, phone, booking_date, status, note, created_at, updated_at, is_deleted";

/// Booking store backed by PostgreSQL.
#[derive(Clone, Debug)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Create a new `PostgresBookingStore` with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url`
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Append the `WHERE` clause for `filter`, soft-deleted rows excluded
fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter) {
    query.push(" WHERE is_deleted = false");

    if let Some(name) = &filter.customer_name {
        query
            .push(" AND customer_name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name)));
    }
    if let Some(phone) = filter.phone {
        query.push(" AND phone = ").push_bind(phone);
    }
    if let Some(from) = filter.booking_from {
        query.push(" AND booking_date >= ").push_bind(from);
    }
    if let Some(to) = filter.booking_to {
        query.push(" AND booking_date <= ").push_bind(to);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(from) = filter.created_from {
        query.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        query.push(" AND created_at <= ").push_bind(to);
    }
}

/// Escape `LIKE` wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(BookingError::storage)?;
        Ok(Box::new(PostgresTransaction { tx: Some(tx) }))
    }

    async fn insert(&self, booking: &NewBooking, now: DateTime<Utc>) -> Result<Booking> {
        let sql = format!(
            "INSERT INTO booking (customer_name, phone, booking_date, note, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&sql)
            .bind(&booking.customer_name)
            .bind(booking.phone)
            .bind(booking.booking_date)
            .bind(&booking.note)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(BookingError::storage)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>> {
        let sql = format!("SELECT {COLUMNS} FROM booking WHERE id = $1 AND is_deleted = false");
        sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(BookingError::storage)
    }

    async fn list(&self, filter: &BookingFilter, page: PageRequest) -> Result<Page<Booking>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM booking");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(BookingError::storage)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM booking"));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::try_from(page.size).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let items = select
            .build_query_as::<Booking>()
            .fetch_all(&self.pool)
            .await
            .map_err(BookingError::storage)?;

        Ok(Page {
            items,
            total: total as usize,
        })
    }

    async fn count_by_booking_date(&self) -> Result<Vec<DateCount>> {
        let rows = sqlx::query_as::<_, (NaiveDate, i64)>(
            "SELECT (booking_date AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS total \
             FROM booking WHERE is_deleted = false GROUP BY day ORDER BY day",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(BookingError::storage)?;

        Ok(rows
            .into_iter()
            .map(|(day, total)| DateCount { day, total })
            .collect())
    }
}

/// Transaction on a [`PostgresBookingStore`]
///
/// Dropping the inner `sqlx::Transaction` without committing rolls it back.
pub struct PostgresTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresTransaction {
    fn conn(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| BookingError::Internal("transaction already finished".to_string()))
    }
}

fn lock_error(err: sqlx::Error, kind: EntityKind, filter: RowFilter) -> BookingError {
    if let sqlx::Error::Database(db) = &err
        && db.code().as_deref() == Some(LOCK_NOT_AVAILABLE)
    {
        return BookingError::conflict(format!("{kind} {filter} is locked by another request"));
    }
    BookingError::storage(err)
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn lock_row(
        &mut self,
        kind: EntityKind,
        filter: RowFilter,
        timeout: Duration,
    ) -> Result<bool> {
        let tx = self.conn()?;
        let RowFilter::Id(id) = filter;

        // SET does not accept bind parameters
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis()))
            .execute(&mut **tx)
            .await
            .map_err(BookingError::storage)?;

        let sql = format!(
            "SELECT id FROM {} WHERE id = $1 AND is_deleted = false FOR UPDATE",
            kind.table_name()
        );
        let locked: Option<i64> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|err| lock_error(err, kind, filter))?;

        Ok(locked.is_some())
    }

    async fn update_booking(
        &mut self,
        id: i64,
        changes: &BookingChanges,
        now: DateTime<Utc>,
    ) -> Result<Booking> {
        let tx = self.conn()?;

        let row = if changes.is_empty() {
            let sql =
                format!("SELECT {COLUMNS} FROM booking WHERE id = $1 AND is_deleted = false");
            sqlx::query_as::<_, Booking>(&sql)
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
        } else {
            let mut query = QueryBuilder::<Postgres>::new("UPDATE booking SET updated_at = ");
            query.push_bind(now);
            if let Some(name) = &changes.customer_name {
                query.push(", customer_name = ").push_bind(name.clone());
            }
            if let Some(phone) = changes.phone {
                query.push(", phone = ").push_bind(phone);
            }
            if let Some(date) = changes.booking_date {
                query.push(", booking_date = ").push_bind(date);
            }
            if let Some(note) = &changes.note {
                query.push(", note = ").push_bind(note.clone());
            }
            if let Some(status) = changes.status {
                query.push(", status = ").push_bind(status);
            }
            query
                .push(" WHERE id = ")
                .push_bind(id)
                .push(" AND is_deleted = false RETURNING ")
                .push(COLUMNS);

            query
                .build_query_as::<Booking>()
                .fetch_optional(&mut **tx)
                .await
        };

        row.map_err(BookingError::storage)?
            .ok_or_else(|| BookingError::not_found("booking not found"))
    }

    async fn soft_delete_booking(&mut self, id: i64, now: DateTime<Utc>) -> Result<()> {
        let tx = self.conn()?;
        let result = sqlx::query(
            "UPDATE booking SET is_deleted = true, updated_at = $1 \
             WHERE id = $2 AND is_deleted = false",
        )
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(BookingError::storage)?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found("booking not found"));
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => tx.commit().await.map_err(BookingError::storage),
            None => Err(BookingError::Internal(
                "transaction already finished".to_string(),
            )),
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(BookingError::storage),
            None => Ok(()),
        }
    }

    async fn close(&mut self) -> Result<()> {
        drop(self.tx.take());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ali"), "ali");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
