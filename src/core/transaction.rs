//! Row-locking transaction runner
//!
//! A mutation declares which rows it touches as a list of [`LockSpec`]s.
//! [`LockingTransactionRunner::run_locked`] opens a transaction, locks each
//! selected row with a bounded wait, runs the unit of work, then commits.
//! Any failure rolls the transaction back and is returned unchanged. The
//! session is closed exactly once on every path.
//!
//! ```text
//! Idle ─▶ LockAcquisition ─▶ Executing ─┬─▶ Committing ──┬─▶ Closed
//!               │                       │                │
//!               └───────────────────────┴─▶ RollingBack ◀┘
//! ```

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::core::error::{BookingError, Result};
use crate::core::store::{BookingStore, EntityKind, RowFilter, StoreTransaction};
use crate::core::validation::Params;

type LockPredicate = Arc<dyn Fn(&Params) -> Option<RowFilter> + Send + Sync>;

/// One row a mutation must lock before it runs
///
/// The predicate receives the bound request parameters and selects the
/// row; returning `None` means the parameters do not identify a row.
#[derive(Clone)]
pub struct LockSpec {
    pub kind: EntityKind,
    predicate: LockPredicate,
}

impl LockSpec {
    pub fn new<F>(kind: EntityKind, predicate: F) -> Self
    where
        F: Fn(&Params) -> Option<RowFilter> + Send + Sync + 'static,
    {
        Self {
            kind,
            predicate: Arc::new(predicate),
        }
    }

    /// Lock the row whose id is the integer parameter `param`
    pub fn by_id(kind: EntityKind, param: &'static str) -> Self {
        Self::new(kind, move |params| {
            params
                .get(param)
                .and_then(|value| value.as_i64())
                .map(RowFilter::Id)
        })
    }

    pub fn resolve(&self, params: &Params) -> Option<RowFilter> {
        (self.predicate)(params)
    }
}

impl fmt::Debug for LockSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockSpec")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Runs units of work inside a transaction holding row locks
#[derive(Clone)]
pub struct LockingTransactionRunner {
    store: Arc<dyn BookingStore>,
    lock_timeout: Duration,
}

impl LockingTransactionRunner {
    pub fn new(store: Arc<dyn BookingStore>, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock_timeout,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Lock every row selected by `specs`, then run `work`
    ///
    /// Fails with `InvalidLockPlan` before opening a transaction when a spec
    /// selects no row from `params` or two specs select the same row. Fails
    /// with `NotFound` when a selected row is absent or soft-deleted, and
    /// with `Conflict` when a lock is not granted within the lock timeout.
    pub async fn run_locked<T, F>(&self, specs: &[LockSpec], params: Params, work: F) -> Result<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut dyn StoreTransaction, Params) -> BoxFuture<'t, Result<T>>
            + Send,
    {
        let targets = plan(specs, &params)?;

        let mut tx = self.store.begin().await?;
        let outcome = execute(tx.as_mut(), &targets, self.lock_timeout, params, work).await;

        let outcome = match outcome {
            Ok(value) => match tx.commit().await {
                Ok(()) => {
                    tracing::debug!(locks = targets.len(), "transaction committed");
                    Ok(value)
                }
                Err(err) => {
                    rollback(tx.as_mut(), &err).await;
                    Err(err)
                }
            },
            Err(err) => {
                rollback(tx.as_mut(), &err).await;
                Err(err)
            }
        };

        if let Err(err) = tx.close().await {
            tracing::warn!(error = %err, "failed to close transaction");
        }

        outcome
    }
}

async fn execute<T, F>(
    tx: &mut dyn StoreTransaction,
    targets: &[(EntityKind, RowFilter)],
    timeout: Duration,
    params: Params,
    work: F,
) -> Result<T>
where
    F: for<'t> FnOnce(&'t mut dyn StoreTransaction, Params) -> BoxFuture<'t, Result<T>>,
{
    for &(kind, filter) in targets {
        if !tx.lock_row(kind, filter, timeout).await? {
            return Err(BookingError::not_found(format!("{kind} not found")));
        }
        tracing::debug!(%kind, %filter, "row locked");
    }

    work(tx, params).await
}

async fn rollback(tx: &mut dyn StoreTransaction, cause: &BookingError) {
    tracing::debug!(error = %cause, "rolling back transaction");
    if let Err(err) = tx.rollback().await {
        tracing::warn!(error = %err, "rollback failed");
    }
}

fn plan(specs: &[LockSpec], params: &Params) -> Result<Vec<(EntityKind, RowFilter)>> {
    let mut targets = Vec::with_capacity(specs.len());
    for spec in specs {
        let filter = spec.resolve(params).ok_or_else(|| {
            BookingError::InvalidLockPlan(format!(
                "parameters do not select a {} row",
                spec.kind
            ))
        })?;

        let target = (spec.kind, filter);
        if targets.contains(&target) {
            return Err(BookingError::InvalidLockPlan(format!(
                "{} row {} is locked twice",
                spec.kind, filter
            )));
        }
        targets.push(target);
    }
    Ok(targets)
}
