use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use reclaim_core::{Scope, SoftDeletable};

/// Record store operation error.
///
/// These are **infrastructure errors** (storage, conflicts, connectivity) as
/// opposed to lifecycle errors (setup preconditions, strict-destroy
/// escalation). They are never swallowed: a store error propagates out of
/// the enclosing transaction envelope and forces a rollback.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The targeted row changed or vanished underneath the operation
    /// (stale-object conflict).
    #[error("stale row: {0}")]
    Conflict(String),

    /// A storage constraint rejected the write (e.g. duplicate key).
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The backend itself failed (pool, lock, IO).
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Row-level store for soft-deletable records.
///
/// ## Design Principles
///
/// - **No storage assumptions**: works with in-memory implementations
///   (tests/dev) and SQL backends (production)
/// - **Explicit visibility**: every read takes a [`Scope`]; there is no
///   silently-applied deletion filter
/// - **Single-column marker writes**: `write_marker` touches the deletion
///   marker alone, without triggering a full validation cycle
/// - **Terminal removal**: `remove` physically deletes the row; the
///   identifier stops resolving under any scope
pub trait RecordStore<R: SoftDeletable>: Send + Sync {
    /// Persist a new record, marking it saved. The returned record carries
    /// the persisted flag.
    fn insert(&self, record: R) -> Result<R, StoreError>;

    /// Fetch one record by id under the given scope.
    fn find(&self, id: &R::Id, scope: Scope) -> Result<Option<R>, StoreError>;

    /// List records under the given scope, in the store's natural
    /// enumeration order.
    fn list(&self, scope: Scope) -> Result<Vec<R>, StoreError>;

    /// Overwrite the deletion marker column for one row. `None` reactivates
    /// the row. Must not touch any other column.
    fn write_marker(&self, id: &R::Id, marker: Option<DateTime<Utc>>) -> Result<(), StoreError>;

    /// Physically delete the row. Irrecoverable.
    fn remove(&self, id: &R::Id) -> Result<(), StoreError>;
}

impl<R, S> RecordStore<R> for Arc<S>
where
    R: SoftDeletable,
    S: RecordStore<R> + ?Sized,
{
    fn insert(&self, record: R) -> Result<R, StoreError> {
        (**self).insert(record)
    }

    fn find(&self, id: &R::Id, scope: Scope) -> Result<Option<R>, StoreError> {
        (**self).find(id, scope)
    }

    fn list(&self, scope: Scope) -> Result<Vec<R>, StoreError> {
        (**self).list(scope)
    }

    fn write_marker(&self, id: &R::Id, marker: Option<DateTime<Utc>>) -> Result<(), StoreError> {
        (**self).write_marker(id, marker)
    }

    fn remove(&self, id: &R::Id) -> Result<(), StoreError> {
        (**self).remove(id)
    }
}

/// Async counterpart of [`RecordStore`], implemented by network-backed
/// stores. Semantics are identical; only the execution model differs.
#[async_trait]
pub trait AsyncRecordStore<R: SoftDeletable>: Send + Sync {
    async fn insert(&self, record: R) -> Result<R, StoreError>;

    async fn find(&self, id: &R::Id, scope: Scope) -> Result<Option<R>, StoreError>;

    async fn list(&self, scope: Scope) -> Result<Vec<R>, StoreError>;

    async fn write_marker(
        &self,
        id: &R::Id,
        marker: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    async fn remove(&self, id: &R::Id) -> Result<(), StoreError>;
}
