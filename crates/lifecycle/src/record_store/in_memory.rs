use std::any::Any;
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use reclaim_core::{Record, Scope, SoftDeletable};

use super::r#trait::{RecordStore, StoreError};
use crate::transaction::TransactionParticipant;

/// In-memory record store.
///
/// Intended for tests/dev. Not optimized for performance.
pub struct InMemoryRecordStore<R: Record> {
    rows: RwLock<HashMap<R::Id, R>>,
}

impl<R: Record> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<R: Record> InMemoryRecordStore<R> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R> RecordStore<R> for InMemoryRecordStore<R>
where
    R: SoftDeletable + Clone + Send + Sync,
    R::Id: Send + Sync,
{
    fn insert(&self, record: R) -> Result<R, StoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        if rows.contains_key(record.id()) {
            return Err(StoreError::Constraint(format!(
                "duplicate id {:?} in '{}'",
                record.id(),
                R::table_name()
            )));
        }

        let mut record = record;
        record.mark_persisted();
        rows.insert(record.id().clone(), record.clone());
        Ok(record)
    }

    fn find(&self, id: &R::Id, scope: Scope) -> Result<Option<R>, StoreError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(rows.get(id).filter(|r| scope.admits(*r)).cloned())
    }

    fn list(&self, scope: Scope) -> Result<Vec<R>, StoreError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(rows.values().filter(|r| scope.admits(*r)).cloned().collect())
    }

    fn write_marker(&self, id: &R::Id, marker: Option<DateTime<Utc>>) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        match rows.get_mut(id) {
            Some(row) => {
                row.set_deleted_at(marker);
                Ok(())
            }
            None => Err(StoreError::Conflict(format!(
                "no row for {:?} in '{}'",
                id,
                R::table_name()
            ))),
        }
    }

    fn remove(&self, id: &R::Id) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        match rows.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::Conflict(format!(
                "no row for {:?} in '{}'",
                id,
                R::table_name()
            ))),
        }
    }
}

impl<R> TransactionParticipant for InMemoryRecordStore<R>
where
    R: SoftDeletable + Clone + Send + Sync + 'static,
    R::Id: Send + Sync,
{
    fn snapshot(&self) -> Result<Box<dyn Any + Send>, StoreError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(Box::new(rows.clone()))
    }

    fn restore(&self, snapshot: Box<dyn Any + Send>) -> Result<(), StoreError> {
        let snapshot = snapshot
            .downcast::<HashMap<R::Id, R>>()
            .map_err(|_| StoreError::Backend("snapshot type mismatch".to_string()))?;

        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        *rows = *snapshot;
        Ok(())
    }
}
