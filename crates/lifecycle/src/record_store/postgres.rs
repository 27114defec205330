//! Postgres-backed record store.
//!
//! Document-style persistence for soft-deletable records: one shared
//! `records` table keyed by `(table_name, record_id)`, the record payload
//! as JSONB, and the deletion marker in a dedicated `deleted_at` column so
//! scope predicates stay plain SQL. The payload's own marker field is
//! overwritten from the column on read — the column is the source of
//! truth.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Constraint` | Duplicate `(table_name, record_id)` insert |
//! | Database (serialization failure) | `40001` | `Conflict` | Concurrent transaction conflict |
//! | Database (foreign key / check violation) | `23503` / `23514` | `Constraint` | Referential or check constraint rejected the write |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | RowNotFound | N/A | `Conflict` | Row vanished underneath the operation |
//! | PoolClosed | N/A | `Backend` | Connection pool was closed |
//! | Other | N/A | `Backend` | Network errors, connection failures, etc. |
//!
//! ## Thread Safety
//!
//! `PostgresRecordStore` is `Send + Sync` and can be shared across
//! threads; all operations go through the SQLx connection pool.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool, Postgres};
use tracing::instrument;

use reclaim_core::{Record, Scope, SoftDeletable};

use super::r#trait::{AsyncRecordStore, StoreError};

/// Postgres-backed store for one record type.
///
/// Multi-row transitions map onto native transactions: callers that span
/// several operations open one via [`begin`](Self::begin) and commit or
/// roll back through SQLx.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore<R> {
    pool: Arc<PgPool>,
    _record: PhantomData<fn() -> R>,
}

#[derive(FromRow)]
struct RecordRow {
    payload: JsonValue,
    deleted_at: Option<DateTime<Utc>>,
}

impl<R> PostgresRecordStore<R>
where
    R: SoftDeletable + Serialize + DeserializeOwned + Send + Sync + 'static,
    R::Id: ToString + Send + Sync,
{
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            _record: PhantomData,
        }
    }

    /// Create the backing table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                table_name  TEXT        NOT NULL,
                record_id   TEXT        NOT NULL,
                payload     JSONB       NOT NULL,
                deleted_at  TIMESTAMPTZ,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (table_name, record_id)
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;

        Ok(())
    }

    /// Open a native transaction spanning several store operations.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))
    }

    #[instrument(skip(self, record), fields(table = R::table_name()), err)]
    pub async fn insert(&self, record: R) -> Result<R, StoreError> {
        let mut record = record;
        record.mark_persisted();

        let payload = serde_json::to_value(&record)
            .map_err(|e| StoreError::Backend(format!("insert: payload serialization failed: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO records (table_name, record_id, payload, deleted_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(R::table_name())
        .bind(record.id().to_string())
        .bind(payload)
        .bind(record.deleted_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;

        Ok(record)
    }

    #[instrument(skip(self, id), fields(table = R::table_name()), err)]
    pub async fn find(&self, id: &R::Id, scope: Scope) -> Result<Option<R>, StoreError> {
        let query = format!(
            "SELECT payload, deleted_at FROM records \
             WHERE table_name = $1 AND record_id = $2{}",
            scope_clause(scope)
        );

        let row = sqlx::query(&query)
            .bind(R::table_name())
            .bind(id.to_string())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find", e))?;

        row.map(|row| decode_row::<R>(&row)).transpose()
    }

    #[instrument(skip(self), fields(table = R::table_name()), err)]
    pub async fn list(&self, scope: Scope) -> Result<Vec<R>, StoreError> {
        let query = format!(
            "SELECT payload, deleted_at FROM records \
             WHERE table_name = $1{} ORDER BY created_at ASC",
            scope_clause(scope)
        );

        let rows = sqlx::query(&query)
            .bind(R::table_name())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(decode_row::<R>).collect()
    }

    #[instrument(skip(self, id), fields(table = R::table_name()), err)]
    pub async fn write_marker(
        &self,
        id: &R::Id,
        marker: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE records SET deleted_at = $3
            WHERE table_name = $1 AND record_id = $2
            "#,
        )
        .bind(R::table_name())
        .bind(id.to_string())
        .bind(marker)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("write_marker", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "write_marker: no row for '{}' in '{}'",
                id.to_string(),
                R::table_name()
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, id), fields(table = R::table_name()), err)]
    pub async fn remove(&self, id: &R::Id) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM records
            WHERE table_name = $1 AND record_id = $2
            "#,
        )
        .bind(R::table_name())
        .bind(id.to_string())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "remove: no row for '{}' in '{}'",
                id.to_string(),
                R::table_name()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<R> AsyncRecordStore<R> for PostgresRecordStore<R>
where
    R: SoftDeletable + Serialize + DeserializeOwned + Send + Sync + 'static,
    R::Id: ToString + Send + Sync,
{
    async fn insert(&self, record: R) -> Result<R, StoreError> {
        PostgresRecordStore::insert(self, record).await
    }

    async fn find(&self, id: &R::Id, scope: Scope) -> Result<Option<R>, StoreError> {
        PostgresRecordStore::find(self, id, scope).await
    }

    async fn list(&self, scope: Scope) -> Result<Vec<R>, StoreError> {
        PostgresRecordStore::list(self, scope).await
    }

    async fn write_marker(
        &self,
        id: &R::Id,
        marker: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        PostgresRecordStore::write_marker(self, id, marker).await
    }

    async fn remove(&self, id: &R::Id) -> Result<(), StoreError> {
        PostgresRecordStore::remove(self, id).await
    }
}

fn scope_clause(scope: Scope) -> String {
    scope
        .sql_predicate("deleted_at")
        .map(|predicate| format!(" AND {predicate}"))
        .unwrap_or_default()
}

fn decode_row<R>(row: &sqlx::postgres::PgRow) -> Result<R, StoreError>
where
    R: SoftDeletable + DeserializeOwned,
{
    let row = RecordRow::from_row(row)
        .map_err(|e| StoreError::Backend(format!("failed to read record row: {e}")))?;

    let mut record: R = serde_json::from_value(row.payload)
        .map_err(|e| StoreError::Backend(format!("failed to deserialize record payload: {e}")))?;

    // The column is the source of truth for the marker.
    record.set_deleted_at(row.deleted_at);
    record.mark_persisted();
    Ok(record)
}

fn map_sqlx_error(operation: &str, error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => {
                StoreError::Constraint(format!("{operation}: unique violation: {}", db.message()))
            }
            Some("40001") => StoreError::Conflict(format!(
                "{operation}: serialization failure: {}",
                db.message()
            )),
            Some("23503") | Some("23514") => {
                StoreError::Constraint(format!("{operation}: {}", db.message()))
            }
            _ => StoreError::Backend(format!("{operation}: {}", db.message())),
        },
        sqlx::Error::RowNotFound => StoreError::Conflict(format!("{operation}: row vanished")),
        sqlx::Error::PoolClosed => StoreError::Backend(format!("{operation}: pool closed")),
        _ => StoreError::Backend(format!("{operation}: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use reclaim_core::RecordId;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Ticket {
        id: RecordId,
        subject: String,
        deleted_at: Option<DateTime<Utc>>,
        #[serde(default)]
        persisted: bool,
        #[serde(default)]
        frozen: bool,
    }

    impl Record for Ticket {
        type Id = RecordId;

        fn id(&self) -> &Self::Id {
            &self.id
        }

        fn table_name() -> &'static str {
            "tickets"
        }

        fn columns() -> &'static [&'static str] {
            &["id", "subject", "deleted_at"]
        }
    }

    impl SoftDeletable for Ticket {
        fn deleted_at(&self) -> Option<DateTime<Utc>> {
            self.deleted_at
        }

        fn set_deleted_at(&mut self, marker: Option<DateTime<Utc>>) {
            self.deleted_at = marker;
        }

        fn is_persisted(&self) -> bool {
            self.persisted
        }

        fn mark_persisted(&mut self) {
            self.persisted = true;
        }

        fn is_frozen(&self) -> bool {
            self.frozen
        }

        fn freeze(&mut self) {
            self.frozen = true;
        }
    }

    async fn connect() -> PostgresRecordStore<Ticket> {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("failed to connect");
        let store = PostgresRecordStore::new(pool);
        store.ensure_schema().await.expect("failed to ensure schema");
        store
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
    async fn marker_round_trip_against_postgres() {
        let store = connect().await;
        let ticket = Ticket {
            id: RecordId::new(),
            subject: "printer on fire".to_string(),
            deleted_at: None,
            persisted: false,
            frozen: false,
        };

        let ticket = store.insert(ticket).await.unwrap();
        assert!(ticket.is_persisted());

        let stamp = Utc::now();
        store.write_marker(ticket.id(), Some(stamp)).await.unwrap();
        assert!(store
            .find(ticket.id(), Scope::Active)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find(ticket.id(), Scope::OnlyDiscarded)
            .await
            .unwrap()
            .is_some());

        store.write_marker(ticket.id(), None).await.unwrap();
        let found = store.find(ticket.id(), Scope::Active).await.unwrap().unwrap();
        assert_eq!(found.deleted_at(), None);

        store.remove(ticket.id()).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
    async fn removed_row_is_unresolvable_under_any_scope() {
        let store = connect().await;
        let ticket = Ticket {
            id: RecordId::new(),
            subject: "stale".to_string(),
            deleted_at: None,
            persisted: false,
            frozen: false,
        };

        let ticket = store.insert(ticket).await.unwrap();
        store.remove(ticket.id()).await.unwrap();

        assert!(store
            .find(ticket.id(), Scope::WithDiscarded)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            store.remove(ticket.id()).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
