//! Lifecycle transition pipeline (application-level orchestration).
//!
//! This module implements the soft-delete state machine over a record
//! store. A record moves Active → Discarded and back any number of times,
//! and may leave through a permanent removal, which is terminal.
//!
//! ## Transition Flow
//!
//! ```text
//! Caller
//!   ↓
//! 1. Open the transaction envelope (multi-row transitions only)
//!   ↓
//! 2. Run the event's before hooks (any abort halts the transition)
//!   ↓
//! 3. Apply the core state change through the store
//!   ↓
//! 4. Cascade to dependent associations (when requested)
//!   ↓
//! 5. Run after hooks; commit — or roll every row back on error
//! ```
//!
//! ## Why This Orchestration?
//!
//! - **Encapsulate complexity**: the transition pattern is identical for
//!   every record type, so it is centralized here rather than duplicated
//!   in each adopting type
//! - **Enforce invariants**: unsaved/frozen guards, scope resolution for
//!   class-level restore, and the terminal nature of permanent removal are
//!   enforced here, not in domain code
//! - **Compose infrastructure**: the engine composes `RecordStore`,
//!   `HookRegistry`, and `TransactionEnvelope`, making it testable with
//!   in-memory implementations and swappable with real backends
//!
//! This module contains no IO itself; it composes infrastructure traits.

use std::sync::Arc;

use chrono::Utc;

use reclaim_core::{LifecycleConfig, LifecycleError, Record, Scope, SoftDeletable};
use reclaim_hooks::{ChainOutcome, HookRegistry, LifecycleEvent};

use crate::cascade::{self, AssociationBinding};
use crate::record_store::{RecordStore, StoreError};
use crate::transaction::TransactionEnvelope;

/// Transition execution error.
#[derive(Debug)]
pub enum TransitionError {
    /// Record type misconfiguration surfaced at setup time.
    Configuration(String),
    /// Strict destroy on an active record whose destroy chain aborted.
    NotDestroyed,
    /// An identifier did not resolve to a discarded row.
    NotFound(String),
    /// Persistence failure (propagated unmodified; aborts the envelope).
    Store(StoreError),
}

impl From<StoreError> for TransitionError {
    fn from(value: StoreError) -> Self {
        TransitionError::Store(value)
    }
}

impl From<LifecycleError> for TransitionError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Configuration(msg) => TransitionError::Configuration(msg),
            LifecycleError::InvalidId(msg) => TransitionError::Configuration(msg),
            LifecycleError::NotDestroyed => TransitionError::NotDestroyed,
            LifecycleError::NotFound(msg) => TransitionError::NotFound(msg),
        }
    }
}

/// Options for a restore transition.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Also restore cascade-eligible dependent associations.
    pub recursive: bool,
}

impl RestoreOptions {
    /// Restore the record alone.
    pub fn shallow() -> Self {
        Self::default()
    }

    /// Restore the record and its dependents.
    pub fn recursive() -> Self {
        Self { recursive: true }
    }
}

/// Reusable transition engine for one soft-deletable record type.
///
/// ## Execution Guarantees
///
/// - **Atomicity**: multi-row transitions (recursive restore, force
///   destroy, bulk restore) run inside the envelope; concurrent observers
///   never see a half-cascaded state
/// - **Guards**: unsaved and frozen records are never mutated — those
///   transitions report a failure value without raising
/// - **Terminal removal**: after a permanent removal the in-hand instance
///   is frozen, so no further transition can touch it
///
/// ## Error Semantics
///
/// - Hook-chain aborts → `Ok(ChainOutcome::Aborted)` — a normal failure
///   value the caller checks explicitly
/// - `strict_destroy` alone escalates an aborted soft destroy into
///   `TransitionError::NotDestroyed`
/// - Store errors → `TransitionError::Store`, never swallowed
///
/// ## Generic Parameters
///
/// - `R`: the record type adopting the lifecycle
/// - `S`: its store implementation
///
/// This design enables testing with `InMemoryRecordStore` and swapping in
/// real backends without changing domain code.
pub struct LifecycleEngine<R, S>
where
    R: SoftDeletable,
    S: RecordStore<R>,
{
    store: S,
    hooks: HookRegistry<R, TransitionError>,
    associations: Vec<AssociationBinding<R>>,
    envelope: Arc<TransactionEnvelope>,
    config: LifecycleConfig,
}

impl<R, S> LifecycleEngine<R, S>
where
    R: SoftDeletable + Clone,
    S: RecordStore<R>,
{
    /// Build an engine for `R`.
    ///
    /// Fails with `LifecycleError::Configuration` when the configured
    /// deletion-marker column is not part of `R`'s storage schema — the
    /// setup-time precondition for adopting the lifecycle.
    pub fn new(
        store: S,
        hooks: HookRegistry<R, TransitionError>,
        envelope: Arc<TransactionEnvelope>,
        config: LifecycleConfig,
    ) -> Result<Self, LifecycleError> {
        config.validate_for::<R>()?;
        Ok(Self {
            store,
            hooks,
            associations: Vec::new(),
            envelope,
            config,
        })
    }

    /// Declare a dependent association. Cascade order follows declaration
    /// order.
    pub fn add_association(&mut self, binding: AssociationBinding<R>) {
        self.associations.push(binding);
    }

    /// Hook registration surface for this record type.
    pub fn hooks_mut(&mut self) -> &mut HookRegistry<R, TransitionError> {
        &mut self.hooks
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Soft destroy: stamp the deletion marker, inside the `Destroy` hook
    /// chain.
    ///
    /// Unsaved and frozen records are not touched; the transition reports
    /// `Aborted`. Re-discarding an already-discarded record re-runs the
    /// full chain and re-stamps the marker — callers relying on
    /// "fires once" must guard externally.
    pub fn discard(&self, record: &mut R) -> Result<ChainOutcome, TransitionError> {
        if !record.is_persisted() || record.is_frozen() {
            return Ok(ChainOutcome::Aborted);
        }

        let store = &self.store;
        let outcome = self.hooks.run(LifecycleEvent::Destroy, record, |r| {
            let stamp = Utc::now();
            store.write_marker(r.id(), Some(stamp))?;
            r.set_deleted_at(Some(stamp));
            Ok(())
        })?;

        if outcome.is_completed() {
            tracing::debug!(table = R::table_name(), "record discarded");
        }
        Ok(outcome)
    }

    /// Direct, hook-free variant of [`discard`](Self::discard): stamps the
    /// marker without running any chain. No-op for unsaved or frozen
    /// records.
    pub fn delete(&self, record: &mut R) -> Result<(), TransitionError> {
        if !record.is_persisted() || record.is_frozen() {
            return Ok(());
        }

        let stamp = Utc::now();
        self.store.write_marker(record.id(), Some(stamp))?;
        record.set_deleted_at(Some(stamp));
        Ok(())
    }

    /// Strict destroy: permanently remove an already-discarded record via
    /// the store's native delete; otherwise soft-destroy, escalating an
    /// aborted chain into [`TransitionError::NotDestroyed`].
    pub fn strict_destroy(&self, record: &mut R) -> Result<(), TransitionError> {
        if record.is_discarded() {
            self.store.remove(record.id())?;
            record.freeze();
            tracing::debug!(table = R::table_name(), "record permanently removed");
            return Ok(());
        }

        match self.discard(record)? {
            ChainOutcome::Completed => Ok(()),
            ChainOutcome::Aborted => Err(TransitionError::NotDestroyed),
        }
    }

    /// Restore a discarded record to the active set, inside the `Restore`
    /// hook chain and the transaction envelope.
    ///
    /// The marker is cleared through a single-column write (no validation
    /// cycle). With `options.recursive`, cascade-eligible dependents are
    /// restored in the same envelope — partial restores are never
    /// observable. Restoring an already-active record re-runs the chain;
    /// the transition is idempotent in effect.
    pub fn restore_record(
        &self,
        record: &mut R,
        options: RestoreOptions,
    ) -> Result<ChainOutcome, TransitionError> {
        if !record.is_persisted() || record.is_frozen() {
            return Ok(ChainOutcome::Aborted);
        }

        self.envelope.run(|| {
            self.hooks.run(LifecycleEvent::Restore, record, |r| {
                self.store.write_marker(r.id(), None)?;
                r.set_deleted_at(None);
                if options.recursive {
                    cascade::restore_dependents(&self.associations, r)?;
                }
                Ok(())
            })
        })
    }

    /// Class-level restore: resolve `id` among discarded rows and restore
    /// it. Fails with [`TransitionError::NotFound`] when no discarded row
    /// matches.
    pub fn restore(&self, id: &R::Id, options: RestoreOptions) -> Result<R, TransitionError> {
        self.envelope.run(|| {
            let mut record = self
                .store
                .find(id, Scope::OnlyDiscarded)?
                .ok_or_else(|| TransitionError::NotFound(format!("{id:?}")))?;
            self.restore_record(&mut record, options)?;
            Ok(record)
        })
    }

    /// Bulk class-level restore. Results follow input order.
    ///
    /// Runs inside one envelope: a failing lookup rolls back every restore
    /// already applied — partial success is not observable.
    pub fn restore_many(
        &self,
        ids: &[R::Id],
        options: RestoreOptions,
    ) -> Result<Vec<R>, TransitionError> {
        self.envelope.run(|| {
            let mut restored = Vec::with_capacity(ids.len());
            for id in ids {
                restored.push(self.restore(id, options)?);
            }
            Ok(restored)
        })
    }

    /// Permanent removal regardless of current state, inside the
    /// `ForceDestroy` hook chain and the transaction envelope.
    ///
    /// Cascade-eligible dependents are force-destroyed first — full
    /// enumeration, discarded members included — then the record's own row
    /// is removed. Any failure rolls back every row. On success the
    /// in-hand instance is frozen: permanent destruction is terminal.
    pub fn force_destroy(&self, record: &mut R) -> Result<ChainOutcome, TransitionError> {
        let outcome = self.envelope.run(|| {
            self.hooks.run(LifecycleEvent::ForceDestroy, &mut *record, |r| {
                cascade::force_destroy_dependents(&self.associations, r)?;
                self.store.remove(r.id())?;
                Ok(())
            })
        })?;

        if outcome.is_completed() {
            record.freeze();
            tracing::debug!(
                table = R::table_name(),
                "record and dependents permanently removed"
            );
        }
        Ok(outcome)
    }

    /// All records, the deletion filter lifted.
    pub fn with_discarded(&self) -> Result<Vec<R>, TransitionError> {
        Ok(self.store.list(Scope::WithDiscarded)?)
    }

    /// Discarded records only.
    pub fn only_discarded(&self) -> Result<Vec<R>, TransitionError> {
        Ok(self.store.list(Scope::OnlyDiscarded)?)
    }

    /// Active records only (the conventional default view).
    pub fn active(&self) -> Result<Vec<R>, TransitionError> {
        Ok(self.store.list(Scope::Active)?)
    }
}
