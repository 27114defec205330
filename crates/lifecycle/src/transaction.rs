//! Transaction envelope for multi-row transitions.
//!
//! A lifecycle transition that touches more than one row (restore with
//! cascade, force-destroy with cascade, bulk restore) runs inside an
//! envelope: every participating store is snapshotted when the outermost
//! scope opens, the snapshots are dropped on commit, and restored if an
//! error unwinds the guarded region. Nested scopes flatten onto the
//! outermost one — the envelope keeps a depth count, not its own
//! nested-transaction bookkeeping.

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::record_store::StoreError;

/// A store that can take part in an envelope.
///
/// Snapshots are opaque to the envelope; it only holds them until the
/// outermost scope resolves and hands them back on rollback.
pub trait TransactionParticipant: Send + Sync {
    fn snapshot(&self) -> Result<Box<dyn Any + Send>, StoreError>;

    fn restore(&self, snapshot: Box<dyn Any + Send>) -> Result<(), StoreError>;
}

#[derive(Default)]
struct EnvelopeState {
    depth: usize,
    snapshots: Vec<(Arc<dyn TransactionParticipant>, Box<dyn Any + Send>)>,
}

/// Scoped all-or-nothing boundary shared by the stores a transition spans.
#[derive(Default)]
pub struct TransactionEnvelope {
    participants: Mutex<Vec<Arc<dyn TransactionParticipant>>>,
    state: Mutex<EnvelopeState>,
}

impl TransactionEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll a store. Wiring-time operation; stores registered after a
    /// scope has opened join from the next outermost scope on.
    pub fn register(&self, participant: Arc<dyn TransactionParticipant>) {
        // If the lock is poisoned the registry is unrecoverable anyway;
        // a scope opened afterwards will surface the poisoning as an error.
        if let Ok(mut participants) = self.participants.lock() {
            participants.push(participant);
        }
    }

    /// Run `body` inside the envelope: commit on `Ok`, restore every
    /// participant on `Err`. Errors from `body` propagate unchanged.
    pub fn run<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<StoreError>,
    {
        self.begin().map_err(E::from)?;

        match body() {
            Ok(value) => {
                self.commit().map_err(E::from)?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = self.rollback() {
                    tracing::error!("rollback failed after transition error: {rollback_error}");
                }
                Err(error)
            }
        }
    }

    fn begin(&self) -> Result<(), StoreError> {
        let participants = self
            .participants
            .lock()
            .map_err(|_| StoreError::Backend("transaction registry poisoned".to_string()))?
            .clone();

        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Backend("transaction state poisoned".to_string()))?;

        if state.depth == 0 {
            let mut snapshots = Vec::with_capacity(participants.len());
            for participant in participants {
                let snapshot = participant.snapshot()?;
                snapshots.push((participant, snapshot));
            }
            state.snapshots = snapshots;
        }

        state.depth += 1;
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Backend("transaction state poisoned".to_string()))?;

        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.snapshots.clear();
        }
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Backend("transaction state poisoned".to_string()))?;

        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            // Restore in reverse registration order.
            for (participant, snapshot) in state.snapshots.drain(..).rev() {
                participant.restore(snapshot)?;
            }
        }
        Ok(())
    }
}
