//! Cascade resolution across dependent associations.
//!
//! Dependent relations are declared as explicit bindings per record type —
//! no runtime reflection. Each binding couples an association descriptor
//! with a resolver that fetches the related records and wraps them in
//! type-erased targets backed by the dependent type's own engine, so the
//! cascade recurses engine-to-engine without the parent knowing the
//! dependent's concrete types.

use std::sync::Arc;

use reclaim_core::{AssociationDescriptor, Cardinality, SoftDeletable};
use reclaim_hooks::ChainOutcome;

use crate::engine::{LifecycleEngine, RestoreOptions, TransitionError};
use crate::record_store::RecordStore;

/// A dependent record reachable from a parent, erased to the operations
/// the cascade needs.
pub trait CascadeTarget {
    fn is_discarded(&self) -> bool;

    /// Recursive restore through the dependent type's engine.
    fn restore(&mut self) -> Result<ChainOutcome, TransitionError>;

    /// Recursive permanent removal through the dependent type's engine.
    fn force_destroy(&mut self) -> Result<ChainOutcome, TransitionError>;
}

type ResolveFn<R> =
    Box<dyn Fn(&R) -> Result<Vec<Box<dyn CascadeTarget>>, TransitionError> + Send + Sync>;

/// One declared association of a record type, ready to resolve.
pub struct AssociationBinding<R> {
    descriptor: AssociationDescriptor,
    resolve: ResolveFn<R>,
}

impl<R: SoftDeletable> AssociationBinding<R> {
    /// Binding with a caller-supplied resolver. The helper constructors
    /// below cover the common shapes.
    pub fn new(
        descriptor: AssociationDescriptor,
        resolve: impl Fn(&R) -> Result<Vec<Box<dyn CascadeTarget>>, TransitionError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            descriptor,
            resolve: Box::new(resolve),
        }
    }

    /// Dependent-destroy collection: every record of `C` for which
    /// `belongs_to(parent, child)` holds.
    pub fn has_many<C, CS>(
        name: &'static str,
        engine: &Arc<LifecycleEngine<C, CS>>,
        belongs_to: impl Fn(&R, &C) -> bool + Send + Sync + 'static,
    ) -> Self
    where
        C: SoftDeletable + Clone + Send + Sync + 'static,
        CS: RecordStore<C> + 'static,
    {
        let engine = Arc::clone(engine);
        Self {
            descriptor: AssociationDescriptor::dependent(name, Cardinality::Many),
            resolve: Box::new(move |parent: &R| {
                // Fetch with the filter lifted: force destroy enumerates
                // every member; restore narrows to the discarded subset.
                let members = engine.with_discarded()?;
                Ok(members
                    .into_iter()
                    .filter(|member| belongs_to(parent, member))
                    .map(|member| {
                        Box::new(EngineTarget {
                            engine: Arc::clone(&engine),
                            record: member,
                        }) as Box<dyn CascadeTarget>
                    })
                    .collect())
            }),
        }
    }

    /// Dependent-destroy single record: the first record of `C` for which
    /// `belongs_to(parent, child)` holds, if any.
    pub fn has_one<C, CS>(
        name: &'static str,
        engine: &Arc<LifecycleEngine<C, CS>>,
        belongs_to: impl Fn(&R, &C) -> bool + Send + Sync + 'static,
    ) -> Self
    where
        C: SoftDeletable + Clone + Send + Sync + 'static,
        CS: RecordStore<C> + 'static,
    {
        let engine = Arc::clone(engine);
        Self {
            descriptor: AssociationDescriptor::dependent(name, Cardinality::One),
            resolve: Box::new(move |parent: &R| {
                let members = engine.with_discarded()?;
                Ok(members
                    .into_iter()
                    .find(|member| belongs_to(parent, member))
                    .map(|member| {
                        Box::new(EngineTarget {
                            engine: Arc::clone(&engine),
                            record: member,
                        }) as Box<dyn CascadeTarget>
                    })
                    .into_iter()
                    .collect())
            }),
        }
    }

    /// Association the cascade must not follow.
    pub fn detached(name: &'static str, cardinality: Cardinality) -> Self {
        Self {
            descriptor: AssociationDescriptor::detached(name, cardinality),
            resolve: Box::new(|_| Ok(Vec::new())),
        }
    }

    /// Dependent association whose target type does not adopt the
    /// lifecycle; left to whatever native cascade the store provides.
    pub fn unmanaged(name: &'static str, cardinality: Cardinality) -> Self {
        Self {
            descriptor: AssociationDescriptor::unmanaged(name, cardinality),
            resolve: Box::new(|_| Ok(Vec::new())),
        }
    }

    pub fn descriptor(&self) -> &AssociationDescriptor {
        &self.descriptor
    }

    fn resolve_targets(&self, parent: &R) -> Result<Vec<Box<dyn CascadeTarget>>, TransitionError> {
        (self.resolve)(parent)
    }
}

/// Restore pass over a record's dependents.
///
/// Only descriptors marked dependent-destroy whose target participates in
/// the lifecycle are followed. For a `many` association only the
/// currently-discarded members are restored; a `one` target is restored
/// even when active (restore is idempotent in effect). A dependent whose
/// own chain aborts is left as-is — aborts are normal failure values; only
/// errors abort the enclosing transition.
pub fn restore_dependents<R: SoftDeletable>(
    bindings: &[AssociationBinding<R>],
    record: &R,
) -> Result<(), TransitionError> {
    for binding in eligible(bindings) {
        let mut targets = binding.resolve_targets(record)?;
        match binding.descriptor().cardinality {
            Cardinality::Many => {
                for target in targets.iter_mut().filter(|t| t.is_discarded()) {
                    target.restore()?;
                }
            }
            Cardinality::One => {
                for target in targets.iter_mut() {
                    target.restore()?;
                }
            }
        }
    }
    Ok(())
}

/// Force-destroy pass over a record's dependents: every member, discarded
/// included.
pub fn force_destroy_dependents<R: SoftDeletable>(
    bindings: &[AssociationBinding<R>],
    record: &R,
) -> Result<(), TransitionError> {
    for binding in eligible(bindings) {
        for target in binding.resolve_targets(record)?.iter_mut() {
            target.force_destroy()?;
        }
    }
    Ok(())
}

fn eligible<'a, R: SoftDeletable>(
    bindings: &'a [AssociationBinding<R>],
) -> impl Iterator<Item = &'a AssociationBinding<R>> {
    bindings.iter().filter(|binding| {
        binding.descriptor().cascade_on_destroy && binding.descriptor().target_is_persistent
    })
}

/// Dependent record paired with the engine that manages its type.
struct EngineTarget<C, CS>
where
    C: SoftDeletable,
    CS: RecordStore<C>,
{
    engine: Arc<LifecycleEngine<C, CS>>,
    record: C,
}

impl<C, CS> CascadeTarget for EngineTarget<C, CS>
where
    C: SoftDeletable + Clone,
    CS: RecordStore<C>,
{
    fn is_discarded(&self) -> bool {
        self.record.is_discarded()
    }

    fn restore(&mut self) -> Result<ChainOutcome, TransitionError> {
        self.engine
            .restore_record(&mut self.record, RestoreOptions::recursive())
    }

    fn force_destroy(&mut self) -> Result<ChainOutcome, TransitionError> {
        self.engine.force_destroy(&mut self.record)
    }
}
