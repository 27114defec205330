//! Association metadata consumed by the cascade resolver.
//!
//! Dependent relations are declared explicitly per record type; there is no
//! runtime reflection. The cascade only ever follows descriptors with
//! `cascade_on_destroy` set, and only when the target type itself
//! participates in the soft-delete lifecycle.

/// How many related records an association can hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Declarative description of a related record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDescriptor {
    /// Association name (diagnostics only; not used for lookup).
    pub name: &'static str,
    pub cardinality: Cardinality,
    /// True only for associations declared dependent-destroy.
    pub cascade_on_destroy: bool,
    /// Whether the target type adopts the soft-delete lifecycle. Targets
    /// that do not are left to whatever native cascade the store provides.
    pub target_is_persistent: bool,
}

impl AssociationDescriptor {
    /// A dependent-destroy association whose target participates in the
    /// lifecycle.
    pub fn dependent(name: &'static str, cardinality: Cardinality) -> Self {
        Self {
            name,
            cardinality,
            cascade_on_destroy: true,
            target_is_persistent: true,
        }
    }

    /// An association the cascade must not follow.
    pub fn detached(name: &'static str, cardinality: Cardinality) -> Self {
        Self {
            name,
            cardinality,
            cascade_on_destroy: false,
            target_is_persistent: true,
        }
    }

    /// A dependent association whose target type does not adopt the
    /// lifecycle.
    pub fn unmanaged(name: &'static str, cardinality: Cardinality) -> Self {
        Self {
            name,
            cardinality,
            cascade_on_destroy: true,
            target_is_persistent: false,
        }
    }
}
