//! `reclaim-core` — soft-delete lifecycle building blocks.
//!
//! This crate contains **pure domain** primitives (no storage concerns).

pub mod association;
pub mod config;
pub mod error;
pub mod id;
pub mod record;
pub mod scope;

pub use association::{AssociationDescriptor, Cardinality};
pub use config::{LifecycleConfig, DEFAULT_MARKER_COLUMN};
pub use error::{LifecycleError, LifecycleResult};
pub use id::RecordId;
pub use record::{Record, SoftDeletable};
pub use scope::Scope;
