//! Row-level persistence boundary.
//!
//! This module defines the store abstraction lifecycle transitions are
//! written against, without making any storage assumptions.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;
pub use r#trait::{AsyncRecordStore, RecordStore, StoreError};
