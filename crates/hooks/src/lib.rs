//! Lifecycle hook chains.
//!
//! Record types extend lifecycle transitions by registering ordered
//! before/around/after hooks per named event. Hooks are opaque callables;
//! the pipeline only honors their position and their continue/abort signal.

pub mod event;
pub mod registry;

pub use event::{ChainOutcome, HookFlow, LifecycleEvent};
pub use registry::{HookRegistry, Next};
