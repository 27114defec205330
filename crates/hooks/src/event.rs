//! Hook chain vocabulary.

/// Named lifecycle events a record type can hook into.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Soft destroy (discard).
    Destroy,
    /// Return of a discarded record to the active set.
    Restore,
    /// Permanent, irrecoverable removal.
    ForceDestroy,
}

impl LifecycleEvent {
    /// Stable event name (logging, diagnostics).
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleEvent::Destroy => "destroy",
            LifecycleEvent::Restore => "restore",
            LifecycleEvent::ForceDestroy => "force_destroy",
        }
    }
}

/// Continue/abort signal returned by a before hook.
///
/// Anything other than `Continue` halts the chain; the core action never
/// runs and after hooks are skipped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HookFlow {
    Continue,
    Abort,
}

/// Result of running a hook chain.
///
/// An abort is a **normal outcome**, not an error: callers that need the
/// failure raised use the strict operation variants instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every hook continued and the core action ran.
    Completed,
    /// A before hook aborted, or an around hook returned without invoking
    /// its continuation.
    Aborted,
}

impl ChainOutcome {
    pub fn is_completed(self) -> bool {
        matches!(self, ChainOutcome::Completed)
    }
}
