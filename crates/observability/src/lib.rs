//! Tracing/logging setup shared by services embedding the lifecycle.

/// Initialize process-wide tracing with the default filter.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    tracing::init_with_filter("info");
}

/// Tracing configuration (filters, layers).
pub mod tracing;
