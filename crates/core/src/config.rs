//! Per-record-type lifecycle configuration.

use crate::error::LifecycleError;
use crate::record::Record;

/// Column holding the deletion marker unless configured otherwise.
pub const DEFAULT_MARKER_COLUMN: &str = "deleted_at";

/// Configuration a record type supplies when adopting the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Name of the nullable timestamp column encoding discard state.
    pub marker_column: &'static str,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            marker_column: DEFAULT_MARKER_COLUMN,
        }
    }
}

impl LifecycleConfig {
    pub fn with_marker_column(marker_column: &'static str) -> Self {
        Self { marker_column }
    }

    /// Setup-time precondition: the configured marker column must exist in
    /// the record type's storage schema. Absence is fatal; the type must
    /// not be used.
    pub fn validate_for<R: Record>(&self) -> Result<(), LifecycleError> {
        if R::columns().contains(&self.marker_column) {
            return Ok(());
        }
        Err(LifecycleError::configuration(format!(
            "table '{}' has no column '{}'",
            R::table_name(),
            self.marker_column
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note;

    impl Record for Note {
        type Id = u64;

        fn id(&self) -> &Self::Id {
            &0
        }

        fn table_name() -> &'static str {
            "notes"
        }

        fn columns() -> &'static [&'static str] {
            &["id", "body", "deleted_at"]
        }
    }

    #[test]
    fn default_marker_column_validates_when_present() {
        assert!(LifecycleConfig::default().validate_for::<Note>().is_ok());
    }

    #[test]
    fn missing_marker_column_is_a_configuration_error() {
        let err = LifecycleConfig::with_marker_column("archived_at")
            .validate_for::<Note>()
            .unwrap_err();
        match err {
            LifecycleError::Configuration(msg) => {
                assert!(msg.contains("notes"));
                assert!(msg.contains("archived_at"));
            }
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }
}
