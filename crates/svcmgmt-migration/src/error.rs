//! Error types for the migration
//!
//! Every variant except [`MigrationError::StepFailed`] is raised inside a
//! step; the runner wraps it with the step so the operator knows where to
//! resume. Inconsistent service references are not errors.

use crate::steps::MigrationStep;
use std::path::PathBuf;
use svcmgmt_model::{DomInstanceId, ModelError};
use svcmgmt_store::{ObjectKind, StoreError};
use uuid::Uuid;

/// Main migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Required definition is absent from the store
    #[error("{kind} '{name}' ({id}) not found")]
    MissingDefinition {
        kind: ObjectKind,
        id: Uuid,
        name: String,
    },

    /// Store read or update failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Field descriptor or field value is malformed
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Store returned the same instance twice in one walk
    #[error("instance {0} was returned twice in one walk")]
    DuplicateInstance(DomInstanceId),

    /// Checkpoint file could not be read or written
    #[error("journal io error at {path}: {source}")]
    JournalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Checkpoint content is not valid
    #[error("journal format error: {0}")]
    JournalFormat(#[from] serde_json::Error),

    /// Checkpoint is past the flatten step but holds no precedence map
    #[error("cannot resume after step '{completed}': checkpoint holds no precedence map")]
    MissingPrecedenceMap { completed: MigrationStep },

    /// Configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// A step failed; later steps did not run
    #[error("step '{step}' failed: {error}")]
    StepFailed {
        step: MigrationStep,
        error: Box<MigrationError>,
    },
}

impl MigrationError {
    /// Create missing definition error
    #[inline]
    pub fn missing_definition(kind: ObjectKind, id: impl Into<Uuid>, name: impl Into<String>) -> Self {
        Self::MissingDefinition {
            kind,
            id: id.into(),
            name: name.into(),
        }
    }

    /// Create journal IO error for path
    #[inline]
    pub fn journal_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::JournalIo {
            path: path.into(),
            source,
        }
    }

    /// Step the run failed in, if known
    #[inline]
    #[must_use]
    pub fn failed_step(&self) -> Option<MigrationStep> {
        match self {
            Self::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Innermost error, unwrapping step context
    #[must_use]
    pub fn root_cause(&self) -> &MigrationError {
        match self {
            Self::StepFailed { error, .. } => error.root_cause(),
            other => other,
        }
    }

    /// Check if a required definition was missing
    #[inline]
    #[must_use]
    pub fn is_missing_definition(&self) -> bool {
        matches!(self.root_cause(), Self::MissingDefinition { .. })
    }

    /// Check if a store update or read failed
    #[inline]
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(self.root_cause(), Self::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_definition_names_definition() {
        let err = MigrationError::missing_definition(
            ObjectKind::SectionDefinition,
            Uuid::nil(),
            "Service Info",
        );
        let message = err.to_string();
        assert!(message.contains("section definition"));
        assert!(message.contains("Service Info"));
    }

    #[test]
    fn step_context_is_transparent_to_classification() {
        let inner = MigrationError::Store(StoreError::Unavailable("down".into()));
        let err = MigrationError::StepFailed {
            step: MigrationStep::RewriteServices,
            error: Box::new(inner),
        };

        assert_eq!(err.failed_step(), Some(MigrationStep::RewriteServices));
        assert!(err.is_store_failure());
        assert!(!err.is_missing_definition());
        assert!(err.to_string().contains("rewrite-services"));
        assert!(err.to_string().contains("down"));
    }
}
