//! Error types for store access

use std::path::PathBuf;
use uuid::Uuid;

/// Kind of stored object, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// DOM instance
    Instance,
    /// Section definition
    SectionDefinition,
    /// DOM definition
    DomDefinition,
    /// DOM behavior definition
    BehaviorDefinition,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Instance => "DOM instance",
            Self::SectionDefinition => "section definition",
            Self::DomDefinition => "DOM definition",
            Self::BehaviorDefinition => "DOM behavior definition",
        };
        f.write_str(name)
    }
}

/// Store access errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Object to update does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: ObjectKind, id: Uuid },

    /// Instance does not conform to its section definitions
    #[error("schema violation on instance {instance}: {reason}")]
    SchemaViolation { instance: Uuid, reason: String },

    /// Backend could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Failure injected for testing
    #[error("injected failure: {0}")]
    Injected(String),

    /// Snapshot file could not be read or written
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot content is not valid
    #[error("snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}

impl StoreError {
    /// Create not-found error
    #[inline]
    pub fn not_found(kind: ObjectKind, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create schema violation for an instance
    #[inline]
    pub fn schema_violation(instance: impl Into<Uuid>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            instance: instance.into(),
            reason: reason.into(),
        }
    }

    /// Create IO error for path
    #[inline]
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
