//! Ordered migration steps
//!
//! The run is a fixed sequence. A step is only started once every earlier
//! step has completed, which is what orders the configuration version walk
//! before the service walk.

use serde::{Deserialize, Serialize};

/// One step of the migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationStep {
    /// Rename the configuration version definition and section, add `createdAt`
    ConfigurationVersionSchema,
    /// Walk configuration versions, record predecessors, stamp `createdAt`
    FlattenVersionChains,
    /// Drop the `previousVersion` descriptor once no instance uses it
    RetirePreviousVersionField,
    /// Add `configurationVersions` to services and link it in every status
    ServiceSchema,
    /// Walk services and write their configuration version lists
    RewriteServices,
}

impl MigrationStep {
    /// All steps in execution order
    pub const ALL: [MigrationStep; 5] = [
        Self::ConfigurationVersionSchema,
        Self::FlattenVersionChains,
        Self::RetirePreviousVersionField,
        Self::ServiceSchema,
        Self::RewriteServices,
    ];

    /// Position in the sequence (0-based)
    #[inline]
    #[must_use]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Step following this one
    #[inline]
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// Steps still to run after `last_completed`
    #[must_use]
    pub fn remaining_after(last_completed: Option<Self>) -> &'static [Self] {
        match last_completed {
            None => &Self::ALL,
            Some(step) => &Self::ALL[step.ordinal() + 1..],
        }
    }

    /// Stable name used in logs and checkpoints
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ConfigurationVersionSchema => "configuration-version-schema",
            Self::FlattenVersionChains => "flatten-version-chains",
            Self::RetirePreviousVersionField => "retire-previous-version-field",
            Self::ServiceSchema => "service-schema",
            Self::RewriteServices => "rewrite-services",
        }
    }

    /// One-line description
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::ConfigurationVersionSchema => {
                "rename configuration version definition and section, add Created At field"
            }
            Self::FlattenVersionChains => {
                "record predecessors, stamp Created At, clear Previous Version on every configuration version"
            }
            Self::RetirePreviousVersionField => {
                "remove the Previous Version field from the configuration info section"
            }
            Self::ServiceSchema => {
                "add Configuration Versions field to services and show it in every status"
            }
            Self::RewriteServices => "write current and previous configuration version on every service",
        }
    }
}

impl std::fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
