//! Migration configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! page_size = 100
//! behavior_link_mode = "upsert"
//! journal_path = "migration.checkpoint.json"
//!
//! [targets]
//! service_definition = "3b2c0f47-8a9e-4a55-9a51-7d7c2e4c1a01"
//! ```

use crate::catalog::MigrationTargets;
use crate::error::MigrationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of instances per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// How the status field link is added to the service behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorLinkMode {
    /// Append to every status link, even if one already exists
    Append,
    /// Append only to status links without a rule for the field
    #[default]
    Upsert,
}

/// Migration configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Instances fetched per page in both walks
    pub page_size: usize,
    /// Behavior link edit mode
    pub behavior_link_mode: BehaviorLinkMode,
    /// Checkpoint file; logs only when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_path: Option<PathBuf>,
    /// Identifiers to migrate
    pub targets: MigrationTargets,
}

impl MigrationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With page size
    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// With behavior link mode
    #[inline]
    #[must_use]
    pub fn with_behavior_link_mode(mut self, mode: BehaviorLinkMode) -> Self {
        self.behavior_link_mode = mode;
        self
    }

    /// With checkpoint file
    #[inline]
    #[must_use]
    pub fn with_journal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal_path = Some(path.into());
        self
    }

    /// With identifiers
    #[inline]
    #[must_use]
    pub fn with_targets(mut self, targets: MigrationTargets) -> Self {
        self.targets = targets;
        self
    }

    /// Check the configuration
    ///
    /// # Errors
    /// Returns `MigrationError::Config` if the page size is zero
    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.page_size == 0 {
            return Err(MigrationError::Config("page_size must be greater than 0".into()));
        }
        Ok(())
    }

    /// Parse and validate configuration from TOML
    ///
    /// # Errors
    /// Returns `MigrationError::Config` on malformed TOML or invalid values
    pub fn from_toml_str(source: &str) -> Result<Self, MigrationError> {
        let config: Self =
            toml::from_str(source).map_err(|e| MigrationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a TOML file
    ///
    /// # Errors
    /// Returns `MigrationError::Config` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MigrationError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| MigrationError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Render configuration as TOML
    ///
    /// # Errors
    /// Returns `MigrationError::Config` if serialization fails
    pub fn to_toml_string(&self) -> Result<String, MigrationError> {
        toml::to_string_pretty(self).map_err(|e| MigrationError::Config(e.to_string()))
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            behavior_link_mode: BehaviorLinkMode::default(),
            journal_path: None,
            targets: MigrationTargets::default(),
        }
    }
}
