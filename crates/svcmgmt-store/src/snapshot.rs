//! JSON snapshots of a store

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use svcmgmt_model::{DomBehaviorDefinition, DomDefinition, DomInstance, SectionDefinition};

/// Full content of a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Section definitions
    #[serde(default)]
    pub section_definitions: Vec<SectionDefinition>,
    /// DOM definitions
    #[serde(default)]
    pub dom_definitions: Vec<DomDefinition>,
    /// Behavior definitions
    #[serde(default)]
    pub behavior_definitions: Vec<DomBehaviorDefinition>,
    /// Instances
    #[serde(default)]
    pub instances: Vec<DomInstance>,
}

impl StoreSnapshot {
    /// Parse a snapshot from JSON
    ///
    /// # Errors
    /// Returns `StoreError::Format` if the JSON does not describe a snapshot
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the snapshot as pretty JSON
    ///
    /// # Errors
    /// Returns `StoreError::Format` if serialization fails
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a snapshot file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).map_err(|e| StoreError::io_error(path, e))?;
        Self::from_json(&json)
    }

    /// Write the snapshot to a file, replacing its content
    ///
    /// The JSON goes to a temporary file in the same directory which is then
    /// renamed over `path`; an interrupted save leaves the old file intact.
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let json = self.to_json()?;

        let mut file =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io_error(dir, e))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| StoreError::io_error(file.path(), e))?;
        file.persist(path)
            .map_err(|e| StoreError::io_error(path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use svcmgmt_model::{DomDefinitionId, SectionDefinitionId};

    #[test]
    fn store_survives_snapshot_file() {
        let store = InMemoryStore::new();
        store.insert_section_definition(SectionDefinition::new(
            SectionDefinitionId::from_u128(1),
            "Info",
        ));
        store.insert_instance(DomInstance::new(DomDefinitionId::from_u128(2)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        store.snapshot().save(&path).unwrap();

        let restored = InMemoryStore::from_snapshot(StoreSnapshot::load(&path).unwrap());
        pretty_assertions::assert_eq!(restored.snapshot(), store.snapshot());
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "previous content").unwrap();

        let store = InMemoryStore::new();
        store.insert_instance(DomInstance::new(DomDefinitionId::from_u128(2)));
        store.snapshot().save(&path).unwrap();

        assert_eq!(StoreSnapshot::load(&path).unwrap(), store.snapshot());
        // No temporary file left next to the target
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn failed_save_leaves_target_and_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by the rename
        let target = dir.path().join("store.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        let err = StoreSnapshot::default().save(&target).unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert!(target.join("keep").exists());
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot = StoreSnapshot::from_json("{}").unwrap();
        assert_eq!(snapshot, StoreSnapshot::default());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = StoreSnapshot::load("/nonexistent/store.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/store.json"));
    }
}
