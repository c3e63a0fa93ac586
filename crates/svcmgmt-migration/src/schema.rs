//! Schema editor
//!
//! Applies field, name and status-link edits to section, DOM and behavior
//! definitions. Every edit fetches the current definition, changes it and
//! writes it back at once; nothing is buffered and nothing is rolled back.

use crate::catalog::MigrationTargets;
use crate::config::BehaviorLinkMode;
use crate::error::MigrationError;
use svcmgmt_model::{
    DomBehaviorDefinition, DomBehaviorDefinitionId, DomDefinition, DomDefinitionId,
    FieldDescriptor, FieldDescriptorBuilder, FieldDescriptorId, FieldEdit, FieldType,
    SectionDefinition, SectionDefinitionId, StatusFieldDescriptorLink,
};
use svcmgmt_store::{DefinitionStore, ObjectKind};

/// Display name of the configuration version DOM definition after migration
pub const CONFIGURATION_VERSION_DEFINITION_NAME: &str = "Service Configuration Version";
/// Display name of the configuration info section after migration
pub const CONFIGURATION_INFO_SECTION_NAME: &str = "Service Configuration Info";

/// Result of [`SchemaEditor::prepare_service_schema`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSchemaChange {
    /// Whether the list field was added or replaced
    pub field: FieldEdit,
    /// Status links that received a rule for the list field
    pub links_added: usize,
}

/// Edits definitions through a [`DefinitionStore`]
#[derive(Debug)]
pub struct SchemaEditor<'d, D: ?Sized> {
    definitions: &'d D,
}

impl<'d, D> SchemaEditor<'d, D>
where
    D: DefinitionStore + ?Sized,
{
    /// Create an editor over a definition store
    #[inline]
    #[must_use]
    pub fn new(definitions: &'d D) -> Self {
        Self { definitions }
    }

    /// Fetch a section definition
    ///
    /// # Errors
    /// Returns `MigrationError::MissingDefinition` naming `label` if absent
    pub fn section(
        &self,
        id: SectionDefinitionId,
        label: &str,
    ) -> Result<SectionDefinition, MigrationError> {
        self.definitions
            .section_definition(id)?
            .ok_or_else(|| MigrationError::missing_definition(ObjectKind::SectionDefinition, id, label))
    }

    /// Fetch a DOM definition
    ///
    /// # Errors
    /// Returns `MigrationError::MissingDefinition` naming `label` if absent
    pub fn dom_definition(
        &self,
        id: DomDefinitionId,
        label: &str,
    ) -> Result<DomDefinition, MigrationError> {
        self.definitions
            .dom_definition(id)?
            .ok_or_else(|| MigrationError::missing_definition(ObjectKind::DomDefinition, id, label))
    }

    /// Fetch a behavior definition
    ///
    /// # Errors
    /// Returns `MigrationError::MissingDefinition` naming `label` if absent
    pub fn behavior(
        &self,
        id: DomBehaviorDefinitionId,
        label: &str,
    ) -> Result<DomBehaviorDefinition, MigrationError> {
        self.definitions.behavior_definition(id)?.ok_or_else(|| {
            MigrationError::missing_definition(ObjectKind::BehaviorDefinition, id, label)
        })
    }

    /// Add a field descriptor to a section, replacing one with the same id
    ///
    /// # Errors
    /// Returns error if the section is missing or the update fails
    pub fn add_or_replace_field(
        &self,
        section: SectionDefinitionId,
        label: &str,
        descriptor: FieldDescriptor,
    ) -> Result<FieldEdit, MigrationError> {
        let mut definition = self.section(section, label)?;
        let field = descriptor.id;
        let edit = definition.add_or_replace_field_descriptor(descriptor);
        self.definitions.update_section_definition(&definition)?;

        tracing::info!(section = %definition.name, %field, ?edit, "field descriptor stored");
        Ok(edit)
    }

    /// Remove a field descriptor from a section
    ///
    /// Absent descriptors are a no-op and cause no update. Returns whether a
    /// descriptor was removed.
    ///
    /// # Errors
    /// Returns error if the section is missing or the update fails
    pub fn remove_field(
        &self,
        section: SectionDefinitionId,
        label: &str,
        field: FieldDescriptorId,
    ) -> Result<bool, MigrationError> {
        let mut definition = self.section(section, label)?;
        if definition.remove_field_descriptor(field).is_none() {
            tracing::debug!(section = %definition.name, %field, "field descriptor already absent");
            return Ok(false);
        }
        self.definitions.update_section_definition(&definition)?;

        tracing::info!(section = %definition.name, %field, "field descriptor removed");
        Ok(true)
    }

    /// Rename a section definition
    ///
    /// # Errors
    /// Returns error if the section is missing or the update fails
    pub fn rename_section(
        &self,
        section: SectionDefinitionId,
        label: &str,
        name: &str,
    ) -> Result<(), MigrationError> {
        let mut definition = self.section(section, label)?;
        definition.name = name.to_string();
        self.definitions.update_section_definition(&definition)?;
        Ok(())
    }

    /// Rename a DOM definition
    ///
    /// # Errors
    /// Returns error if the definition is missing or the update fails
    pub fn rename_dom_definition(
        &self,
        id: DomDefinitionId,
        label: &str,
        name: &str,
    ) -> Result<(), MigrationError> {
        let mut definition = self.dom_definition(id, label)?;
        definition.name = name.to_string();
        self.definitions.update_dom_definition(&definition)?;

        tracing::info!(definition = %id, name, "DOM definition renamed");
        Ok(())
    }

    /// Append a field rule to every status-section link of a behavior
    ///
    /// Not idempotent: a second call adds a second rule for the same field
    /// to every link. Returns the number of rules appended.
    ///
    /// # Errors
    /// Returns error if the behavior is missing or the update fails
    pub fn append_status_field_link(
        &self,
        behavior: DomBehaviorDefinitionId,
        label: &str,
        link: &StatusFieldDescriptorLink,
    ) -> Result<usize, MigrationError> {
        self.edit_status_links(behavior, label, link, BehaviorLinkMode::Append)
    }

    /// Add a field rule to every status-section link that has none for the field
    ///
    /// Returns the number of rules added; when zero, no update is sent.
    ///
    /// # Errors
    /// Returns error if the behavior is missing or the update fails
    pub fn upsert_status_field_link(
        &self,
        behavior: DomBehaviorDefinitionId,
        label: &str,
        link: &StatusFieldDescriptorLink,
    ) -> Result<usize, MigrationError> {
        self.edit_status_links(behavior, label, link, BehaviorLinkMode::Upsert)
    }

    /// Add a field rule using the given mode
    ///
    /// # Errors
    /// Returns error if the behavior is missing or the update fails
    pub fn link_status_field(
        &self,
        behavior: DomBehaviorDefinitionId,
        label: &str,
        link: &StatusFieldDescriptorLink,
        mode: BehaviorLinkMode,
    ) -> Result<usize, MigrationError> {
        self.edit_status_links(behavior, label, link, mode)
    }

    fn edit_status_links(
        &self,
        behavior: DomBehaviorDefinitionId,
        label: &str,
        link: &StatusFieldDescriptorLink,
        mode: BehaviorLinkMode,
    ) -> Result<usize, MigrationError> {
        let mut definition = self.behavior(behavior, label)?;
        let mut added = 0;

        for status in &mut definition.status_section_definition_links {
            if mode == BehaviorLinkMode::Upsert && status.links_field(link.field_descriptor) {
                continue;
            }
            status.field_descriptor_links.push(link.clone());
            added += 1;
        }

        if added == 0 && mode == BehaviorLinkMode::Upsert {
            tracing::debug!(behavior = %definition.name, "status links already present");
            return Ok(0);
        }
        self.definitions.update_behavior_definition(&definition)?;

        tracing::info!(behavior = %definition.name, ?mode, added, "status field links stored");
        Ok(added)
    }

    /// Schema edits applied before the configuration version walk
    ///
    /// Renames the DOM definition and the section, and adds the optional
    /// `Created At` field. Both definitions are looked up before anything is
    /// written.
    ///
    /// # Errors
    /// Returns error if a definition is missing or an update fails
    pub fn prepare_configuration_version_schema(
        &self,
        targets: &MigrationTargets,
    ) -> Result<FieldEdit, MigrationError> {
        let mut section =
            self.section(targets.configuration_info_section, CONFIGURATION_INFO_SECTION_NAME)?;
        let mut definition = self.dom_definition(
            targets.configuration_version_definition,
            CONFIGURATION_VERSION_DEFINITION_NAME,
        )?;

        definition.name = CONFIGURATION_VERSION_DEFINITION_NAME.to_string();
        self.definitions.update_dom_definition(&definition)?;

        let created_at = FieldDescriptorBuilder::new()
            .with_id(targets.created_at_field)
            .with_name("Created At")
            .with_is_optional(true)
            .with_type(FieldType::DateTime)
            .with_module(targets.module.clone())
            .build()?;

        let edit = section.add_or_replace_field_descriptor(created_at);
        section.name = CONFIGURATION_INFO_SECTION_NAME.to_string();
        self.definitions.update_section_definition(&section)?;

        tracing::info!(?edit, "configuration version schema prepared");
        Ok(edit)
    }

    /// Schema edit applied after the configuration version walk
    ///
    /// # Errors
    /// Returns error if the section is missing or the update fails
    pub fn retire_previous_version_field(
        &self,
        targets: &MigrationTargets,
    ) -> Result<bool, MigrationError> {
        self.remove_field(
            targets.configuration_info_section,
            CONFIGURATION_INFO_SECTION_NAME,
            targets.previous_version_field,
        )
    }

    /// Schema edits applied before the service walk
    ///
    /// Adds the optional `Configuration Versions` reference list to Service
    /// Info and makes it visible and editable in every status of the service
    /// behavior.
    ///
    /// # Errors
    /// Returns error if a definition is missing or an update fails
    pub fn prepare_service_schema(
        &self,
        targets: &MigrationTargets,
        mode: BehaviorLinkMode,
    ) -> Result<ServiceSchemaChange, MigrationError> {
        // Fail before editing anything if the behavior is gone
        self.behavior(targets.service_behavior, "Service Behavior")?;

        let versions = FieldDescriptorBuilder::new()
            .with_id(targets.configuration_versions_field)
            .with_name("Configuration Versions")
            .with_tooltip(format!(
                "Reference list to the stored service configuration version in {}",
                targets.module
            ))
            .with_is_optional(true)
            .with_type(FieldType::GuidList)
            .with_module(targets.module.clone())
            .add_dom_definition(targets.configuration_version_definition)
            .build()?;

        let field = self.add_or_replace_field(targets.service_info_section, "Service Info", versions)?;
        let links_added = self.link_status_field(
            targets.service_behavior,
            "Service Behavior",
            &StatusFieldDescriptorLink::editable(targets.configuration_versions_field),
            mode,
        )?;

        Ok(ServiceSchemaChange { field, links_added })
    }
}
