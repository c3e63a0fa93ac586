//! Section and DOM definitions
//!
//! A [`SectionDefinition`] declares the named, typed fields an instance
//! section may carry. A [`DomDefinition`] names a kind of instance and links
//! the sections and behavior it uses.

use crate::error::ModelError;
use crate::ids::{
    DomBehaviorDefinitionId, DomDefinitionId, FieldDescriptorId, ModuleId, SectionDefinitionId,
};
use crate::value::FieldType;
use serde::{Deserialize, Serialize};

/// Declared field of a section definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field id
    pub id: FieldDescriptorId,
    /// Display name
    pub name: String,
    /// Tooltip shown next to the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    /// Whether instances may leave the field unset
    pub is_optional: bool,
    /// Declared value type
    pub field_type: FieldType,
    /// Owning module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleId>,
    /// DOM definitions the field may reference
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_definitions: Vec<DomDefinitionId>,
}

/// Builder for [`FieldDescriptor`]
#[derive(Debug, Clone, Default)]
pub struct FieldDescriptorBuilder {
    id: Option<FieldDescriptorId>,
    name: Option<String>,
    tooltip: Option<String>,
    is_optional: bool,
    field_type: Option<FieldType>,
    module: Option<ModuleId>,
    referenced_definitions: Vec<DomDefinitionId>,
}

impl FieldDescriptorBuilder {
    /// Create an empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With field id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: FieldDescriptorId) -> Self {
        self.id = Some(id);
        self
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With tooltip
    #[inline]
    #[must_use]
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// With optionality
    #[inline]
    #[must_use]
    pub fn with_is_optional(mut self, is_optional: bool) -> Self {
        self.is_optional = is_optional;
        self
    }

    /// With value type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    /// With owning module
    #[inline]
    #[must_use]
    pub fn with_module(mut self, module: ModuleId) -> Self {
        self.module = Some(module);
        self
    }

    /// Add a DOM definition the field may reference
    #[inline]
    #[must_use]
    pub fn add_dom_definition(mut self, definition: DomDefinitionId) -> Self {
        if !self.referenced_definitions.contains(&definition) {
            self.referenced_definitions.push(definition);
        }
        self
    }

    /// Build the descriptor
    ///
    /// # Errors
    /// - `ModelError::MissingProperty` if id, name or type was not given
    /// - `ModelError::NotAReferenceType` if referenced definitions were added
    ///   to a field whose type cannot hold references
    pub fn build(self) -> Result<FieldDescriptor, ModelError> {
        let id = self.id.ok_or(ModelError::MissingProperty("id"))?;
        let name = self.name.ok_or(ModelError::MissingProperty("name"))?;
        let field_type = self.field_type.ok_or(ModelError::MissingProperty("type"))?;

        if !self.referenced_definitions.is_empty() && !field_type.is_reference() {
            return Err(ModelError::NotAReferenceType { field: id, field_type });
        }

        Ok(FieldDescriptor {
            id,
            name,
            tooltip: self.tooltip,
            is_optional: self.is_optional,
            field_type,
            module: self.module,
            referenced_definitions: self.referenced_definitions,
        })
    }
}

/// Outcome of [`SectionDefinition::add_or_replace_field_descriptor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEdit {
    /// Descriptor was not present and has been appended
    Added,
    /// Descriptor with the same id has been replaced in place
    Replaced,
}

/// Declared shape of an instance section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDefinition {
    /// Section definition id
    pub id: SectionDefinitionId,
    /// Display name
    pub name: String,
    /// Declared fields
    #[serde(default)]
    pub field_descriptors: Vec<FieldDescriptor>,
}

impl SectionDefinition {
    /// Create a section definition without fields
    #[inline]
    pub fn new(id: SectionDefinitionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            field_descriptors: Vec::new(),
        }
    }

    /// Descriptor for a field id
    #[must_use]
    pub fn field_descriptor(&self, field: FieldDescriptorId) -> Option<&FieldDescriptor> {
        self.field_descriptors.iter().find(|d| d.id == field)
    }

    /// Add a descriptor, replacing any descriptor with the same id
    pub fn add_or_replace_field_descriptor(&mut self, descriptor: FieldDescriptor) -> FieldEdit {
        match self
            .field_descriptors
            .iter_mut()
            .find(|d| d.id == descriptor.id)
        {
            Some(existing) => {
                *existing = descriptor;
                FieldEdit::Replaced
            }
            None => {
                self.field_descriptors.push(descriptor);
                FieldEdit::Added
            }
        }
    }

    /// Remove a descriptor; no-op if absent
    pub fn remove_field_descriptor(&mut self, field: FieldDescriptorId) -> Option<FieldDescriptor> {
        let idx = self.field_descriptors.iter().position(|d| d.id == field)?;
        Some(self.field_descriptors.remove(idx))
    }
}

/// Kind of instance, linking its sections and behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomDefinition {
    /// DOM definition id
    pub id: DomDefinitionId,
    /// Display name
    pub name: String,
    /// Owning module
    pub module: ModuleId,
    /// Section definitions used by instances
    #[serde(default)]
    pub section_definitions: Vec<SectionDefinitionId>,
    /// Behavior governing the instance lifecycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<DomBehaviorDefinitionId>,
}

impl DomDefinition {
    /// Create a DOM definition
    #[inline]
    pub fn new(id: DomDefinitionId, name: impl Into<String>, module: ModuleId) -> Self {
        Self {
            id,
            name: name.into(),
            module,
            section_definitions: Vec::new(),
            behavior: None,
        }
    }

    /// Link a section definition
    #[inline]
    #[must_use]
    pub fn with_section(mut self, section: SectionDefinitionId) -> Self {
        self.section_definitions.push(section);
        self
    }

    /// Link a behavior definition
    #[inline]
    #[must_use]
    pub fn with_behavior(mut self, behavior: DomBehaviorDefinitionId) -> Self {
        self.behavior = Some(behavior);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: u128, name: &str) -> FieldDescriptor {
        FieldDescriptorBuilder::new()
            .with_id(FieldDescriptorId::from_u128(id))
            .with_name(name)
            .with_type(FieldType::Text)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_id_name_and_type() {
        let missing_id = FieldDescriptorBuilder::new().with_name("x").with_type(FieldType::Bool);
        assert_eq!(missing_id.build(), Err(ModelError::MissingProperty("id")));

        let missing_type = FieldDescriptorBuilder::new()
            .with_id(FieldDescriptorId::from_u128(1))
            .with_name("x");
        assert_eq!(missing_type.build(), Err(ModelError::MissingProperty("type")));
    }

    #[test]
    fn builder_rejects_references_on_plain_types() {
        let result = FieldDescriptorBuilder::new()
            .with_id(FieldDescriptorId::from_u128(1))
            .with_name("Created At")
            .with_type(FieldType::DateTime)
            .add_dom_definition(DomDefinitionId::from_u128(2))
            .build();

        assert!(matches!(result, Err(ModelError::NotAReferenceType { .. })));
    }

    #[test]
    fn builder_keeps_reference_list() {
        let target = DomDefinitionId::from_u128(2);
        let descriptor = FieldDescriptorBuilder::new()
            .with_id(FieldDescriptorId::from_u128(1))
            .with_name("Configuration Versions")
            .with_tooltip("tip")
            .with_is_optional(true)
            .with_type(FieldType::GuidList)
            .add_dom_definition(target)
            .add_dom_definition(target)
            .build()
            .unwrap();

        assert_eq!(descriptor.referenced_definitions, vec![target]);
        assert_eq!(descriptor.tooltip.as_deref(), Some("tip"));
        assert!(descriptor.is_optional);
    }

    #[test]
    fn add_or_replace_is_idempotent_per_field() {
        let mut section = SectionDefinition::new(SectionDefinitionId::from_u128(1), "Info");

        assert_eq!(section.add_or_replace_field_descriptor(descriptor(1, "a")), FieldEdit::Added);
        assert_eq!(section.add_or_replace_field_descriptor(descriptor(1, "b")), FieldEdit::Replaced);

        assert_eq!(section.field_descriptors.len(), 1);
        assert_eq!(section.field_descriptors[0].name, "b");
    }

    #[test]
    fn remove_absent_descriptor_is_noop() {
        let mut section = SectionDefinition::new(SectionDefinitionId::from_u128(1), "Info");
        section.add_or_replace_field_descriptor(descriptor(1, "a"));

        assert!(section.remove_field_descriptor(FieldDescriptorId::from_u128(2)).is_none());
        assert!(section.remove_field_descriptor(FieldDescriptorId::from_u128(1)).is_some());
        assert!(section.field_descriptors.is_empty());
    }
}
