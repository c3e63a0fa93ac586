//! DOM instances
//!
//! An instance belongs to one DOM definition and carries its field values
//! grouped in sections, one section per section definition.

use crate::error::ModelError;
use crate::ids::{DomDefinitionId, DomInstanceId, FieldDescriptorId, SectionDefinitionId};
use crate::value::{FieldType, FieldValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field values of one section definition on an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section definition this section conforms to
    pub section_definition: SectionDefinitionId,
    /// Field values keyed by descriptor, in insertion order
    #[serde(default)]
    pub fields: IndexMap<FieldDescriptorId, FieldValue>,
}

impl Section {
    /// Create an empty section
    #[inline]
    #[must_use]
    pub fn new(section_definition: SectionDefinitionId) -> Self {
        Self {
            section_definition,
            fields: IndexMap::new(),
        }
    }
}

/// Stored record conforming to a DOM definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomInstance {
    /// Instance id
    pub id: DomInstanceId,
    /// DOM definition of the instance
    pub definition: DomDefinitionId,
    /// Sections with field values
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl DomInstance {
    /// Create an empty instance with a fresh id
    #[inline]
    #[must_use]
    pub fn new(definition: DomDefinitionId) -> Self {
        Self::with_id(DomInstanceId::new(), definition)
    }

    /// Create an empty instance with a known id
    #[inline]
    #[must_use]
    pub fn with_id(id: DomInstanceId, definition: DomDefinitionId) -> Self {
        Self {
            id,
            definition,
            sections: Vec::new(),
        }
    }

    /// Section for a section definition, if present
    #[must_use]
    pub fn section(&self, section: SectionDefinitionId) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.section_definition == section)
    }

    fn section_mut(&mut self, section: SectionDefinitionId) -> &mut Section {
        let idx = match self
            .sections
            .iter()
            .position(|s| s.section_definition == section)
        {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(section));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }

    /// Value of a field, if set
    #[must_use]
    pub fn field_value(
        &self,
        section: SectionDefinitionId,
        field: FieldDescriptorId,
    ) -> Option<&FieldValue> {
        self.section(section).and_then(|s| s.fields.get(&field))
    }

    /// Value of a single-reference field
    ///
    /// # Errors
    /// Returns `ModelError::TypeMismatch` if the field holds a non-Guid value
    pub fn guid_field_value(
        &self,
        section: SectionDefinitionId,
        field: FieldDescriptorId,
    ) -> Result<Option<Uuid>, ModelError> {
        match self.field_value(section, field) {
            None => Ok(None),
            Some(FieldValue::Guid(id)) => Ok(Some(*id)),
            Some(other) => Err(ModelError::TypeMismatch {
                instance: self.id,
                field,
                expected: FieldType::Guid,
                actual: other.field_type(),
            }),
        }
    }

    /// Add a field value or replace the existing one
    ///
    /// Returns the previous value, if any.
    pub fn set_field_value(
        &mut self,
        section: SectionDefinitionId,
        field: FieldDescriptorId,
        value: FieldValue,
    ) -> Option<FieldValue> {
        self.section_mut(section).fields.insert(field, value)
    }

    /// Add a list field value or replace the existing list
    pub fn set_list_field_value(
        &mut self,
        section: SectionDefinitionId,
        field: FieldDescriptorId,
        values: Vec<Uuid>,
    ) -> Option<FieldValue> {
        self.set_field_value(section, field, FieldValue::GuidList(values))
    }

    /// Remove a field value; no-op if absent
    ///
    /// Returns the removed value, if any.
    pub fn remove_field_value(
        &mut self,
        section: SectionDefinitionId,
        field: FieldDescriptorId,
    ) -> Option<FieldValue> {
        self.sections
            .iter_mut()
            .find(|s| s.section_definition == section)
            .and_then(|s| s.fields.shift_remove(&field))
    }
}
