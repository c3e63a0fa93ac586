//! DOM behavior definitions
//!
//! A behavior lists the lifecycle statuses of an instance and, per status
//! and section, how each field is shown.

use crate::ids::{DomBehaviorDefinitionId, FieldDescriptorId, SectionDefinitionId};
use serde::{Deserialize, Serialize};

/// Lifecycle status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomStatus {
    /// Status id, e.g. `new` or `active`
    pub id: String,
    /// Display name
    pub name: String,
}

impl DomStatus {
    /// Create a status
    #[inline]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Visibility rule of one field in one status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFieldDescriptorLink {
    /// Field the rule applies to
    pub field_descriptor: FieldDescriptorId,
    /// Field is shown
    pub visible: bool,
    /// Field cannot be changed
    pub read_only: bool,
    /// Field cannot be changed from client applications
    pub client_read_only: bool,
    /// Field must be set before entering the status
    pub required_for_status: bool,
}

impl StatusFieldDescriptorLink {
    /// Visible, editable and optional field
    #[inline]
    #[must_use]
    pub fn editable(field_descriptor: FieldDescriptorId) -> Self {
        Self {
            field_descriptor,
            visible: true,
            read_only: false,
            client_read_only: false,
            required_for_status: false,
        }
    }
}

/// Field rules of one section in one status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSectionDefinitionLink {
    /// Status id
    pub status_id: String,
    /// Section definition the rules belong to
    pub section_definition: SectionDefinitionId,
    /// Per-field rules
    #[serde(default)]
    pub field_descriptor_links: Vec<StatusFieldDescriptorLink>,
}

impl StatusSectionDefinitionLink {
    /// Create a link without field rules
    #[inline]
    pub fn new(status_id: impl Into<String>, section_definition: SectionDefinitionId) -> Self {
        Self {
            status_id: status_id.into(),
            section_definition,
            field_descriptor_links: Vec::new(),
        }
    }

    /// Whether a rule for the field already exists
    #[inline]
    #[must_use]
    pub fn links_field(&self, field: FieldDescriptorId) -> bool {
        self.field_descriptor_links
            .iter()
            .any(|l| l.field_descriptor == field)
    }
}

/// Lifecycle and visibility rules of a DOM definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomBehaviorDefinition {
    /// Behavior id
    pub id: DomBehaviorDefinitionId,
    /// Display name
    pub name: String,
    /// Lifecycle statuses
    #[serde(default)]
    pub statuses: Vec<DomStatus>,
    /// Per-status, per-section field rules
    #[serde(default)]
    pub status_section_definition_links: Vec<StatusSectionDefinitionLink>,
}

impl DomBehaviorDefinition {
    /// Create a behavior without statuses
    #[inline]
    pub fn new(id: DomBehaviorDefinitionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            statuses: Vec::new(),
            status_section_definition_links: Vec::new(),
        }
    }

    /// Number of rules for a field across all status links
    #[must_use]
    pub fn field_link_count(&self, field: FieldDescriptorId) -> usize {
        self.status_section_definition_links
            .iter()
            .flat_map(|s| s.field_descriptor_links.iter())
            .filter(|l| l.field_descriptor == field)
            .count()
    }
}
