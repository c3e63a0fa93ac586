//! Store interfaces
//!
//! Both traits take `&self`; backends manage their own interior state.
//! All calls are synchronous and every successful update is committed
//! immediately.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use svcmgmt_model::{
    DomBehaviorDefinition, DomBehaviorDefinitionId, DomDefinition, DomDefinitionId, DomInstance,
    DomInstanceId, SectionDefinition, SectionDefinitionId,
};

/// Filter selecting the instances of one DOM definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomInstanceFilter {
    /// DOM definition the instances must belong to
    pub definition: DomDefinitionId,
}

impl DomInstanceFilter {
    /// Instances whose DOM definition equals `definition`
    #[inline]
    #[must_use]
    pub fn definition_equal(definition: DomDefinitionId) -> Self {
        Self { definition }
    }

    /// Whether the instance passes the filter
    #[inline]
    #[must_use]
    pub fn matches(&self, instance: &DomInstance) -> bool {
        instance.definition == self.definition
    }
}

/// Continuation point of a paged read
///
/// Holds the last instance id of the previous page; the next page starts
/// strictly after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken(pub DomInstanceId);

/// One page of instances
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Instances in ascending id order
    pub instances: Vec<DomInstance>,
    /// Continuation, `None` when no instances follow
    pub next: Option<PageToken>,
}

/// Paged access to DOM instances
pub trait DomInstanceStore {
    /// Read up to `page_size` instances matching `filter`, starting after `after`
    ///
    /// # Errors
    /// Returns error if the backend cannot serve the page
    fn fetch_page(
        &self,
        filter: &DomInstanceFilter,
        after: Option<&PageToken>,
        page_size: usize,
    ) -> Result<Page, StoreError>;

    /// Persist an instance
    ///
    /// # Errors
    /// Returns error if the instance does not exist, violates its schema, or
    /// the backend rejects the write
    fn update(&self, instance: &DomInstance) -> Result<(), StoreError>;
}

/// Access to section, DOM and behavior definitions
pub trait DefinitionStore {
    /// Section definition by id, `None` if absent
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    fn section_definition(
        &self,
        id: SectionDefinitionId,
    ) -> Result<Option<SectionDefinition>, StoreError>;

    /// DOM definition by id, `None` if absent
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    fn dom_definition(&self, id: DomDefinitionId) -> Result<Option<DomDefinition>, StoreError>;

    /// Behavior definition by id, `None` if absent
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    fn behavior_definition(
        &self,
        id: DomBehaviorDefinitionId,
    ) -> Result<Option<DomBehaviorDefinition>, StoreError>;

    /// Persist a section definition
    ///
    /// # Errors
    /// Returns error if the definition does not exist or the write fails
    fn update_section_definition(&self, definition: &SectionDefinition) -> Result<(), StoreError>;

    /// Persist a DOM definition
    ///
    /// # Errors
    /// Returns error if the definition does not exist or the write fails
    fn update_dom_definition(&self, definition: &DomDefinition) -> Result<(), StoreError>;

    /// Persist a behavior definition
    ///
    /// # Errors
    /// Returns error if the definition does not exist or the write fails
    fn update_behavior_definition(
        &self,
        definition: &DomBehaviorDefinition,
    ) -> Result<(), StoreError>;
}
