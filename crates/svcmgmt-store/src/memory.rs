//! In-memory store backend
//!
//! Keeps instances ordered by id so keyset paging is stable while instances
//! are updated. Instance updates are checked against the stored section
//! definitions, the way a DOM manager rejects values for undeclared fields.
//!
//! Statistics and injectable failures make the backend usable as a test
//! double for the migration.

use crate::api::{DefinitionStore, DomInstanceFilter, DomInstanceStore, Page, PageToken};
use crate::error::{ObjectKind, StoreError};
use crate::snapshot::StoreSnapshot;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use svcmgmt_model::{
    DomBehaviorDefinition, DomBehaviorDefinitionId, DomDefinition, DomDefinitionId, DomInstance,
    DomInstanceId, SectionDefinition, SectionDefinitionId,
};

/// Access statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Total page fetches
    pub page_fetches: usize,
    /// Page fetches per filtered DOM definition
    pub page_fetches_by_definition: BTreeMap<DomDefinitionId, usize>,
    /// Successful instance updates
    pub instance_updates: usize,
    /// Successful updates per instance
    pub updates_by_instance: BTreeMap<DomInstanceId, usize>,
    /// Successful definition updates of any kind
    pub definition_updates: usize,
}

impl StoreStats {
    /// Page fetches issued for one DOM definition
    #[inline]
    #[must_use]
    pub fn fetches_for(&self, definition: DomDefinitionId) -> usize {
        self.page_fetches_by_definition
            .get(&definition)
            .copied()
            .unwrap_or(0)
    }

    /// Successful updates of one instance
    #[inline]
    #[must_use]
    pub fn updates_of(&self, instance: DomInstanceId) -> usize {
        self.updates_by_instance.get(&instance).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct Faults {
    /// Fail the n-th instance update attempt (1-based)
    instance_update_at: Option<usize>,
    instances: BTreeSet<DomInstanceId>,
    definition_updates: bool,
    update_attempts: usize,
}

#[derive(Debug)]
struct Inner {
    instances: BTreeMap<DomInstanceId, DomInstance>,
    sections: BTreeMap<SectionDefinitionId, SectionDefinition>,
    dom_definitions: BTreeMap<DomDefinitionId, DomDefinition>,
    behaviors: BTreeMap<DomBehaviorDefinitionId, DomBehaviorDefinition>,
    validate_schema: bool,
    faults: Faults,
    stats: StoreStats,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            instances: BTreeMap::new(),
            sections: BTreeMap::new(),
            dom_definitions: BTreeMap::new(),
            behaviors: BTreeMap::new(),
            validate_schema: true,
            faults: Faults::default(),
            stats: StoreStats::default(),
        }
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Create an empty store with schema validation enabled
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable checking instance updates against section definitions
    #[inline]
    #[must_use]
    pub fn without_schema_validation(mut self) -> Self {
        self.inner.get_mut().validate_schema = false;
        self
    }

    /// Build a store from a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            inner.sections = snapshot
                .section_definitions
                .into_iter()
                .map(|d| (d.id, d))
                .collect();
            inner.dom_definitions = snapshot
                .dom_definitions
                .into_iter()
                .map(|d| (d.id, d))
                .collect();
            inner.behaviors = snapshot
                .behavior_definitions
                .into_iter()
                .map(|d| (d.id, d))
                .collect();
            inner.instances = snapshot
                .instances
                .into_iter()
                .map(|i| (i.id, i))
                .collect();
        }
        store
    }

    /// Capture the current content
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.lock();
        StoreSnapshot {
            section_definitions: inner.sections.values().cloned().collect(),
            dom_definitions: inner.dom_definitions.values().cloned().collect(),
            behavior_definitions: inner.behaviors.values().cloned().collect(),
            instances: inner.instances.values().cloned().collect(),
        }
    }

    /// Seed an instance, bypassing validation and statistics
    pub fn insert_instance(&self, instance: DomInstance) {
        self.inner.lock().instances.insert(instance.id, instance);
    }

    /// Seed a section definition
    pub fn insert_section_definition(&self, definition: SectionDefinition) {
        self.inner.lock().sections.insert(definition.id, definition);
    }

    /// Seed a DOM definition
    pub fn insert_dom_definition(&self, definition: DomDefinition) {
        self.inner
            .lock()
            .dom_definitions
            .insert(definition.id, definition);
    }

    /// Seed a behavior definition
    pub fn insert_behavior_definition(&self, definition: DomBehaviorDefinition) {
        self.inner.lock().behaviors.insert(definition.id, definition);
    }

    /// Stored instance by id
    #[must_use]
    pub fn instance(&self, id: DomInstanceId) -> Option<DomInstance> {
        self.inner.lock().instances.get(&id).cloned()
    }

    /// All stored instances of a DOM definition, in id order
    #[must_use]
    pub fn instances_of(&self, definition: DomDefinitionId) -> Vec<DomInstance> {
        self.inner
            .lock()
            .instances
            .values()
            .filter(|i| i.definition == definition)
            .cloned()
            .collect()
    }

    /// Number of stored instances
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.inner.lock().instances.len()
    }

    /// Access statistics so far
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.inner.lock().stats.clone()
    }

    /// Fail the n-th instance update attempt from now on (1-based)
    pub fn fail_nth_instance_update(&self, n: usize) {
        let mut inner = self.inner.lock();
        let attempts = inner.faults.update_attempts;
        inner.faults.instance_update_at = Some(attempts + n);
    }

    /// Fail every update of one instance
    pub fn fail_updates_of(&self, instance: DomInstanceId) {
        self.inner.lock().faults.instances.insert(instance);
    }

    /// Fail every definition update
    pub fn fail_definition_updates(&self) {
        self.inner.lock().faults.definition_updates = true;
    }

    /// Remove all injected failures
    pub fn clear_faults(&self) {
        let mut inner = self.inner.lock();
        let attempts = inner.faults.update_attempts;
        inner.faults = Faults {
            update_attempts: attempts,
            ..Faults::default()
        };
    }
}

impl Inner {
    fn check_schema(&self, instance: &DomInstance) -> Result<(), StoreError> {
        for section in &instance.sections {
            let Some(definition) = self.sections.get(&section.section_definition) else {
                return Err(StoreError::schema_violation(
                    instance.id,
                    format!("unknown section definition {}", section.section_definition),
                ));
            };

            for (field, value) in &section.fields {
                let Some(descriptor) = definition.field_descriptor(*field) else {
                    return Err(StoreError::schema_violation(
                        instance.id,
                        format!("field {field} is not declared in section '{}'", definition.name),
                    ));
                };
                if descriptor.field_type != value.field_type() {
                    return Err(StoreError::schema_violation(
                        instance.id,
                        format!(
                            "field '{}' expects {}, got {}",
                            descriptor.name,
                            descriptor.field_type,
                            value.field_type()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_definition_fault(&self, kind: ObjectKind) -> Result<(), StoreError> {
        if self.faults.definition_updates {
            return Err(StoreError::Injected(format!("{kind} update rejected")));
        }
        Ok(())
    }
}

impl DomInstanceStore for InMemoryStore {
    fn fetch_page(
        &self,
        filter: &DomInstanceFilter,
        after: Option<&PageToken>,
        page_size: usize,
    ) -> Result<Page, StoreError> {
        let mut inner = self.inner.lock();
        inner.stats.page_fetches += 1;
        *inner
            .stats
            .page_fetches_by_definition
            .entry(filter.definition)
            .or_default() += 1;

        let lower = match after {
            Some(token) => Bound::Excluded(token.0),
            None => Bound::Unbounded,
        };
        let mut matching = inner
            .instances
            .range((lower, Bound::Unbounded))
            .map(|(_, i)| i)
            .filter(|i| filter.matches(i));

        let instances: Vec<DomInstance> = matching.by_ref().take(page_size).cloned().collect();
        let more = matching.next().is_some();
        let next = if more {
            instances.last().map(|i| PageToken(i.id))
        } else {
            None
        };

        tracing::trace!(
            definition = %filter.definition,
            returned = instances.len(),
            more,
            "served page"
        );
        Ok(Page { instances, next })
    }

    fn update(&self, instance: &DomInstance) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.faults.update_attempts += 1;

        if inner.faults.instance_update_at == Some(inner.faults.update_attempts)
            || inner.faults.instances.contains(&instance.id)
        {
            return Err(StoreError::Injected(format!(
                "update of instance {} rejected",
                instance.id
            )));
        }
        if !inner.instances.contains_key(&instance.id) {
            return Err(StoreError::not_found(ObjectKind::Instance, instance.id));
        }
        if inner.validate_schema {
            inner.check_schema(instance)?;
        }

        inner.instances.insert(instance.id, instance.clone());
        inner.stats.instance_updates += 1;
        *inner.stats.updates_by_instance.entry(instance.id).or_default() += 1;
        Ok(())
    }
}

impl DefinitionStore for InMemoryStore {
    fn section_definition(
        &self,
        id: SectionDefinitionId,
    ) -> Result<Option<SectionDefinition>, StoreError> {
        Ok(self.inner.lock().sections.get(&id).cloned())
    }

    fn dom_definition(&self, id: DomDefinitionId) -> Result<Option<DomDefinition>, StoreError> {
        Ok(self.inner.lock().dom_definitions.get(&id).cloned())
    }

    fn behavior_definition(
        &self,
        id: DomBehaviorDefinitionId,
    ) -> Result<Option<DomBehaviorDefinition>, StoreError> {
        Ok(self.inner.lock().behaviors.get(&id).cloned())
    }

    fn update_section_definition(&self, definition: &SectionDefinition) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check_definition_fault(ObjectKind::SectionDefinition)?;
        let Some(slot) = inner.sections.get_mut(&definition.id) else {
            return Err(StoreError::not_found(ObjectKind::SectionDefinition, definition.id));
        };
        *slot = definition.clone();
        inner.stats.definition_updates += 1;
        Ok(())
    }

    fn update_dom_definition(&self, definition: &DomDefinition) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check_definition_fault(ObjectKind::DomDefinition)?;
        let Some(slot) = inner.dom_definitions.get_mut(&definition.id) else {
            return Err(StoreError::not_found(ObjectKind::DomDefinition, definition.id));
        };
        *slot = definition.clone();
        inner.stats.definition_updates += 1;
        Ok(())
    }

    fn update_behavior_definition(
        &self,
        definition: &DomBehaviorDefinition,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check_definition_fault(ObjectKind::BehaviorDefinition)?;
        let Some(slot) = inner.behaviors.get_mut(&definition.id) else {
            return Err(StoreError::not_found(ObjectKind::BehaviorDefinition, definition.id));
        };
        *slot = definition.clone();
        inner.stats.definition_updates += 1;
        Ok(())
    }
}
