//! Version-chain flattener
//!
//! Walks every configuration version page by page. The `previousVersion`
//! reference of every instance on a page is recorded in the
//! [`VersionPrecedenceMap`] and handed to the page callback first. Only then
//! is each instance stripped of `previousVersion`, stamped with `createdAt`
//! and written back, so a saved map always covers every committed instance.

use crate::catalog::MigrationTargets;
use crate::error::MigrationError;
use crate::precedence::VersionPrecedenceMap;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use svcmgmt_model::{DomInstance, DomInstanceId, FieldValue};
use svcmgmt_store::{prepare_paging, DomInstanceFilter, DomInstanceStore};

/// Counters of one flatten walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenOutcome {
    /// Instances updated
    pub instances_visited: usize,
    /// Page fetches issued
    pub pages_fetched: usize,
    /// Instances that referenced a predecessor
    pub with_predecessor: usize,
    /// Instances whose predecessor came from a checkpoint of an earlier run
    pub restored_from_checkpoint: usize,
}

/// Flattens configuration version chains into a precedence map
#[derive(Debug)]
pub struct ChainFlattener<'s, S: ?Sized> {
    store: &'s S,
    targets: &'s MigrationTargets,
    page_size: usize,
}

impl<'s, S> ChainFlattener<'s, S>
where
    S: DomInstanceStore + ?Sized,
{
    /// Create a flattener
    #[inline]
    #[must_use]
    pub fn new(store: &'s S, targets: &'s MigrationTargets, page_size: usize) -> Self {
        Self {
            store,
            targets,
            page_size,
        }
    }

    /// Walk all configuration versions
    ///
    /// Entries already in `map` are kept when the instance no longer carries
    /// a `previousVersion`; that only happens when resuming a walk whose
    /// earlier instances were committed. `on_page` runs once per page, after
    /// the page's predecessors are recorded and before any of its instances
    /// is written.
    ///
    /// # Errors
    /// - `MigrationError::Store` if a fetch or update fails
    /// - `MigrationError::Model` if `previousVersion` is not a Guid
    /// - `MigrationError::DuplicateInstance` if the store repeats an instance
    ///
    /// `map` keeps every entry recorded before the failure.
    pub fn run<F>(
        &self,
        migrated_at: DateTime<Utc>,
        map: &mut VersionPrecedenceMap,
        mut on_page: F,
    ) -> Result<FlattenOutcome, MigrationError>
    where
        F: FnMut(&VersionPrecedenceMap) -> Result<(), MigrationError>,
    {
        let filter = DomInstanceFilter::definition_equal(self.targets.configuration_version_definition);
        let mut cursor = prepare_paging(self.store, filter, self.page_size);
        let mut visited: HashSet<DomInstanceId> = HashSet::new();
        let mut outcome = FlattenOutcome::default();

        let result = loop {
            let page = match cursor.next_page() {
                Ok(Some(page)) => page,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e.into()),
            };
            let page_len = page.len();

            if let Err(e) = page
                .iter()
                .try_for_each(|instance| self.record(instance, map, &mut visited, &mut outcome))
            {
                break Err(e);
            }
            if let Err(e) = on_page(map) {
                break Err(e);
            }
            if let Err(e) = page
                .into_iter()
                .try_for_each(|instance| self.flatten_one(instance, migrated_at, &mut outcome))
            {
                break Err(e);
            }

            tracing::debug!(
                page = cursor.pages_fetched(),
                instances = page_len,
                recorded = map.len(),
                "configuration version page migrated"
            );
        };
        outcome.pages_fetched = cursor.pages_fetched();
        result?;

        tracing::info!(
            instances = outcome.instances_visited,
            pages = outcome.pages_fetched,
            with_predecessor = outcome.with_predecessor,
            "configuration version chains flattened"
        );
        Ok(outcome)
    }

    fn record(
        &self,
        instance: &DomInstance,
        map: &mut VersionPrecedenceMap,
        visited: &mut HashSet<DomInstanceId>,
        outcome: &mut FlattenOutcome,
    ) -> Result<(), MigrationError> {
        if !visited.insert(instance.id) {
            return Err(MigrationError::DuplicateInstance(instance.id));
        }

        let previous = instance
            .guid_field_value(self.targets.configuration_info_section, self.targets.previous_version_field)?
            .map(DomInstanceId::from);

        if previous.is_none() && map.contains(instance.id) {
            outcome.restored_from_checkpoint += 1;
        } else {
            map.record(instance.id, previous);
        }
        if previous.is_some() {
            outcome.with_predecessor += 1;
        }
        Ok(())
    }

    fn flatten_one(
        &self,
        mut instance: DomInstance,
        migrated_at: DateTime<Utc>,
        outcome: &mut FlattenOutcome,
    ) -> Result<(), MigrationError> {
        let section = self.targets.configuration_info_section;
        instance.remove_field_value(section, self.targets.previous_version_field);
        instance.set_field_value(
            section,
            self.targets.created_at_field,
            FieldValue::DateTime(migrated_at),
        );
        self.store.update(&instance)?;

        outcome.instances_visited += 1;
        Ok(())
    }
}
