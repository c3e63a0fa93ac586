//! Service rewriter
//!
//! Walks every service and writes `configurationVersions`: the current
//! configuration version first, then its immediate predecessor from the
//! precedence map. History deeper than one hop is not carried over.

use crate::catalog::MigrationTargets;
use crate::error::MigrationError;
use crate::precedence::{Precedence, VersionPrecedenceMap};
use std::collections::HashSet;
use svcmgmt_model::{DomInstance, DomInstanceId};
use svcmgmt_store::{prepare_paging, DomInstanceFilter, DomInstanceStore};
use uuid::Uuid;

/// How a service's configuration versions were resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Service has no current configuration
    NoConfiguration,
    /// Current configuration has no predecessor
    CurrentOnly,
    /// Current configuration and its predecessor
    WithPredecessor,
    /// Current configuration was never seen by the flatten walk
    Unresolved,
}

/// Configuration versions list for a service's current configuration
///
/// Holds at most two ids: index 0 is the current version, index 1 its
/// immediate predecessor.
#[must_use]
pub fn configuration_versions(
    current: Option<DomInstanceId>,
    map: &VersionPrecedenceMap,
) -> (Vec<Uuid>, Resolution) {
    let Some(current) = current else {
        return (Vec::new(), Resolution::NoConfiguration);
    };

    match map.precedence(current) {
        Precedence::Preceded(previous) => (
            vec![current.as_uuid(), previous.as_uuid()],
            Resolution::WithPredecessor,
        ),
        Precedence::Root => (vec![current.as_uuid()], Resolution::CurrentOnly),
        Precedence::Unknown => (vec![current.as_uuid()], Resolution::Unresolved),
    }
}

/// Counters of one rewrite walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Services updated
    pub services_visited: usize,
    /// Page fetches issued
    pub pages_fetched: usize,
    /// Services with current and previous version
    pub with_history: usize,
    /// Services with only a current version
    pub current_only: usize,
    /// Services without configuration
    pub without_configuration: usize,
    /// Services whose configuration was not in the precedence map
    pub unresolved_references: usize,
    /// Services returned again by the store and skipped
    pub duplicates_skipped: usize,
}

/// Writes configuration version lists on services
#[derive(Debug)]
pub struct ServiceRewriter<'s, S: ?Sized> {
    store: &'s S,
    targets: &'s MigrationTargets,
    page_size: usize,
}

impl<'s, S> ServiceRewriter<'s, S>
where
    S: DomInstanceStore + ?Sized,
{
    /// Create a rewriter
    #[inline]
    #[must_use]
    pub fn new(store: &'s S, targets: &'s MigrationTargets, page_size: usize) -> Self {
        Self {
            store,
            targets,
            page_size,
        }
    }

    /// Walk all services
    ///
    /// # Errors
    /// - `MigrationError::Store` if a fetch or update fails
    /// - `MigrationError::Model` if `serviceConfiguration` is not a Guid
    pub fn run(&self, map: &VersionPrecedenceMap) -> Result<RewriteOutcome, MigrationError> {
        let filter = DomInstanceFilter::definition_equal(self.targets.service_definition);
        let mut cursor = prepare_paging(self.store, filter, self.page_size);
        let mut visited: HashSet<DomInstanceId> = HashSet::new();
        let mut outcome = RewriteOutcome::default();

        while let Some(page) = cursor.next_page()? {
            let page_len = page.len();
            for instance in page {
                if !visited.insert(instance.id) {
                    tracing::warn!(service = %instance.id, "service returned twice, skipping");
                    outcome.duplicates_skipped += 1;
                    continue;
                }
                self.rewrite_one(instance, map, &mut outcome)?;
            }
            tracing::debug!(page = cursor.pages_fetched(), services = page_len, "service page migrated");
        }
        outcome.pages_fetched = cursor.pages_fetched();

        tracing::info!(
            services = outcome.services_visited,
            pages = outcome.pages_fetched,
            with_history = outcome.with_history,
            unresolved = outcome.unresolved_references,
            "services rewritten"
        );
        Ok(outcome)
    }

    fn rewrite_one(
        &self,
        mut instance: DomInstance,
        map: &VersionPrecedenceMap,
        outcome: &mut RewriteOutcome,
    ) -> Result<(), MigrationError> {
        let section = self.targets.service_info_section;
        let current = instance
            .guid_field_value(section, self.targets.service_configuration_field)?
            .map(DomInstanceId::from);

        let (versions, resolution) = configuration_versions(current, map);
        match resolution {
            Resolution::NoConfiguration => outcome.without_configuration += 1,
            Resolution::CurrentOnly => outcome.current_only += 1,
            Resolution::WithPredecessor => outcome.with_history += 1,
            Resolution::Unresolved => {
                tracing::warn!(
                    service = %instance.id,
                    configuration = ?current,
                    "configuration version unknown to the precedence map"
                );
                outcome.unresolved_references += 1;
            }
        }

        instance.set_list_field_value(section, self.targets.configuration_versions_field, versions);
        self.store.update(&instance)?;

        outcome.services_visited += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(n: u128) -> DomInstanceId {
        DomInstanceId::from_u128(n)
    }

    #[test]
    fn no_configuration_gives_empty_list() {
        let (versions, resolution) = configuration_versions(None, &VersionPrecedenceMap::new());
        assert!(versions.is_empty());
        assert_eq!(resolution, Resolution::NoConfiguration);
    }

    #[test]
    fn chain_is_truncated_to_two() {
        let map: VersionPrecedenceMap = [(id(1), None), (id(2), Some(id(1))), (id(3), Some(id(2)))]
            .into_iter()
            .collect();

        let (versions, resolution) = configuration_versions(Some(id(3)), &map);
        assert_eq!(versions, vec![id(3).as_uuid(), id(2).as_uuid()]);
        assert_eq!(resolution, Resolution::WithPredecessor);

        let (versions, resolution) = configuration_versions(Some(id(1)), &map);
        assert_eq!(versions, vec![id(1).as_uuid()]);
        assert_eq!(resolution, Resolution::CurrentOnly);
    }

    #[test]
    fn unknown_configuration_keeps_current_only() {
        let (versions, resolution) =
            configuration_versions(Some(id(9)), &VersionPrecedenceMap::new());
        assert_eq!(versions, vec![id(9).as_uuid()]);
        assert_eq!(resolution, Resolution::Unresolved);
    }

    proptest! {
        #[test]
        fn list_never_exceeds_two(
            links in proptest::collection::vec(proptest::option::of(0u128..64), 0..64),
            current in proptest::option::of(0u128..80),
        ) {
            let map: VersionPrecedenceMap = links
                .iter()
                .enumerate()
                .map(|(i, prev)| (id(i as u128), prev.map(id)))
                .collect();

            let (versions, _) = configuration_versions(current.map(id), &map);

            prop_assert!(versions.len() <= 2);
            if let Some(current) = current {
                prop_assert_eq!(versions[0], id(current).as_uuid());
            } else {
                prop_assert!(versions.is_empty());
            }
        }
    }
}
