use pretty_assertions::assert_eq;
use svcmgmt_migration::catalog::{definitions, sections};
use svcmgmt_migration::{
    FixedClock, MemoryJournal, MigrationConfig, MigrationError, MigrationRunner, MigrationStep,
    Precedence,
};
use svcmgmt_model::DomInstanceId;
use svcmgmt_store::{DefinitionStore, ObjectKind, StoreError};
use svcmgmt_test_utils::*;

fn runner(store: &svcmgmt_store::InMemoryStore) -> MigrationRunner<'_, svcmgmt_store::InMemoryStore> {
    MigrationRunner::new(store, MigrationConfig::new()).with_clock(FixedClock(migrated_at()))
}

#[test]
fn test_chain_scenario_end_to_end() {
    let (store, s) = ChainScenario::store();

    let report = runner(&store).run().unwrap();

    assert_eq!(report.steps_executed, MigrationStep::ALL.to_vec());
    assert_eq!(report.migrated_at, Some(migrated_at()));

    assert_eq!(report.precedence.len(), 3);
    assert_eq!(report.precedence.precedence(s.a), Precedence::Root);
    assert_eq!(report.precedence.precedence(s.b), Precedence::Preceded(s.a));
    assert_eq!(report.precedence.precedence(s.c), Precedence::Preceded(s.b));

    assert_eq!(configuration_versions_of(&store, s.s1), Some(uuids(&[s.c, s.b])));
    assert_eq!(configuration_versions_of(&store, s.s2), Some(uuids(&[s.b, s.a])));
    assert_eq!(configuration_versions_of(&store, s.s3), Some(uuids(&[s.a])));
    assert_eq!(configuration_versions_of(&store, s.s4), Some(Vec::new()));
    assert_eq!(configuration_versions_of(&store, s.s5), Some(uuids(&[s.x])));

    let rewrite = report.rewrite.unwrap();
    assert_eq!(rewrite.services_visited, 5);
    assert_eq!(rewrite.with_history, 2);
    assert_eq!(rewrite.current_only, 1);
    assert_eq!(rewrite.without_configuration, 1);
    assert_eq!(rewrite.unresolved_references, 1);
}

#[test]
fn test_configuration_versions_are_flattened() {
    let (store, s) = ChainScenario::store();

    runner(&store).run().unwrap();

    for version in [s.a, s.b, s.c] {
        assert!(!has_previous_version(&store, version));
        assert_eq!(created_at_of(&store, version), Some(migrated_at()));
    }
}

#[test]
fn test_schema_after_migration() {
    use sections::service_configuration_info as config_info;

    let (store, _) = ChainScenario::store();
    let report = runner(&store).run().unwrap();

    let section = store.section_definition(config_info::ID).unwrap().unwrap();
    assert_eq!(section.name, "Service Configuration Info");
    assert!(section.field_descriptor(config_info::PREVIOUS_VERSION).is_none());
    let created_at = section.field_descriptor(config_info::CREATED_AT).unwrap();
    assert_eq!(created_at.name, "Created At");
    assert!(created_at.is_optional);
    assert!(report.previous_version_field_removed);

    let definition = store
        .dom_definition(definitions::SERVICE_CONFIGURATION_VERSION)
        .unwrap()
        .unwrap();
    assert_eq!(definition.name, "Service Configuration Version");

    let service_info = store.section_definition(sections::service_info::ID).unwrap().unwrap();
    let versions = service_info
        .field_descriptor(sections::service_info::CONFIGURATION_VERSIONS)
        .unwrap();
    assert_eq!(
        versions.referenced_definitions,
        vec![definitions::SERVICE_CONFIGURATION_VERSION]
    );
    assert_eq!(report.service_schema.unwrap().links_added, SERVICE_STATUSES.len());
}

#[test]
fn test_paging_issues_exact_fetch_counts() {
    let store = seeded_store();
    let versions = seed_chain(&store, 1, 250);
    for n in 0..200 {
        store.insert_instance(service(service_id(n), Some(versions[(n as usize) % versions.len()])));
    }

    let report = runner(&store).run().unwrap();

    let stats = store.stats();
    assert_eq!(stats.fetches_for(definitions::SERVICE_CONFIGURATION_VERSION), 3);
    assert_eq!(stats.fetches_for(definitions::SERVICES), 2);
    assert_eq!(report.flatten.unwrap().pages_fetched, 3);
    assert_eq!(report.rewrite.unwrap().pages_fetched, 2);

    for version in &versions {
        assert_eq!(stats.updates_of(*version), 1);
    }
    assert_eq!(stats.instance_updates, 450);
}

#[test]
fn test_empty_collections_fetch_once() {
    let store = seeded_store();

    let report = runner(&store).run().unwrap();

    let stats = store.stats();
    assert_eq!(stats.fetches_for(definitions::SERVICE_CONFIGURATION_VERSION), 1);
    assert_eq!(stats.fetches_for(definitions::SERVICES), 1);
    assert_eq!(stats.instance_updates, 0);
    assert!(report.precedence.is_empty());
}

#[test]
fn test_all_versions_share_one_timestamp() {
    let store = seeded_store();
    let versions = seed_chain(&store, 1, 120);

    // Wall clock: every instance still gets the single run timestamp
    let report = MigrationRunner::new(&store, MigrationConfig::new().with_page_size(7))
        .run()
        .unwrap();

    let stamp = report.migrated_at.unwrap();
    for version in versions {
        assert_eq!(created_at_of(&store, version), Some(stamp));
    }
}

#[test]
fn test_missing_behavior_fails_service_schema_step() {
    let store = svcmgmt_store::InMemoryStore::new();
    store.insert_section_definition(configuration_info_section());
    store.insert_section_definition(service_info_section());
    store.insert_dom_definition(svcmgmt_model::DomDefinition::new(
        definitions::SERVICE_CONFIGURATION_VERSION,
        "Service Configuration",
        svcmgmt_model::ModuleId::new(svcmgmt_migration::catalog::MODULE_ID),
    ));
    let versions = seed_chain(&store, 1, 2);

    let err = runner(&store).run().unwrap_err();

    assert_eq!(err.failed_step(), Some(MigrationStep::ServiceSchema));
    assert!(err.is_missing_definition());
    assert!(matches!(
        err.root_cause(),
        MigrationError::MissingDefinition {
            kind: ObjectKind::BehaviorDefinition,
            ..
        }
    ));
    assert!(err.to_string().starts_with("step 'service-schema' failed"));

    // Earlier steps stay committed
    assert!(!has_previous_version(&store, versions[1]));
    // Service Info was not touched
    let service_info = store.section_definition(sections::service_info::ID).unwrap().unwrap();
    assert!(service_info
        .field_descriptor(sections::service_info::CONFIGURATION_VERSIONS)
        .is_none());
}

#[test]
fn test_missing_configuration_section_fails_first_step() {
    let (store, s) = ChainScenario::store();
    let store = {
        let mut snapshot = store.snapshot();
        snapshot
            .section_definitions
            .retain(|d| d.id != sections::service_configuration_info::ID);
        svcmgmt_store::InMemoryStore::from_snapshot(snapshot)
    };

    let err = runner(&store).run().unwrap_err();

    assert_eq!(err.failed_step(), Some(MigrationStep::ConfigurationVersionSchema));
    assert!(err.is_missing_definition());
    assert!(has_previous_version(&store, s.c));
    assert_eq!(store.stats().definition_updates, 0);
    assert_eq!(store.stats().page_fetches, 0);
}

#[test]
fn test_store_failure_stops_walk() {
    let store = seeded_store();
    let versions = seed_chain(&store, 1, 250);
    store.fail_nth_instance_update(150);
    let journal = MemoryJournal::new();

    let err = runner(&store).with_journal(&journal).run().unwrap_err();

    assert_eq!(err.failed_step(), Some(MigrationStep::FlattenVersionChains));
    assert!(err.is_store_failure());
    assert!(matches!(
        err.root_cause(),
        MigrationError::Store(StoreError::Injected(_))
    ));

    // Pages after the failing one were never fetched
    assert_eq!(store.stats().fetches_for(definitions::SERVICE_CONFIGURATION_VERSION), 2);
    assert_eq!(store.stats().instance_updates, 149);
    for version in &versions[..149] {
        assert!(!has_previous_version(&store, *version));
    }
    for version in &versions[149..] {
        assert!(has_previous_version(&store, *version));
        assert_eq!(created_at_of(&store, *version), None);
    }

    let checkpoint = journal.latest().unwrap();
    assert_eq!(checkpoint.last_completed, Some(MigrationStep::ConfigurationVersionSchema));
    assert_eq!(checkpoint.migrated_at, Some(migrated_at()));
    let map = checkpoint.precedence.unwrap();
    for version in &versions[..149] {
        assert!(map.contains(*version));
    }
}

#[test]
fn test_journal_saved_per_page_and_step() {
    let store = seeded_store();
    seed_chain(&store, 1, 250);
    let journal = MemoryJournal::new();

    runner(&store).with_journal(&journal).run().unwrap();

    // Three flatten pages plus five completed steps
    assert_eq!(journal.save_count(), 8);
    let checkpoint = journal.latest().unwrap();
    assert!(checkpoint.is_complete());
    assert_eq!(checkpoint.precedence.unwrap().len(), 250);
}

#[test]
fn test_invalid_config_is_rejected_before_any_step() {
    let (store, _) = ChainScenario::store();

    let err = MigrationRunner::new(&store, MigrationConfig::new().with_page_size(0))
        .run()
        .unwrap_err();

    assert!(matches!(err, MigrationError::Config(_)));
    assert_eq!(store.stats().definition_updates, 0);
}

#[test]
fn test_unknown_reference_keeps_current_only() {
    let store = seeded_store();
    let ghost = DomInstanceId::new();
    store.insert_instance(service(service_id(1), Some(ghost)));

    let report = runner(&store).run().unwrap();

    assert_eq!(configuration_versions_of(&store, service_id(1)), Some(uuids(&[ghost])));
    assert_eq!(report.rewrite.unwrap().unresolved_references, 1);
}
