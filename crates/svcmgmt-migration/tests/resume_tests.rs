use pretty_assertions::assert_eq;
use svcmgmt_migration::catalog::{behaviors, sections};
use svcmgmt_migration::{
    BehaviorLinkMode, Checkpoint, FileJournal, FixedClock, MemoryJournal, MigrationConfig,
    MigrationError, MigrationRunner, MigrationStep, Precedence, StepJournal,
};
use svcmgmt_store::{DefinitionStore, InMemoryStore};
use svcmgmt_test_utils::*;

fn later() -> chrono::DateTime<chrono::Utc> {
    migrated_at() + chrono::Duration::hours(3)
}

fn interrupted_walk(journal: &dyn StepJournal) -> (InMemoryStore, Vec<svcmgmt_model::DomInstanceId>) {
    let store = seeded_store();
    let versions = seed_chain(&store, 1, 250);
    for (n, version) in versions.iter().enumerate().step_by(50) {
        store.insert_instance(service(service_id(n as u128), Some(*version)));
    }
    store.fail_nth_instance_update(150);

    let err = MigrationRunner::new(&store, MigrationConfig::new())
        .with_clock(FixedClock(migrated_at()))
        .with_journal(journal)
        .run()
        .unwrap_err();
    assert_eq!(err.failed_step(), Some(MigrationStep::FlattenVersionChains));

    store.clear_faults();
    (store, versions)
}

/// Journal that loses every save made once the store has committed
/// `crash_after` instance updates, as if the process died there
struct CrashingJournal<'s> {
    saved: MemoryJournal,
    store: &'s InMemoryStore,
    crash_after: usize,
}

impl StepJournal for CrashingJournal<'_> {
    fn load(&self) -> Result<Option<Checkpoint>, MigrationError> {
        self.saved.load()
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), MigrationError> {
        if self.store.stats().instance_updates >= self.crash_after {
            return Ok(());
        }
        self.saved.save(checkpoint)
    }
}

#[test]
fn test_crash_mid_page_keeps_predecessors_of_committed_versions() {
    let store = seeded_store();
    let versions = seed_chain(&store, 1, 250);
    store.fail_nth_instance_update(150);
    let journal = CrashingJournal {
        saved: MemoryJournal::new(),
        store: &store,
        crash_after: 149,
    };

    MigrationRunner::new(&store, MigrationConfig::new())
        .with_clock(FixedClock(migrated_at()))
        .with_journal(&journal)
        .run()
        .unwrap_err();
    store.clear_faults();

    // Step one, then one save per page before its first write
    assert_eq!(journal.saved.save_count(), 3);
    let map = journal.saved.latest().unwrap().precedence.unwrap();
    assert_eq!(map.len(), 200);
    for version in &versions[..149] {
        assert!(map.contains(*version));
    }

    let report = MigrationRunner::new(&store, MigrationConfig::new())
        .with_clock(FixedClock(later()))
        .with_journal(&journal.saved)
        .run()
        .unwrap();

    let lost = versions
        .windows(2)
        .filter(|pair| report.precedence.precedence(pair[1]) != Precedence::Preceded(pair[0]))
        .count();
    assert_eq!(lost, 0);
    assert_eq!(report.precedence.precedence(versions[120]), Precedence::Preceded(versions[119]));
    assert_eq!(report.flatten.unwrap().restored_from_checkpoint, 149);
}

#[test]
fn test_resume_keeps_predecessors_of_flattened_versions() {
    let journal = MemoryJournal::new();
    let (store, versions) = interrupted_walk(&journal);

    let report = MigrationRunner::new(&store, MigrationConfig::new())
        .with_clock(FixedClock(later()))
        .with_journal(&journal)
        .run()
        .unwrap();

    assert_eq!(report.resumed_after, Some(MigrationStep::ConfigurationVersionSchema));
    assert_eq!(report.steps_executed, MigrationStep::ALL[1..].to_vec());
    assert_eq!(report.flatten.as_ref().unwrap().restored_from_checkpoint, 149);

    // Predecessors recorded before the failure survive the lost field
    assert_eq!(report.precedence.len(), 250);
    assert_eq!(report.precedence.precedence(versions[0]), Precedence::Root);
    for pair in versions.windows(2) {
        assert_eq!(report.precedence.precedence(pair[1]), Precedence::Preceded(pair[0]));
    }

    // One timestamp for the whole migration, taken by the first run
    assert_eq!(report.migrated_at, Some(migrated_at()));
    for version in &versions {
        assert_eq!(created_at_of(&store, *version), Some(migrated_at()));
    }

    assert_eq!(
        configuration_versions_of(&store, service_id(100)),
        Some(uuids(&[versions[100], versions[99]]))
    );
}

#[test]
fn test_resume_from_file_journal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("migration.checkpoint.json");
    let (store, versions) = interrupted_walk(&FileJournal::new(&path));
    assert!(path.exists());

    let report = MigrationRunner::new(&store, MigrationConfig::new())
        .with_clock(FixedClock(later()))
        .with_journal(FileJournal::new(&path))
        .run()
        .unwrap();

    assert_eq!(report.resumed_after, Some(MigrationStep::ConfigurationVersionSchema));
    assert_eq!(report.precedence.precedence(versions[10]), Precedence::Preceded(versions[9]));
    assert_eq!(
        configuration_versions_of(&store, service_id(50)),
        Some(uuids(&[versions[50], versions[49]]))
    );

    let saved = FileJournal::new(&path).load().unwrap().unwrap();
    assert!(saved.is_complete());
    assert_eq!(saved.started_at, migrated_at());
}

#[test]
fn test_completed_checkpoint_is_a_no_op() {
    let (store, s) = ChainScenario::store();
    let journal = MemoryJournal::new();
    let run = || {
        MigrationRunner::new(&store, MigrationConfig::new())
            .with_clock(FixedClock(migrated_at()))
            .with_journal(&journal)
            .run()
            .unwrap()
    };

    run();
    let stats = store.stats();
    let second = run();

    assert!(second.steps_executed.is_empty());
    assert_eq!(second.resumed_after, Some(MigrationStep::RewriteServices));
    assert_eq!(second.precedence.precedence(s.c), Precedence::Preceded(s.b));
    assert_eq!(store.stats(), stats);
    assert_eq!(configuration_versions_of(&store, s.s1), Some(uuids(&[s.c, s.b])));
}

#[test]
fn test_resume_without_precedence_map_is_refused() {
    let (store, _) = ChainScenario::store();
    let mut checkpoint = Checkpoint::new(earlier());
    checkpoint.last_completed = Some(MigrationStep::RetirePreviousVersionField);
    let journal = MemoryJournal::with_checkpoint(checkpoint);

    let err = MigrationRunner::new(&store, MigrationConfig::new())
        .with_journal(&journal)
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        MigrationError::MissingPrecedenceMap {
            completed: MigrationStep::RetirePreviousVersionField
        }
    ));
    assert_eq!(store.stats().page_fetches, 0);
}

#[test]
fn test_resume_at_rewrite_uses_saved_map() {
    let (store, s) = ChainScenario::store();
    let journal = MemoryJournal::new();
    store.fail_updates_of(s.s2);

    let err = MigrationRunner::new(&store, MigrationConfig::new())
        .with_clock(FixedClock(migrated_at()))
        .with_journal(&journal)
        .run()
        .unwrap_err();
    assert_eq!(err.failed_step(), Some(MigrationStep::RewriteServices));
    assert_eq!(configuration_versions_of(&store, s.s1), Some(uuids(&[s.c, s.b])));
    assert_eq!(configuration_versions_of(&store, s.s2), None);

    store.clear_faults();
    let report = MigrationRunner::new(&store, MigrationConfig::new())
        .with_journal(&journal)
        .run()
        .unwrap();

    assert_eq!(report.steps_executed, vec![MigrationStep::RewriteServices]);
    assert_eq!(configuration_versions_of(&store, s.s1), Some(uuids(&[s.c, s.b])));
    assert_eq!(configuration_versions_of(&store, s.s2), Some(uuids(&[s.b, s.a])));
}

#[test]
fn test_append_mode_rerun_duplicates_links_and_loses_history() {
    let (store, s) = ChainScenario::store();
    let config = MigrationConfig::new().with_behavior_link_mode(BehaviorLinkMode::Append);
    let field = sections::service_info::CONFIGURATION_VERSIONS;

    let first = MigrationRunner::new(&store, config.clone()).run().unwrap();
    assert!(first.previous_version_field_removed);
    let behavior = store.behavior_definition(behaviors::SERVICE_BEHAVIOR).unwrap().unwrap();
    assert_eq!(behavior.field_link_count(field), SERVICE_STATUSES.len());

    // Without a journal nothing marks the first run as done
    let second = MigrationRunner::new(&store, config).run().unwrap();

    let behavior = store.behavior_definition(behaviors::SERVICE_BEHAVIOR).unwrap().unwrap();
    assert_eq!(behavior.field_link_count(field), 2 * SERVICE_STATUSES.len());
    assert!(!second.previous_version_field_removed);
    assert_eq!(second.precedence.precedence(s.c), Precedence::Root);
    assert_eq!(configuration_versions_of(&store, s.s1), Some(uuids(&[s.c])));
}

#[test]
fn test_upsert_mode_rerun_keeps_links_unique() {
    let (store, _) = ChainScenario::store();
    let field = sections::service_info::CONFIGURATION_VERSIONS;

    MigrationRunner::new(&store, MigrationConfig::new()).run().unwrap();
    let second = MigrationRunner::new(&store, MigrationConfig::new()).run().unwrap();

    let behavior = store.behavior_definition(behaviors::SERVICE_BEHAVIOR).unwrap().unwrap();
    assert_eq!(behavior.field_link_count(field), SERVICE_STATUSES.len());
    assert_eq!(second.service_schema.unwrap().links_added, 0);
}
