//! Fixtures for service management migration tests
//!
//! Seeds an [`InMemoryStore`] with the schema as it looks before the
//! migration: configuration versions still carry `Previous Version`, services
//! only know their current configuration.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use svcmgmt_migration::catalog::{behaviors, definitions, sections, MODULE_ID};
use svcmgmt_migration::MigrationTargets;
use svcmgmt_model::{
    DomBehaviorDefinition, DomDefinition, DomInstance, DomInstanceId, DomStatus, FieldDescriptor,
    FieldDescriptorBuilder, FieldDescriptorId, FieldType, FieldValue, ModuleId, SectionDefinition,
    StatusFieldDescriptorLink, StatusSectionDefinitionLink,
};
use svcmgmt_store::InMemoryStore;
use uuid::Uuid;

/// Name field of a configuration version
pub const CONFIGURATION_NAME: FieldDescriptorId =
    FieldDescriptorId::from_u128(0xe7a9_2b14_6c3d_4f08_b1e2_9d7c_4a5f_6b2f);
/// Name field of a service
pub const SERVICE_NAME: FieldDescriptorId =
    FieldDescriptorId::from_u128(0x8c41_6a2d_0e7f_4b93_a5c8_1f2d_3b4e_5a1f);

/// Statuses of the seeded service behavior
pub const SERVICE_STATUSES: [&str; 2] = ["new", "active"];

/// Fixed migration timestamp
pub fn migrated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Timestamp used as the start of a resumed run
pub fn earlier() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 30, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Configuration version id `n`
pub fn version_id(n: u128) -> DomInstanceId {
    DomInstanceId::from_u128(0x1000_0000 + n)
}

/// Service id `n`
pub fn service_id(n: u128) -> DomInstanceId {
    DomInstanceId::from_u128(0x2000_0000 + n)
}

fn field(id: FieldDescriptorId, name: &str, field_type: FieldType) -> FieldDescriptor {
    FieldDescriptorBuilder::new()
        .with_id(id)
        .with_name(name)
        .with_type(field_type)
        .with_module(ModuleId::new(MODULE_ID))
        .build()
        .expect("fixture descriptor")
}

/// Configuration version section before the migration
pub fn configuration_info_section() -> SectionDefinition {
    use sections::service_configuration_info as info;

    let mut section = SectionDefinition::new(info::ID, "Service Configuration");
    section.add_or_replace_field_descriptor(field(CONFIGURATION_NAME, "Name", FieldType::Text));
    section.add_or_replace_field_descriptor(field(
        info::PREVIOUS_VERSION,
        "Previous Version",
        FieldType::Guid,
    ));
    section
}

/// Service Info section before the migration
pub fn service_info_section() -> SectionDefinition {
    use sections::service_info as info;

    let mut section = SectionDefinition::new(info::ID, "Service Info");
    section.add_or_replace_field_descriptor(field(SERVICE_NAME, "Name", FieldType::Text));
    section.add_or_replace_field_descriptor(field(
        info::SERVICE_CONFIGURATION,
        "Service Configuration",
        FieldType::Guid,
    ));
    section
}

/// Service behavior with one Service Info link per status
pub fn service_behavior() -> DomBehaviorDefinition {
    let mut behavior = DomBehaviorDefinition::new(behaviors::SERVICE_BEHAVIOR, "Service Behavior");
    for status in SERVICE_STATUSES {
        behavior.statuses.push(DomStatus::new(status, status));
        let mut link = StatusSectionDefinitionLink::new(status, sections::service_info::ID);
        link.field_descriptor_links
            .push(StatusFieldDescriptorLink::editable(SERVICE_NAME));
        behavior.status_section_definition_links.push(link);
    }
    behavior
}

/// Seed all definitions the migration touches
pub fn seed_schema(store: &InMemoryStore) {
    let module = ModuleId::new(MODULE_ID);

    store.insert_section_definition(configuration_info_section());
    store.insert_section_definition(service_info_section());
    store.insert_dom_definition(
        DomDefinition::new(
            definitions::SERVICE_CONFIGURATION_VERSION,
            "Service Configuration",
            module.clone(),
        )
        .with_section(sections::service_configuration_info::ID),
    );
    store.insert_dom_definition(
        DomDefinition::new(definitions::SERVICES, "Services", module)
            .with_section(sections::service_info::ID)
            .with_behavior(behaviors::SERVICE_BEHAVIOR),
    );
    store.insert_behavior_definition(service_behavior());
}

/// Store with the pre-migration schema and no instances
pub fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    seed_schema(&store);
    store
}

/// Configuration version with an optional predecessor
pub fn configuration_version(id: DomInstanceId, previous: Option<DomInstanceId>) -> DomInstance {
    use sections::service_configuration_info as info;

    let mut instance = DomInstance::with_id(id, definitions::SERVICE_CONFIGURATION_VERSION);
    instance.set_field_value(info::ID, CONFIGURATION_NAME, FieldValue::Text(format!("config {id}")));
    if let Some(previous) = previous {
        instance.set_field_value(info::ID, info::PREVIOUS_VERSION, FieldValue::Guid(previous.as_uuid()));
    }
    instance
}

/// Service with an optional current configuration
pub fn service(id: DomInstanceId, configuration: Option<DomInstanceId>) -> DomInstance {
    use sections::service_info as info;

    let mut instance = DomInstance::with_id(id, definitions::SERVICES);
    instance.set_field_value(info::ID, SERVICE_NAME, FieldValue::Text(format!("service {id}")));
    if let Some(configuration) = configuration {
        instance.set_field_value(
            info::ID,
            info::SERVICE_CONFIGURATION,
            FieldValue::Guid(configuration.as_uuid()),
        );
    }
    instance
}

/// Seed a linear chain of `len` configuration versions, oldest first
pub fn seed_chain(store: &InMemoryStore, first: u128, len: u128) -> Vec<DomInstanceId> {
    let mut ids = Vec::new();
    let mut previous = None;
    for n in first..first + len {
        let id = version_id(n);
        store.insert_instance(configuration_version(id, previous));
        ids.push(id);
        previous = Some(id);
    }
    ids
}

/// Three-version chain and five services
///
/// - `C -> B -> A`, `A` is the root
/// - `S1` uses `C`, `S2` uses `B`, `S3` uses `A`, `S4` has no configuration
/// - `S5` uses `X`, which does not exist
#[derive(Debug, Clone, Copy)]
pub struct ChainScenario {
    pub a: DomInstanceId,
    pub b: DomInstanceId,
    pub c: DomInstanceId,
    pub x: DomInstanceId,
    pub s1: DomInstanceId,
    pub s2: DomInstanceId,
    pub s3: DomInstanceId,
    pub s4: DomInstanceId,
    pub s5: DomInstanceId,
}

impl ChainScenario {
    /// Seed schema and instances into `store`
    pub fn seed(store: &InMemoryStore) -> Self {
        seed_schema(store);
        let ids = seed_chain(store, 1, 3);
        let scenario = Self {
            a: ids[0],
            b: ids[1],
            c: ids[2],
            x: version_id(99),
            s1: service_id(1),
            s2: service_id(2),
            s3: service_id(3),
            s4: service_id(4),
            s5: service_id(5),
        };

        store.insert_instance(service(scenario.s1, Some(scenario.c)));
        store.insert_instance(service(scenario.s2, Some(scenario.b)));
        store.insert_instance(service(scenario.s3, Some(scenario.a)));
        store.insert_instance(service(scenario.s4, None));
        store.insert_instance(service(scenario.s5, Some(scenario.x)));
        scenario
    }

    /// New store holding the scenario
    pub fn store() -> (InMemoryStore, Self) {
        let store = InMemoryStore::new();
        let scenario = Self::seed(&store);
        (store, scenario)
    }
}

/// `configurationVersions` of a stored service, `None` if never written
pub fn configuration_versions_of(store: &InMemoryStore, service: DomInstanceId) -> Option<Vec<Uuid>> {
    let targets = MigrationTargets::default();
    let instance = store.instance(service)?;
    instance
        .field_value(targets.service_info_section, targets.configuration_versions_field)
        .and_then(FieldValue::as_guid_list)
        .map(<[Uuid]>::to_vec)
}

/// `createdAt` of a stored configuration version
pub fn created_at_of(store: &InMemoryStore, version: DomInstanceId) -> Option<DateTime<Utc>> {
    let targets = MigrationTargets::default();
    let instance = store.instance(version)?;
    instance
        .field_value(targets.configuration_info_section, targets.created_at_field)
        .and_then(FieldValue::as_date_time)
}

/// Whether a stored configuration version still carries `previousVersion`
pub fn has_previous_version(store: &InMemoryStore, version: DomInstanceId) -> bool {
    let targets = MigrationTargets::default();
    store.instance(version).is_some_and(|i| {
        i.field_value(targets.configuration_info_section, targets.previous_version_field)
            .is_some()
    })
}

/// Uuids of instance ids, in order
pub fn uuids(ids: &[DomInstanceId]) -> Vec<Uuid> {
    ids.iter().map(DomInstanceId::as_uuid).collect()
}
