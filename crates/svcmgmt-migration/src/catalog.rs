//! Well-known identifiers of the service management module
//!
//! [`MigrationTargets`] collects the definitions, sections and fields the
//! migration touches. Its defaults are the identifiers shipped with the
//! module; a configuration file may point at different ones.

use serde::{Deserialize, Serialize};
use svcmgmt_model::{
    DomBehaviorDefinitionId, DomDefinitionId, FieldDescriptorId, ModuleId, SectionDefinitionId,
};

/// Module owning all service management definitions
pub const MODULE_ID: &str = "(slc)servicemanagement";

/// DOM definitions
pub mod definitions {
    use super::DomDefinitionId;

    /// Services
    pub const SERVICES: DomDefinitionId =
        DomDefinitionId::from_u128(0x3b2c_0f47_8a9e_4a55_9a51_7d7c_2e4c_1a01);
    /// Service configuration versions
    pub const SERVICE_CONFIGURATION_VERSION: DomDefinitionId =
        DomDefinitionId::from_u128(0x5d0e_91c3_2f6b_4c1e_8d2a_0b9f_6e3a_7c02);
}

/// Section definitions and their fields
pub mod sections {
    /// Service Info section of a service
    pub mod service_info {
        use svcmgmt_model::{FieldDescriptorId, SectionDefinitionId};

        /// Section id
        pub const ID: SectionDefinitionId =
            SectionDefinitionId::from_u128(0x8c41_6a2d_0e7f_4b93_a5c8_1f2d_3b4e_5a10);
        /// Current configuration version
        pub const SERVICE_CONFIGURATION: FieldDescriptorId =
            FieldDescriptorId::from_u128(0x8c41_6a2d_0e7f_4b93_a5c8_1f2d_3b4e_5a11);
        /// Current and previous configuration versions
        pub const CONFIGURATION_VERSIONS: FieldDescriptorId =
            FieldDescriptorId::from_u128(0x8c41_6a2d_0e7f_4b93_a5c8_1f2d_3b4e_5a12);
    }

    /// Service Configuration Info section of a configuration version
    pub mod service_configuration_info {
        use svcmgmt_model::{FieldDescriptorId, SectionDefinitionId};

        /// Section id
        pub const ID: SectionDefinitionId =
            SectionDefinitionId::from_u128(0xe7a9_2b14_6c3d_4f08_b1e2_9d7c_4a5f_6b20);
        /// Link to the preceding configuration version
        pub const PREVIOUS_VERSION: FieldDescriptorId =
            FieldDescriptorId::from_u128(0xe7a9_2b14_6c3d_4f08_b1e2_9d7c_4a5f_6b21);
        /// Migration timestamp
        pub const CREATED_AT: FieldDescriptorId =
            FieldDescriptorId::from_u128(0xe7a9_2b14_6c3d_4f08_b1e2_9d7c_4a5f_6b22);
    }
}

/// Behavior definitions
pub mod behaviors {
    use super::DomBehaviorDefinitionId;

    /// Service lifecycle behavior
    pub const SERVICE_BEHAVIOR: DomBehaviorDefinitionId =
        DomBehaviorDefinitionId::from_u128(0x1f6d_4e8b_9a2c_4d57_8e3f_6a1b_2c9d_0e30);
}

/// Identifiers the migration reads and edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationTargets {
    /// Owning module of new field descriptors
    pub module: ModuleId,
    /// Services DOM definition
    pub service_definition: DomDefinitionId,
    /// Service configuration version DOM definition
    pub configuration_version_definition: DomDefinitionId,
    /// Service Info section
    pub service_info_section: SectionDefinitionId,
    /// Current configuration field of a service
    pub service_configuration_field: FieldDescriptorId,
    /// Configuration versions list field of a service
    pub configuration_versions_field: FieldDescriptorId,
    /// Service Configuration Info section
    pub configuration_info_section: SectionDefinitionId,
    /// Previous version field of a configuration version
    pub previous_version_field: FieldDescriptorId,
    /// Created at field of a configuration version
    pub created_at_field: FieldDescriptorId,
    /// Service behavior
    pub service_behavior: DomBehaviorDefinitionId,
}

impl Default for MigrationTargets {
    fn default() -> Self {
        use sections::{service_configuration_info as config_info, service_info};

        Self {
            module: ModuleId::new(MODULE_ID),
            service_definition: definitions::SERVICES,
            configuration_version_definition: definitions::SERVICE_CONFIGURATION_VERSION,
            service_info_section: service_info::ID,
            service_configuration_field: service_info::SERVICE_CONFIGURATION,
            configuration_versions_field: service_info::CONFIGURATION_VERSIONS,
            configuration_info_section: config_info::ID,
            previous_version_field: config_info::PREVIOUS_VERSION,
            created_at_field: config_info::CREATED_AT,
            service_behavior: behaviors::SERVICE_BEHAVIOR,
        }
    }
}
