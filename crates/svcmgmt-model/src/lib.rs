//! Service Management DOM model
//!
//! Typed records and schema metadata of the object-model store:
//! - Identifiers for instances, definitions, sections and fields
//! - Field values and the sections that carry them on an instance
//! - Section, DOM and behavior definitions describing a record shape
//!
//! # Example
//!
//! ```rust
//! use svcmgmt_model::{FieldDescriptorBuilder, FieldDescriptorId, FieldType, ModuleId};
//!
//! let descriptor = FieldDescriptorBuilder::new()
//!     .with_id(FieldDescriptorId::new())
//!     .with_name("Created At")
//!     .with_is_optional(true)
//!     .with_type(FieldType::DateTime)
//!     .with_module(ModuleId::new("(slc)servicemanagement"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(descriptor.name, "Created At");
//! ```

pub mod behavior;
pub mod definition;
pub mod error;
pub mod ids;
pub mod instance;
pub mod value;

pub use behavior::{DomBehaviorDefinition, DomStatus, StatusFieldDescriptorLink, StatusSectionDefinitionLink};
pub use definition::{DomDefinition, FieldDescriptor, FieldDescriptorBuilder, FieldEdit, SectionDefinition};
pub use error::ModelError;
pub use ids::{
    DomBehaviorDefinitionId, DomDefinitionId, DomInstanceId, FieldDescriptorId, ModuleId,
    SectionDefinitionId,
};
pub use instance::{DomInstance, Section};
pub use value::{FieldType, FieldValue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
