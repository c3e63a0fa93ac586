//! Error types for the DOM model

use crate::ids::{DomInstanceId, FieldDescriptorId};
use crate::value::FieldType;

/// Model-level errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Field descriptor builder is missing a required property
    #[error("field descriptor is missing {0}")]
    MissingProperty(&'static str),

    /// Referenced definitions given for a field that cannot hold references
    #[error("field {field} of type {field_type} cannot reference DOM definitions")]
    NotAReferenceType {
        field: FieldDescriptorId,
        field_type: FieldType,
    },

    /// Stored value has a different type than requested
    #[error("field {field} on instance {instance} holds a {actual} value, expected {expected}")]
    TypeMismatch {
        instance: DomInstanceId,
        field: FieldDescriptorId,
        expected: FieldType,
        actual: FieldType,
    },
}
