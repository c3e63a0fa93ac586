//! Field values stored on DOM instances

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declared type of a field descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Single reference or identifier
    Guid,
    /// Ordered list of references
    GuidList,
    /// UTC timestamp
    DateTime,
    /// Free text
    Text,
    /// Boolean flag
    Bool,
    /// Signed integer
    Integer,
}

impl FieldType {
    /// Whether fields of this type may reference DOM definitions
    #[inline]
    #[must_use]
    pub fn is_reference(self) -> bool {
        matches!(self, Self::Guid | Self::GuidList)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Guid => "guid",
            Self::GuidList => "guid list",
            Self::DateTime => "date time",
            Self::Text => "text",
            Self::Bool => "bool",
            Self::Integer => "integer",
        };
        f.write_str(name)
    }
}

/// Value of a single field on an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Single reference or identifier
    Guid(Uuid),
    /// Ordered list of references
    GuidList(Vec<Uuid>),
    /// UTC timestamp
    DateTime(DateTime<Utc>),
    /// Free text
    Text(String),
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Integer(i64),
}

impl FieldValue {
    /// Type of this value
    #[inline]
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Guid(_) => FieldType::Guid,
            Self::GuidList(_) => FieldType::GuidList,
            Self::DateTime(_) => FieldType::DateTime,
            Self::Text(_) => FieldType::Text,
            Self::Bool(_) => FieldType::Bool,
            Self::Integer(_) => FieldType::Integer,
        }
    }

    /// Guid payload, if this is a single reference
    #[inline]
    #[must_use]
    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            Self::Guid(id) => Some(*id),
            _ => None,
        }
    }

    /// Guid list payload, if this is a list of references
    #[inline]
    #[must_use]
    pub fn as_guid_list(&self) -> Option<&[Uuid]> {
        match self {
            Self::GuidList(ids) => Some(ids),
            _ => None,
        }
    }

    /// Timestamp payload
    #[inline]
    #[must_use]
    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(at) => Some(*at),
            _ => None,
        }
    }
}
