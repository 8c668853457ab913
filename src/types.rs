//! Type descriptors: the closed set of value shapes a unit can describe.

use serde_json::Value;

use crate::container;
use crate::error::{ErrorKind, SerializeError, SyncError, ValidationError};
use crate::scalar::{self, DateFormat, DateTimeFormat};
use crate::unit::{Scope, Unit};
use crate::value::Data;

/// Message keys every unit understands.
pub(crate) const UNIT_MESSAGES: &[(&str, &str)] = &[
    ("required", "This field is required."),
    ("none", "This field may not be null."),
];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Display form of a JSON value inside messages: strings unquoted.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Serialize/deserialize logic for one shape of data.
///
/// Scalars carry their own configuration; containers work through the
/// children of the unit that owns them.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitType {
    Integer,
    Float,
    Boolean,
    String,
    Date(DateFormat),
    DateTime(DateTimeFormat),
    File,
    /// Dictionary keyed by child name.
    Mapping,
    /// Object read and written through attributes.
    ObjectMapping,
    /// Homogeneous list described by a single child.
    Sequence,
}

impl UnitType {
    /// Type tag reported in metadata.
    pub fn tag(&self) -> &'static str {
        match self {
            UnitType::Integer => "integer",
            UnitType::Float => "float",
            UnitType::Boolean => "boolean",
            UnitType::String | UnitType::Date(_) | UnitType::DateTime(_) => "string",
            UnitType::File => "file",
            UnitType::Mapping | UnitType::ObjectMapping => "dictionary",
            UnitType::Sequence => "sequence",
        }
    }

    /// Containers can be synced into domain instances.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            UnitType::Mapping | UnitType::ObjectMapping | UnitType::Sequence
        )
    }

    pub(crate) fn default_error_messages(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            UnitType::Integer => &[("invalid", "Enter a whole number.")],
            UnitType::Float => &[("invalid", "Enter a number.")],
            UnitType::Boolean => &[("invalid", "\"${input}\" is not a valid boolean.")],
            UnitType::String => &[],
            UnitType::Date(_) => &[(
                "invalid",
                "Date has wrong format. Use one of these formats instead: ${format}.",
            )],
            UnitType::DateTime(_) => &[(
                "invalid",
                "Datetime has wrong format. Use one of these formats instead: ${format}.",
            )],
            UnitType::File => &[("invalid", "No file was submitted.")],
            UnitType::Mapping | UnitType::ObjectMapping => &[(
                "invalid",
                "Expected a dictionary of items but got type \"${input_type}\".",
            )],
            UnitType::Sequence => &[
                (
                    "iterable",
                    "Expected a list of items but got type \"${input_type}\".",
                ),
                ("read_only", "Read-only sequences cannot be deserialized."),
            ],
        }
    }

    /// Serialize a domain value. Null passes through for every type.
    pub(crate) fn serialize(
        &self,
        unit: &Unit,
        value: &Data,
        path: &str,
    ) -> Result<Value, SerializeError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            UnitType::Integer => scalar::serialize_integer(value, path),
            UnitType::Float => scalar::serialize_float(value, path),
            UnitType::Boolean => scalar::serialize_boolean(value, path),
            UnitType::String => Ok(scalar::serialize_string(value)),
            UnitType::Date(format) => format.serialize(value, path),
            UnitType::DateTime(format) => format.serialize(value, path),
            UnitType::File => scalar::serialize_file(value, path),
            UnitType::Mapping => container::serialize_mapping(unit, value, path),
            UnitType::ObjectMapping => container::serialize_object(unit, value, path),
            UnitType::Sequence => container::serialize_sequence(unit, value, path),
        }
    }

    /// Deserialize raw input. Null passes through for every type.
    pub(crate) fn deserialize(
        &self,
        unit: &Unit,
        raw: &Value,
        scope: &Scope<'_>,
    ) -> Result<Data, ValidationError> {
        if raw.is_null() {
            return Ok(Data::Null);
        }
        let parsed = match self {
            UnitType::Integer => scalar::deserialize_integer(raw),
            UnitType::Float => scalar::deserialize_float(raw),
            UnitType::Boolean => scalar::deserialize_boolean(raw),
            UnitType::String => Some(scalar::deserialize_string(raw)),
            UnitType::Date(format) => {
                return format.deserialize(raw).ok_or_else(|| {
                    unit.error(
                        ErrorKind::Format,
                        "invalid",
                        scope,
                        &[("format", format.expected())],
                    )
                });
            }
            UnitType::DateTime(format) => {
                return format.deserialize(raw).ok_or_else(|| {
                    unit.error(
                        ErrorKind::Format,
                        "invalid",
                        scope,
                        &[("format", format.expected())],
                    )
                });
            }
            UnitType::File => scalar::deserialize_file(raw),
            UnitType::Mapping | UnitType::ObjectMapping => {
                return container::deserialize_mapping(unit, raw, scope);
            }
            UnitType::Sequence => return container::deserialize_sequence(unit, raw, scope),
        };
        parsed.ok_or_else(|| {
            unit.error(
                ErrorKind::TypeMismatch,
                "invalid",
                scope,
                &[("input", display_value(raw))],
            )
        })
    }

    /// Fresh instance for a container when no target exists yet.
    pub(crate) fn restore_default(&self, path: &str) -> Result<Data, SyncError> {
        match self {
            UnitType::Mapping => Ok(Data::Map(Default::default())),
            UnitType::Sequence => Ok(Data::List(Vec::new())),
            UnitType::ObjectMapping => Err(SyncError::RestoreNotImplemented {
                path: path.to_string(),
            }),
            other => Err(SyncError::NotSyncable {
                path: path.to_string(),
                kind: other.tag(),
            }),
        }
    }

    /// Whether an existing value can receive a sync of this container.
    pub(crate) fn accepts_target(&self, target: &Data) -> bool {
        matches!(
            (self, target),
            (UnitType::Mapping, Data::Map(_))
                | (UnitType::ObjectMapping, Data::Object(_))
                | (UnitType::Sequence, Data::List(_))
        )
    }
}
