//! Container type descriptors: mappings, object mappings and sequences.
//!
//! Containers never stop at the first bad child. Every child failure is
//! collected under its field name (or element index) and reported once.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{ErrorDetail, ErrorKind, SerializeError, SyncError, ValidationError};
use crate::types::{json_type_name, UnitType};
use crate::unit::{child_path, Outcome, Scope, Unit};
use crate::value::Data;

fn invalid_value(path: &str, expected: &'static str, value: &Data) -> SerializeError {
    SerializeError::InvalidValue {
        path: path.to_string(),
        expected,
        actual: value.type_name().to_string(),
    }
}

fn mismatch(path: &str, expected: &'static str, actual: &Data) -> SyncError {
    SyncError::TargetMismatch {
        path: path.to_string(),
        expected,
        actual: actual.type_name(),
    }
}

/// Attribute name an object-mapping child reads and writes.
fn attribute_name<'a>(slot: &'a str, child: &'a Unit) -> &'a str {
    child.name().unwrap_or(slot)
}

pub(crate) fn serialize_mapping(
    unit: &Unit,
    value: &Data,
    path: &str,
) -> Result<Value, SerializeError> {
    let Data::Map(map) = value else {
        return Err(invalid_value(path, "a mapping", value));
    };
    let mut result = Map::new();
    for (name, child) in unit.children() {
        let subvalue = map.get(name).unwrap_or(&Data::Null);
        let serialized = child.serialize_at(subvalue, &child_path(path, name))?;
        if child.allow_to_serialize(&serialized) {
            result.insert(name.to_string(), serialized);
        }
    }
    Ok(Value::Object(result))
}

pub(crate) fn serialize_object(
    unit: &Unit,
    value: &Data,
    path: &str,
) -> Result<Value, SerializeError> {
    let Data::Object(object) = value else {
        return Err(invalid_value(path, "an object", value));
    };
    let mut result = Map::new();
    for (name, child) in unit.children() {
        let subvalue = object.getattr(attribute_name(name, child));
        let serialized = child.serialize_at(subvalue, &child_path(path, name))?;
        if child.allow_to_serialize(&serialized) {
            result.insert(name.to_string(), serialized);
        }
    }
    Ok(Value::Object(result))
}

pub(crate) fn serialize_sequence(
    unit: &Unit,
    value: &Data,
    path: &str,
) -> Result<Value, SerializeError> {
    let Data::List(items) = value else {
        return Err(invalid_value(path, "a list", value));
    };
    let Some(child) = unit.item() else {
        return Ok(Value::Array(Vec::new()));
    };
    let mut result = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let serialized = child.serialize_at(item, &child_path(path, index))?;
        if child.allow_to_serialize(&serialized) {
            result.push(serialized);
        }
    }
    Ok(Value::Array(result))
}

/// Deserialize a dictionary for both mapping kinds.
///
/// Read-only children are skipped entirely; they are never reported as
/// missing.
pub(crate) fn deserialize_mapping(
    unit: &Unit,
    raw: &Value,
    scope: &Scope<'_>,
) -> Result<Data, ValidationError> {
    let Value::Object(input) = raw else {
        return Err(unit.error(
            ErrorKind::TypeMismatch,
            "invalid",
            scope,
            &[("input_type", json_type_name(raw).to_string())],
        ));
    };

    let mut result = BTreeMap::new();
    let mut errors = BTreeMap::new();
    for (name, child) in unit.children() {
        if child.is_read_only() {
            continue;
        }
        match child.run_validation(input.get(name), &scope.child(name)) {
            Outcome::Present(value) => {
                result.insert(name.to_string(), value);
            }
            Outcome::Absent => {}
            Outcome::Invalid(err) => {
                errors.insert(name.to_string(), err.detail);
            }
        }
    }

    if !errors.is_empty() {
        trace!(path = scope.path(), count = errors.len(), "mapping has invalid fields");
        return Err(ValidationError::nested(ErrorDetail::Fields(errors)));
    }
    Ok(Data::Map(result))
}

pub(crate) fn deserialize_sequence(
    unit: &Unit,
    raw: &Value,
    scope: &Scope<'_>,
) -> Result<Data, ValidationError> {
    if unit.is_read_only() {
        return Err(unit.error(ErrorKind::ReadOnlyWrite, "read_only", scope, &[]));
    }
    let Value::Array(items) = raw else {
        return Err(unit.error(
            ErrorKind::NotIterable,
            "iterable",
            scope,
            &[("input_type", json_type_name(raw).to_string())],
        ));
    };
    let Some(child) = unit.item() else {
        return Ok(Data::List(Vec::new()));
    };

    let mut result = Vec::with_capacity(items.len());
    let mut errors = BTreeMap::new();
    for (index, item) in items.iter().enumerate() {
        match child.run_validation(Some(item), &scope.child(index)) {
            Outcome::Present(value) => result.push(value),
            Outcome::Absent => {}
            Outcome::Invalid(err) => {
                errors.insert(index, err.detail);
            }
        }
    }

    if !errors.is_empty() {
        trace!(path = scope.path(), count = errors.len(), "sequence has invalid items");
        return Err(ValidationError::nested(ErrorDetail::Items(errors)));
    }
    Ok(Data::List(result))
}

/// Sync validated mapping data into a dictionary or object.
///
/// Container children are synced recursively into the existing sub-instance
/// (or a restored one); leaf values are assigned directly.
pub(crate) fn sync_mapping(
    unit: &Unit,
    target: &mut Data,
    value: &Data,
    path: &str,
) -> Result<(), SyncError> {
    let Data::Map(values) = value else {
        return Err(mismatch(path, "validated mapping data", value));
    };

    match (unit.unit_type(), target) {
        (UnitType::Mapping, Data::Map(map)) => {
            for (key, subvalue) in values {
                let assigned = match unit.child(key) {
                    Some(child) if child.unit_type().is_container() && !subvalue.is_null() => {
                        let child_path = child_path(path, key);
                        let mut sub = child.sync_target(map.get(key).cloned(), subvalue, &child_path)?;
                        child.sync_into(&mut sub, subvalue, &child_path)?;
                        sub
                    }
                    _ => subvalue.clone(),
                };
                map.insert(key.clone(), assigned);
            }
            Ok(())
        }
        (UnitType::ObjectMapping, Data::Object(object)) => {
            for (key, subvalue) in values {
                let child = unit.child(key);
                let attribute = child.and_then(Unit::name).unwrap_or(key).to_string();
                let assigned = match child {
                    Some(child) if child.unit_type().is_container() && !subvalue.is_null() => {
                        let child_path = child_path(path, key);
                        let existing = object
                            .hasattr(&attribute)
                            .then(|| object.getattr(&attribute).clone());
                        let mut sub = child.sync_target(existing, subvalue, &child_path)?;
                        child.sync_into(&mut sub, subvalue, &child_path)?;
                        sub
                    }
                    _ => subvalue.clone(),
                };
                object.setattr(attribute, assigned);
            }
            Ok(())
        }
        (UnitType::ObjectMapping, other) => Err(mismatch(path, "an object", other)),
        (_, other) => Err(mismatch(path, "a mapping", other)),
    }
}

/// Sync validated list data by appending each element to the target list.
pub(crate) fn sync_sequence(
    unit: &Unit,
    target: &mut Data,
    value: &Data,
    path: &str,
) -> Result<(), SyncError> {
    let Data::List(values) = value else {
        return Err(mismatch(path, "validated list data", value));
    };
    let Data::List(items) = target else {
        return Err(mismatch(path, "a list", target));
    };
    let Some(child) = unit.item() else {
        return Ok(());
    };

    for (index, subvalue) in values.iter().enumerate() {
        if child.unit_type().is_container() && !subvalue.is_null() {
            let child_path = child_path(path, index);
            let mut sub = child.restore(subvalue, &child_path)?;
            child.sync_into(&mut sub, subvalue, &child_path)?;
            items.push(sub);
        } else {
            items.push(subvalue.clone());
        }
    }
    Ok(())
}
