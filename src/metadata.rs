//! Describe a unit tree for form builders and API documentation.

use serde_json::{Map, Value};

use crate::types::UnitType;
use crate::unit::Unit;

/// Metadata tree of `unit`: type tag, flags, validator constraints and,
/// for containers, the metadata of every child under `fields`.
///
/// Below a read-only container only the type tags are reported.
pub fn determine_metadata(unit: &Unit) -> Value {
    Value::Object(describe(unit, false))
}

fn describe(unit: &Unit, only_type: bool) -> Map<String, Value> {
    let mut metadata = handle_basic(unit, only_type);
    if unit.unit_type().is_container() {
        handle_container(unit, only_type, &mut metadata);
    }
    metadata
}

fn handle_basic(unit: &Unit, only_type: bool) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("type".to_string(), Value::from(unit.unit_type().tag()));
    if only_type {
        return metadata;
    }

    metadata.insert("required".to_string(), Value::Bool(unit.is_required()));
    metadata.insert("read_only".to_string(), Value::Bool(unit.is_read_only()));
    match unit.unit_type() {
        UnitType::Date(format) => {
            metadata.insert("format".to_string(), Value::from(format.format()));
        }
        UnitType::DateTime(format) => {
            metadata.insert("format".to_string(), Value::from(format.format()));
        }
        _ => {}
    }
    if let Some(validator) = unit.validator_ref() {
        metadata.extend(validator.metadata());
    }
    metadata
}

fn handle_container(unit: &Unit, only_type: bool, metadata: &mut Map<String, Value>) {
    let only_type = only_type || unit.is_read_only();
    let fields = unit
        .children()
        .map(|(name, child)| (name.to_string(), Value::Object(describe(child, only_type))))
        .collect();
    metadata.insert("fields".to_string(), Value::Object(fields));
}
