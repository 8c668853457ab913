//! Declaration loading: build unit trees from JSON documents.
//!
//! A declaration describes one unit. Containers nest their children under
//! `fields` (mappings) or `item` (sequences):
//!
//! ```json
//! {
//!   "type": "mapping",
//!   "fields": {
//!     "name": {"type": "string", "preparers": ["strip"]},
//!     "age": {"type": "integer", "validators": [{"type": "range", "min": 0}]},
//!     "tags": {"type": "sequence", "required": false, "item": {"type": "string"}}
//!   }
//! }
//! ```
//!
//! Every document is checked against an embedded meta-schema before any
//! unit is built, so structural mistakes are reported all at once.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::error::{DeclarationIssue, LoadError, SchemaError};
use crate::preparers::{blank_as_null, lowercase, preparer_chain, strip};
use crate::scalar::{DateFormat, DateTimeFormat};
use crate::schema::Schema;
use crate::unit::Unit;
use crate::validator::{Choice, Choices, Email, Length, Range, Regex, ValidatedChain, Validator};
use crate::value::Data;

/// Load and build a declaration from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidJson` if it isn't valid JSON, or
/// `LoadError::InvalidDeclaration` if it doesn't describe a unit.
pub fn load_declaration(path: &Path) -> Result<Unit, LoadError> {
    debug!(?path, "loading declaration");
    build_declaration(&load_json(path)?)
}

/// Read a JSON document from a file.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load and build a declaration from a JSON string.
pub fn load_declaration_str(content: &str) -> Result<Unit, LoadError> {
    let declaration: Value =
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    build_declaration(&declaration)
}

/// Check `declaration` against the meta-schema and build its unit tree.
pub fn build_declaration(declaration: &Value) -> Result<Unit, LoadError> {
    check_declaration(declaration)?;
    Ok(build_unit(declaration)?)
}

/// Report every structural problem in a declaration document.
pub fn check_declaration(declaration: &Value) -> Result<(), LoadError> {
    let validator = jsonschema::validator_for(&meta_schema()).map_err(|e| {
        LoadError::InvalidDeclaration {
            issues: vec![DeclarationIssue {
                path: String::new(),
                message: format!("meta-schema: {e}"),
            }],
        }
    })?;

    let issues: Vec<DeclarationIssue> = validator
        .iter_errors(declaration)
        .map(|e| DeclarationIssue {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        debug!(count = issues.len(), "declaration rejected");
        Err(LoadError::InvalidDeclaration { issues })
    }
}

fn meta_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$ref": "#/$defs/unit",
        "$defs": {
            "unit": {
                "type": "object",
                "required": ["type"],
                "additionalProperties": false,
                "properties": {
                    "type": {
                        "enum": [
                            "integer", "float", "boolean", "string", "date",
                            "datetime", "file", "mapping", "sequence"
                        ]
                    },
                    "name": {"type": "string"},
                    "required": {"type": "boolean"},
                    "read_only": {"type": "boolean"},
                    "allow_none": {"type": "boolean"},
                    "omit_if_none": {"type": "boolean"},
                    "omit_if_empty": {"type": "boolean"},
                    "default": true,
                    "error_messages": {
                        "type": "object",
                        "additionalProperties": {"type": "string"}
                    },
                    "format": {"type": "string", "minLength": 1},
                    "input_formats": {
                        "type": "array",
                        "items": {"type": "string", "minLength": 1}
                    },
                    "preparers": {
                        "type": "array",
                        "items": {"enum": ["strip", "lowercase", "blank_as_null"]}
                    },
                    "validators": {
                        "type": "array",
                        "items": {"$ref": "#/$defs/validator"}
                    },
                    "fields": {
                        "type": "object",
                        "additionalProperties": {"$ref": "#/$defs/unit"}
                    },
                    "item": {"$ref": "#/$defs/unit"}
                }
            },
            "validator": {
                "type": "object",
                "required": ["type"],
                "additionalProperties": false,
                "properties": {
                    "type": {"enum": ["range", "length", "choices", "regex", "email"]},
                    "min": {"type": "number"},
                    "max": {"type": "number"},
                    "choices": {
                        "type": "array",
                        "items": {
                            "anyOf": [
                                {
                                    "type": "object",
                                    "required": ["value"],
                                    "additionalProperties": false,
                                    "properties": {"value": true, "label": true}
                                },
                                {"not": {"type": "object"}}
                            ]
                        }
                    },
                    "pattern": {"type": "string"},
                    "message": {"type": "string"}
                },
                "allOf": [
                    {
                        "if": {"properties": {"type": {"const": "length"}}},
                        "then": {
                            "properties": {
                                "min": {"type": "integer", "minimum": 0},
                                "max": {"type": "integer", "minimum": 0}
                            }
                        }
                    },
                    {
                        "if": {"properties": {"type": {"const": "choices"}}},
                        "then": {"required": ["choices"]}
                    },
                    {
                        "if": {"properties": {"type": {"const": "regex"}}},
                        "then": {"required": ["pattern"]}
                    }
                ]
            }
        }
    })
}

fn build_unit(declaration: &Value) -> Result<Unit, SchemaError> {
    let type_name = declaration["type"].as_str().unwrap_or_default();
    let mut unit = match type_name {
        "integer" => Unit::integer(),
        "float" => Unit::float(),
        "boolean" => Unit::boolean(),
        "string" => Unit::string(),
        "file" => Unit::file(),
        "date" => {
            let mut format = match declaration["format"].as_str() {
                Some(format) => DateFormat::new(format),
                None => DateFormat::default(),
            };
            if let Some(inputs) = string_list(&declaration["input_formats"]) {
                format = format.input_formats(inputs);
            }
            Unit::date(format)
        }
        "datetime" => {
            let mut format = match declaration["format"].as_str() {
                Some(format) => DateTimeFormat::new(format),
                None => DateTimeFormat::default(),
            };
            if let Some(inputs) = string_list(&declaration["input_formats"]) {
                format = format.input_formats(inputs);
            }
            Unit::datetime(format)
        }
        "mapping" => {
            let mut schema = Schema::mapping();
            if let Some(fields) = declaration["fields"].as_object() {
                for (name, field) in fields {
                    schema = schema.unit(name.as_str(), build_unit(field)?);
                }
            }
            schema.build()?
        }
        "sequence" => {
            let mut schema = Schema::sequence();
            if let Some(item) = declaration.get("item") {
                schema = schema.unit("item", build_unit(item)?);
            }
            schema.build()?
        }
        other => return Err(SchemaError::UnknownUnitType(other.to_string())),
    };

    if let Some(name) = declaration["name"].as_str() {
        unit = unit.named(name);
    }
    if let Some(required) = declaration["required"].as_bool() {
        unit = unit.required(required);
    }
    if let Some(read_only) = declaration["read_only"].as_bool() {
        unit = unit.read_only(read_only);
    }
    if let Some(allow_none) = declaration["allow_none"].as_bool() {
        unit = unit.allow_none(allow_none);
    }
    if let Some(omit) = declaration["omit_if_none"].as_bool() {
        unit = unit.omit_if_none(omit);
    }
    if let Some(omit) = declaration["omit_if_empty"].as_bool() {
        unit = unit.omit_if_empty(omit);
    }
    if let Some(default) = declaration.get("default") {
        unit = unit.default_value(Data::from_json(default));
    }
    if let Some(messages) = declaration["error_messages"].as_object() {
        for (key, template) in messages {
            if let Some(template) = template.as_str() {
                unit = unit.error_message(key.as_str(), template);
            }
        }
    }
    if let Some(names) = string_list(&declaration["preparers"]) {
        let preparers = names
            .iter()
            .map(String::as_str)
            .map(preparer)
            .collect::<Result<Vec<_>, _>>()?;
        if !preparers.is_empty() {
            unit = unit.preparer(preparer_chain(preparers));
        }
    }
    if let Some(validators) = declaration["validators"].as_array() {
        let mut validators = validators
            .iter()
            .map(build_validator)
            .collect::<Result<Vec<_>, _>>()?;
        match validators.len() {
            0 => {}
            1 => unit = unit.shared_validator(validators.remove(0)),
            _ => unit = unit.validator(ValidatedChain::from(validators)),
        }
    }
    Ok(unit)
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn preparer(name: &str) -> Result<fn(Value) -> Value, SchemaError> {
    match name {
        "strip" => Ok(strip),
        "lowercase" => Ok(lowercase),
        "blank_as_null" => Ok(blank_as_null),
        other => Err(SchemaError::UnknownPreparer(other.to_string())),
    }
}

fn build_validator(declaration: &Value) -> Result<Arc<dyn Validator>, SchemaError> {
    let size = |key: &str| declaration[key].as_u64().and_then(|n| usize::try_from(n).ok());
    let validator: Arc<dyn Validator> = match declaration["type"].as_str().unwrap_or_default() {
        "range" => Arc::new(Range::new(
            declaration["min"].as_f64(),
            declaration["max"].as_f64(),
        )),
        "length" => Arc::new(Length::new(size("min"), size("max"))),
        "choices" => {
            let choices: Vec<Choice> = declaration["choices"]
                .as_array()
                .map(|items| items.iter().map(choice).collect())
                .unwrap_or_default();
            Arc::new(Choices::labeled(
                choices.into_iter().map(|c| (c.value, c.label)),
            ))
        }
        "regex" => {
            let mut regex = Regex::new(declaration["pattern"].as_str().unwrap_or_default())?;
            if let Some(message) = declaration["message"].as_str() {
                regex = regex.message(message);
            }
            Arc::new(regex)
        }
        "email" => Arc::new(Email::new()),
        other => return Err(SchemaError::UnknownValidator(other.to_string())),
    };
    Ok(validator)
}

/// `{"value": v, "label": l}` or a bare value labelled by itself.
fn choice(item: &Value) -> Choice {
    match item {
        Value::Object(pair) => {
            let value = pair.get("value").cloned().unwrap_or(Value::Null);
            let label = pair.get("label").cloned().unwrap_or_else(|| value.clone());
            Choice { value, label }
        }
        bare => Choice::from(bare.clone()),
    }
}
