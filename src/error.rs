//! Error types for schema declaration, validation, serialization and sync.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Structured validation output.
///
/// Leaf units report a list of messages. Mapping units report a map of
/// field name to sub-error, sequence units a map of element index to
/// sub-error. The shape nests as deep as the unit tree that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    Messages(Vec<String>),
    Fields(BTreeMap<String, ErrorDetail>),
    Items(BTreeMap<usize, ErrorDetail>),
}

impl ErrorDetail {
    /// A single-message detail.
    pub fn message(message: impl Into<String>) -> Self {
        ErrorDetail::Messages(vec![message.into()])
    }

    /// Number of messages, fields or items at this level.
    pub fn len(&self) -> usize {
        match self {
            ErrorDetail::Messages(m) => m.len(),
            ErrorDetail::Fields(f) => f.len(),
            ErrorDetail::Items(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sub-error for a mapping field.
    pub fn field(&self, name: &str) -> Option<&ErrorDetail> {
        match self {
            ErrorDetail::Fields(f) => f.get(name),
            _ => None,
        }
    }

    /// Sub-error for a sequence element.
    pub fn item(&self, index: usize) -> Option<&ErrorDetail> {
        match self {
            ErrorDetail::Items(i) => i.get(&index),
            _ => None,
        }
    }

    /// Leaf messages, if this is a leaf.
    pub fn messages(&self) -> Option<&[String]> {
        match self {
            ErrorDetail::Messages(m) => Some(m),
            _ => None,
        }
    }

    /// Render as the JSON error tree (index keys become strings).
    pub fn to_json(&self) -> Value {
        match self {
            ErrorDetail::Messages(m) => {
                Value::Array(m.iter().cloned().map(Value::String).collect())
            }
            ErrorDetail::Fields(f) => Value::Object(
                f.iter()
                    .map(|(name, detail)| (name.clone(), detail.to_json()))
                    .collect(),
            ),
            ErrorDetail::Items(i) => Value::Object(
                i.iter()
                    .map(|(index, detail)| (index.to_string(), detail.to_json()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for ErrorDetail {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ErrorDetail::Messages(m) => m.serialize(serializer),
            ErrorDetail::Fields(f) => f.serialize(serializer),
            ErrorDetail::Items(i) => {
                let mut map = serializer.serialize_map(Some(i.len()))?;
                for (index, detail) in i {
                    map.serialize_entry(&index.to_string(), detail)?;
                }
                map.end()
            }
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Category of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Value missing on a required unit.
    Required,
    /// Explicit null on a unit that does not allow it.
    NoneNotAllowed,
    /// Raw input cannot be coerced to the unit's type.
    TypeMismatch,
    /// Date or time string matches none of the accepted formats.
    Format,
    /// A validator rejected the value.
    Constraint,
    /// Sequence input is not a list.
    NotIterable,
    /// Deserialize into a read-only sequence.
    ReadOnlyWrite,
    /// Aggregate of child failures in a mapping or sequence.
    Nested,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Required => "required",
            ErrorKind::NoneNotAllowed => "none not allowed",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Format => "format",
            ErrorKind::Constraint => "constraint",
            ErrorKind::NotIterable => "not iterable",
            ErrorKind::ReadOnlyWrite => "read-only write",
            ErrorKind::Nested => "nested",
        };
        f.write_str(name)
    }
}

/// A validation failure carrying its structured detail.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} error: {detail}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub detail: ErrorDetail,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            detail: ErrorDetail::message(message),
        }
    }

    /// Aggregate failure built from collected child errors.
    pub fn nested(detail: ErrorDetail) -> Self {
        Self {
            kind: ErrorKind::Nested,
            detail,
        }
    }
}

/// The domain value handed to `serialize` does not fit the unit's type.
///
/// This signals a programming error in the caller, not bad user input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SerializeError {
    #[error("cannot serialize {actual} at {path}: expected {expected}")]
    InvalidValue {
        path: String,
        expected: &'static str,
        actual: String,
    },

    #[error("cannot format value at {path} with {format:?}")]
    BadFormat { path: String, format: String },
}

/// Errors while writing validated data into a domain instance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("sync requires a successful is_valid() call first")]
    NotValidated,

    #[error("nothing to sync at {path}: validated data is empty")]
    NoData { path: String },

    #[error("restore_object is not implemented for the object mapping at {path}")]
    RestoreNotImplemented { path: String },

    #[error("cannot sync into {actual} at {path}: expected {expected}")]
    TargetMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{kind} unit at {path} cannot be synced")]
    NotSyncable { path: String, kind: &'static str },
}

/// Errors raised while declaring or building a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("sequence schemas must have exactly one child unit, found {count}")]
    SequenceArity { count: usize },

    #[error("unknown unit type {0:?}")]
    UnknownUnitType(String),

    #[error("unknown validator {0:?}")]
    UnknownValidator(String),

    #[error("unknown preparer {0:?}")]
    UnknownPreparer(String),

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors while loading a JSON schema declaration.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid declaration with {} issue(s)", issues.len())]
    InvalidDeclaration { issues: Vec<DeclarationIssue> },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Single problem found in a declaration document.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeclarationIssue {
    /// JSON Pointer (RFC 6901) to the offending declaration node.
    pub path: String,
    pub message: String,
}

impl fmt::Display for DeclarationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}: {}", path, self.message)
    }
}
