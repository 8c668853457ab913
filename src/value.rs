//! In-memory domain values.
//!
//! Raw input and serialized output are plain `serde_json::Value`s. Between
//! the two, validated data and the objects being serialized or synced are
//! [`Data`]: JSON plus dates, file payloads and attribute-bearing objects.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, SecondsFormat};
use serde_json::{Map, Number, Value};

static NULL: Data = Data::Null;

/// A domain value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Data {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(chrono::DateTime<FixedOffset>),
    File(FilePayload),
    List(Vec<Data>),
    /// Dictionary-like value, read and written by key.
    Map(BTreeMap<String, Data>),
    /// Attribute-bearing value, read and written by attribute name.
    Object(Object),
}

impl Data {
    /// Convert plain JSON into domain data. Objects become [`Data::Map`].
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Data::Null,
            Value::Bool(b) => Data::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Data::Int(i),
                None => Data::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Data::Str(s.clone()),
            Value::Array(items) => Data::List(items.iter().map(Data::from_json).collect()),
            Value::Object(map) => Data::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Data::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render as plain JSON. Dates use ISO 8601, files their filename.
    pub fn to_json(&self) -> Value {
        match self {
            Data::Null => Value::Null,
            Data::Bool(b) => Value::Bool(*b),
            Data::Int(i) => Value::from(*i),
            Data::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Data::Str(s) => Value::String(s.clone()),
            Data::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Data::DateTime(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
            Data::File(file) => Value::String(file.filename.clone()),
            Data::List(items) => Value::Array(items.iter().map(Data::to_json).collect()),
            Data::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            Data::Object(object) => Value::Object(
                object
                    .attributes()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Data::Null => "null",
            Data::Bool(_) => "boolean",
            Data::Int(_) => "integer",
            Data::Float(_) => "float",
            Data::Str(_) => "string",
            Data::Date(_) => "date",
            Data::DateTime(_) => "datetime",
            Data::File(_) => "file",
            Data::List(_) => "list",
            Data::Map(_) => "mapping",
            Data::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Data::Null)
    }

    /// Length of strings (in chars), lists, mappings and objects.
    pub fn len(&self) -> Option<usize> {
        match self {
            Data::Str(s) => Some(s.chars().count()),
            Data::List(items) => Some(items.len()),
            Data::Map(map) => Some(map.len()),
            Data::Object(object) => Some(object.attributes.len()),
            _ => None,
        }
    }

    /// Key lookup on a [`Data::Map`].
    pub fn get(&self, key: &str) -> Option<&Data> {
        match self {
            Data::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Data::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Data::Int(i) => Some(*i as f64),
            Data::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Data::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl From<bool> for Data {
    fn from(b: bool) -> Self {
        Data::Bool(b)
    }
}

impl From<i64> for Data {
    fn from(i: i64) -> Self {
        Data::Int(i)
    }
}

impl From<i32> for Data {
    fn from(i: i32) -> Self {
        Data::Int(i64::from(i))
    }
}

impl From<f64> for Data {
    fn from(f: f64) -> Self {
        Data::Float(f)
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Data::Str(s.to_string())
    }
}

impl From<String> for Data {
    fn from(s: String) -> Self {
        Data::Str(s)
    }
}

impl From<NaiveDate> for Data {
    fn from(d: NaiveDate) -> Self {
        Data::Date(d)
    }
}

impl From<chrono::DateTime<FixedOffset>> for Data {
    fn from(dt: chrono::DateTime<FixedOffset>) -> Self {
        Data::DateTime(dt)
    }
}

impl From<FilePayload> for Data {
    fn from(file: FilePayload) -> Self {
        Data::File(file)
    }
}

impl From<Object> for Data {
    fn from(object: Object) -> Self {
        Data::Object(object)
    }
}

impl<T: Into<Data>> From<Vec<T>> for Data {
    fn from(items: Vec<T>) -> Self {
        Data::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        Data::from_json(&value)
    }
}

/// An attribute-bearing record, the target of object mappings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    class: String,
    attributes: BTreeMap<String, Data>,
}

impl Object {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder form of [`Object::setattr`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Data>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Attribute value; a missing attribute reads as null.
    pub fn getattr(&self, name: &str) -> &Data {
        self.attributes.get(name).unwrap_or(&NULL)
    }

    pub fn hasattr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn setattr(&mut self, name: impl Into<String>, value: Data) {
        self.attributes.insert(name.into(), value);
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Data)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// An uploaded file: a name plus its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub filename: String,
    pub content: String,
    pub content_type: Option<String>,
}

impl FilePayload {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            content_type: None,
        }
    }
}
