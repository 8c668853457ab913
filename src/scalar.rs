//! Scalar type descriptors.
//!
//! Deserializers return `None` when the raw value cannot be coerced; the
//! owning unit turns that into a translated `invalid` error. Serializers
//! fail with [`SerializeError`] because a bad domain value is a caller bug.

use std::fmt::Write;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};

use crate::error::SerializeError;
use crate::value::{Data, FilePayload};

const TRUE_TOKENS: &[&str] = &["true", "1"];
const FALSE_TOKENS: &[&str] = &["false", "0"];

fn invalid_value(path: &str, expected: &'static str, value: &Data) -> SerializeError {
    SerializeError::InvalidValue {
        path: path.to_string(),
        expected,
        actual: value.type_name().to_string(),
    }
}

pub(crate) fn serialize_integer(value: &Data, path: &str) -> Result<Value, SerializeError> {
    match value {
        Data::Int(i) => Ok(Value::from(*i)),
        Data::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid_value(path, "an integer", value)),
        other => Err(invalid_value(path, "an integer", other)),
    }
}

pub(crate) fn deserialize_integer(raw: &Value) -> Option<Data> {
    match raw {
        Value::Number(n) => n.as_i64().map(Data::Int),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Data::Int),
        _ => None,
    }
}

pub(crate) fn serialize_float(value: &Data, path: &str) -> Result<Value, SerializeError> {
    let number = match value {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        Data::Str(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| invalid_value(path, "a finite number", value))
}

pub(crate) fn deserialize_float(raw: &Value) -> Option<Data> {
    let number = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(Data::Float(number))
}

fn parse_boolean(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Some(true),
            Some(f) if f == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => {
            let token = s.trim().to_ascii_lowercase();
            if TRUE_TOKENS.contains(&token.as_str()) {
                Some(true)
            } else if FALSE_TOKENS.contains(&token.as_str()) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub(crate) fn serialize_boolean(value: &Data, path: &str) -> Result<Value, SerializeError> {
    let token = match value {
        Data::Bool(b) => return Ok(Value::Bool(*b)),
        Data::Int(i) => Value::from(*i),
        Data::Str(s) => Value::String(s.clone()),
        other => return Err(invalid_value(path, "a boolean", other)),
    };
    parse_boolean(&token)
        .map(Value::Bool)
        .ok_or_else(|| invalid_value(path, "a boolean", value))
}

pub(crate) fn deserialize_boolean(raw: &Value) -> Option<Data> {
    parse_boolean(raw).map(Data::Bool)
}

pub(crate) fn serialize_string(value: &Data) -> Value {
    match value {
        Data::Str(s) => Value::String(s.clone()),
        Data::Null => Value::Null,
        other => match other.to_json() {
            Value::String(s) => Value::String(s),
            rendered => Value::String(rendered.to_string()),
        },
    }
}

pub(crate) fn deserialize_string(raw: &Value) -> Data {
    match raw {
        Value::String(s) => Data::Str(s.clone()),
        Value::Null => Data::Null,
        other => Data::Str(other.to_string()),
    }
}

pub(crate) fn serialize_file(value: &Data, path: &str) -> Result<Value, SerializeError> {
    match value {
        Data::File(file) => Ok(Value::String(file.filename.clone())),
        Data::Str(name) => Ok(Value::String(name.clone())),
        other => Err(invalid_value(path, "a file", other)),
    }
}

pub(crate) fn deserialize_file(raw: &Value) -> Option<Data> {
    let map = raw.as_object()?;
    let filename = map
        .get("filename")
        .or_else(|| map.get("name"))
        .and_then(Value::as_str)?;
    let content = match map.get("content")? {
        Value::String(s) => s.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };
    Some(Data::File(FilePayload {
        filename: filename.to_string(),
        content,
        content_type: map
            .get("content_type")
            .and_then(Value::as_str)
            .map(str::to_string),
    }))
}

/// Render a chrono format, refusing malformed format strings.
fn render(item: impl std::fmt::Display, path: &str, format: &str) -> Result<Value, SerializeError> {
    let mut out = String::new();
    write!(out, "{}", item).map_err(|_| SerializeError::BadFormat {
        path: path.to_string(),
        format: format.to_string(),
    })?;
    Ok(Value::String(out))
}

/// Output and accepted input formats for calendar dates (strftime syntax).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    format: String,
    input_formats: Vec<String>,
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            format: "%Y-%m-%d".to_string(),
            input_formats: Vec::new(),
        }
    }
}

impl DateFormat {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            input_formats: Vec::new(),
        }
    }

    /// Accepted input formats, tried in order. Defaults to the output format.
    pub fn input_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    fn accepted(&self) -> Vec<&str> {
        if self.input_formats.is_empty() {
            vec![self.format.as_str()]
        } else {
            self.input_formats.iter().map(String::as_str).collect()
        }
    }

    /// Accepted formats as shown in error messages.
    pub fn expected(&self) -> String {
        self.accepted().join(", ")
    }

    fn parse(&self, s: &str) -> Option<NaiveDate> {
        self.accepted()
            .into_iter()
            .find_map(|format| NaiveDate::parse_from_str(s.trim(), format).ok())
    }

    pub(crate) fn serialize(&self, value: &Data, path: &str) -> Result<Value, SerializeError> {
        let date = match value {
            Data::Date(d) => *d,
            Data::DateTime(dt) => dt.date_naive(),
            Data::Str(s) => self
                .parse(s)
                .ok_or_else(|| invalid_value(path, "a date", value))?,
            other => return Err(invalid_value(path, "a date", other)),
        };
        render(date.format(&self.format), path, &self.format)
    }

    pub(crate) fn deserialize(&self, raw: &Value) -> Option<Data> {
        raw.as_str().and_then(|s| self.parse(s)).map(Data::Date)
    }
}

/// Output and accepted input formats for timestamps (strftime syntax).
///
/// Input formats without an offset are read as UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeFormat {
    format: String,
    input_formats: Vec<String>,
}

impl Default for DateTimeFormat {
    fn default() -> Self {
        Self {
            format: "%Y-%m-%dT%H:%M:%S%:z".to_string(),
            input_formats: vec![
                "%Y-%m-%dT%H:%M:%S%:z".to_string(),
                "%Y-%m-%dT%H:%M:%S%.f%:z".to_string(),
            ],
        }
    }
}

impl DateTimeFormat {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            input_formats: Vec::new(),
        }
    }

    /// Accepted input formats, tried in order. Defaults to the output format.
    pub fn input_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    fn accepted(&self) -> Vec<&str> {
        if self.input_formats.is_empty() {
            vec![self.format.as_str()]
        } else {
            self.input_formats.iter().map(String::as_str).collect()
        }
    }

    pub fn expected(&self) -> String {
        self.accepted().join(", ")
    }

    fn parse(&self, s: &str) -> Option<chrono::DateTime<FixedOffset>> {
        let s = s.trim();
        self.accepted().into_iter().find_map(|format| {
            chrono::DateTime::parse_from_str(s, format).ok().or_else(|| {
                let naive = NaiveDateTime::parse_from_str(s, format).ok()?;
                let utc = FixedOffset::east_opt(0)?;
                Some(chrono::DateTime::from_naive_utc_and_offset(naive, utc))
            })
        })
    }

    pub(crate) fn serialize(&self, value: &Data, path: &str) -> Result<Value, SerializeError> {
        let timestamp = match value {
            Data::DateTime(dt) => *dt,
            Data::Date(d) => d
                .and_hms_opt(0, 0, 0)
                .zip(FixedOffset::east_opt(0))
                .map(|(midnight, utc)| chrono::DateTime::from_naive_utc_and_offset(midnight, utc))
                .ok_or_else(|| invalid_value(path, "a datetime", value))?,
            Data::Str(s) => self
                .parse(s)
                .ok_or_else(|| invalid_value(path, "a datetime", value))?,
            other => return Err(invalid_value(path, "a datetime", other)),
        };
        render(timestamp.format(&self.format), path, &self.format)
    }

    pub(crate) fn deserialize(&self, raw: &Value) -> Option<Data> {
        raw.as_str().and_then(|s| self.parse(s)).map(Data::DateTime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_serialize() {
        assert_eq!(serialize_integer(&Data::Int(1), "/"), Ok(json!(1)));
        assert_eq!(serialize_integer(&Data::from("1"), "/"), Ok(json!(1)));
        assert!(matches!(
            serialize_integer(&Data::from("Broken"), "/"),
            Err(SerializeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn integer_deserialize() {
        assert_eq!(deserialize_integer(&json!(1)), Some(Data::Int(1)));
        assert_eq!(deserialize_integer(&json!(" 12 ")), Some(Data::Int(12)));
        assert_eq!(deserialize_integer(&json!("Broken")), None);
        assert_eq!(deserialize_integer(&json!(1.5)), None);
        assert_eq!(deserialize_integer(&json!(true)), None);
    }

    #[test]
    fn float_rejects_non_finite() {
        assert_eq!(deserialize_float(&json!("2.5")), Some(Data::Float(2.5)));
        assert_eq!(deserialize_float(&json!("inf")), None);
        assert_eq!(deserialize_float(&json!("NaN")), None);
        assert!(serialize_float(&Data::Float(f64::INFINITY), "/").is_err());
        assert_eq!(serialize_float(&Data::Int(2), "/"), Ok(json!(2.0)));
    }

    #[test]
    fn boolean_token_sets() {
        for raw in [json!(true), json!(1), json!("true"), json!("TRUE"), json!("1")] {
            assert_eq!(deserialize_boolean(&raw), Some(Data::Bool(true)), "{raw}");
        }
        for raw in [json!(false), json!(0), json!("false"), json!("0")] {
            assert_eq!(deserialize_boolean(&raw), Some(Data::Bool(false)), "{raw}");
        }
        for raw in [json!("yes"), json!(2), json!(""), json!([])] {
            assert_eq!(deserialize_boolean(&raw), None, "{raw}");
        }
        assert_eq!(serialize_boolean(&Data::from("0"), "/"), Ok(json!(false)));
        assert!(serialize_boolean(&Data::from("maybe"), "/").is_err());
    }

    #[test]
    fn string_stringifies_other_values() {
        assert_eq!(serialize_string(&Data::from("Native string")), json!("Native string"));
        assert_eq!(serialize_string(&Data::Int(123)), json!("123"));
        assert_eq!(deserialize_string(&json!(123)), Data::from("123"));
        assert_eq!(deserialize_string(&json!("abc")), Data::from("abc"));
    }

    #[test]
    fn date_roundtrip_and_errors() {
        let format = DateFormat::default();
        let date = NaiveDate::from_ymd_opt(2014, 11, 24).unwrap();
        assert_eq!(format.serialize(&Data::Date(date), "/"), Ok(json!("2014-11-24")));
        assert_eq!(format.deserialize(&json!("2014-11-24")), Some(Data::Date(date)));
        assert_eq!(format.deserialize(&json!("Broken")), None);
        assert!(matches!(
            format.serialize(&Data::from("Broken"), "/"),
            Err(SerializeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn date_input_formats_tried_in_order() {
        let format = DateFormat::new("%d.%m.%Y").input_formats(["%Y-%m-%d", "%d/%m/%Y"]);
        let date = NaiveDate::from_ymd_opt(2014, 11, 24).unwrap();
        assert_eq!(format.deserialize(&json!("24/11/2014")), Some(Data::Date(date)));
        assert_eq!(format.serialize(&Data::Date(date), "/"), Ok(json!("24.11.2014")));
        assert_eq!(format.expected(), "%Y-%m-%d, %d/%m/%Y");
    }

    #[test]
    fn datetime_parses_offsets_and_fractions() {
        let format = DateTimeFormat::default();
        let parsed = format.deserialize(&json!("2014-11-24T21:46:10-00:00"));
        let expected = chrono::DateTime::parse_from_rfc3339("2014-11-24T21:46:10+00:00").unwrap();
        assert_eq!(parsed, Some(Data::DateTime(expected)));

        let fractional = format.deserialize(&json!("2014-11-24T21:46:10.250+02:00"));
        assert!(matches!(fractional, Some(Data::DateTime(_))));

        assert_eq!(format.deserialize(&json!("Broken")), None);
        assert_eq!(
            format.serialize(&Data::DateTime(expected), "/"),
            Ok(json!("2014-11-24T21:46:10+00:00"))
        );
    }

    #[test]
    fn datetime_without_offset_is_utc() {
        let format = DateTimeFormat::new("%Y-%m-%d %H:%M");
        let parsed = format.deserialize(&json!("2014-11-24 21:46"));
        let expected = chrono::DateTime::parse_from_rfc3339("2014-11-24T21:46:00+00:00").unwrap();
        assert_eq!(parsed, Some(Data::DateTime(expected)));
    }

    #[test]
    fn file_requires_name_and_content() {
        let file = deserialize_file(&json!({"filename": "a.txt", "content": "hi"}));
        assert_eq!(file, Some(Data::File(FilePayload::new("a.txt", "hi"))));
        assert_eq!(deserialize_file(&json!({"filename": "a.txt"})), None);
        assert_eq!(deserialize_file(&json!("a.txt")), None);
        assert_eq!(
            serialize_file(&Data::File(FilePayload::new("a.txt", "hi")), "/"),
            Ok(json!("a.txt"))
        );
    }
}
