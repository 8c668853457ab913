//! Composable validators run after a unit's type conversion.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};

use crate::error::{ErrorDetail, ErrorKind, SchemaError, ValidationError};
use crate::i18n::TranslationString;
use crate::types::display_value;
use crate::unit::{Scope, Unit};
use crate::value::Data;

const EMAIL_PATTERN: &str = r"(?i)^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$";

/// A predicate over a unit's deserialized value.
pub trait Validator: fmt::Debug + Send + Sync {
    /// Check `value`, failing with a [`ErrorKind::Constraint`] error.
    fn validate(&self, unit: &Unit, value: &Data, scope: &Scope<'_>) -> Result<(), ValidationError>;

    /// Constraint description for metadata consumers.
    fn metadata(&self) -> Map<String, Value> {
        Map::new()
    }
}

fn constraint(scope: &Scope<'_>, term: TranslationString) -> ValidationError {
    ValidationError::new(ErrorKind::Constraint, scope.translate(&term))
}

/// Emit integral bounds as JSON integers.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

/// Runs every validator and merges all failures into one error.
#[derive(Debug, Clone, Default)]
pub struct ValidatedChain {
    validators: Vec<Arc<dyn Validator>>,
}

impl ValidatedChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn push(&mut self, validator: Arc<dyn Validator>) {
        self.validators.push(validator);
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl From<Vec<Arc<dyn Validator>>> for ValidatedChain {
    fn from(validators: Vec<Arc<dyn Validator>>) -> Self {
        Self { validators }
    }
}

impl Validator for ValidatedChain {
    fn validate(&self, unit: &Unit, value: &Data, scope: &Scope<'_>) -> Result<(), ValidationError> {
        let mut messages = Vec::new();
        for validator in &self.validators {
            if let Err(err) = validator.validate(unit, value, scope) {
                match err.detail {
                    ErrorDetail::Messages(m) => messages.extend(m),
                    other => messages.push(other.to_string()),
                }
            }
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                kind: ErrorKind::Constraint,
                detail: ErrorDetail::Messages(messages),
            })
        }
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for validator in &self.validators {
            merged.extend(validator.metadata());
        }
        merged
    }
}

/// One allowed value and its display label.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub value: Value,
    pub label: Value,
}

impl From<Value> for Choice {
    fn from(value: Value) -> Self {
        Self {
            label: value.clone(),
            value,
        }
    }
}

impl<V: Into<Value>, L: Into<Value>> From<(V, L)> for Choice {
    fn from((value, label): (V, L)) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

type ChoiceSource = Arc<dyn Fn() -> Vec<Choice> + Send + Sync>;

/// The value must be one of a fixed or computed set.
#[derive(Clone)]
pub struct Choices {
    fixed: Vec<Choice>,
    source: Option<ChoiceSource>,
}

impl Choices {
    /// Bare values; each is its own label.
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            fixed: values
                .into_iter()
                .map(|v| Choice::from(v.into()))
                .collect(),
            source: None,
        }
    }

    /// `(value, label)` pairs.
    pub fn labeled<I, V, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<Value>,
        L: Into<Value>,
    {
        Self {
            fixed: pairs.into_iter().map(Choice::from).collect(),
            source: None,
        }
    }

    /// Choices computed on every validation.
    pub fn from_fn(source: impl Fn() -> Vec<Choice> + Send + Sync + 'static) -> Self {
        Self {
            fixed: Vec::new(),
            source: Some(Arc::new(source)),
        }
    }

    pub fn choices(&self) -> Vec<Choice> {
        match &self.source {
            Some(source) => source(),
            None => self.fixed.clone(),
        }
    }
}

impl fmt::Debug for Choices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Choices")
            .field("fixed", &self.fixed)
            .field("dynamic", &self.source.is_some())
            .finish()
    }
}

impl Validator for Choices {
    fn validate(&self, _unit: &Unit, value: &Data, scope: &Scope<'_>) -> Result<(), ValidationError> {
        let choices = self.choices();
        let value = value.to_json();
        if choices.iter().any(|c| c.value == value) {
            return Ok(());
        }
        let listed = choices
            .iter()
            .map(|c| display_value(&c.value))
            .collect::<Vec<_>>()
            .join(", ");
        Err(constraint(
            scope,
            TranslationString::new("${value} is not one of ${choices}")
                .with("value", display_value(&value))
                .with("choices", listed),
        ))
    }

    fn metadata(&self) -> Map<String, Value> {
        let pairs = self
            .choices()
            .into_iter()
            .map(|c| Value::Array(vec![c.value, c.label]))
            .collect();
        let mut metadata = Map::new();
        metadata.insert("choices".to_string(), Value::Array(pairs));
        metadata
    }
}

/// Numeric bounds, both inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn min(min: f64) -> Self {
        Self::new(Some(min), None)
    }

    pub fn max(max: f64) -> Self {
        Self::new(None, Some(max))
    }
}

impl Validator for Range {
    fn validate(&self, _unit: &Unit, value: &Data, scope: &Scope<'_>) -> Result<(), ValidationError> {
        let Some(number) = value.as_f64() else {
            return Err(constraint(
                scope,
                TranslationString::new("${value} is not a number")
                    .with("value", display_value(&value.to_json())),
            ));
        };
        let shown = display_value(&value.to_json());
        if let Some(min) = self.min {
            if number < min {
                return Err(constraint(
                    scope,
                    TranslationString::new("${value} is less than minimum value ${min}")
                        .with("value", &shown)
                        .with("min", number_value(min)),
                ));
            }
        }
        if let Some(max) = self.max {
            if number > max {
                return Err(constraint(
                    scope,
                    TranslationString::new("${value} is greater than maximum value ${max}")
                        .with("value", &shown)
                        .with("max", number_value(max)),
                ));
            }
        }
        Ok(())
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        if let Some(min) = self.min {
            metadata.insert("min".to_string(), number_value(min));
        }
        if let Some(max) = self.max {
            metadata.insert("max".to_string(), number_value(max));
        }
        metadata
    }
}

/// Length bounds for strings (in chars), lists and mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Length {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Length {
    pub fn new(min: Option<usize>, max: Option<usize>) -> Self {
        Self { min, max }
    }
}

impl Validator for Length {
    fn validate(&self, _unit: &Unit, value: &Data, scope: &Scope<'_>) -> Result<(), ValidationError> {
        let Some(len) = value.len() else {
            return Err(constraint(
                scope,
                TranslationString::new("Value of type ${type} has no length")
                    .with("type", value.type_name()),
            ));
        };
        if let Some(min) = self.min {
            if len < min {
                return Err(constraint(
                    scope,
                    TranslationString::new("Shorter than minimum length ${min}").with("min", min),
                ));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                return Err(constraint(
                    scope,
                    TranslationString::new("Longer than maximum length ${max}").with("max", max),
                ));
            }
        }
        Ok(())
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        if let Some(min) = self.min {
            metadata.insert("min_length".to_string(), Value::from(min));
        }
        if let Some(max) = self.max {
            metadata.insert("max_length".to_string(), Value::from(max));
        }
        metadata
    }
}

/// The string value must match a pattern.
#[derive(Debug, Clone)]
pub struct Regex {
    pattern: regex::Regex,
    message: String,
}

impl Regex {
    pub fn new(pattern: &str) -> Result<Self, SchemaError> {
        let pattern = regex::Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::from_compiled(pattern))
    }

    fn from_compiled(pattern: regex::Regex) -> Self {
        Self {
            pattern,
            message: "String does not match expected pattern".to_string(),
        }
    }

    /// Replace the failure message template.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Validator for Regex {
    fn validate(&self, _unit: &Unit, value: &Data, scope: &Scope<'_>) -> Result<(), ValidationError> {
        match value.as_str() {
            Some(s) if self.pattern.is_match(s) => Ok(()),
            _ => Err(constraint(scope, TranslationString::new(self.message.as_str()))),
        }
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("pattern".to_string(), Value::String(self.pattern().to_string()));
        metadata
    }
}

/// [`Regex`] preconfigured with an email address pattern.
#[derive(Debug, Clone)]
pub struct Email(Regex);

impl Email {
    pub fn new() -> Self {
        static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
        let compiled = PATTERN
            .get_or_init(|| regex::Regex::new(EMAIL_PATTERN).expect("email pattern compiles"));
        Email(Regex::from_compiled(compiled.clone()).message("Invalid email address"))
    }
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for Email {
    fn validate(&self, unit: &Unit, value: &Data, scope: &Scope<'_>) -> Result<(), ValidationError> {
        self.0.validate(unit, value, scope)
    }

    fn metadata(&self) -> Map<String, Value> {
        self.0.metadata()
    }
}

/// Adapts a closure into a constraint validator.
pub struct FnValidator<F> {
    check: F,
}

impl<F> fmt::Debug for FnValidator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnValidator")
    }
}

/// Wrap `check`; an `Err(message)` becomes a constraint failure.
pub fn from_fn<F>(check: F) -> FnValidator<F>
where
    F: Fn(&Data) -> Result<(), String> + Send + Sync,
{
    FnValidator { check }
}

impl<F> Validator for FnValidator<F>
where
    F: Fn(&Data) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, _unit: &Unit, value: &Data, scope: &Scope<'_>) -> Result<(), ValidationError> {
        (self.check)(value).map_err(|message| constraint(scope, TranslationString::new(message)))
    }
}
