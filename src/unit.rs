//! Units: named nodes binding a type descriptor, a validator and the
//! per-instance runtime state of one use of a schema.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{ErrorDetail, ErrorKind, SerializeError, SyncError, ValidationError};
use crate::i18n::{SimpleTranslator, TranslationString, Translator};
use crate::scalar::{DateFormat, DateTimeFormat};
use crate::types::{UnitType, UNIT_MESSAGES};
use crate::validator::Validator;
use crate::value::Data;

/// Transforms a present raw value before validation.
pub type Preparer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Builds a fresh domain instance for sync from the validated data.
pub type RestoreObject = Arc<dyn Fn(&Data) -> Data + Send + Sync>;

/// Result of validating one field.
///
/// `Absent` means "leave this field out": no value was supplied (or the unit
/// is read-only) and there is no default. It is never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Present(Data),
    Absent,
    Invalid(ValidationError),
}

/// Shared state of one recursive descent: the root's translator and
/// context plus the path of the unit being visited.
pub struct Scope<'a> {
    translator: &'a dyn Translator,
    context: &'a Map<String, Value>,
    path: String,
}

impl<'a> Scope<'a> {
    pub fn new(translator: &'a dyn Translator, context: &'a Map<String, Value>) -> Self {
        Self {
            translator,
            context,
            path: "/".to_string(),
        }
    }

    /// Scope for a child field or element.
    pub fn child(&self, segment: impl fmt::Display) -> Scope<'a> {
        Scope {
            translator: self.translator,
            context: self.context,
            path: child_path(&self.path, segment),
        }
    }

    pub fn translate(&self, term: &TranslationString) -> String {
        self.translator.translate(term)
    }

    /// Context bound on the root unit.
    pub fn context(&self) -> &Map<String, Value> {
        self.context
    }

    /// Slash-separated path from the root ("/" for the root itself).
    pub fn path(&self) -> &str {
        &self.path
    }
}

pub(crate) fn child_path(parent: &str, segment: impl fmt::Display) -> String {
    if parent == "/" {
        format!("/{}", segment)
    } else {
        format!("{}/{}", parent, segment)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Validation {
    Valid(Option<Data>),
    Invalid(ErrorDetail),
}

/// A named validation and transformation node.
///
/// Leaf units are built with the scalar constructors ([`Unit::integer`],
/// [`Unit::string`], ...). Container units come from
/// [`Schema::build`](crate::Schema::build), which fixes their children
/// once; afterwards only runtime state changes.
#[derive(Clone)]
pub struct Unit {
    name: Option<String>,
    unit_type: UnitType,
    validator: Option<Arc<dyn Validator>>,
    preparer: Option<Preparer>,
    restore: Option<RestoreObject>,
    pub(crate) children: Vec<(String, Unit)>,
    required: bool,
    read_only: bool,
    allow_none: bool,
    default: Option<Data>,
    omit_if_none: bool,
    omit_if_empty: bool,
    error_messages: BTreeMap<String, String>,
    translator: Arc<dyn Translator>,

    source_object: Option<Data>,
    initial_data: Option<Value>,
    context: Map<String, Value>,
    validation: Option<Validation>,
}

impl Unit {
    pub(crate) fn new(unit_type: UnitType) -> Self {
        let error_messages = UNIT_MESSAGES
            .iter()
            .chain(unit_type.default_error_messages())
            .map(|(key, template)| (key.to_string(), template.to_string()))
            .collect();
        Self {
            name: None,
            unit_type,
            validator: None,
            preparer: None,
            restore: None,
            children: Vec::new(),
            required: true,
            read_only: false,
            allow_none: false,
            default: None,
            omit_if_none: false,
            omit_if_empty: false,
            error_messages,
            translator: Arc::new(SimpleTranslator),
            source_object: None,
            initial_data: None,
            context: Map::new(),
            validation: None,
        }
    }

    pub fn integer() -> Self {
        Self::new(UnitType::Integer)
    }

    pub fn float() -> Self {
        Self::new(UnitType::Float)
    }

    pub fn boolean() -> Self {
        Self::new(UnitType::Boolean)
    }

    pub fn string() -> Self {
        Self::new(UnitType::String)
    }

    pub fn date(format: DateFormat) -> Self {
        Self::new(UnitType::Date(format))
    }

    pub fn datetime(format: DateTimeFormat) -> Self {
        Self::new(UnitType::DateTime(format))
    }

    pub fn file() -> Self {
        Self::new(UnitType::File)
    }

    // --- Declaration options ---

    /// Explicit name. Defaults to the slot the unit is declared under.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn allow_none(mut self, allow_none: bool) -> Self {
        self.allow_none = allow_none;
        self
    }

    pub fn default_value(mut self, value: impl Into<Data>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Drop the field from serialized output when it serializes to null.
    pub fn omit_if_none(mut self, omit: bool) -> Self {
        self.omit_if_none = omit;
        self
    }

    /// Drop the field from serialized output when it serializes to an
    /// empty string, list or mapping.
    pub fn omit_if_empty(mut self, omit: bool) -> Self {
        self.omit_if_empty = omit;
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Attach a validator that is already shared behind an `Arc`.
    pub fn shared_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn preparer(mut self, preparer: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.preparer = Some(Arc::new(preparer));
        self
    }

    /// Override the template for one message key (`required`, `none`,
    /// `invalid`, ...).
    pub fn error_message(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.error_messages.insert(key.into(), template.into());
        self
    }

    /// Hook building a fresh instance when sync has no target.
    pub fn restore_object(mut self, restore: impl Fn(&Data) -> Data + Send + Sync + 'static) -> Self {
        self.restore = Some(Arc::new(restore));
        self
    }

    pub(crate) fn set_restore(&mut self, restore: Option<RestoreObject>) {
        self.restore = restore;
    }

    pub(crate) fn set_name_if_missing(&mut self, name: &str) {
        if self.name.is_none() {
            self.name = Some(name.to_string());
        }
    }

    /// Translator used for messages when this unit is the root.
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn set_translator(&mut self, translator: Arc<dyn Translator>) {
        self.translator = translator;
    }

    pub fn with_object(mut self, object: impl Into<Data>) -> Self {
        self.bind_object(object);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.bind_data(data);
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.bind_context(context);
        self
    }

    // --- Accessors ---

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn unit_type(&self) -> &UnitType {
        &self.unit_type
    }

    pub fn validator_ref(&self) -> Option<&dyn Validator> {
        self.validator.as_deref()
    }

    /// Children in declaration order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Unit)> {
        self.children.iter().map(|(name, unit)| (name.as_str(), unit))
    }

    pub fn child(&self, name: &str) -> Option<&Unit> {
        self.children
            .iter()
            .find(|(slot, _)| slot == name)
            .map(|(_, unit)| unit)
    }

    /// The single element unit of a sequence.
    pub fn item(&self) -> Option<&Unit> {
        self.children.first().map(|(_, unit)| unit)
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn allows_none(&self) -> bool {
        self.allow_none
    }

    pub fn default(&self) -> Option<&Data> {
        self.default.as_ref()
    }

    pub fn error_messages(&self) -> &BTreeMap<String, String> {
        &self.error_messages
    }

    // --- Runtime state ---

    pub fn bind_object(&mut self, object: impl Into<Data>) {
        self.source_object = Some(object.into());
    }

    pub fn bind_data(&mut self, data: Value) {
        self.initial_data = Some(data);
        self.validation = None;
    }

    pub fn bind_context(&mut self, context: Map<String, Value>) {
        self.context = context;
    }

    /// Clear bound object, data, context and cached validation results.
    pub fn reset(&mut self) {
        self.source_object = None;
        self.initial_data = None;
        self.context = Map::new();
        self.validation = None;
    }

    pub fn source_object(&self) -> Option<&Data> {
        self.source_object.as_ref()
    }

    pub fn initial_data(&self) -> Option<&Value> {
        self.initial_data.as_ref()
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Root scope for a descent starting at this unit.
    pub fn scope(&self) -> Scope<'_> {
        Scope::new(self.translator.as_ref(), &self.context)
    }

    // --- Validation ---

    /// The default value, or `None` meaning "omit this field".
    pub fn get_default(&self) -> Option<Data> {
        self.default.clone()
    }

    /// Build a translated error from one of this unit's message templates.
    pub fn error(
        &self,
        kind: ErrorKind,
        key: &str,
        scope: &Scope<'_>,
        args: &[(&str, String)],
    ) -> ValidationError {
        let template = self
            .error_messages
            .get(key)
            .map(String::as_str)
            .unwrap_or(key);
        let term = args
            .iter()
            .fold(TranslationString::new(template), |term, (name, value)| {
                term.with(*name, value)
            });
        ValidationError::new(kind, scope.translate(&term))
    }

    /// Run the required/default/none/read-only pipeline on `raw`.
    ///
    /// `None` means no value was supplied; `Some(Value::Null)` is an
    /// explicit null.
    pub fn run_validation(&self, raw: Option<&Value>, scope: &Scope<'_>) -> Outcome {
        let prepared;
        let raw = match (raw, &self.preparer) {
            (Some(value), Some(preparer)) => {
                prepared = preparer(value.clone());
                Some(&prepared)
            }
            (raw, _) => raw,
        };

        if self.read_only {
            return self.default_outcome(scope);
        }

        let Some(raw) = raw else {
            if self.required {
                return Outcome::Invalid(self.error(ErrorKind::Required, "required", scope, &[]));
            }
            return self.default_outcome(scope);
        };

        if raw.is_null() {
            if !self.allow_none {
                return Outcome::Invalid(self.error(
                    ErrorKind::NoneNotAllowed,
                    "none",
                    scope,
                    &[],
                ));
            }
            return Outcome::Present(Data::Null);
        }

        match self.deserialize_in(raw, scope) {
            Ok(value) => Outcome::Present(value),
            Err(err) => Outcome::Invalid(err),
        }
    }

    fn default_outcome(&self, scope: &Scope<'_>) -> Outcome {
        match self.get_default() {
            Some(value) => Outcome::Present(value),
            None => {
                trace!(path = scope.path(), "no value and no default, skipping");
                Outcome::Absent
            }
        }
    }

    /// Type conversion followed by the validator, for a present value.
    pub fn deserialize(&self, raw: &Value) -> Result<Data, ValidationError> {
        self.deserialize_in(raw, &self.scope())
    }

    pub(crate) fn deserialize_in(
        &self,
        raw: &Value,
        scope: &Scope<'_>,
    ) -> Result<Data, ValidationError> {
        let value = self.unit_type.deserialize(self, raw, scope)?;
        if let Some(validator) = &self.validator {
            validator.validate(self, &value, scope)?;
        }
        Ok(value)
    }

    /// Validate the bound data and cache the outcome.
    pub fn is_valid(&mut self) -> bool {
        let outcome = self.run_validation(self.initial_data.as_ref(), &self.scope());
        let validation = match outcome {
            Outcome::Present(value) => Validation::Valid(Some(value)),
            Outcome::Absent => Validation::Valid(None),
            Outcome::Invalid(err) => {
                debug!(kind = %err.kind, errors = %err.detail, "validation failed");
                Validation::Invalid(err.detail)
            }
        };
        let valid = matches!(validation, Validation::Valid(_));
        self.validation = Some(validation);
        valid
    }

    /// Structured errors of the last [`Unit::is_valid`] call.
    ///
    /// # Panics
    ///
    /// Panics if `is_valid()` has not been called.
    pub fn errors(&self) -> Option<&ErrorDetail> {
        match &self.validation {
            Some(Validation::Invalid(detail)) => Some(detail),
            Some(Validation::Valid(_)) => None,
            None => panic!("You must call `.is_valid()` before accessing `.errors()`."),
        }
    }

    /// Validated data of the last [`Unit::is_valid`] call.
    ///
    /// # Panics
    ///
    /// Panics if `is_valid()` has not been called.
    pub fn validated_data(&self) -> Option<&Data> {
        match &self.validation {
            Some(Validation::Valid(data)) => data.as_ref(),
            Some(Validation::Invalid(_)) => None,
            None => panic!("You must call `.is_valid()` before accessing `.validated_data()`."),
        }
    }

    // --- Serialization ---

    /// Serialize the bound source object (null when nothing is bound).
    pub fn serialize(&self) -> Result<Value, SerializeError> {
        match &self.source_object {
            Some(object) => self.serialize_value(object),
            None => Ok(Value::Null),
        }
    }

    pub fn serialize_value(&self, value: &Data) -> Result<Value, SerializeError> {
        self.serialize_at(value, "/")
    }

    pub(crate) fn serialize_at(&self, value: &Data, path: &str) -> Result<Value, SerializeError> {
        self.unit_type.serialize(self, value, path)
    }

    /// Omit rules applied by containers to a serialized child value.
    pub(crate) fn allow_to_serialize(&self, serialized: &Value) -> bool {
        if serialized.is_null() && self.omit_if_none {
            return false;
        }
        let empty = match serialized {
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
            _ => false,
        };
        !(empty && self.omit_if_empty)
    }

    // --- Sync ---

    /// Write the validated data into the bound source object, creating one
    /// through `restore_object` when nothing is bound.
    pub fn sync(&mut self) -> Result<&Data, SyncError> {
        let value = match &self.validation {
            Some(Validation::Valid(Some(value))) => value.clone(),
            Some(Validation::Valid(None)) => {
                return Err(SyncError::NoData {
                    path: "/".to_string(),
                })
            }
            _ => return Err(SyncError::NotValidated),
        };
        // the bound object only changes when the whole sync succeeds
        let mut target = match &self.source_object {
            Some(target) => target.clone(),
            None => self.restore(&value, "/")?,
        };
        self.sync_into(&mut target, &value, "/")?;
        let target: &Data = self.source_object.insert(target);
        Ok(target)
    }

    /// Sync `value` into `instance`, or into a restored instance when
    /// `instance` is `None`. Returns the synced instance.
    pub fn sync_to(&self, instance: Option<Data>, value: &Data) -> Result<Data, SyncError> {
        let mut target = match instance {
            Some(target) => target,
            None => self.restore(value, "/")?,
        };
        self.sync_into(&mut target, value, "/")?;
        debug!(kind = self.unit_type.tag(), "synced validated data");
        Ok(target)
    }

    pub(crate) fn restore(&self, value: &Data, path: &str) -> Result<Data, SyncError> {
        match &self.restore {
            Some(restore) => Ok(restore(value)),
            None => self.unit_type.restore_default(path),
        }
    }

    /// Target for a child container: the existing value if it fits, else a
    /// restored one.
    pub(crate) fn sync_target(
        &self,
        existing: Option<Data>,
        value: &Data,
        path: &str,
    ) -> Result<Data, SyncError> {
        match existing {
            Some(target) if self.unit_type.accepts_target(&target) => Ok(target),
            _ => self.restore(value, path),
        }
    }

    pub(crate) fn sync_into(
        &self,
        target: &mut Data,
        value: &Data,
        path: &str,
    ) -> Result<(), SyncError> {
        match self.unit_type {
            UnitType::Mapping | UnitType::ObjectMapping => {
                crate::container::sync_mapping(self, target, value, path)
            }
            UnitType::Sequence => crate::container::sync_sequence(self, target, value, path),
            ref other => Err(SyncError::NotSyncable {
                path: path.to_string(),
                kind: other.tag(),
            }),
        }
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("unit_type", &self.unit_type)
            .field("validator", &self.validator)
            .field("children", &self.children)
            .field("required", &self.required)
            .field("read_only", &self.read_only)
            .field("allow_none", &self.allow_none)
            .field("default", &self.default)
            .field("omit_if_none", &self.omit_if_none)
            .field("omit_if_empty", &self.omit_if_empty)
            .field("has_preparer", &self.preparer.is_some())
            .field("has_restore", &self.restore.is_some())
            .finish_non_exhaustive()
    }
}
