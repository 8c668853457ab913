//! Nativeview
//!
//! Declarative schemas that turn loosely typed input into validated domain
//! data, turn domain data back into JSON, and write validated data into
//! existing domain instances.
//!
//! A schema is a tree of [`Unit`]s. Leaf units wrap a scalar type
//! (integer, float, boolean, string, date, datetime, file); containers are
//! built from a [`Schema`] declaration (mapping, object mapping, sequence).
//!
//! # Example
//!
//! ```
//! use nativeview::{Data, ErrorDetail, Range, Schema, Unit};
//! use serde_json::json;
//!
//! let schema = Schema::mapping()
//!     .unit("age", Unit::integer().validator(Range::min(0.0)))
//!     .unit("name", Unit::string());
//!
//! let mut unit = schema.build().unwrap().with_data(json!({"age": "42", "name": "Ann"}));
//! assert!(unit.is_valid());
//! assert_eq!(unit.validated_data().and_then(|d| d.get("age")), Some(&Data::Int(42)));
//!
//! let mut unit = schema.build().unwrap().with_data(json!({"age": "x", "name": "Ann"}));
//! assert!(!unit.is_valid());
//! assert_eq!(
//!     unit.errors().map(ErrorDetail::to_json),
//!     Some(json!({"age": ["Enter a whole number."]}))
//! );
//! ```
//!
//! # Validation pipeline
//!
//! | Input | `read_only` | `required` | Result |
//! |-------|-------------|------------|--------|
//! | any | yes | - | default, or field left out |
//! | missing | no | yes | `required` error |
//! | missing | no | no | default, or field left out |
//! | `null` | no | - | `null` if `allow_none`, else `none` error |
//! | value | no | - | type conversion, then validator |
//!
//! Containers never stop at the first failure: every invalid field (or
//! element) is reported in one [`ErrorDetail`] tree.

mod container;
mod error;
mod i18n;
mod loader;
mod metadata;
pub mod preparers;
mod scalar;
mod schema;
mod types;
mod unit;
mod validator;
mod value;

pub use error::{
    DeclarationIssue, ErrorDetail, ErrorKind, LoadError, SchemaError, SerializeError, SyncError,
    ValidationError,
};
pub use i18n::{CatalogTranslator, SimpleTranslator, TranslationString, Translator};
pub use loader::{build_declaration, check_declaration, load_declaration, load_declaration_str, load_json};
pub use metadata::determine_metadata;
pub use scalar::{DateFormat, DateTimeFormat};
pub use schema::{Schema, SchemaKind};
pub use types::{json_type_name, UnitType};
pub use unit::{Outcome, Preparer, RestoreObject, Scope, Unit};
pub use validator::{
    from_fn, Choice, Choices, Email, FnValidator, Length, Range, Regex, ValidatedChain, Validator,
};
pub use value::{Data, FilePayload, Object};
