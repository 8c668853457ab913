//! Schema declarations: ordered named slots of template units, built into a
//! fresh owned unit tree on every use.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::SchemaError;
use crate::types::UnitType;
use crate::unit::{RestoreObject, Unit};
use crate::value::Data;

/// Which container a schema builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Mapping,
    ObjectMapping,
    Sequence,
}

impl SchemaKind {
    fn unit_type(self) -> UnitType {
        match self {
            SchemaKind::Mapping => UnitType::Mapping,
            SchemaKind::ObjectMapping => UnitType::ObjectMapping,
            SchemaKind::Sequence => UnitType::Sequence,
        }
    }
}

/// An ordered declaration of template units.
///
/// Templates are never mutated by use: [`Schema::build`] clones every unit
/// into a new tree with clean runtime state.
///
/// ```
/// use nativeview::{Schema, Unit};
///
/// let base = Schema::mapping()
///     .unit("id", Unit::integer())
///     .unit("name", Unit::string());
/// let person = Schema::mapping()
///     .extends(&base)
///     .unit("email", Unit::string())
///     .unit("name", Unit::string().required(false));
///
/// assert_eq!(person.declared().collect::<Vec<_>>(), ["id", "name", "email"]);
/// ```
#[derive(Clone)]
pub struct Schema {
    kind: SchemaKind,
    units: Vec<(String, Unit)>,
    // units[..inherited] sit in base-schema positions
    inherited: usize,
    own: HashSet<String>,
    restore: Option<RestoreObject>,
}

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            units: Vec::new(),
            inherited: 0,
            own: HashSet::new(),
            restore: None,
        }
    }

    pub fn mapping() -> Self {
        Self::new(SchemaKind::Mapping)
    }

    pub fn object_mapping() -> Self {
        Self::new(SchemaKind::ObjectMapping)
    }

    pub fn sequence() -> Self {
        Self::new(SchemaKind::Sequence)
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// Declare a slot. Re-declaring an existing name replaces the unit but
    /// keeps the slot's position.
    pub fn unit(mut self, name: impl Into<String>, unit: Unit) -> Self {
        let name = name.into();
        self.own.insert(name.clone());
        match self.position(&name) {
            Some(index) => self.units[index].1 = unit,
            None => self.units.push((name, unit)),
        }
        self
    }

    /// Inherit the slots of `base`.
    ///
    /// Base slots go after previously inherited slots and before this
    /// schema's own ones. A slot this schema declares itself keeps its own
    /// unit but moves to the inherited position.
    pub fn extends(mut self, base: &Schema) -> Self {
        for (name, unit) in &base.units {
            match self.position(name) {
                Some(index) if self.own.contains(name) => {
                    if index >= self.inherited {
                        let own = self.units.remove(index);
                        self.units.insert(self.inherited, own);
                        self.inherited += 1;
                    }
                }
                Some(index) => self.units[index].1 = unit.clone(),
                None => {
                    self.units.insert(self.inherited, (name.clone(), unit.clone()));
                    self.inherited += 1;
                }
            }
        }
        if self.restore.is_none() {
            self.restore = base.restore.clone();
        }
        self
    }

    /// Hook creating a fresh domain instance when sync has no target.
    pub fn restore_object(mut self, restore: impl Fn(&Data) -> Data + Send + Sync + 'static) -> Self {
        self.restore = Some(Arc::new(restore));
        self
    }

    /// Slot names in declaration order.
    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|(name, _)| name.as_str())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.units.iter().position(|(slot, _)| slot == name)
    }

    /// Instantiate a new unit tree from the templates.
    pub fn build(&self) -> Result<Unit, SchemaError> {
        if self.kind == SchemaKind::Sequence && self.units.len() != 1 {
            return Err(SchemaError::SequenceArity {
                count: self.units.len(),
            });
        }

        let mut root = Unit::new(self.kind.unit_type());
        root.children = self
            .units
            .iter()
            .map(|(name, template)| {
                let mut unit = template.clone();
                unit.reset();
                unit.set_name_if_missing(name);
                (name.clone(), unit)
            })
            .collect();
        root.set_restore(self.restore.clone());
        debug!(kind = ?self.kind, slots = root.children.len(), "built schema");
        Ok(root)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("kind", &self.kind)
            .field("units", &self.units)
            .field("inherited", &self.inherited)
            .field("own", &self.own)
            .field("has_restore", &self.restore.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn declaration_order_is_kept() {
        let schema = Schema::mapping()
            .unit("b", Unit::integer())
            .unit("a", Unit::string())
            .unit("c", Unit::boolean());
        let unit = schema.build().unwrap();
        let names: Vec<_> = unit.children().map(|(name, _)| name).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn children_are_named_from_slots() {
        let unit = Schema::mapping()
            .unit("plain", Unit::integer())
            .unit("renamed", Unit::integer().named("other"))
            .build()
            .unwrap();
        assert_eq!(unit.child("plain").and_then(Unit::name), Some("plain"));
        assert_eq!(unit.child("renamed").and_then(Unit::name), Some("other"));
    }

    #[test]
    fn sequence_arity_is_checked() {
        assert!(matches!(
            Schema::sequence().build(),
            Err(SchemaError::SequenceArity { count: 0 })
        ));
        assert!(matches!(
            Schema::sequence()
                .unit("a", Unit::integer())
                .unit("b", Unit::integer())
                .build(),
            Err(SchemaError::SequenceArity { count: 2 })
        ));
        assert!(Schema::sequence().unit("item", Unit::integer()).build().is_ok());
    }

    #[test]
    fn redeclared_field_keeps_inherited_position() {
        let base = Schema::mapping()
            .unit("a", Unit::integer())
            .unit("b", Unit::integer())
            .unit("c", Unit::integer());
        let child = Schema::mapping()
            .extends(&base)
            .unit("d", Unit::integer())
            .unit("b", Unit::string());
        assert_eq!(child.declared().collect::<Vec<_>>(), ["a", "b", "c", "d"]);

        let unit = child.build().unwrap();
        assert_eq!(unit.child("b").map(Unit::unit_type), Some(&UnitType::String));
    }

    #[test]
    fn extends_after_own_units_still_puts_base_first() {
        let base = Schema::mapping()
            .unit("a", Unit::integer())
            .unit("b", Unit::integer());
        let child = Schema::mapping()
            .unit("x", Unit::integer())
            .unit("b", Unit::boolean())
            .extends(&base);
        assert_eq!(child.declared().collect::<Vec<_>>(), ["a", "b", "x"]);
        let unit = child.build().unwrap();
        assert_eq!(unit.child("b").map(Unit::unit_type), Some(&UnitType::Boolean));
    }

    #[test]
    fn own_slot_survives_repeated_extends() {
        let first = Schema::mapping()
            .unit("a", Unit::integer())
            .unit("b", Unit::integer());
        let second = Schema::mapping()
            .unit("b", Unit::boolean())
            .unit("c", Unit::boolean());
        let child = Schema::mapping()
            .unit("b", Unit::string())
            .extends(&first)
            .extends(&second);
        assert_eq!(child.declared().collect::<Vec<_>>(), ["a", "b", "c"]);

        let unit = child.build().unwrap();
        assert_eq!(unit.child("b").map(Unit::unit_type), Some(&UnitType::String));
        assert_eq!(unit.child("c").map(Unit::unit_type), Some(&UnitType::Boolean));
    }

    #[test]
    fn later_base_overrides_earlier_base() {
        let first = Schema::mapping().unit("a", Unit::integer());
        let second = Schema::mapping().unit("a", Unit::string());
        let unit = Schema::mapping()
            .extends(&first)
            .extends(&second)
            .build()
            .unwrap();
        assert_eq!(unit.child("a").map(Unit::unit_type), Some(&UnitType::String));
    }

    #[test]
    fn built_trees_are_independent() {
        let schema = Schema::mapping().unit("n", Unit::integer());
        let mut first = schema.build().unwrap().with_data(json!({"n": 1}));
        let second = schema.build().unwrap();
        assert!(first.is_valid());
        assert!(second.initial_data().is_none());
    }

    #[test]
    fn restore_hook_is_inherited() {
        let base = Schema::object_mapping()
            .unit("a", Unit::integer())
            .restore_object(|_| Data::Object(crate::value::Object::new("Thing")));
        let unit = Schema::object_mapping().extends(&base).build().unwrap();
        let synced = unit
            .sync_to(None, &Data::Map([("a".to_string(), Data::Int(1))].into()))
            .unwrap();
        assert_eq!(synced.as_object().map(|o| o.class()), Some("Thing"));
    }
}
