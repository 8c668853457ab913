//! End-to-end behavior of declared schemas: deserialize, serialize, sync.

use std::collections::BTreeMap;
use std::sync::Arc;

use nativeview::{
    determine_metadata, CatalogTranslator, Choices, Data, ErrorDetail, ErrorKind, Object,
    Outcome, Range, Schema, SchemaError, Scope, SyncError, Unit, ValidationError, Validator,
};
use serde_json::{json, Value};

fn int_str_schema() -> Schema {
    Schema::mapping()
        .unit("int_unit", Unit::integer())
        .unit("str_unit", Unit::string())
}

fn map(entries: &[(&str, Data)]) -> Data {
    Data::Map(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
    )
}

mod deserialize {
    use super::*;

    #[test]
    fn mapping_converts_every_field() {
        let unit = int_str_schema().build().unwrap();
        let data = unit
            .deserialize(&json!({"int_unit": "123", "str_unit": "abc"}))
            .unwrap();
        assert_eq!(
            data,
            map(&[("int_unit", Data::Int(123)), ("str_unit", Data::from("abc"))])
        );
    }

    #[test]
    fn invalid_field_is_reported_by_name() {
        let mut unit = int_str_schema()
            .build()
            .unwrap()
            .with_data(json!({"int_unit": "x", "str_unit": "abc"}));
        assert!(!unit.is_valid());
        assert_eq!(
            unit.errors().map(ErrorDetail::to_json),
            Some(json!({"int_unit": ["Enter a whole number."]}))
        );
        assert_eq!(unit.validated_data(), None);
    }

    #[test]
    fn every_invalid_field_is_collected() {
        let schema = Schema::mapping()
            .unit("a", Unit::integer())
            .unit("b", Unit::float())
            .unit("c", Unit::boolean())
            .unit("d", Unit::string())
            .unit("e", Unit::integer());
        let mut unit = schema
            .build()
            .unwrap()
            .with_data(json!({"a": "one", "b": "two", "c": "maybe", "d": "ok", "e": 5}));
        assert!(!unit.is_valid());
        let errors = unit.errors().unwrap();
        assert_eq!(errors.len(), 3);
        for name in ["a", "b", "c"] {
            assert!(errors.field(name).is_some(), "missing error for {name}");
        }
        assert_eq!(
            errors.field("c").and_then(ErrorDetail::messages),
            Some(&["\"maybe\" is not a valid boolean.".to_string()][..])
        );
    }

    #[test]
    fn sequence_errors_are_keyed_by_index() {
        let mut unit = Schema::sequence()
            .unit("item", Unit::integer())
            .build()
            .unwrap()
            .with_data(json!([1, "x", 3]));
        assert!(!unit.is_valid());
        let errors = unit.errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.item(1),
            Some(&ErrorDetail::message("Enter a whole number."))
        );
        assert_eq!(
            unit.errors().map(ErrorDetail::to_json),
            Some(json!({"1": ["Enter a whole number."]}))
        );
    }

    #[test]
    fn sequence_rejects_non_lists() {
        let unit = Schema::sequence()
            .unit("item", Unit::integer())
            .build()
            .unwrap();
        for raw in [json!("123"), json!({"a": 1}), json!(5)] {
            let err = unit.deserialize(&raw).unwrap_err();
            assert_eq!(err.kind, ErrorKind::NotIterable);
        }
        let err = unit.deserialize(&json!("abc")).unwrap_err();
        assert_eq!(
            err.detail,
            ErrorDetail::message("Expected a list of items but got type \"string\".")
        );
    }

    #[test]
    fn read_only_sequence_always_fails() {
        let unit = Schema::sequence()
            .unit("item", Unit::integer())
            .build()
            .unwrap()
            .read_only(true);
        for raw in [json!([1, 2]), json!([]), json!("x"), json!({})] {
            let err = unit.deserialize(&raw).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ReadOnlyWrite);
        }
    }

    #[test]
    fn read_only_children_are_never_missing() {
        let unit = Schema::mapping()
            .unit("id", Unit::integer().read_only(true))
            .unit("name", Unit::string())
            .build()
            .unwrap();
        let data = unit.deserialize(&json!({"id": "ignored", "name": "n"})).unwrap();
        assert_eq!(data, map(&[("name", Data::from("n"))]));
    }

    #[test]
    fn skipped_fields_leave_no_trace() {
        let unit = Schema::mapping()
            .unit("opt", Unit::integer().required(false))
            .unit("dflt", Unit::integer().required(false).default_value(7))
            .build()
            .unwrap();
        let data = unit.deserialize(&json!({})).unwrap();
        assert_eq!(data, map(&[("dflt", Data::Int(7))]));
    }

    #[test]
    fn nested_errors_keep_their_shape() {
        let address = Schema::mapping()
            .unit("zip", Unit::integer())
            .build()
            .unwrap();
        let tags = Schema::sequence()
            .unit("tag", Unit::string().validator(Choices::new(["a", "b"])))
            .build()
            .unwrap();
        let unit = Schema::mapping()
            .unit("address", address)
            .unit("tags", tags)
            .build()
            .unwrap();
        let err = unit
            .deserialize(&json!({"address": {"zip": "abc"}, "tags": ["a", "z"]}))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Nested);
        assert_eq!(
            err.detail.to_json(),
            json!({
                "address": {"zip": ["Enter a whole number."]},
                "tags": {"1": ["z is not one of a, b"]}
            })
        );
    }

    #[test]
    fn null_handling_for_every_type() {
        let units = [
            Unit::integer(),
            Unit::float(),
            Unit::boolean(),
            Unit::string(),
            Unit::date(Default::default()),
            Unit::datetime(Default::default()),
            Unit::file(),
            Schema::mapping().build().unwrap(),
            Schema::sequence().unit("i", Unit::integer()).build().unwrap(),
        ];
        for unit in units {
            let unit = unit.allow_none(true);
            assert_eq!(
                unit.run_validation(Some(&Value::Null), &unit.scope()),
                Outcome::Present(Data::Null)
            );
            assert_eq!(unit.serialize_value(&Data::Null), Ok(Value::Null));
        }
    }

    #[test]
    fn translator_applies_to_nested_messages() {
        let translator = CatalogTranslator::new()
            .insert("Enter a whole number.", "Geben Sie eine ganze Zahl ein.")
            .insert("${value} is less than minimum value ${min}", "${value} < ${min}");
        let mut unit = Schema::mapping()
            .unit("n", Unit::integer())
            .unit("m", Unit::integer().validator(Range::min(10.0)))
            .build()
            .unwrap()
            .with_translator(Arc::new(translator))
            .with_data(json!({"n": "x", "m": 3}));
        assert!(!unit.is_valid());
        assert_eq!(
            unit.errors().map(ErrorDetail::to_json),
            Some(json!({
                "n": ["Geben Sie eine ganze Zahl ein."],
                "m": ["3 < 10"]
            }))
        );
    }

    /// Rejects integers above the root context's `max`.
    #[derive(Debug)]
    struct ContextMax;

    impl Validator for ContextMax {
        fn validate(&self, _unit: &Unit, value: &Data, scope: &Scope<'_>) -> Result<(), ValidationError> {
            let max = scope.context().get("max").and_then(Value::as_i64);
            match (value, max) {
                (Data::Int(n), Some(max)) if *n > max => Err(ValidationError::new(
                    ErrorKind::Constraint,
                    format!("{n} exceeds {max} at {}", scope.path()),
                )),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn root_context_reaches_nested_validators() {
        let schema = Schema::mapping().unit(
            "inner",
            Schema::mapping()
                .unit(
                    "n",
                    Schema::sequence()
                        .unit("item", Unit::integer().validator(ContextMax))
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
        );
        let data = json!({"inner": {"n": [1, 5]}});

        let strict = json!({"max": 3}).as_object().cloned().unwrap();
        let mut unit = schema.build().unwrap().with_context(strict).with_data(data.clone());
        assert!(!unit.is_valid());
        assert_eq!(
            unit.errors().map(ErrorDetail::to_json),
            Some(json!({"inner": {"n": {"1": ["5 exceeds 3 at /inner/n/1"]}}}))
        );

        let loose = json!({"max": 10}).as_object().cloned().unwrap();
        let mut unit = schema.build().unwrap().with_context(loose).with_data(data);
        assert!(unit.is_valid(), "{:?}", unit.errors());
    }
}

mod declaration {
    use super::*;

    #[test]
    fn sequence_arity_fails_at_construction() {
        assert!(matches!(
            Schema::sequence().build(),
            Err(SchemaError::SequenceArity { count: 0 })
        ));
        let two = Schema::sequence()
            .unit("a", Unit::integer())
            .unit("b", Unit::string());
        assert!(matches!(two.build(), Err(SchemaError::SequenceArity { count: 2 })));
    }

    #[test]
    fn subclass_redeclaration_keeps_position() {
        let base = int_str_schema().unit("flag", Unit::boolean());
        let derived = Schema::mapping()
            .extends(&base)
            .unit("extra", Unit::float())
            .unit("int_unit", Unit::integer().required(false));

        let unit = derived.build().unwrap();
        let names: Vec<_> = unit.children().map(|(name, _)| name).collect();
        assert_eq!(names, ["int_unit", "str_unit", "flag", "extra"]);
        assert!(!unit.child("int_unit").unwrap().is_required());

        let serialized = unit
            .serialize_value(&map(&[
                ("extra", Data::Float(1.5)),
                ("flag", Data::Bool(true)),
                ("int_unit", Data::Int(1)),
                ("str_unit", Data::from("s")),
            ]))
            .unwrap();
        let keys: Vec<_> = serialized.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["int_unit", "str_unit", "flag", "extra"]);
    }

    #[test]
    fn templates_are_untouched_by_use() {
        let schema = int_str_schema();
        let mut first = schema.build().unwrap().with_data(json!({"int_unit": "x"}));
        assert!(!first.is_valid());
        let mut second = schema
            .build()
            .unwrap()
            .with_data(json!({"int_unit": 1, "str_unit": "s"}));
        assert!(second.is_valid());
        assert!(first.errors().is_some());
    }
}

mod serialize {
    use super::*;

    #[test]
    fn object_mapping_reads_attributes() {
        let unit = Schema::object_mapping()
            .unit("title", Unit::string())
            .unit("pages", Unit::integer().named("page_count"))
            .unit("missing", Unit::string().omit_if_none(true))
            .build()
            .unwrap()
            .with_object(Object::new("Book").with("title", "Dune").with("page_count", 412));
        assert_eq!(unit.serialize(), Ok(json!({"title": "Dune", "pages": 412})));
    }

    #[test]
    fn omit_if_empty_drops_empty_containers() {
        let unit = Schema::mapping()
            .unit(
                "tags",
                Schema::sequence()
                    .unit("t", Unit::string())
                    .build()
                    .unwrap()
                    .omit_if_empty(true),
            )
            .unit("name", Unit::string())
            .build()
            .unwrap();
        let value = map(&[("tags", Data::List(vec![])), ("name", Data::from(""))]);
        assert_eq!(unit.serialize_value(&value), Ok(json!({"name": ""})));
    }

    #[test]
    fn wrong_domain_value_is_a_serialize_error() {
        let unit = int_str_schema().build().unwrap();
        let err = unit
            .serialize_value(&map(&[("int_unit", Data::from(vec![1]))]))
            .unwrap_err();
        assert!(err.to_string().contains("/int_unit"));
    }
}

mod sync {
    use super::*;

    fn validated(mut unit: Unit, data: Value) -> Unit {
        unit.bind_data(data);
        assert!(unit.is_valid(), "{:?}", unit.errors());
        unit
    }

    #[test]
    fn object_mapping_without_restore_is_not_implemented() {
        let unit = Schema::object_mapping()
            .unit("a", Unit::integer())
            .build()
            .unwrap();
        let mut unit = validated(unit, json!({"a": 1}));
        assert!(matches!(
            unit.sync(),
            Err(SyncError::RestoreNotImplemented { .. })
        ));
    }

    #[test]
    fn object_mapping_with_restore_builds_fresh_object() {
        let unit = Schema::object_mapping()
            .unit("a", Unit::integer())
            .restore_object(|_| Data::from(Object::new("Thing")))
            .build()
            .unwrap();
        let mut unit = validated(unit, json!({"a": "1"}));
        let synced = unit.sync().unwrap();
        let object = synced.as_object().unwrap();
        assert_eq!(object.class(), "Thing");
        assert_eq!(object.getattr("a"), &Data::Int(1));
    }

    #[test]
    fn sync_updates_bound_object_in_place() {
        let unit = Schema::object_mapping()
            .unit("title", Unit::string())
            .unit("pages", Unit::integer().named("page_count"))
            .build()
            .unwrap()
            .with_object(Object::new("Book").with("title", "Old").with("isbn", "123"));
        let mut unit = validated(unit, json!({"title": "New", "pages": 10}));
        let object = unit.sync().unwrap().as_object().unwrap().clone();
        assert_eq!(object.getattr("title"), &Data::from("New"));
        assert_eq!(object.getattr("page_count"), &Data::Int(10));
        assert_eq!(object.getattr("isbn"), &Data::from("123"));
        assert!(!object.hasattr("pages"));
    }

    #[test]
    fn nested_containers_sync_recursively() {
        let address = Schema::mapping()
            .unit("city", Unit::string())
            .build()
            .unwrap();
        let phones = Schema::sequence()
            .unit(
                "phone",
                Schema::mapping().unit("number", Unit::string()).build().unwrap(),
            )
            .build()
            .unwrap();
        let unit = Schema::mapping()
            .unit("name", Unit::string())
            .unit("address", address)
            .unit("phones", phones)
            .build()
            .unwrap()
            .with_object(map(&[
                ("name", Data::from("old")),
                ("address", map(&[("street", Data::from("Main St"))])),
            ]));
        let mut unit = validated(
            unit,
            json!({
                "name": "Ann",
                "address": {"city": "Oslo"},
                "phones": [{"number": "1"}, {"number": "2"}]
            }),
        );
        let synced = unit.sync().unwrap().clone();
        assert_eq!(
            synced.to_json(),
            json!({
                "name": "Ann",
                "address": {"city": "Oslo", "street": "Main St"},
                "phones": [{"number": "1"}, {"number": "2"}]
            })
        );
    }

    #[test]
    fn failed_nested_sync_leaves_bound_object_untouched() {
        let geo = Schema::object_mapping()
            .unit("lat", Unit::integer())
            .build()
            .unwrap();
        let address = Schema::object_mapping()
            .unit("city", Unit::string())
            .unit("geo", geo)
            .build()
            .unwrap();
        let original = Object::new("User").with("address", Object::new("Address").with("city", "old"));
        let unit = Schema::object_mapping()
            .unit("address", address)
            .build()
            .unwrap()
            .with_object(original.clone());
        let mut unit = validated(
            unit,
            json!({"address": {"city": "new", "geo": {"lat": 1}}}),
        );

        assert!(matches!(
            unit.sync(),
            Err(SyncError::RestoreNotImplemented { .. })
        ));
        assert_eq!(unit.source_object(), Some(&Data::from(original)));
    }

    #[test]
    fn sequence_sync_appends_in_order() {
        let unit = Schema::sequence()
            .unit("n", Unit::integer())
            .build()
            .unwrap();
        let synced = unit
            .sync_to(Some(Data::from(vec![0])), &Data::from(vec![1, 2]))
            .unwrap();
        assert_eq!(synced, Data::from(vec![0, 1, 2]));

        let fresh = unit.sync_to(None, &Data::from(vec![3])).unwrap();
        assert_eq!(fresh, Data::from(vec![3]));
    }

    #[test]
    fn sync_requires_successful_validation() {
        let mut unit = int_str_schema()
            .build()
            .unwrap()
            .with_data(json!({"int_unit": "x"}));
        assert_eq!(unit.sync().unwrap_err(), SyncError::NotValidated);
        assert!(!unit.is_valid());
        assert_eq!(unit.sync().unwrap_err(), SyncError::NotValidated);
    }

    #[test]
    fn mismatched_target_is_rejected() {
        let unit = int_str_schema().build().unwrap();
        let err = unit
            .sync_to(Some(Data::from("text")), &map(&[("int_unit", Data::Int(1))]))
            .unwrap_err();
        assert!(matches!(err, SyncError::TargetMismatch { .. }));
    }
}

mod metadata {
    use super::*;

    #[test]
    fn metadata_for_declared_schema() {
        let unit = Schema::mapping()
            .unit("age", Unit::integer().validator(Range::new(Some(0.0), Some(130.0))))
            .unit(
                "tags",
                Schema::sequence()
                    .unit("tag", Unit::string())
                    .build()
                    .unwrap()
                    .required(false),
            )
            .build()
            .unwrap();
        assert_eq!(
            determine_metadata(&unit),
            json!({
                "type": "dictionary",
                "required": true,
                "read_only": false,
                "fields": {
                    "age": {
                        "type": "integer",
                        "required": true,
                        "read_only": false,
                        "min": 0,
                        "max": 130
                    },
                    "tags": {
                        "type": "sequence",
                        "required": false,
                        "read_only": false,
                        "fields": {
                            "tag": {"type": "string", "required": true, "read_only": false}
                        }
                    }
                }
            })
        );
    }
}
