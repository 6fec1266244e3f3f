//! Dialect- and access-mode-independent canonical form of a schema
//!
//! Runs before every leaf validation. Never mutates its input: the document's
//! schemas are shared between concurrent checks.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{Schema, SchemaNode, Shape};
use crate::document::Dialect;

/// Which side of the exchange a schema is checked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Parameters: no filtering
    #[default]
    None,
    /// Responses: `writeOnly` properties are dropped
    Read,
    /// Request bodies: `readOnly` properties are dropped
    Write,
}

impl AccessMode {
    fn drops(self, schema: &Schema) -> bool {
        let Some(node) = schema.as_node() else {
            return false;
        };
        match self {
            Self::None => false,
            Self::Read => node.write_only,
            Self::Write => node.read_only,
        }
    }
}

/// Produce the canonical form of `schema` for the given dialect and access mode.
///
/// Idempotent: normalizing an already normalized schema returns it unchanged.
/// Shared references are normalized once and stay shared in the output.
#[must_use]
pub fn normalize(schema: &Schema, dialect: Dialect, mode: AccessMode) -> Schema {
    Normalizer {
        dialect,
        mode,
        shared: HashMap::new(),
    }
    .schema(schema)
}

struct Normalizer {
    dialect: Dialect,
    mode: AccessMode,
    shared: HashMap<String, Arc<Schema>>,
}

impl Normalizer {
    fn schema(&mut self, schema: &Schema) -> Schema {
        match schema {
            Schema::Unresolved { .. } => schema.clone(),
            Schema::Ref { reference, target } => {
                let target = match self.shared.get(reference) {
                    Some(done) => Arc::clone(done),
                    None => {
                        let done = Arc::new(self.schema(target));
                        self.shared.insert(reference.clone(), Arc::clone(&done));
                        done
                    }
                };
                Schema::Ref {
                    reference: reference.clone(),
                    target,
                }
            }
            Schema::Node(node) => self.node(node),
        }
    }

    fn node(&mut self, node: &SchemaNode) -> Schema {
        let mut out = SchemaNode {
            types: node.types.clone(),
            nullable: node.nullable,
            read_only: node.read_only,
            write_only: node.write_only,
            required: node.required.clone(),
            shape: Shape::Primitive,
            secondary: node.secondary.clone(),
            applicators: node.applicators.clone(),
            keywords: node.keywords.clone(),
        };

        let mut null_alternative = false;
        let mut wrap_nullable = false;
        if self.dialect == Dialect::V30 {
            if out.nullable.take() == Some(true) {
                if matches!(node.shape, Shape::AnyOf(_)) {
                    null_alternative = true;
                } else if !out.types.is_empty() {
                    if !out.has_type("null") {
                        out.types.push("null".into());
                    }
                } else if matches!(node.shape, Shape::AllOf(_) | Shape::OneOf(_)) {
                    wrap_nullable = true;
                }
            }
            migrate_exclusive_bound(&mut out.keywords, "exclusiveMinimum", "minimum");
            migrate_exclusive_bound(&mut out.keywords, "exclusiveMaximum", "maximum");
        }

        out.shape = match &node.shape {
            Shape::Primitive if out.has_type("object") => Shape::Object(IndexMap::new()),
            Shape::Primitive => Shape::Primitive,
            Shape::Object(properties) => {
                let mut kept = IndexMap::with_capacity(properties.len());
                for (name, property) in properties {
                    if self.mode.drops(property) {
                        out.required.retain(|required| required != name);
                    } else {
                        kept.insert(name.clone(), self.schema(property));
                    }
                }
                Shape::Object(kept)
            }
            Shape::Array(items) => Shape::Array(Box::new(self.schema(items))),
            Shape::AnyOf(list) => {
                let mut list = self.list(list);
                if null_alternative {
                    list.push(Schema::typed("null"));
                }
                Shape::AnyOf(list)
            }
            Shape::AllOf(list) => Shape::AllOf(self.list(list)),
            Shape::OneOf(list) => Shape::OneOf(self.list(list)),
        };

        // Object-typed composition nodes still carry an (empty) property map
        let composed = matches!(out.shape, Shape::AnyOf(_) | Shape::AllOf(_) | Shape::OneOf(_));
        let has_properties = out
            .secondary
            .iter()
            .any(|shape| matches!(shape, Shape::Object(_)));
        if composed && out.has_type("object") && !has_properties {
            out.secondary.insert(0, Shape::Object(IndexMap::new()));
        }

        if wrap_nullable {
            return Schema::Node(SchemaNode {
                shape: Shape::AnyOf(vec![Schema::Node(out), Schema::typed("null")]),
                ..SchemaNode::default()
            });
        }
        Schema::Node(out)
    }

    fn list(&mut self, list: &[Schema]) -> Vec<Schema> {
        list.iter().map(|schema| self.schema(schema)).collect()
    }
}

/// 3.0 `exclusiveMinimum: true` + `minimum: 5` → `exclusiveMinimum: 5`
fn migrate_exclusive_bound(keywords: &mut Map<String, Value>, exclusive: &str, bound: &str) {
    match keywords.get(exclusive) {
        Some(Value::Bool(true)) => match keywords.remove(bound) {
            Some(limit) => {
                keywords.insert(exclusive.to_string(), limit);
            }
            None => {
                keywords.remove(exclusive);
            }
        },
        Some(Value::Bool(false)) => {
            keywords.remove(exclusive);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn schema(value: Value) -> Schema {
        Schema::from_json(&value).unwrap()
    }

    fn type_set(schema: &Schema) -> Vec<String> {
        let mut types = schema.as_node().unwrap().types.clone();
        types.sort();
        types
    }

    #[test]
    fn nullable_string_becomes_type_list() {
        let out = normalize(
            &schema(json!({"type": "string", "nullable": true})),
            Dialect::V30,
            AccessMode::None,
        );
        assert_eq!(type_set(&out), vec!["null", "string"]);
        assert_eq!(out.as_node().unwrap().nullable, None);
        assert!(out.to_json().get("nullable").is_none());
    }

    #[test]
    fn nullable_any_of_gets_null_alternative() {
        let out = normalize(
            &schema(json!({
                "nullable": true,
                "anyOf": [{"type": "string"}, {"type": "integer"}]
            })),
            Dialect::V30,
            AccessMode::None,
        );
        assert_eq!(
            out.to_json(),
            json!({"anyOf": [{"type": "string"}, {"type": "integer"}, {"type": "null"}]})
        );
    }

    #[test]
    fn nullable_false_is_just_dropped() {
        let out = normalize(
            &schema(json!({"type": "string", "nullable": false})),
            Dialect::V30,
            AccessMode::None,
        );
        assert_eq!(out.to_json(), json!({"type": "string"}));
    }

    #[test]
    fn nullable_untyped_all_of_is_wrapped() {
        let out = normalize(
            &schema(json!({"nullable": true, "allOf": [{"type": "object"}]})),
            Dialect::V30,
            AccessMode::None,
        );
        assert_eq!(
            out.to_json(),
            json!({"anyOf": [
                {"allOf": [{"type": "object", "properties": {}}]},
                {"type": "null"}
            ]})
        );
    }

    #[test]
    fn nullable_is_left_alone_in_3_1() {
        let raw = json!({"type": "string", "nullable": true});
        let out = normalize(&schema(raw.clone()), Dialect::V31, AccessMode::None);
        assert_eq!(out.to_json(), raw);
    }

    #[test]
    fn existing_null_type_is_not_duplicated() {
        let out = normalize(
            &schema(json!({"type": ["string", "null"], "nullable": true})),
            Dialect::V30,
            AccessMode::None,
        );
        assert_eq!(type_set(&out), vec!["null", "string"]);
    }

    #[test]
    fn exclusive_bounds_migrate_in_3_0() {
        let out = normalize(
            &schema(json!({
                "type": "integer",
                "minimum": 1,
                "exclusiveMinimum": true,
                "maximum": 10,
                "exclusiveMaximum": false
            })),
            Dialect::V30,
            AccessMode::None,
        );
        assert_eq!(
            out.to_json(),
            json!({"type": "integer", "exclusiveMinimum": 1, "maximum": 10})
        );
    }

    #[test]
    fn object_type_gets_empty_properties() {
        let out = normalize(
            &schema(json!({"type": ["object", "null"]})),
            Dialect::V31,
            AccessMode::None,
        );
        assert!(matches!(out.as_node().unwrap().shape, Shape::Object(ref p) if p.is_empty()));
    }

    #[test]
    fn object_typed_composition_gets_empty_properties() {
        let out = normalize(
            &schema(json!({"type": "object", "allOf": [{"required": ["id"]}]})),
            Dialect::V31,
            AccessMode::None,
        );
        let node = out.as_node().unwrap();
        assert!(matches!(node.shape, Shape::AllOf(_)));
        assert_eq!(node.secondary, vec![Shape::Object(IndexMap::new())]);
        assert_eq!(normalize(&out, Dialect::V31, AccessMode::None), out);
    }

    #[test]
    fn shared_targets_are_normalized_once_and_stay_shared() {
        let doc = json!({
            "$defs": {
                "Id": {"type": "integer", "readOnly": true},
                "Tag": {"type": "string", "nullable": true}
            },
            "type": "object",
            "required": ["id", "a", "b"],
            "properties": {
                "id": {"$ref": "#/$defs/Id"},
                "a": {"$ref": "#/$defs/Tag"},
                "b": {"$ref": "#/$defs/Tag"}
            }
        });
        let out = normalize(&schema(doc), Dialect::V30, AccessMode::Write);
        let node = out.as_node().unwrap();
        let Shape::Object(props) = &node.shape else {
            panic!("expected object shape");
        };

        // readOnly is read through the reference
        assert!(!props.contains_key("id"));
        assert_eq!(node.required, vec!["a", "b"]);

        let (Schema::Ref { target: a, .. }, Schema::Ref { target: b, .. }) = (&props["a"], &props["b"])
        else {
            panic!("expected shared references");
        };
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(type_set(a), vec!["null", "string"]);
    }

    fn user() -> Schema {
        schema(json!({
            "type": "object",
            "required": ["id", "password", "name"],
            "properties": {
                "id": {"type": "integer", "readOnly": true},
                "password": {
                    "type": "object",
                    "writeOnly": true,
                    "required": ["hash"],
                    "properties": {"hash": {"type": "string"}}
                },
                "name": {"type": "string"}
            }
        }))
    }

    #[test]
    fn read_mode_drops_write_only_and_its_requirement() {
        let out = normalize(&user(), Dialect::V31, AccessMode::Read);
        let node = out.as_node().unwrap();
        let Shape::Object(props) = &node.shape else {
            panic!("expected object shape");
        };
        assert!(!props.contains_key("password"));
        assert!(props.contains_key("id"));
        assert_eq!(node.required, vec!["id", "name"]);
    }

    #[test]
    fn write_mode_keeps_write_only_and_drops_read_only() {
        let out = normalize(&user(), Dialect::V31, AccessMode::Write);
        let node = out.as_node().unwrap();
        let Shape::Object(props) = &node.shape else {
            panic!("expected object shape");
        };
        assert!(props.contains_key("password"));
        assert!(!props.contains_key("id"));
        assert_eq!(node.required, vec!["password", "name"]);
        assert_eq!(
            props["password"].to_json(),
            json!({
                "type": "object",
                "writeOnly": true,
                "required": ["hash"],
                "properties": {"hash": {"type": "string"}}
            })
        );
    }

    #[test]
    fn none_mode_filters_nothing() {
        let out = normalize(&user(), Dialect::V31, AccessMode::None);
        assert_eq!(out, user());
    }

    #[test]
    fn filtering_recurses_through_items_and_composition() {
        let raw = json!({
            "type": "array",
            "items": {
                "allOf": [{
                    "type": "object",
                    "properties": {"secret": {"type": "string", "writeOnly": true}}
                }]
            }
        });
        let out = normalize(&schema(raw), Dialect::V31, AccessMode::Read);
        assert_eq!(
            out.to_json(),
            json!({
                "type": "array",
                "items": {"allOf": [{"type": "object", "properties": {}}]}
            })
        );
    }

    #[test]
    fn cyclic_leaf_is_returned_unchanged() {
        let doc = json!({
            "$defs": {
                "Node": {
                    "type": "object",
                    "nullable": true,
                    "properties": {"next": {"$ref": "#/$defs/Node"}}
                }
            },
            "$ref": "#/$defs/Node"
        });
        let parsed = schema(doc);
        let out = normalize(&parsed, Dialect::V30, AccessMode::Read);
        let Shape::Object(props) = &out.as_node().unwrap().shape else {
            panic!("expected object shape");
        };
        assert_eq!(
            props["next"],
            Schema::Unresolved {
                reference: "#/$defs/Node".into()
            }
        );
    }

    #[test]
    fn input_is_not_mutated() {
        let original = user();
        let copy = original.clone();
        let _ = normalize(&original, Dialect::V30, AccessMode::Read);
        assert_eq!(original, copy);
    }

    fn arb_types() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(
            prop_oneof![
                Just("string"),
                Just("integer"),
                Just("object"),
                Just("array"),
                Just("null"),
            ]
            .prop_map(String::from),
            0..3,
        )
    }

    fn arb_schema() -> impl Strategy<Value = Schema> {
        let leaf = prop_oneof![
            Just(Schema::Unresolved {
                reference: "#/components/schemas/Node".into()
            }),
            (arb_types(), any::<Option<bool>>(), any::<bool>(), any::<bool>()).prop_map(
                |(types, nullable, read_only, write_only)| {
                    Schema::Node(SchemaNode {
                        types,
                        nullable,
                        read_only,
                        write_only,
                        ..SchemaNode::default()
                    })
                }
            ),
        ];
        leaf.prop_recursive(4, 48, 4, |inner| {
            let node = |types: Vec<String>, nullable: Option<bool>, shape: Shape| {
                Schema::Node(SchemaNode {
                    types,
                    nullable,
                    shape,
                    ..SchemaNode::default()
                })
            };
            prop_oneof![
                (
                    prop::collection::vec(("[a-d]", inner.clone()), 0..4),
                    prop::collection::vec("[a-d]", 0..3),
                    arb_types(),
                    any::<Option<bool>>(),
                    any::<bool>(),
                )
                    .prop_map(move |(props, required, types, nullable, write_only)| {
                        Schema::Node(SchemaNode {
                            types,
                            nullable,
                            write_only,
                            required,
                            shape: Shape::Object(props.into_iter().collect()),
                            ..SchemaNode::default()
                        })
                    }),
                (inner.clone(), arb_types(), any::<Option<bool>>())
                    .prop_map(move |(items, types, nullable)| {
                        node(types, nullable, Shape::Array(Box::new(items)))
                    }),
                (prop::collection::vec(inner.clone(), 1..3), any::<Option<bool>>())
                    .prop_map(move |(list, nullable)| node(Vec::new(), nullable, Shape::AnyOf(list))),
                (prop::collection::vec(inner.clone(), 1..3), any::<Option<bool>>())
                    .prop_map(move |(list, nullable)| node(Vec::new(), nullable, Shape::AllOf(list))),
                (prop::collection::vec(inner, 1..3), any::<Option<bool>>())
                    .prop_map(move |(list, nullable)| node(Vec::new(), nullable, Shape::OneOf(list))),
            ]
        })
    }

    fn arb_mode() -> impl Strategy<Value = AccessMode> {
        prop_oneof![
            Just(AccessMode::None),
            Just(AccessMode::Read),
            Just(AccessMode::Write),
        ]
    }

    fn arb_dialect() -> impl Strategy<Value = Dialect> {
        prop_oneof![Just(Dialect::V30), Just(Dialect::V31)]
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(
            schema in arb_schema(),
            mode in arb_mode(),
            dialect in arb_dialect(),
        ) {
            let once = normalize(&schema, dialect, mode);
            let twice = normalize(&once, dialect, mode);
            prop_assert_eq!(once, twice);
        }
    }
}
