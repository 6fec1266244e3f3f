//! JSON → [`Schema`] with `$ref` expansion
//!
//! Each reference target is parsed once per schema tree and shared through
//! [`Schema::Ref`]. A reference met again while it is still being expanded
//! becomes [`Schema::Unresolved`], which keeps recursive component
//! definitions finite.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{Applicator, Schema, SchemaNode, Shape};
use crate::document::RefResolver;
use crate::error::ContractError;

/// Keywords holding a single subschema outside the modelled shapes.
const SUBSCHEMA: &[&str] = &[
    "additionalProperties",
    "additionalItems",
    "not",
    "contains",
    "if",
    "then",
    "else",
    "propertyNames",
    "unevaluatedProperties",
    "unevaluatedItems",
];

/// Keywords holding a name → subschema map.
const SUBSCHEMA_MAP: &[&str] = &[
    "patternProperties",
    "dependentSchemas",
    "$defs",
    "definitions",
];

pub(crate) struct SchemaParser<'a> {
    refs: RefResolver<'a>,
    expanding: Vec<String>,
    expanded: HashMap<String, Arc<Schema>>,
}

impl<'a> SchemaParser<'a> {
    pub(crate) fn new(root: &'a Value) -> Self {
        Self {
            refs: RefResolver::new(root),
            expanding: Vec::new(),
            expanded: HashMap::new(),
        }
    }

    pub(crate) fn parse(&mut self, value: &Value) -> Result<Schema, ContractError> {
        match value {
            Value::Bool(true) => Ok(Schema::Node(SchemaNode::default())),
            Value::Bool(false) => {
                let mut keywords = Map::new();
                keywords.insert("not".into(), Value::Object(Map::new()));
                Ok(Schema::Node(SchemaNode {
                    keywords,
                    ..SchemaNode::default()
                }))
            }
            Value::Object(obj) => match obj.get("$ref").and_then(Value::as_str) {
                Some(reference) => self.parse_ref(reference),
                None => self.parse_node(obj).map(Schema::Node),
            },
            other => Err(ContractError::MalformedSpec(format!(
                "Schema must be an object or a boolean, found [{other}]."
            ))),
        }
    }

    fn parse_ref(&mut self, reference: &str) -> Result<Schema, ContractError> {
        if self.expanding.iter().any(|r| r == reference) {
            return Ok(Schema::Unresolved {
                reference: reference.to_string(),
            });
        }
        if let Some(target) = self.expanded.get(reference) {
            return Ok(Schema::Ref {
                reference: reference.to_string(),
                target: Arc::clone(target),
            });
        }
        let raw = self.refs.lookup(reference)?;
        self.expanding.push(reference.to_string());
        let parsed = self.parse(raw);
        self.expanding.pop();

        let target = Arc::new(parsed?);
        self.expanded
            .insert(reference.to_string(), Arc::clone(&target));
        Ok(Schema::Ref {
            reference: reference.to_string(),
            target,
        })
    }

    fn parse_node(&mut self, obj: &Map<String, Value>) -> Result<SchemaNode, ContractError> {
        let mut node = SchemaNode::default();
        // (precedence, shape); lowest precedence wins the primary slot
        let mut shapes: Vec<(u8, Shape)> = Vec::new();

        for (key, value) in obj {
            match (key.as_str(), value) {
                ("type", _) => node.types = parse_types(value)?,
                ("nullable", Value::Bool(flag)) => node.nullable = Some(*flag),
                ("readOnly", Value::Bool(flag)) => node.read_only = *flag,
                ("writeOnly", Value::Bool(flag)) => node.write_only = *flag,
                ("required", Value::Array(names)) => {
                    node.required = names
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect();
                }
                ("properties", Value::Object(props)) => {
                    let mut properties = IndexMap::with_capacity(props.len());
                    for (name, prop) in props {
                        properties.insert(name.clone(), self.parse(prop)?);
                    }
                    shapes.push((0, Shape::Object(properties)));
                }
                ("items", Value::Object(_) | Value::Bool(_)) => {
                    shapes.push((1, Shape::Array(Box::new(self.parse(value)?))));
                }
                ("anyOf", Value::Array(list)) => shapes.push((2, Shape::AnyOf(self.parse_list(list)?))),
                ("allOf", Value::Array(list)) => shapes.push((3, Shape::AllOf(self.parse_list(list)?))),
                ("oneOf", Value::Array(list)) => shapes.push((4, Shape::OneOf(self.parse_list(list)?))),
                ("prefixItems", Value::Array(list)) => {
                    let list = self.parse_list(list)?;
                    node.applicators.insert(key.clone(), Applicator::List(list));
                }
                (k, Value::Object(map)) if SUBSCHEMA_MAP.contains(&k) => {
                    let mut schemas = IndexMap::with_capacity(map.len());
                    for (name, sub) in map {
                        schemas.insert(name.clone(), self.parse(sub)?);
                    }
                    node.applicators.insert(key.clone(), Applicator::Map(schemas));
                }
                (k, Value::Object(_)) if SUBSCHEMA.contains(&k) => {
                    let schema = self.parse(value)?;
                    node.applicators.insert(key.clone(), Applicator::Single(schema));
                }
                _ => {
                    node.keywords.insert(key.clone(), value.clone());
                }
            }
        }

        shapes.sort_by_key(|(precedence, _)| *precedence);
        let mut shapes = shapes.into_iter().map(|(_, shape)| shape);
        node.shape = shapes.next().unwrap_or_default();
        node.secondary = shapes.collect();
        Ok(node)
    }

    fn parse_list(&mut self, list: &[Value]) -> Result<Vec<Schema>, ContractError> {
        list.iter().map(|item| self.parse(item)).collect()
    }
}

fn parse_types(value: &Value) -> Result<Vec<String>, ContractError> {
    match value {
        Value::String(ty) => Ok(vec![ty.clone()]),
        Value::Array(types) => types
            .iter()
            .map(|ty| {
                ty.as_str().map(str::to_string).ok_or_else(|| {
                    ContractError::MalformedSpec(format!("Invalid schema type [{ty}]."))
                })
            })
            .collect(),
        other => Err(ContractError::MalformedSpec(format!(
            "Invalid schema type [{other}]."
        ))),
    }
}
