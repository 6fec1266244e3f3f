//! Recursive schema model
//!
//! A schema is a regular node, a shared expansion of a `$ref`, or an opaque
//! [`Schema::Unresolved`] leaf standing in for a cyclic `$ref`. Nodes carry
//! one primary [`Shape`]; every keyword the model does not interpret is kept
//! verbatim in `keywords` and handed to the leaf validator untouched.

mod normalize;
mod parse;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::ContractError;

pub use normalize::{AccessMode, normalize};
pub(crate) use parse::SchemaParser;

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// A reference that re-enters itself; never expanded further.
    Unresolved { reference: String },
    /// An expanded `$ref`. Every use of the same reference within one schema
    /// tree points at the same target.
    Ref {
        reference: String,
        target: Arc<Schema>,
    },
    Node(SchemaNode),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaNode {
    /// `type`, possibly multi-valued. Empty when absent.
    pub types: Vec<String>,
    /// OpenAPI 3.0 `nullable`
    pub nullable: Option<bool>,
    pub read_only: bool,
    pub write_only: bool,
    pub required: Vec<String>,
    pub shape: Shape,
    /// Shape keywords that coexisted with the primary one, carried through as-is.
    pub secondary: Vec<Shape>,
    /// Subschema keywords outside the modelled shapes (`not`, `additionalProperties`, ...).
    pub applicators: IndexMap<String, Applicator>,
    pub keywords: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Shape {
    #[default]
    Primitive,
    Object(IndexMap<String, Schema>),
    Array(Box<Schema>),
    AnyOf(Vec<Schema>),
    AllOf(Vec<Schema>),
    OneOf(Vec<Schema>),
}

/// Value of a subschema keyword the normalizer does not look into.
#[derive(Debug, Clone, PartialEq)]
pub enum Applicator {
    Single(Schema),
    List(Vec<Schema>),
    Map(IndexMap<String, Schema>),
}

/// What a schema describes at its top level, used to decide how a body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind<'a> {
    Types(&'a [String]),
    AllOf,
    AnyOf,
    OneOf,
    Unknown,
}

impl SchemaKind<'_> {
    /// Object, array or allOf-shaped schemas only accept JSON bodies.
    #[must_use]
    pub fn is_structured(self) -> bool {
        match self {
            Self::Types(types) => types.iter().any(|t| t == "object" || t == "array"),
            Self::AllOf => true,
            Self::AnyOf | Self::OneOf | Self::Unknown => false,
        }
    }
}

impl std::fmt::Display for SchemaKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Types(types) => f.write_str(&types.join("|")),
            Self::AllOf => f.write_str("allOf"),
            Self::AnyOf => f.write_str("anyOf"),
            Self::OneOf => f.write_str("oneOf"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl Schema {
    /// Parse a standalone JSON Schema; `$ref`s resolve against the value itself.
    pub fn from_json(value: &Value) -> Result<Self, ContractError> {
        SchemaParser::new(value).parse(value)
    }

    /// Node with a single `type`.
    pub fn typed(ty: &str) -> Self {
        Self::Node(SchemaNode {
            types: vec![ty.to_string()],
            ..SchemaNode::default()
        })
    }

    /// The node behind this schema, looking through shared references.
    #[must_use]
    pub fn as_node(&self) -> Option<&SchemaNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Ref { target, .. } => target.as_node(),
            Self::Unresolved { .. } => None,
        }
    }

    /// `type` if present, else the composition keyword of the primary shape.
    #[must_use]
    pub fn effective_kind(&self) -> SchemaKind<'_> {
        let Some(node) = self.as_node() else {
            return SchemaKind::Unknown;
        };
        if !node.types.is_empty() {
            return SchemaKind::Types(node.types.as_slice());
        }
        match node.shape {
            Shape::AllOf(_) => SchemaKind::AllOf,
            Shape::AnyOf(_) => SchemaKind::AnyOf,
            Shape::OneOf(_) => SchemaKind::OneOf,
            Shape::Primitive | Shape::Object(_) | Shape::Array(_) => SchemaKind::Unknown,
        }
    }

    /// First declared type other than `null`.
    #[must_use]
    pub fn primary_type(&self) -> Option<&str> {
        self.as_node()?
            .types
            .iter()
            .map(String::as_str)
            .find(|t| *t != "null")
    }

    /// Items schema of an array-shaped node.
    #[must_use]
    pub fn items(&self) -> Option<&Self> {
        match &self.as_node()?.shape {
            Shape::Array(items) => Some(items.as_ref()),
            _ => None,
        }
    }

    /// Render as JSON Schema for the leaf validator.
    ///
    /// Shared references render once under `$defs` and are pointed at with
    /// `$ref`. Unresolved leaves render as `{}` and accept any instance.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut defs = Defs::default();
        let mut out = self.render(&mut defs);
        if !defs.rendered.is_empty() {
            if let Value::Object(map) = &mut out {
                let slot = map
                    .entry("$defs")
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(existing) = slot {
                    existing.extend(defs.rendered);
                }
            }
        }
        out
    }

    fn render(&self, defs: &mut Defs) -> Value {
        match self {
            Self::Unresolved { .. } => Value::Object(Map::new()),
            Self::Ref { reference, target } => {
                let mut out = Map::new();
                out.insert("$ref".into(), Value::String(defs.pointer(reference, target)));
                Value::Object(out)
            }
            Self::Node(node) => node.render(defs),
        }
    }
}

impl SchemaNode {
    #[must_use]
    pub fn has_type(&self, ty: &str) -> bool {
        self.types.iter().any(|t| t == ty)
    }

    fn render(&self, defs: &mut Defs) -> Value {
        let mut out = Map::new();
        match self.types.as_slice() {
            [] => {}
            [single] => {
                out.insert("type".into(), Value::String(single.clone()));
            }
            many => {
                out.insert(
                    "type".into(),
                    Value::Array(many.iter().cloned().map(Value::String).collect()),
                );
            }
        }
        if let Some(nullable) = self.nullable {
            out.insert("nullable".into(), Value::Bool(nullable));
        }
        if self.read_only {
            out.insert("readOnly".into(), Value::Bool(true));
        }
        if self.write_only {
            out.insert("writeOnly".into(), Value::Bool(true));
        }
        if !self.required.is_empty() {
            out.insert(
                "required".into(),
                Value::Array(self.required.iter().cloned().map(Value::String).collect()),
            );
        }
        for shape in std::iter::once(&self.shape).chain(&self.secondary) {
            if let Some((keyword, value)) = shape.render(defs) {
                out.insert(keyword.into(), value);
            }
        }
        for (keyword, applicator) in &self.applicators {
            out.insert(keyword.clone(), applicator.render(defs));
        }
        for (keyword, value) in &self.keywords {
            out.insert(keyword.clone(), value.clone());
        }
        Value::Object(out)
    }
}

impl Shape {
    fn render(&self, defs: &mut Defs) -> Option<(&'static str, Value)> {
        match self {
            Self::Primitive => None,
            Self::Object(properties) => Some((
                "properties",
                Value::Object(
                    properties
                        .iter()
                        .map(|(name, schema)| (name.clone(), schema.render(defs)))
                        .collect(),
                ),
            )),
            Self::Array(items) => Some(("items", items.render(defs))),
            Self::AnyOf(schemas) => Some(("anyOf", render_list(schemas, defs))),
            Self::AllOf(schemas) => Some(("allOf", render_list(schemas, defs))),
            Self::OneOf(schemas) => Some(("oneOf", render_list(schemas, defs))),
        }
    }
}

impl Applicator {
    fn render(&self, defs: &mut Defs) -> Value {
        match self {
            Self::Single(schema) => schema.render(defs),
            Self::List(schemas) => render_list(schemas, defs),
            Self::Map(schemas) => Value::Object(
                schemas
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.render(defs)))
                    .collect(),
            ),
        }
    }
}

fn render_list(schemas: &[Schema], defs: &mut Defs) -> Value {
    Value::Array(schemas.iter().map(|schema| schema.render(defs)).collect())
}

/// `$defs` collected while rendering, one entry per reference.
#[derive(Default)]
struct Defs {
    keys: HashMap<String, String>,
    rendered: Map<String, Value>,
}

impl Defs {
    /// `$ref` pointer for `reference`, rendering its target on first use.
    fn pointer(&mut self, reference: &str, target: &Schema) -> String {
        if let Some(key) = self.keys.get(reference) {
            return format!("#/$defs/{key}");
        }
        let key = self.fresh_key(reference);
        self.keys.insert(reference.to_string(), key.clone());
        let value = target.render(self);
        self.rendered.insert(key.clone(), value);
        format!("#/$defs/{key}")
    }

    /// Last pointer segment, restricted to characters that need no escaping.
    fn fresh_key(&self, reference: &str) -> String {
        let base: String = reference
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            .collect();
        let base = if base.is_empty() { "schema".to_string() } else { base };
        let taken = |key: &str| self.keys.values().any(|k| k == key);
        let mut key = base.clone();
        let mut suffix = 1;
        while taken(&key) {
            suffix += 1;
            key = format!("{base}_{suffix}");
        }
        key
    }
}
