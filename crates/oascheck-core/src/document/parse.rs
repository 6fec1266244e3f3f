//! `serde_json::Value` → typed [`Document`]

use indexmap::IndexMap;
use serde_json::Value;

use super::{
    Content, Dialect, Document, Method, Operation, ParamLocation, Parameter, PathItem, RefResolver,
    RequestBody, Response,
};
use crate::error::ContractError;
use crate::schema::{Schema, SchemaParser};

impl Document {
    /// Build the typed model from a parsed OpenAPI 3.x document.
    pub fn from_value(root: &Value) -> Result<Self, ContractError> {
        let version = root
            .get("openapi")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("Spec is missing the `openapi` version field."))?;
        let dialect = Dialect::from_version(version)
            .ok_or_else(|| malformed(format!("Unsupported OpenAPI version [{version}].")))?;

        let ctx = Context {
            root,
            refs: RefResolver::new(root),
        };

        let mut paths = IndexMap::new();
        if let Some(raw) = root.get("paths") {
            let raw = raw
                .as_object()
                .ok_or_else(|| malformed("`paths` must be an object."))?;
            for (template, item) in raw {
                paths.insert(template.clone(), ctx.path_item(item)?);
            }
        }

        Ok(Self {
            version: version.to_string(),
            dialect,
            paths,
        })
    }
}

struct Context<'a> {
    root: &'a Value,
    refs: RefResolver<'a>,
}

impl<'a> Context<'a> {
    fn path_item(&self, item: &'a Value) -> Result<PathItem, ContractError> {
        let item = self.refs.follow(item)?;
        let shared = self.parameters(item.get("parameters"))?;

        let mut operations = IndexMap::new();
        for method in Method::ALL {
            let Some(operation) = item.get(method.as_str()) else {
                continue;
            };
            let own = self.parameters(operation.get("parameters"))?;
            operations.insert(method, self.operation(operation, &shared, own)?);
        }

        Ok(PathItem {
            parameters: shared,
            operations,
        })
    }

    fn operation(
        &self,
        operation: &'a Value,
        shared: &[Parameter],
        own: Vec<Parameter>,
    ) -> Result<Operation, ContractError> {
        // Path-level first, operation-level overriding on (name, in)
        let mut parameters: Vec<Parameter> = shared
            .iter()
            .filter(|p| {
                !own.iter()
                    .any(|o| o.name == p.name && o.location == p.location)
            })
            .cloned()
            .collect();
        parameters.extend(own);

        let request_body = operation
            .get("requestBody")
            .map(|body| self.request_body(body))
            .transpose()?;

        let mut responses = IndexMap::new();
        if let Some(raw) = operation.get("responses").and_then(Value::as_object) {
            for (key, response) in raw {
                let response = self.refs.follow(response)?;
                responses.insert(
                    key.clone(),
                    Response {
                        content: self.content(response.get("content"))?,
                    },
                );
            }
        }

        Ok(Operation {
            operation_id: operation
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string),
            parameters,
            request_body,
            responses,
        })
    }

    fn parameters(&self, raw: Option<&'a Value>) -> Result<Vec<Parameter>, ContractError> {
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };
        let list = raw
            .as_array()
            .ok_or_else(|| malformed("`parameters` must be an array."))?;
        list.iter().map(|param| self.parameter(param)).collect()
    }

    fn parameter(&self, param: &'a Value) -> Result<Parameter, ContractError> {
        let param = self.refs.follow(param)?;
        let name = param
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("Parameter is missing `name`."))?;
        let location = match param.get("in").and_then(Value::as_str) {
            Some("path") => ParamLocation::Path,
            Some("query") => ParamLocation::Query,
            Some("header") => ParamLocation::Header,
            Some("cookie") => ParamLocation::Cookie,
            other => {
                return Err(malformed(format!(
                    "Parameter [{name}] has invalid location [{}].",
                    other.unwrap_or("")
                )));
            }
        };

        // `schema`, or the schema of the single `content` entry
        let schema_value = param.get("schema").or_else(|| {
            param
                .get("content")
                .and_then(Value::as_object)
                .and_then(|content| content.values().next())
                .and_then(|media| media.get("schema"))
        });

        Ok(Parameter {
            name: name.to_string(),
            location,
            required: param
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            schema: schema_value.map(|s| self.schema(s)).transpose()?,
        })
    }

    fn request_body(&self, body: &'a Value) -> Result<RequestBody, ContractError> {
        let body = self.refs.follow(body)?;
        Ok(RequestBody {
            required: body
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            content: self.content(body.get("content"))?,
        })
    }

    fn content(&self, raw: Option<&'a Value>) -> Result<Content, ContractError> {
        let mut content = Content::new();
        let Some(raw) = raw.and_then(Value::as_object) else {
            return Ok(content);
        };
        for (media_type, media) in raw {
            let schema = media
                .get("schema")
                .map(|s| self.schema(s))
                .transpose()?;
            content.insert(media_type.clone(), schema);
        }
        Ok(content)
    }

    fn schema(&self, value: &Value) -> Result<Schema, ContractError> {
        SchemaParser::new(self.root).parse(value)
    }
}

fn malformed(message: impl Into<String>) -> ContractError {
    ContractError::MalformedSpec(message.into())
}
