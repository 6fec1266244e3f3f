//! Typed OpenAPI document: paths, operations, parameters, bodies, responses
//!
//! Built once per spec and shared read-only afterwards.

mod parse;
mod refs;

use indexmap::IndexMap;

use crate::schema::Schema;

pub(crate) use refs::RefResolver;

/// OpenAPI dialect, decided by the `openapi` version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// 3.0.x: `nullable`, boolean exclusive bounds
    V30,
    /// 3.1 and later: JSON Schema 2020-12
    V31,
}

impl Dialect {
    #[must_use]
    pub fn from_version(version: &str) -> Option<Self> {
        if version.starts_with("3.0") {
            Some(Self::V30)
        } else if version.starts_with("3.") {
            Some(Self::V31)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Method {
    pub const ALL: [Self; 8] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Options,
        Self::Head,
        Self::Patch,
        Self::Trace,
    ];

    /// Lower-cased key as used in a Path Item
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Trace => "trace",
        }
    }

    /// Case-insensitive parse of an HTTP method name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub schema: Option<Schema>,
}

/// Media type → schema. `None` when the media type declares no schema.
pub type Content = IndexMap<String, Option<Schema>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    pub content: Content,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub content: Content,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operation {
    pub operation_id: Option<String>,
    /// Path-level parameters merged in; operation-level wins on (name, location).
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    /// Keyed by status code, range (`2XX`) or `default`.
    pub responses: IndexMap<String, Response>,
}

impl Operation {
    /// Declared response for a status: exact code, then range key, then `default`.
    #[must_use]
    pub fn response_for(&self, status: u16) -> Option<&Response> {
        let exact = status.to_string();
        let range = format!("{}XX", status / 100);
        self.responses
            .get(&exact)
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(&range))
                    .map(|(_, response)| response)
            })
            .or_else(|| self.responses.get("default"))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathItem {
    pub parameters: Vec<Parameter>,
    pub operations: IndexMap<Method, Operation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub version: String,
    pub dialect: Dialect,
    /// Path template → item, in declaration order
    pub paths: IndexMap<String, PathItem>,
}

impl Document {
    /// Every declared `(template, method, operation)`, in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = (&str, Method, &Operation)> {
        self.paths.iter().flat_map(|(template, item)| {
            item.operations
                .iter()
                .map(move |(method, op)| (template.as_str(), *method, op))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_from_version() {
        assert_eq!(Dialect::from_version("3.0.3"), Some(Dialect::V30));
        assert_eq!(Dialect::from_version("3.1.0"), Some(Dialect::V31));
        assert_eq!(Dialect::from_version("2.0"), None);
    }

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("GET"), Some(Method::Get));
        assert_eq!(Method::parse("patch"), Some(Method::Patch));
        assert_eq!(Method::parse("CONNECT"), None);
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn response_lookup_order() {
        let tagged = |tag: &str| Response {
            content: std::iter::once((tag.to_string(), None)).collect(),
        };
        let tag_of = |response: Option<&Response>| {
            response.and_then(|r| r.content.keys().next().cloned())
        };

        let mut op = Operation::default();
        op.responses.insert("default".into(), tagged("fallback"));
        op.responses.insert("2XX".into(), tagged("range"));
        op.responses.insert("200".into(), tagged("exact"));

        assert_eq!(tag_of(op.response_for(200)).as_deref(), Some("exact"));
        assert_eq!(tag_of(op.response_for(204)).as_deref(), Some("range"));
        assert_eq!(tag_of(op.response_for(404)).as_deref(), Some("fallback"));

        op.responses.shift_remove("default");
        assert!(op.response_for(404).is_none());
    }
}
