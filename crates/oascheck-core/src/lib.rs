//! oascheck-core: OpenAPI contract model for request/response checking
//!
//! This crate parses an OpenAPI 3.0/3.1 document into a typed model, resolves
//! requests to declared operations, and normalizes schemas for leaf
//! validation. It performs no I/O beyond reading config files.

pub mod config;
pub mod document;
pub mod error;
pub mod http;
pub mod media;
pub mod resolver;
pub mod schema;

pub use config::{Config, ConfigError, SourceConfig};
pub use document::{
    Content, Dialect, Document, Method, Operation, ParamLocation, Parameter, PathItem,
    RequestBody, Response,
};
pub use error::{ContractError, ErrorKind, FailurePayload, StatusPolicy, Violation};
pub use http::{Headers, HttpRequest, HttpResponse};
pub use resolver::{ResolvedOperation, resolve};
pub use schema::{AccessMode, Applicator, Schema, SchemaKind, SchemaNode, Shape, normalize};
