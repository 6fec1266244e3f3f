//! Request line → declared operation
//!
//! Templates are compared as literal strings after the mount prefix is
//! applied. `{id}` placeholders are not pattern-matched: hosts pass the
//! route template they matched, not the concrete URL.

use crate::document::{Document, Method, Operation};
use crate::error::ContractError;

/// Operation selected for a request, borrowed from the document.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedOperation<'a> {
    pub template: &'a str,
    pub method: Method,
    pub operation: &'a Operation,
}

impl ResolvedOperation<'_> {
    /// `operationId`, or `METHOD template` when the spec gives none.
    #[must_use]
    pub fn label(&self) -> String {
        self.operation
            .operation_id
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.method, self.template))
    }
}

/// Mount a template under `prefix`; an empty prefix leaves it unchanged.
#[must_use]
pub fn prefixed(prefix: &str, template: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        template.to_string()
    } else {
        format!("/{prefix}/{}", template.trim_start_matches('/'))
    }
}

/// Find the operation for `method` on `request_path`.
///
/// A path without any matching template is `InvalidPath`, whatever the method.
pub fn resolve<'a>(
    document: &'a Document,
    method: &str,
    request_path: &str,
    prefix: &str,
) -> Result<ResolvedOperation<'a>, ContractError> {
    let path = request_path.split('?').next().unwrap_or_default();
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    let (template, item) = document
        .paths
        .iter()
        .find(|(template, _)| prefixed(prefix, template) == path)
        .ok_or_else(|| ContractError::InvalidPath {
            method: method.to_ascii_uppercase(),
            path: path.clone(),
        })?;

    let invalid_method = || ContractError::InvalidMethod {
        method: method.to_ascii_uppercase(),
        path: path.clone(),
    };
    let parsed = Method::parse(method).ok_or_else(invalid_method)?;
    let operation = item.operations.get(&parsed).ok_or_else(invalid_method)?;

    Ok(ResolvedOperation {
        template,
        method: parsed,
        operation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Document {
        Document::from_value(&json!({
            "openapi": "3.1.0",
            "paths": {
                "/users": {
                    "get": {"operationId": "listUsers", "responses": {}}
                },
                "/users/{id}": {
                    "get": {"responses": {}}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn resolves_declared_operation() {
        let doc = document();
        let resolved = resolve(&doc, "get", "/users", "").unwrap();
        assert_eq!(resolved.template, "/users");
        assert_eq!(resolved.method, Method::Get);
        assert_eq!(resolved.label(), "listUsers");

        let resolved = resolve(&doc, "GET", "users?page=2", "").unwrap();
        assert_eq!(resolved.template, "/users");
    }

    #[test]
    fn wrong_method_and_missing_path_are_distinguished() {
        let doc = document();
        assert_eq!(
            resolve(&doc, "PUT", "/users", "").unwrap_err(),
            ContractError::InvalidMethod {
                method: "PUT".into(),
                path: "/users".into()
            }
        );
        assert_eq!(
            resolve(&doc, "GET", "/missing", "").unwrap_err(),
            ContractError::InvalidPath {
                method: "GET".into(),
                path: "/missing".into()
            }
        );
        // Unknown verb on an unknown path is still a path failure
        assert!(matches!(
            resolve(&doc, "BREW", "/missing", "").unwrap_err(),
            ContractError::InvalidPath { .. }
        ));
        assert!(matches!(
            resolve(&doc, "BREW", "/users", "").unwrap_err(),
            ContractError::InvalidMethod { .. }
        ));
    }

    #[test]
    fn prefix_is_applied_to_templates() {
        let doc = document();
        assert!(resolve(&doc, "GET", "/v1/users", "v1").is_ok());
        assert!(resolve(&doc, "GET", "/v1/users", "/v1/").is_ok());
        assert!(matches!(
            resolve(&doc, "GET", "/users", "v1").unwrap_err(),
            ContractError::InvalidPath { .. }
        ));
    }

    #[test]
    fn placeholders_are_compared_verbatim() {
        let doc = document();
        assert!(matches!(
            resolve(&doc, "GET", "/users/42", "").unwrap_err(),
            ContractError::InvalidPath { .. }
        ));
        let resolved = resolve(&doc, "GET", "/users/{id}", "").unwrap();
        assert_eq!(resolved.label(), "GET /users/{id}");
    }

    #[test]
    fn prefix_join() {
        assert_eq!(prefixed("", "/users"), "/users");
        assert_eq!(prefixed("api/v2", "/users"), "/api/v2/users");
        assert_eq!(prefixed("/", "/users"), "/users");
    }
}
