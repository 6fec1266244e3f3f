//! Contract failure taxonomy and the structured payload surfaced to callers

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of contract failure - determines the status code handed back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ErrorKind {
    /// No usable spec configured, or acquisition failed
    MissingSpec,
    /// Spec text failed to parse, or describes something unsupported
    MalformedSpec,
    /// A `$ref` inside the spec could not be resolved
    UnresolvableReference,
    /// No operation matches the request path
    InvalidPath,
    /// Path matches, method does not
    InvalidMethod,
    /// Parameter or request body failed presence/schema checks
    RequestValidation,
    /// Status, content-type or body failed schema checks
    ResponseValidation,
    /// Anything else (e.g. the system under test could not be reached)
    Unexpected,
}

impl ErrorKind {
    /// Stable name used as `exception` in the failure payload
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingSpec => "MissingSpec",
            Self::MalformedSpec => "MalformedSpec",
            Self::UnresolvableReference => "UnresolvableReference",
            Self::InvalidPath => "InvalidPath",
            Self::InvalidMethod => "InvalidMethod",
            Self::RequestValidation => "RequestValidation",
            Self::ResponseValidation => "ResponseValidation",
            Self::Unexpected => "Unexpected",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the caller wants ambiguous kinds mapped onto HTTP statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusPolicy {
    /// Report `InvalidPath` as 404 instead of 422
    pub distinguish_not_found: bool,
}

/// A single failed schema constraint.
///
/// `pointer` is a JSON pointer into the validated instance (`/0/id`);
/// `expected` is the schema fragment of the failing keyword and `used` the
/// instance value found at `pointer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    pub keyword: String,
    pub pointer: String,
    pub message: String,
    #[serde(default)]
    pub expected: serde_json::Value,
    #[serde(default)]
    pub used: serde_json::Value,
}

impl Violation {
    /// Dotted form of the pointer (`/0/id` → `0.id`), empty for the root.
    #[must_use]
    pub fn path(&self) -> String {
        self.pointer
            .split('/')
            .skip(1)
            .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// One-line description used in the flattened `errors` list.
    #[must_use]
    pub fn describe(&self) -> String {
        let path = self.path();
        if path.is_empty() {
            format!("{}: {}", self.keyword, self.message)
        } else {
            format!("{path} ({}): {}", self.keyword, self.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractError {
    #[error("{0}")]
    MissingSpec(String),
    #[error("{0}")]
    MalformedSpec(String),
    #[error("Unable to resolve reference [{0}].")]
    UnresolvableReference(String),
    #[error("Path [{method} {path}] not found in spec.")]
    InvalidPath { method: String, path: String },
    #[error("[{method}] not a valid method for [{path}].")]
    InvalidMethod { method: String, path: String },
    #[error("{message}")]
    RequestValidation {
        message: String,
        violations: Vec<Violation>,
    },
    #[error("{message}")]
    ResponseValidation {
        message: String,
        violations: Vec<Violation>,
    },
    #[error("{0}")]
    Execution(String),
}

impl ContractError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::RequestValidation {
            message: message.into(),
            violations: Vec::new(),
        }
    }

    pub fn response(message: impl Into<String>) -> Self {
        Self::ResponseValidation {
            message: message.into(),
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingSpec(_) => ErrorKind::MissingSpec,
            Self::MalformedSpec(_) => ErrorKind::MalformedSpec,
            Self::UnresolvableReference(_) => ErrorKind::UnresolvableReference,
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::InvalidMethod { .. } => ErrorKind::InvalidMethod,
            Self::RequestValidation { .. } => ErrorKind::RequestValidation,
            Self::ResponseValidation { .. } => ErrorKind::ResponseValidation,
            Self::Execution(_) => ErrorKind::Unexpected,
        }
    }

    /// Structured constraint detail, empty for non-schema failures.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::RequestValidation { violations, .. }
            | Self::ResponseValidation { violations, .. } => violations,
            _ => &[],
        }
    }

    /// HTTP status handed back to the caller for this failure.
    #[must_use]
    pub const fn status_code(&self, policy: StatusPolicy) -> u16 {
        match self.kind() {
            ErrorKind::InvalidPath => {
                if policy.distinguish_not_found {
                    404
                } else {
                    422
                }
            }
            ErrorKind::InvalidMethod => 405,
            ErrorKind::RequestValidation | ErrorKind::ResponseValidation => 400,
            ErrorKind::MissingSpec
            | ErrorKind::MalformedSpec
            | ErrorKind::UnresolvableReference
            | ErrorKind::Unexpected => 500,
        }
    }

    #[must_use]
    pub fn to_payload(&self) -> FailurePayload {
        let violations = self.violations();
        FailurePayload {
            exception: self.kind(),
            message: self.to_string(),
            errors: if violations.is_empty() {
                None
            } else {
                Some(violations.iter().map(Violation::describe).collect())
            },
        }
    }
}

/// Body of a captured contract failure.
///
/// `errors` is only present for schema-validation failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FailurePayload {
    pub exception: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

/// JSON Schema describing [`FailurePayload`].
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(FailurePayload);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
