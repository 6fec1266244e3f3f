//! Resolve → validate request → execute → validate response

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use oascheck_core::{
    Config, ContractError, Document, FailurePayload, HttpRequest, HttpResponse, StatusPolicy,
    resolve,
};
use tracing::{debug, warn};

use crate::cache::SpecCache;
use crate::error::RunnerError;
use crate::source::{self, SpecSource};
use crate::spec::parse_spec;
use crate::validate::{validate_request, validate_response};

/// Contract guard for one test (or one CLI invocation).
///
/// Without a selected spec it passes requests straight through.
#[derive(Clone)]
pub struct ContractGuard {
    sources: BTreeMap<String, Arc<dyn SpecSource>>,
    source: String,
    spec: Option<String>,
    prefix: String,
    capture: bool,
    policy: StatusPolicy,
    cache: SpecCache,
}

/// What happened to one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No spec selected; the response was not checked
    Unchecked(HttpResponse),
    Passed {
        operation: String,
        response: HttpResponse,
    },
    Failed(Failure),
}

/// A captured contract failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub status: u16,
    pub payload: FailurePayload,
    pub error: ContractError,
}

impl Failure {
    #[must_use]
    pub fn new(error: ContractError, policy: StatusPolicy) -> Self {
        Self {
            status: error.status_code(policy),
            payload: error.to_payload(),
            error,
        }
    }
}

impl Outcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            Self::Unchecked(_) | Self::Passed { .. } => None,
        }
    }

    /// Response to hand back to the caller; failures become a JSON payload.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        match self {
            Self::Unchecked(response) | Self::Passed { response, .. } => response,
            Self::Failed(failure) => HttpResponse::new(failure.status).with_body(
                "application/json",
                serde_json::to_string(&failure.payload).unwrap_or_default(),
            ),
        }
    }
}

impl ContractGuard {
    /// Guard with no sources; register some or build from a [`Config`].
    #[must_use]
    pub fn new(cache: SpecCache) -> Self {
        Self {
            sources: BTreeMap::new(),
            source: "local".to_string(),
            spec: None,
            prefix: String::new(),
            capture: true,
            policy: StatusPolicy::default(),
            cache,
        }
    }

    /// # Errors
    ///
    /// Returns error if a configured source cannot be built.
    pub fn from_config(config: &Config, cache: SpecCache) -> Result<Self, RunnerError> {
        let mut guard = Self::new(cache)
            .with_source(config.default_source.clone())
            .with_prefix(config.path_prefix.clone())
            .with_capture(config.capture_failures)
            .with_policy(config.status_policy());
        guard.spec = config.default_spec.clone();
        for (name, source_config) in &config.sources {
            guard
                .sources
                .insert(name.clone(), Arc::from(source::from_config(source_config)?));
        }
        Ok(guard)
    }

    #[must_use]
    pub fn register_source(
        mut self,
        name: impl Into<String>,
        source: impl SpecSource + 'static,
    ) -> Self {
        self.sources.insert(name.into(), Arc::new(source));
        self
    }

    /// Select the spec checked by [`run`](Self::run).
    #[must_use]
    pub fn with_spec(mut self, name: impl Into<String>) -> Self {
        self.spec = Some(name.into());
        self
    }

    /// Turn checking off for this guard.
    #[must_use]
    pub fn without_spec(mut self) -> Self {
        self.spec = None;
        self
    }

    #[must_use]
    pub fn with_source(mut self, name: impl Into<String>) -> Self {
        self.source = name.into();
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// `false` returns failures as `Err` instead of [`Outcome::Failed`].
    #[must_use]
    pub fn with_capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The selected spec, loaded through the cache. `None` when no spec is selected.
    pub fn document(&self) -> Result<Option<Arc<Document>>, ContractError> {
        let Some(name) = self.spec.as_deref() else {
            return Ok(None);
        };
        let source = self.sources.get(&self.source).ok_or_else(|| {
            ContractError::MissingSpec(format!("Spec source [{}] is not configured.", self.source))
        })?;
        let key = source.identity(name);
        self.cache
            .get_or_load(&key, || {
                debug!(spec = name, source = %self.source, "loading spec");
                let text = source.acquire(name)?;
                parse_spec(name, &text)
            })
            .map(Some)
    }

    /// Check `request`, run it through `execute`, check the response.
    ///
    /// # Errors
    ///
    /// Only when capture is off: the contract failure itself.
    pub fn run<F, E>(&self, request: &HttpRequest, execute: F) -> Result<Outcome, ContractError>
    where
        F: FnOnce(&HttpRequest) -> Result<HttpResponse, E>,
        E: Display,
    {
        match self.check(request, execute) {
            Ok(outcome) => Ok(outcome),
            Err(error) if self.capture => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    kind = %error.kind(),
                    "{error}"
                );
                Ok(Outcome::Failed(Failure::new(error, self.policy)))
            }
            Err(error) => Err(error),
        }
    }

    fn check<F, E>(&self, request: &HttpRequest, execute: F) -> Result<Outcome, ContractError>
    where
        F: FnOnce(&HttpRequest) -> Result<HttpResponse, E>,
        E: Display,
    {
        let Some(document) = self.document()? else {
            debug!(path = %request.path, "no spec selected, passing through");
            return execute(request)
                .map(Outcome::Unchecked)
                .map_err(|e| ContractError::Execution(e.to_string()));
        };

        let resolved = resolve(&document, &request.method, &request.path, &self.prefix)?;
        let operation = resolved.label();
        debug!(%operation, "resolved operation");

        validate_request(request, resolved.operation, document.dialect)?;
        let response = execute(request).map_err(|e| ContractError::Execution(e.to_string()))?;
        validate_response(&request.path, &response, resolved.operation, document.dialect)?;

        Ok(Outcome::Passed {
            operation,
            response,
        })
    }
}

impl std::fmt::Debug for ContractGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractGuard")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("source", &self.source)
            .field("spec", &self.spec)
            .field("prefix", &self.prefix)
            .field("capture", &self.capture)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oascheck_core::ErrorKind;

    struct Inline(&'static str);

    impl SpecSource for Inline {
        fn identity(&self, name: &str) -> String {
            format!("inline:{name}")
        }

        fn acquire(&self, _name: &str) -> Result<String, ContractError> {
            Ok(self.0.to_string())
        }
    }

    const SPEC: &str = r#"{"openapi": "3.1.0", "paths": {"/ping": {"get": {"responses": {"200": {"description": "ok"}}}}}}"#;

    fn ok(_: &HttpRequest) -> Result<HttpResponse, String> {
        Ok(HttpResponse::new(200))
    }

    #[test]
    fn no_spec_is_passthrough() {
        let guard = ContractGuard::new(SpecCache::new()).register_source("local", Inline(SPEC));
        let outcome = guard.run(&HttpRequest::new("GET", "/anything"), ok).unwrap();
        assert_eq!(outcome, Outcome::Unchecked(HttpResponse::new(200)));
    }

    #[test]
    fn unknown_source_is_missing_spec() {
        let guard = ContractGuard::new(SpecCache::new()).with_spec("users.json");
        let outcome = guard.run(&HttpRequest::new("GET", "/ping"), ok).unwrap();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.payload.exception, ErrorKind::MissingSpec);
        assert_eq!(failure.status, 500);
    }

    #[test]
    fn transport_errors_are_unexpected() {
        let guard = ContractGuard::new(SpecCache::new())
            .register_source("local", Inline(SPEC))
            .with_spec("ping.json");
        let outcome = guard
            .run(&HttpRequest::new("GET", "/ping"), |_| {
                Err::<HttpResponse, _>("connection refused")
            })
            .unwrap();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.payload.exception, ErrorKind::Unexpected);
        assert_eq!(failure.payload.message, "connection refused");
        assert_eq!(failure.status, 500);
    }

    #[test]
    fn failure_becomes_json_response() {
        let guard = ContractGuard::new(SpecCache::new())
            .register_source("local", Inline(SPEC))
            .with_spec("ping.json")
            .with_policy(StatusPolicy {
                distinguish_not_found: true,
            });
        let outcome = guard.run(&HttpRequest::new("GET", "/pong"), ok).unwrap();
        let response = outcome.into_response();
        assert_eq!(response.status, 404);
        assert_eq!(response.content_type(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["exception"], "InvalidPath");
        assert_eq!(body["message"], "Path [GET /pong] not found in spec.");
    }
}
