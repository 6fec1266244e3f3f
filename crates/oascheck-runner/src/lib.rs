//! oascheck-runner: contract checks for live HTTP exchanges
//!
//! Loads specs through configured sources, caches parsed documents, and
//! wraps request execution with request/response validation.

mod cache;
mod error;
mod executor;
mod guard;
pub mod source;
mod spec;
mod validate;

pub use cache::SpecCache;
pub use error::RunnerError;
pub use executor::HttpExecutor;
pub use guard::{ContractGuard, Failure, Outcome};
pub use source::{GithubSource, LocalSource, RemoteSource, SpecSource};
pub use spec::parse_spec;
pub use validate::{validate_request, validate_response};
