//! Request and response contract checks
//!
//! Both sides normalize the declared schema for their access mode, decode the
//! body, and hand leaf constraints to `jsonschema`.

mod body;
mod leaf;
mod request;
mod response;

pub use request::validate_request;
pub use response::validate_response;
