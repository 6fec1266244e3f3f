//! Outbound response checks
//!
//! No I/O. Status lookup, content-type match, then the body in read mode.

use oascheck_core::{
    AccessMode, ContractError, Dialect, HttpResponse, Operation, media, normalize,
};

use super::{body, leaf};

/// Check `response` against the declared responses of `operation`.
///
/// `path` only appears in the failure message.
pub fn validate_response(
    path: &str,
    response: &HttpResponse,
    operation: &Operation,
    dialect: Dialect,
) -> Result<(), ContractError> {
    let status = response.status;
    let Some(declared) = operation.response_for(status) else {
        return Err(ContractError::response(format!(
            "No response object matching returned status code [{status}] for [{path}]."
        )));
    };
    if declared.content.is_empty() {
        return Ok(());
    }

    let content_type = response.content_type().unwrap_or_default();
    let Some(entry) = media::lookup(&declared.content, content_type) else {
        let expected = declared
            .content
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ContractError::response(format!(
            "Response did not match any specified content type. Expected one of [{expected}], got [{content_type}]."
        )));
    };
    let Some(schema) = entry else {
        return Ok(());
    };

    let normalized = normalize(schema, dialect, AccessMode::Read);
    let instance = body::decode(schema.effective_kind(), content_type, &response.body)
        .map_err(|e| ContractError::response(e.to_string()))?;
    let violations = leaf::check(&normalized, &instance)?;
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ContractError::ResponseValidation {
            message: "Response body did not match provided schema.".to_string(),
            violations,
        })
    }
}
