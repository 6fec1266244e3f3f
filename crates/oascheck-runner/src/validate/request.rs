//! Inbound request checks: parameters first, then the body

use oascheck_core::{
    AccessMode, ContractError, Dialect, HttpRequest, Operation, ParamLocation, Parameter, Schema,
    media, normalize,
};
use serde_json::Value;

use super::{body, leaf};

/// Check `request` against the operation it resolved to.
///
/// Stops at the first failing parameter; the body is only looked at once
/// every parameter passed.
pub fn validate_request(
    request: &HttpRequest,
    operation: &Operation,
    dialect: Dialect,
) -> Result<(), ContractError> {
    for parameter in &operation.parameters {
        check_parameter(request, parameter, dialect)?;
    }
    check_body(request, operation, dialect)
}

fn check_parameter(
    request: &HttpRequest,
    parameter: &Parameter,
    dialect: Dialect,
) -> Result<(), ContractError> {
    let name = parameter.name.as_str();
    let values: Vec<&str> = match parameter.location {
        ParamLocation::Path => request.path_params.get(name).map(String::as_str).into_iter().collect(),
        ParamLocation::Query => request.query_values(name).collect(),
        ParamLocation::Header => request.headers.get(name).into_iter().collect(),
        ParamLocation::Cookie => request.cookie(name).into_iter().collect(),
    };

    if values.is_empty() {
        if parameter.required {
            return Err(ContractError::request(missing_message(parameter)));
        }
        return Ok(());
    }

    let Some(schema) = &parameter.schema else {
        return Ok(());
    };
    let normalized = normalize(schema, dialect, AccessMode::None);
    let instance = coerce(&normalized, &values);
    let violations = leaf::check(&normalized, &instance)?;
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ContractError::RequestValidation {
            message: format!("Parameter [{name}] did not match provided JSON schema."),
            violations,
        })
    }
}

fn missing_message(parameter: &Parameter) -> String {
    let name = &parameter.name;
    match parameter.location {
        ParamLocation::Path => format!("Missing required path parameter [{name}]."),
        ParamLocation::Query => format!("Missing required query parameter [?{name}=]."),
        ParamLocation::Header => format!("Missing required header [{name}]."),
        ParamLocation::Cookie => format!("Missing required cookie [{name}]."),
    }
}

/// Parameter strings → typed JSON, guided by the declared type.
///
/// Arrays take repeated values, or split a single value on `,`.
fn coerce(schema: &Schema, values: &[&str]) -> Value {
    if schema.primary_type() == Some("array") {
        let items = schema.items();
        let parts: Vec<&str> = match values {
            [single] => single.split(',').collect(),
            many => many.to_vec(),
        };
        return Value::Array(parts.into_iter().map(|part| coerce_scalar(items, part)).collect());
    }
    coerce_scalar(Some(schema), values.first().copied().unwrap_or_default())
}

/// Values that do not parse stay strings so the `type` check reports them.
fn coerce_scalar(schema: Option<&Schema>, raw: &str) -> Value {
    match schema.and_then(Schema::primary_type) {
        Some("integer") => raw
            .parse::<i64>()
            .map_or_else(|_| Value::String(raw.to_string()), Value::from),
        Some("number") => raw
            .parse::<i64>()
            .map(Value::from)
            .ok()
            .or_else(|| {
                raw.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
            })
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Some("boolean") => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        _ => Value::String(raw.to_string()),
    }
}

fn check_body(
    request: &HttpRequest,
    operation: &Operation,
    dialect: Dialect,
) -> Result<(), ContractError> {
    let Some(declared) = &operation.request_body else {
        return Ok(());
    };
    if request.body.is_empty() {
        if declared.required {
            return Err(ContractError::request("Request body required."));
        }
        return Ok(());
    }
    if declared.content.is_empty() {
        return Ok(());
    }

    let content_type = request.content_type().unwrap_or_default();
    let Some(entry) = media::lookup(&declared.content, content_type) else {
        return Err(ContractError::request(format!(
            "No matching media type for request body [{content_type}]."
        )));
    };
    let Some(schema) = entry else {
        return Ok(());
    };

    let normalized = normalize(schema, dialect, AccessMode::Write);
    let instance = body::decode(schema.effective_kind(), content_type, &request.body)
        .map_err(|e| ContractError::request(e.to_string()))?;
    let violations = leaf::check(&normalized, &instance)?;
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ContractError::RequestValidation {
            message: "Request body did not match provided schema.".to_string(),
            violations,
        })
    }
}
