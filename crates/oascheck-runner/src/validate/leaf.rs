//! Leaf constraint checking via `jsonschema`

use jsonschema::Draft;
use oascheck_core::{ContractError, Schema, Violation};
use serde_json::Value;

/// Validate `instance` against an already-normalized schema.
///
/// Returns every violated constraint; an empty list means the instance passed.
pub(super) fn check(schema: &Schema, instance: &Value) -> Result<Vec<Violation>, ContractError> {
    let schema_json = schema.to_json();
    let validator = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .should_validate_formats(true)
        .build(&schema_json)
        .map_err(|err| ContractError::MalformedSpec(format!("Invalid schema: {err}")))?;

    let violations = validator
        .iter_errors(instance)
        .map(|error| {
            let schema_path = error.schema_path().as_str().to_string();
            let pointer = error.instance_path().as_str().to_string();
            Violation {
                keyword: schema_path
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string(),
                expected: fragment(&schema_json, &schema_path)
                    .cloned()
                    .unwrap_or(Value::Null),
                used: instance.pointer(&pointer).cloned().unwrap_or(Value::Null),
                message: error.to_string(),
                pointer,
            }
        })
        .collect();
    Ok(violations)
}

/// Schema fragment at `path`, following `$ref` hops into `$defs`.
fn fragment<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(found) = root.pointer(path) {
        return Some(found);
    }
    let mut current = root;
    for segment in path.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        current = if segment == "$ref" {
            let target = current.get("$ref")?.as_str()?.strip_prefix('#')?;
            root.pointer(target)?
        } else {
            match current {
                Value::Object(map) => map.get(&segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            }
        };
    }
    Some(current)
}
