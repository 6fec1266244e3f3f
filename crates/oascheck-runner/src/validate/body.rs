//! Body text → instance handed to the leaf validator

use oascheck_core::SchemaKind;
use oascheck_core::media;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub(super) enum DecodeError {
    #[error("Content type [{content_type}] cannot carry a [{kind}] body, expected JSON.")]
    NonJsonStructured { content_type: String, kind: String },
    #[error("Body is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Decode a body for a schema of the given kind.
///
/// `kind` comes from the schema as declared, before normalization rewrites
/// its top level. Object, array and allOf schemas need a JSON-family content
/// type and a JSON-decodable body. Other schemas get the decoded value when
/// the body is JSON-typed and decodes, and the raw string otherwise.
pub(super) fn decode(
    kind: SchemaKind<'_>,
    content_type: &str,
    body: &str,
) -> Result<Value, DecodeError> {
    let json_typed = media::is_json(content_type);

    if kind.is_structured() {
        if !json_typed {
            return Err(DecodeError::NonJsonStructured {
                content_type: content_type.to_string(),
                kind: kind.to_string(),
            });
        }
        return serde_json::from_str(body).map_err(|e| DecodeError::InvalidJson(e.to_string()));
    }

    if json_typed {
        if let Ok(value) = serde_json::from_str(body) {
            return Ok(value);
        }
    }
    Ok(Value::String(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oascheck_core::Schema;
    use serde_json::json;

    fn schema(raw: Value) -> Schema {
        Schema::from_json(&raw).unwrap()
    }

    #[test]
    fn structured_schema_needs_json() {
        let object = schema(json!({"type": "object"}));
        assert_eq!(
            decode(object.effective_kind(), "application/json; charset=utf-8", r#"{"a": 1}"#).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            decode(object.effective_kind(), "application/vnd.api+json", "{}").unwrap(),
            json!({})
        );
        assert!(matches!(
            decode(object.effective_kind(), "text/plain", "{}").unwrap_err(),
            DecodeError::NonJsonStructured { .. }
        ));
        assert!(matches!(
            decode(object.effective_kind(), "application/json", "{oops").unwrap_err(),
            DecodeError::InvalidJson(_)
        ));

        let all_of = schema(json!({"allOf": [{"type": "object"}]}));
        assert!(decode(all_of.effective_kind(), "text/csv", "a,b").is_err());
    }

    #[test]
    fn scalar_schemas_fall_back_to_raw_text() {
        let string = schema(json!({"type": "string"}));
        assert_eq!(decode(string.effective_kind(), "text/plain", "hello").unwrap(), json!("hello"));
        assert_eq!(decode(string.effective_kind(), "application/json", "\"hi\"").unwrap(), json!("hi"));
        assert_eq!(
            decode(string.effective_kind(), "application/json", "bare").unwrap(),
            json!("bare")
        );

        let integer = schema(json!({"type": "integer"}));
        assert_eq!(decode(integer.effective_kind(), "application/json", "42").unwrap(), json!(42));
        assert_eq!(decode(integer.effective_kind(), "text/plain", "42").unwrap(), json!("42"));
    }

    #[test]
    fn composite_alternatives_decode_json() {
        let one_of = schema(json!({"oneOf": [{"type": "object"}, {"type": "string"}]}));
        assert_eq!(
            decode(one_of.effective_kind(), "application/json", r#"{"k": true}"#).unwrap(),
            json!({"k": true})
        );
    }
}
