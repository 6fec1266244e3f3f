//! Spec text → [`Document`]

use std::path::Path;

use oascheck_core::{ContractError, Document};
use serde_json::Value;

/// Parse an OpenAPI spec from JSON or YAML.
///
/// Detection strategy: try extension first (`.json`, `.yaml`/`.yml`), then fall
/// back to content sniffing (leading `{` → JSON, otherwise YAML).
pub fn parse_spec(name: &str, text: &str) -> Result<Document, ContractError> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "yaml" | "yml" => from_yaml(text)?,
        "json" => from_json(text)?,
        _ if text.trim_start().starts_with('{') => from_json(text)?,
        _ => from_yaml(text)?,
    };
    Document::from_value(&raw)
}

fn from_json(text: &str) -> Result<Value, ContractError> {
    serde_json::from_str(text).map_err(|e| ContractError::MalformedSpec(format!("Invalid JSON: {e}")))
}

fn from_yaml(text: &str) -> Result<Value, ContractError> {
    serde_yml::from_str(text).map_err(|e| ContractError::MalformedSpec(format!("Invalid YAML: {e}")))
}
