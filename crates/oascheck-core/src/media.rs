//! Media-type matching between declared `content` maps and actual headers

use crate::document::Content;
use crate::schema::Schema;

/// `"Application/JSON; charset=utf-8"` → `"application/json"`
#[must_use]
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// JSON-family media types: `application/json` and any `+json` suffix
/// (`application/vnd.api+json`, `application/problem+json`).
#[must_use]
pub fn is_json(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence == "application/json" || essence.ends_with("+json")
}

/// Find the declared entry for an actual content type.
///
/// Lookup order: exact media type, then `type/*`, then `*/*`.
#[must_use]
pub fn lookup<'a>(content: &'a Content, content_type: &str) -> Option<&'a Option<Schema>> {
    let actual = essence(content_type);
    if actual.is_empty() {
        return None;
    }
    let find = |wanted: &str| {
        content
            .iter()
            .find(|(declared, _)| essence(declared) == wanted)
            .map(|(_, schema)| schema)
    };
    if let Some(found) = find(&actual) {
        return Some(found);
    }
    let major = actual.split('/').next().unwrap_or("");
    find(&format!("{major}/*")).or_else(|| find("*/*"))
}
