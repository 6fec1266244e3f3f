use serde_json::Value;

use crate::error::ContractError;

/// Resolves local `$ref` pointers (`#/components/...`) against the document root.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RefResolver<'a> {
    root: &'a Value,
}

impl<'a> RefResolver<'a> {
    pub(crate) const fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Target of a single reference. Only local JSON pointers are supported.
    pub(crate) fn lookup(&self, reference: &str) -> Result<&'a Value, ContractError> {
        reference
            .strip_prefix('#')
            .filter(|pointer| pointer.is_empty() || pointer.starts_with('/'))
            .and_then(|pointer| self.root.pointer(pointer))
            .ok_or_else(|| ContractError::UnresolvableReference(reference.to_string()))
    }

    /// Follow a chain of `$ref`s on a non-schema object (parameter, body, response).
    pub(crate) fn follow(&self, value: &'a Value) -> Result<&'a Value, ContractError> {
        let mut current = value;
        let mut seen: Vec<&str> = Vec::new();
        while let Some(reference) = current.get("$ref").and_then(Value::as_str) {
            if seen.contains(&reference) {
                return Err(ContractError::UnresolvableReference(reference.to_string()));
            }
            seen.push(reference);
            current = self.lookup(reference)?;
        }
        Ok(current)
    }
}
