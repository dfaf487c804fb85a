//! Serde adapters for inventory snapshots.

use serde::{Deserialize, Deserializer};

/// Deserializes an optional string, mapping `null`, `""` and whitespace to `None`.
pub fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

pub(crate) fn default_true() -> bool {
    true
}
