use serde::Serialize;

use crate::error::Result;

/// Format any serializable value as JSON
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
