//! Response extraction: pulls the embedded JSON record out of free-form model output.
//!
//! Lookup order:
//! 1. the first fenced block opened with ```json
//! 2. otherwise the span from the first `{` to the last `}`
//!
//! The same algorithm serves every call site; only the target record type differs.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed oracle response: no JSON object found")]
    NoJsonFound,

    #[error("malformed oracle response: invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("malformed oracle response: unexpected record shape: {0}")]
    Shape(#[source] serde_json::Error),
}

/// Locates and decodes the JSON record embedded in `raw`.
///
/// Fails when no candidate span exists, when the span is not valid JSON, or when required
/// fields of `T` are absent or null.
pub fn extract<T: DeserializeOwned>(raw: &str) -> Result<T, ExtractError> {
    let span = locate_json(raw).ok_or(ExtractError::NoJsonFound)?;
    let value: Value = serde_json::from_str(span).map_err(ExtractError::InvalidJson)?;
    serde_json::from_value(value).map_err(ExtractError::Shape)
}

/// Returns the candidate JSON span, if any.
pub fn locate_json(raw: &str) -> Option<&str> {
    if let Some(start) = raw.find(JSON_FENCE) {
        let body = &raw[start + JSON_FENCE.len()..];
        if let Some(end) = body.find(FENCE) {
            return Some(body[..end].trim());
        }
    }

    let open = raw.find('{')?;
    let close = raw.rfind('}')?;
    (close > open).then(|| &raw[open..=close])
}
