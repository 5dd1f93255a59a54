// Provider adapters. Each knows one provider's auth scheme, request shape,
// and response envelope.
pub mod nutrition;
pub mod primary;
pub mod upc;
pub mod usda;

use crate::error::{CatalogError, Result};
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("pantry/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client. Per-call deadlines are enforced by the orchestrator;
/// this timeout only bounds calls made outside of it (detail lookups, export).
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| CatalogError::Config(format!("http client: {}", e)))
}

/// Seconds from a `Retry-After` header, when given as a number.
pub fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// Map a non-success status onto the adapter error taxonomy.
pub fn status_error(provider: &str, status: StatusCode, headers: &HeaderMap) -> CatalogError {
    match status.as_u16() {
        401 | 403 => CatalogError::Authentication(format!("{} rejected the credential ({})", provider, status)),
        404 => CatalogError::NotFound,
        429 => CatalogError::RateLimit {
            retry_after: retry_after(headers),
        },
        _ => CatalogError::network(format!("{} returned {}", provider, status)),
    }
}

/// Fail on non-success status, otherwise hand the response back.
pub fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(status_error(provider, status, response.headers()))
    }
}

/// Read a successful response as JSON. Undecodable bodies are malformed, not network errors.
pub async fn read_json(provider: &str, response: Response) -> Result<Value> {
    let response = check_status(provider, response)?;
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(CatalogError::MalformedResponse(format!(
            "{} returned an empty body",
            provider
        )));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| CatalogError::MalformedResponse(format!("{}: {}", provider, e)))
}

/// Short description of a JSON value's shape for error messages.
pub(crate) fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Array under `key`, treating null/absent as empty. Any other type is a shape mismatch.
pub(crate) fn array_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    match map.get(key) {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(items)) => Some(items.clone()),
        Some(_) => None,
    }
}

/// Non-negative integer that may be encoded as a number or a numeric string.
pub(crate) fn count_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<u64> {
    match map.get(key)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
