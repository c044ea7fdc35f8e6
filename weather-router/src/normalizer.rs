//! Turns each upstream outcome into a JSON string.
//!
//! JSON responses pass through untouched, whatever their status. The upstream
//! reports useful details in its 4xx bodies. Anything else becomes an
//! `{"error": ...}` object, so the collator always has something to parse.

use crate::fanout::FetchResult;
use crate::upstream::UpstreamResponse;
use serde_json::json;

/// Normalize one fetch outcome. Never fails.
pub fn normalize(result: &FetchResult) -> String {
    match result {
        Ok(response) if response.is_json() => String::from_utf8_lossy(&response.body).into_owned(),
        Ok(response) => error_payload(&status_error(response)),
        Err(e) => error_payload(&e.to_string()),
    }
}

fn status_error(response: &UpstreamResponse) -> String {
    format!(
        "HTTP status: {} {}: URL: {}",
        response.status.as_u16(),
        response.status_text,
        response.url_without_query()
    )
}

pub fn error_payload(message: &str) -> String {
    json!({ "error": message }).to_string()
}
