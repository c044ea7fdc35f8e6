use crate::endpoints::Endpoints;
use crate::metrics_defs::COLLATE_ERRORS;
use indexmap::IndexMap;
use serde_json::{Value as JsonValue, json};

/// Endpoint name to parsed payload (or error object), in endpoint order.
pub type Collated = IndexMap<String, JsonValue>;

/// Parse each normalized string and key it by endpoint name.
///
/// Always returns exactly one entry per endpoint. A string that fails to parse,
/// or a missing one, is replaced with `{"error": "Error collating: ..."}`.
pub fn collate(endpoints: &Endpoints, normalized: &[String]) -> Collated {
    endpoints
        .iter()
        .enumerate()
        .map(|(index, endpoint)| {
            let value = match normalized.get(index) {
                Some(raw) => match serde_json::from_str::<JsonValue>(raw) {
                    Ok(value) => value,
                    Err(e) => collate_error(endpoint.name(), &e.to_string()),
                },
                None => collate_error(endpoint.name(), "no result for endpoint"),
            };
            (endpoint.name().to_string(), value)
        })
        .collect()
}

fn collate_error(endpoint: &str, message: &str) -> JsonValue {
    tracing::error!(endpoint, error = message, "Error collating upstream result");
    shared::counter!(COLLATE_ERRORS, "endpoint" => endpoint.to_string()).increment(1);
    json!({ "error": format!("Error collating: {message}") })
}
