use crate::collator::Collated;
use crate::errors::RelayError;
use chrono::{TimeDelta, Utc};
use hyper::body::Bytes;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CACHE_CONTROL, CONTENT_TYPE, EXPIRES,
};
use hyper::{Response, StatusCode};
use std::time::Duration;

pub const REJECTION_BODY: &str = "Requests are not allowed from this domain.";

const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// IMF-fixdate, e.g. "Sun, 06 Nov 1994 08:49:37 GMT"
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Builds the 200 response carrying the collated results.
pub fn build_response(
    collated: &Collated,
    expires_after: Duration,
) -> Result<Response<Bytes>, RelayError> {
    let body = serde_json::to_vec(collated)
        .map_err(|e| RelayError::ResponseSerializationError(e.to_string()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(ACCESS_CONTROL_ALLOW_METHODS, "GET")
        .header(ACCESS_CONTROL_ALLOW_HEADERS, "*")
        .header(CACHE_CONTROL, "public")
        .header(EXPIRES, expires_at(expires_after))
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(Bytes::from(body))
        .map_err(|e| RelayError::ResponseBuildError(e.to_string()))
}

/// 403 for callers outside the origin whitelist.
pub fn rejection_response() -> Response<Bytes> {
    let mut response = Response::new(Bytes::from_static(REJECTION_BODY.as_bytes()));
    *response.status_mut() = StatusCode::FORBIDDEN;
    response.headers_mut().insert(
        CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/plain;charset=UTF-8"),
    );
    response
}

fn expires_at(expires_after: Duration) -> String {
    let offset = TimeDelta::from_std(expires_after).unwrap_or(TimeDelta::zero());
    let now = Utc::now();
    now.checked_add_signed(offset)
        .unwrap_or(now)
        .format(HTTP_DATE_FORMAT)
        .to_string()
}
