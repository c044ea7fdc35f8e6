use crate::config::ValidationError;
use thiserror::Error;

/// Errors that can occur while relaying a request
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Upstream request failed for {0}: {1}")]
    UpstreamRequestFailed(String, String),

    #[error("Upstream timeout for {0}")]
    UpstreamTimeout(String),

    #[error("Failed to read response body from {0}: {1}")]
    ResponseBodyError(String, String),

    #[error("Upstream task for {0} did not complete")]
    TaskFailed(String),

    #[error("Invalid upstream URL for {0}: {1}")]
    InvalidUpstreamUrl(String, url::ParseError),

    #[error("Response serialization error: {0}")]
    ResponseSerializationError(String),

    #[error("Failed to build response: {0}")]
    ResponseBuildError(String),

    #[error("HTTP client error: {0}")]
    HttpClientError(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Converts a reqwest failure for `endpoint` into a relay error.
    ///
    /// The URL is dropped from the message since it carries the API key.
    pub fn from_reqwest(endpoint: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return RelayError::UpstreamTimeout(endpoint.to_string());
        }
        RelayError::UpstreamRequestFailed(endpoint.to_string(), error.without_url().to_string())
    }
}
