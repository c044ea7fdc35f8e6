use crate::config::{CacheConfig, UpstreamConfig};
use crate::errors::RelayError;
use async_trait::async_trait;
use hyper::StatusCode;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use std::time::Duration;
use url::Url;

/// Edge cache directives for an outbound request.
///
/// This is an optional capability. Clients that have no edge cache in front of
/// them ignore it, and the relay's output must not depend on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub cache_everything: bool,
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_secs),
            cache_everything: config.cache_everything,
        }
    }
}

/// One outbound fetch.
#[derive(Clone, Debug)]
pub struct UpstreamRequest {
    /// Endpoint name, used for errors and metrics
    pub endpoint: String,
    pub url: Url,
    pub cache: CachePolicy,
}

/// A fully buffered upstream response.
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub status_text: String,
    pub content_type: Option<String>,
    /// URL the response came from, after redirects
    pub url: Url,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }

    /// The response URL with query and fragment stripped, so the API key never leaks.
    pub fn url_without_query(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.into()
    }
}

/// Performs a single GET against an upstream endpoint.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch(&self, request: UpstreamRequest) -> Result<UpstreamResponse, RelayError>;
}

/// `reqwest`-backed upstream client.
///
/// Redirects are followed, so the reported URL is the final one. There is no
/// edge cache behind this client and the request's cache policy is not acted on.
#[derive(Clone)]
pub struct HttpUpstreamClient {
    client: reqwest::Client,
}

impl HttpUpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, RelayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| RelayError::HttpClientError(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn fetch(&self, request: UpstreamRequest) -> Result<UpstreamResponse, RelayError> {
        let UpstreamRequest { endpoint, url, .. } = request;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RelayError::from_reqwest(&endpoint, e))?;

        let status = response.status();
        let status_text = reason_phrase(&response);
        let url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::ResponseBodyError(endpoint, e.without_url().to_string()))?;

        Ok(UpstreamResponse {
            status,
            status_text,
            content_type,
            url,
            body,
        })
    }
}

/// The reason phrase the upstream actually sent, else the canonical one.
///
/// hyper only keeps a `ReasonPhrase` when it differs from the canonical reason,
/// which is always the case for unregistered codes such as 520.
fn reason_phrase(response: &reqwest::Response) -> String {
    response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
        .or_else(|| response.status().canonical_reason().map(str::to_string))
        .unwrap_or_default()
}
