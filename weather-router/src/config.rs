use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Longest `Expires` offset accepted, one year.
const MAX_EXPIRES_AFTER_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("No endpoints configured")]
    NoEndpoints,

    #[error("Duplicate endpoint name: {0}")]
    DuplicateEndpoint(String),

    #[error("Empty endpoint name")]
    EmptyEndpointName,

    #[error("Endpoint {0} path must start with '/'")]
    InvalidEndpointPath(String),

    #[error("Origin whitelist is empty and debug mode is off")]
    EmptyOriginWhitelist,

    #[error("expires_after_secs cannot exceed one year")]
    ExpiresTooLong,

    #[error("No API key configured and ${0} is not set")]
    MissingApiKey(String),

    #[error("Invalid upstream base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// weather-router configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for incoming requests
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    /// Which callers may use the relay
    pub origin: OriginConfig,
    /// Where the weather data comes from
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub response: ResponseConfig,
    /// Endpoints fetched for every request, in response order
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,
}

impl Config {
    /// Validates the relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.origin.validate()?;
        self.upstream.validate()?;
        self.response.validate()?;

        if self.endpoints.is_empty() {
            return Err(ValidationError::NoEndpoints);
        }

        let mut names = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.name.is_empty() {
                return Err(ValidationError::EmptyEndpointName);
            }

            if !endpoint.path.starts_with('/') {
                return Err(ValidationError::InvalidEndpointPath(endpoint.name.clone()));
            }

            if !names.insert(&endpoint.name) {
                return Err(ValidationError::DuplicateEndpoint(endpoint.name.clone()));
            }
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Origin whitelist
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct OriginConfig {
    /// Exact `Origin` header values allowed through, e.g. "https://example.github.io"
    #[serde(default)]
    pub allowed: Vec<String>,
    /// Skip the origin check entirely. Deploy-time only.
    #[serde(default)]
    pub debug: bool,
}

impl OriginConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.allowed.is_empty() && !self.debug {
            return Err(ValidationError::EmptyOriginWhitelist);
        }
        Ok(())
    }
}

/// Upstream weather API configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Base URL that endpoint paths are appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key injected into every endpoint URL. Takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable read when `api_key` is not set
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Per-request timeout. Unset means the client never gives up on its own.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.parsed_base_url()?;
        Ok(())
    }

    pub fn parsed_base_url(&self) -> Result<Url, ValidationError> {
        Ok(Url::parse(&self.base_url)?)
    }

    /// Returns the API key, from the config itself or from the environment.
    pub fn resolve_api_key(&self) -> Result<String, ValidationError> {
        if let Some(key) = &self.api_key
            && !key.is_empty()
        {
            return Ok(key.clone());
        }

        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ValidationError::MissingApiKey(self.api_key_env.clone()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: None,
        }
    }
}

/// Edge cache directives attached to every upstream request
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// How long the platform cache keeps an upstream response
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Cache regardless of the upstream's own cache headers
    #[serde(default = "default_true")]
    pub cache_everything: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            cache_everything: true,
        }
    }
}

/// Settings for the collated response
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ResponseConfig {
    /// Offset from now used for the `Expires` header
    #[serde(default = "default_expires_after_secs")]
    pub expires_after_secs: u64,
}

impl ResponseConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.expires_after_secs > MAX_EXPIRES_AFTER_SECS {
            return Err(ValidationError::ExpiresTooLong);
        }
        Ok(())
    }

    pub fn expires_after(&self) -> Duration {
        Duration::from_secs(self.expires_after_secs)
    }
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            expires_after_secs: default_expires_after_secs(),
        }
    }
}

/// One upstream endpoint
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EndpointConfig {
    /// Key of this endpoint's entry in the collated response
    pub name: String,
    /// Path appended to the upstream base URL
    pub path: String,
    /// Query parameters always sent to this endpoint, before the caller's
    #[serde(default)]
    pub params: IndexMap<String, String>,
}

impl EndpointConfig {
    pub fn new(name: &str, path: &str, params: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

pub fn default_endpoints() -> Vec<EndpointConfig> {
    vec![
        EndpointConfig::new("USAGE", "/subscription/usage", &[]),
        EndpointConfig::new("CURRENT", "/current", &[]),
        EndpointConfig::new("HOURLY", "/forecast/hourly", &[("hours", "48")]),
        EndpointConfig::new("DAILY", "/forecast/daily", &[("days", "16")]),
        EndpointConfig::new("ALERTS", "/alerts", &[]),
    ]
}

fn default_base_url() -> String {
    "https://api.weatherbit.io/v2.0".to_string()
}

fn default_api_key_env() -> String {
    "WB_KEY".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_expires_after_secs() -> u64 {
    25 * 60
}

fn default_true() -> bool {
    true
}
