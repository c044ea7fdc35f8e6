//! The ordered endpoint table every inbound request fans out to.
//!
//! Each endpoint's URL template is resolved once at startup: base URL, endpoint
//! path, API key and fixed parameters. Per request, the caller's query string
//! is appended to the template unchanged.

use crate::config::EndpointConfig;
use crate::errors::RelayError;
use url::Url;

/// Name of the query parameter carrying the API key.
const API_KEY_PARAM: &str = "key";

#[derive(Clone, Debug)]
pub struct Endpoint {
    name: String,
    template: String,
    public_template: String,
}

impl Endpoint {
    fn new(base_url: &Url, config: &EndpointConfig, api_key: &str) -> Self {
        let mut url = base_url.clone();
        let path = format!("{}{}", base_url.path().trim_end_matches('/'), config.path);
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        let mut public = url.clone();
        if !config.params.is_empty() {
            public.query_pairs_mut().extend_pairs(&config.params);
        }

        url.query_pairs_mut()
            .append_pair(API_KEY_PARAM, api_key)
            .extend_pairs(&config.params);

        Self {
            name: config.name.clone(),
            template: url.into(),
            public_template: public.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upstream URL for a request carrying `query`.
    pub fn url_for(&self, query: &str) -> Result<Url, RelayError> {
        let raw = if query.is_empty() {
            self.template.clone()
        } else {
            format!("{}&{}", self.template, query)
        };

        Url::parse(&raw).map_err(|e| RelayError::InvalidUpstreamUrl(self.name.clone(), e))
    }

    /// The URL template without the API key, safe to log or print.
    pub fn public_template(&self) -> &str {
        &self.public_template
    }
}

/// Immutable, ordered set of endpoints. Order defines the response key order.
#[derive(Clone, Debug)]
pub struct Endpoints {
    endpoints: Vec<Endpoint>,
}

impl Endpoints {
    pub fn new(base_url: &Url, configs: &[EndpointConfig], api_key: &str) -> Self {
        let endpoints = configs
            .iter()
            .map(|config| Endpoint::new(base_url, config, api_key))
            .collect();

        Self { endpoints }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Endpoint> {
        self.endpoints.get(index)
    }
}
