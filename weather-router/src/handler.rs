use crate::collator::collate;
use crate::config::Config;
use crate::endpoints::{Endpoint, Endpoints};
use crate::errors::RelayError;
use crate::fanout::FanOut;
use crate::metrics_defs::ORIGIN_REJECTED;
use crate::normalizer::normalize;
use crate::origin::OriginGuard;
use crate::response::{build_response, rejection_response};
use crate::upstream::{CachePolicy, UpstreamClient};
use http::StatusCode;
use hyper::body::Bytes;
use hyper::{Request, Response};
use shared::http::make_error_response;
use std::sync::Arc;
use std::time::Duration;

/// The whole relay pipeline for one inbound request:
/// origin guard, fan-out, normalize, collate, build.
///
/// Independent of any server runtime. The hyper service in [`crate::service`]
/// is one way to drive it.
pub struct WeatherHandler {
    guard: OriginGuard,
    fanout: FanOut,
    expires_after: Duration,
}

impl WeatherHandler {
    /// `api_key` is baked into every endpoint URL here, once.
    pub fn new(
        config: &Config,
        api_key: &str,
        client: Arc<dyn UpstreamClient>,
    ) -> Result<Self, RelayError> {
        let base_url = config.upstream.parsed_base_url()?;
        let endpoints = Endpoints::new(&base_url, &config.endpoints, api_key);

        Ok(Self {
            guard: OriginGuard::new(&config.origin),
            fanout: FanOut::new(
                client,
                Arc::new(endpoints),
                CachePolicy::from(&config.cache),
            ),
            expires_after: config.response.expires_after(),
        })
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.fanout.endpoints().iter()
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Response<Bytes> {
        let (parts, _) = request.into_parts();

        if !self.guard.allows(&parts.headers) {
            tracing::info!(
                origin = ?parts.headers.get(hyper::header::ORIGIN),
                "Rejected request from non-whitelisted origin"
            );
            shared::counter!(ORIGIN_REJECTED).increment(1);
            return rejection_response();
        }

        let query = parts.uri.query().unwrap_or_default();
        let results = self.fanout.fetch_all(query).await;
        let normalized: Vec<String> = results.iter().map(normalize).collect();
        let collated = collate(self.fanout.endpoints(), &normalized);

        match build_response(&collated, self.expires_after) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build collated response");
                make_error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}
