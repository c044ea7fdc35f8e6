use crate::endpoints::Endpoints;
use crate::errors::RelayError;
use crate::metrics_defs::UPSTREAM_REQUESTS;
use crate::upstream::{CachePolicy, UpstreamClient, UpstreamRequest, UpstreamResponse};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Outcome of one upstream fetch, in endpoint order.
pub type FetchResult = Result<UpstreamResponse, RelayError>;

/// Issues one request per endpoint concurrently and waits for all of them.
///
/// This is a wait-for-all join, not fail-fast: every endpoint gets a slot in
/// the result, and a failure in one slot never affects the others.
#[derive(Clone)]
pub struct FanOut {
    client: Arc<dyn UpstreamClient>,
    endpoints: Arc<Endpoints>,
    cache: CachePolicy,
}

impl FanOut {
    pub fn new(
        client: Arc<dyn UpstreamClient>,
        endpoints: Arc<Endpoints>,
        cache: CachePolicy,
    ) -> Self {
        Self {
            client,
            endpoints,
            cache,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetch every endpoint with `query` appended. The returned vector always
    /// has one entry per endpoint, indexed the same way as the endpoint table.
    pub async fn fetch_all(&self, query: &str) -> Vec<FetchResult> {
        let mut results: Vec<FetchResult> = self
            .endpoints
            .iter()
            .map(|endpoint| Err(RelayError::TaskFailed(endpoint.name().to_string())))
            .collect();

        let mut join_set = JoinSet::new();

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let url = match endpoint.url_for(query) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(endpoint = endpoint.name(), error = %e, "Could not build upstream URL");
                    results[index] = Err(e);
                    continue;
                }
            };

            let request = UpstreamRequest {
                endpoint: endpoint.name().to_string(),
                url,
                cache: self.cache,
            };
            let client = self.client.clone();

            join_set.spawn(async move { (index, client.fetch(request).await) });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => {
                    let name = self
                        .endpoints
                        .get(index)
                        .map(|e| e.name().to_string())
                        .unwrap_or_default();
                    record_outcome(&name, &result);
                    results[index] = result;
                }
                // The slot keeps its TaskFailed placeholder
                Err(e) => tracing::error!("Upstream task panicked: {}", e),
            }
        }

        results
    }
}

fn record_outcome(endpoint: &str, result: &FetchResult) {
    let outcome = match result {
        Ok(response) => {
            tracing::debug!(
                endpoint,
                status = response.status.as_u16(),
                url = %response.url_without_query(),
                "Upstream responded"
            );
            if response.is_json() { "json" } else { "non_json" }
        }
        Err(e) => {
            tracing::warn!(endpoint, error = %e, "Upstream request failed");
            "error"
        }
    };

    shared::counter!(
        UPSTREAM_REQUESTS,
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
