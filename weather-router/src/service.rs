use crate::errors::RelayError;
use crate::handler::WeatherHandler;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::body::Bytes;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Hyper service driving [`WeatherHandler`] on the main listener.
#[derive(Clone)]
pub struct RelayService {
    handler: Arc<WeatherHandler>,
    inflight: Arc<AtomicUsize>,
}

impl RelayService {
    pub fn new(handler: Arc<WeatherHandler>) -> Self {
        Self {
            handler,
            inflight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Requests currently being processed.
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Relaxed)
    }
}

/// Tracks one request from arrival until its future completes or is dropped.
///
/// hyper drops the service future when the client goes away, so the inflight
/// gauge and the duration histogram are settled in `Drop`.
struct InflightGuard {
    inflight: Arc<AtomicUsize>,
    started: Instant,
    status: Option<StatusCode>,
}

impl InflightGuard {
    fn new(inflight: Arc<AtomicUsize>) -> Self {
        inflight.fetch_add(1, Ordering::Relaxed);
        shared::gauge!(REQUESTS_INFLIGHT).increment(1.0);

        Self {
            inflight,
            started: Instant::now(),
            status: None,
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight.fetch_sub(1, Ordering::Relaxed);
        shared::gauge!(REQUESTS_INFLIGHT).decrement(1.0);

        let status = match self.status {
            Some(status) => status.as_u16().to_string(),
            None => {
                tracing::debug!("Request dropped before completion");
                "cancelled".to_string()
            }
        };
        shared::histogram!(REQUEST_DURATION, "status" => status)
            .record(self.started.elapsed().as_secs_f64());
    }
}

impl<B> Service<Request<B>> for RelayService
where
    B: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, RelayError>>;
    type Error = RelayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let handler = self.handler.clone();
        let inflight = self.inflight.clone();

        Box::pin(async move {
            tracing::debug!(method = %req.method(), uri = %req.uri().path(), "Received request");
            let mut guard = InflightGuard::new(inflight);

            let response = handler.handle(req).await;
            guard.status = Some(response.status());

            Ok(response.map(|body| Full::new(body).map_err(|e| match e {}).boxed()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CacheConfig, Config, Listener, OriginConfig, ResponseConfig, UpstreamConfig,
        default_endpoints,
    };
    use crate::testutils::{FakeClient, json_response};
    use crate::upstream::{UpstreamClient, UpstreamRequest, UpstreamResponse};
    use async_trait::async_trait;
    use hyper::header::ORIGIN;
    use shared::http::run_http_service;
    use std::time::Duration;

    const ALLOWED: &str = "https://example.github.io";

    /// Upstream that never answers.
    struct StalledClient;

    #[async_trait]
    impl UpstreamClient for StalledClient {
        async fn fetch(&self, _request: UpstreamRequest) -> Result<UpstreamResponse, RelayError> {
            std::future::pending().await
        }
    }

    fn test_config(port: u16) -> Config {
        Config {
            listener: Listener {
                host: "127.0.0.1".to_string(),
                port,
            },
            admin_listener: Listener {
                host: "127.0.0.1".to_string(),
                port: 3001,
            },
            origin: OriginConfig {
                allowed: vec![ALLOWED.to_string()],
                debug: false,
            },
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            response: ResponseConfig::default(),
            endpoints: default_endpoints(),
        }
    }

    fn test_request() -> Request<()> {
        Request::builder()
            .uri("/?lat=1&lon=2")
            .header(ORIGIN, ALLOWED)
            .body(())
            .unwrap()
    }

    async fn free_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_serves_collated_response() {
        let config = test_config(free_port().await);
        let client = Arc::new(FakeClient::new(|req: &UpstreamRequest| {
            Ok(json_response(&req.url, r#"{"ok":true}"#))
        }));
        let handler = WeatherHandler::new(&config, "secret", client).unwrap();
        let service = RelayService::new(Arc::new(handler));

        let port = config.listener.port;
        tokio::spawn(async move {
            let _ = run_http_service::<_, _, RelayError>("127.0.0.1", port, service).await;
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let http = reqwest::Client::new();
        let url = format!("http://127.0.0.1:{port}/?lat=1&lon=2");

        let allowed = http
            .get(&url)
            .header(ORIGIN, ALLOWED)
            .send()
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(allowed.headers()["access-control-allow-origin"], "*");
        let body: serde_json::Value = allowed.json().await.unwrap();
        assert_eq!(body["CURRENT"], serde_json::json!({"ok": true}));
        assert_eq!(body.as_object().unwrap().len(), 5);

        let rejected = http.get(&url).send().await.unwrap();
        assert_eq!(rejected.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            rejected.text().await.unwrap(),
            "Requests are not allowed from this domain."
        );
    }

    #[tokio::test]
    async fn test_inflight_settles_after_completion() {
        let client = Arc::new(FakeClient::new(|req: &UpstreamRequest| {
            Ok(json_response(&req.url, "{}"))
        }));
        let handler = WeatherHandler::new(&test_config(3000), "secret", client).unwrap();
        let service = RelayService::new(Arc::new(handler));

        let response = service.call(test_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(service.inflight(), 0);
    }

    #[tokio::test]
    async fn test_inflight_settles_when_request_dropped() {
        let handler =
            WeatherHandler::new(&test_config(3000), "secret", Arc::new(StalledClient)).unwrap();
        let service = RelayService::new(Arc::new(handler));

        let mut pending = service.call(test_request());
        let timed_out = tokio::time::timeout(Duration::from_millis(50), &mut pending).await;
        assert!(timed_out.is_err());
        assert_eq!(service.inflight(), 1);

        // Client disconnect: hyper drops the future mid fan-out
        drop(pending);
        assert_eq!(service.inflight(), 0);
    }
}
