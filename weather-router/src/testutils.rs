use crate::errors::RelayError;
use crate::upstream::{UpstreamClient, UpstreamRequest, UpstreamResponse};
use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::ext::ReasonPhrase;
use hyper::header::CONTENT_TYPE;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

/// Canned reply served by the mock upstream.
#[derive(Clone, Debug)]
pub struct MockReply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
    pub delay_ms: u64,
    pub reason: Option<&'static str>,
}

impl MockReply {
    pub fn json(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "application/json; charset=utf-8",
            body: body.to_string(),
            delay_ms: 0,
            reason: None,
        }
    }

    pub fn html(status: StatusCode) -> Self {
        Self {
            status,
            content_type: "text/html",
            body: "<html><body>nope</body></html>".to_string(),
            delay_ms: 0,
            reason: None,
        }
    }

    /// Sends `reason` instead of the canonical reason phrase.
    pub fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

pub struct MockServer {
    pub port: u16,
    received: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Path and query of every request received so far, in arrival order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

/// Start a mock upstream that answers each request with `reply(path)`.
pub async fn start_mock_server<F>(reply: F) -> MockServer
where
    F: Fn(&str) -> MockReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let reply = Arc::new(reply);
    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = received.clone();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            let reply = reply.clone();
            let received = received_clone.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let reply = reply.clone();
                    let received = received.clone();
                    async move {
                        if let Some(pq) = req.uri().path_and_query() {
                            received.lock().unwrap().push(pq.to_string());
                        }
                        let mock = (*reply)(req.uri().path());
                        if mock.delay_ms > 0 {
                            tokio::time::sleep(Duration::from_millis(mock.delay_ms)).await;
                        }
                        let mut builder = Response::builder()
                            .status(mock.status)
                            .header(CONTENT_TYPE, mock.content_type);
                        if let Some(reason) = mock.reason {
                            builder = builder
                                .extension(ReasonPhrase::from_static(reason.as_bytes()));
                        }
                        let response = builder.body(Full::new(Bytes::from(mock.body))).unwrap();
                        Ok::<_, Infallible>(response)
                    }
                });

                let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    MockServer { port, received }
}

/// In-memory upstream client that records every request it is given.
pub struct FakeClient<F> {
    respond: F,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl<F> FakeClient<F>
where
    F: Fn(&UpstreamRequest) -> Result<UpstreamResponse, RelayError> + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl<F> UpstreamClient for FakeClient<F>
where
    F: Fn(&UpstreamRequest) -> Result<UpstreamResponse, RelayError> + Send + Sync,
{
    async fn fetch(&self, request: UpstreamRequest) -> Result<UpstreamResponse, RelayError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(&request)
    }
}

pub fn json_response(url: &Url, body: &str) -> UpstreamResponse {
    UpstreamResponse {
        status: StatusCode::OK,
        status_text: "OK".to_string(),
        content_type: Some("application/json".to_string()),
        url: url.clone(),
        body: Bytes::from(body.to_string()),
    }
}

pub fn html_response(url: &Url, status: StatusCode) -> UpstreamResponse {
    UpstreamResponse {
        status,
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        content_type: Some("text/html".to_string()),
        url: url.clone(),
        body: Bytes::from_static(b"<html></html>"),
    }
}
