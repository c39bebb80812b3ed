//! Scripted in-memory transport for tests.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use armature_fetch::{FetchError, Result, Transport, TransportRequest, TransportResponse};

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct MockReply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    redirects: usize,
    url: Option<Url>,
    delay: Option<Duration>,
    error: Option<String>,
}

impl MockReply {
    /// Empty reply with a status.
    pub fn status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            redirects: 0,
            url: None,
            delay: None,
            error: None,
        }
    }

    /// JSON reply.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::status(status)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body.to_string())
    }

    /// Plain text reply.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::status(status)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_body(body.into())
    }

    /// Transport failure instead of a response.
    pub fn network_error(message: impl Into<String>) -> Self {
        let mut reply = Self::status(500);
        reply.error = Some(message.into());
        reply
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Report `count` followed redirects.
    pub fn with_redirects(mut self, count: usize) -> Self {
        self.redirects = count;
        self
    }

    /// Report a final URL different from the request URL.
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Delay the reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct MockState {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: Mutex<Option<MockReply>>,
    recorded: Mutex<Vec<TransportRequest>>,
}

/// Transport that replays scripted replies in order and records requests.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    /// Transport with no replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport answering every request with `reply`.
    pub fn always(reply: MockReply) -> Self {
        let transport = Self::new();
        *transport.state.fallback.lock() = Some(reply);
        transport
    }

    /// Queue a reply.
    pub fn reply(self, reply: MockReply) -> Self {
        self.push(reply);
        self
    }

    /// Queue a reply on a shared handle.
    pub fn push(&self, reply: MockReply) {
        self.state.replies.lock().push_back(reply);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.state.recorded.lock().clone()
    }

    /// Most recent request.
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.state.recorded.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse> {
        self.state.recorded.lock().push(request.clone());

        let next = self.state.replies.lock().pop_front();
        let reply = next
            .or_else(|| self.state.fallback.lock().clone())
            .ok_or_else(|| FetchError::Network(format!("no scripted reply for {}", request.url)))?;

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = reply.error {
            return Err(FetchError::Network(message));
        }

        Ok(TransportResponse {
            status: reply.status,
            status_text: reply.status.canonical_reason().unwrap_or_default().to_string(),
            headers: reply.headers,
            redirects: reply.redirects,
            url: reply.url.unwrap_or_else(|| request.url.clone()),
            body: reply.body,
        })
    }
}
