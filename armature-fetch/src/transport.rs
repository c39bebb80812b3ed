//! Transport boundary and the reqwest-backed default transport.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::body::{PartValue, RequestBody};
use crate::config::{CacheMode, Credentials};
use crate::{FetchError, Result};

/// Redirect cap used when a request does not configure `max_redirects`.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Fully prepared request handed to a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: Url,
    /// Final headers.
    pub headers: HeaderMap,
    /// Body, if any.
    pub body: Option<RequestBody>,
    /// Credentials mode.
    pub credentials: Credentials,
    /// Cache directive.
    pub cache: Option<CacheMode>,
    /// Maximum redirects the transport may follow. `None` uses
    /// [`DEFAULT_MAX_REDIRECTS`] and fails once it is exceeded.
    pub max_redirects: Option<usize>,
}

/// Raw result of an HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Final status.
    pub status: StatusCode,
    /// Reason phrase.
    pub status_text: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Number of redirects followed.
    pub redirects: usize,
    /// Final URL after redirects.
    pub url: Url,
    /// Response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Whether at least one redirect was followed.
    pub fn redirected(&self) -> bool {
        self.redirects > 0
    }
}

/// Performs one HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and read the full response.
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse>;
}

/// Settings for the underlying reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransportConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Enable gzip decompression.
    pub gzip: bool,
    /// Enable brotli decompression.
    pub brotli: bool,
}

impl Default for ReqwestTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("armature-fetch/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
            brotli: true,
        }
    }
}

/// Transport backed by [`reqwest`].
///
/// reqwest's own redirect handling is disabled; redirects are followed here
/// so that the hop count can be reported.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the given settings.
    pub fn new(config: ReqwestTransportConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(config.gzip)
            .brotli(config.brotli)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { inner })
    }

    /// Wrap an existing client. It should be built with
    /// `redirect::Policy::none()`, otherwise hops are invisible.
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    async fn execute(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&RequestBody>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .inner
            .request(method.clone(), url.clone())
            .headers(headers.clone());

        if let Some(body) = body {
            request = match body {
                RequestBody::Text(text) => request.body(text.clone()),
                RequestBody::Bytes(bytes) => request.body(bytes.clone()),
                RequestBody::Multipart(parts) => {
                    let mut form = reqwest::multipart::Form::new();
                    for part in parts {
                        form = match &part.value {
                            PartValue::Text(text) => form.text(part.name.clone(), text.clone()),
                            PartValue::File {
                                data,
                                file_name,
                                content_type,
                            } => {
                                let mut file = reqwest::multipart::Part::bytes(data.to_vec());
                                if let Some(name) = file_name {
                                    file = file.file_name(name.clone());
                                }
                                if let Some(mime) = content_type {
                                    file = file.mime_str(mime)?;
                                }
                                form.part(part.name.clone(), file)
                            }
                        };
                    }
                    request.multipart(form)
                }
                RequestBody::Stream(stream) => match stream.take() {
                    Some(stream) => request.body(reqwest::Body::wrap_stream(stream)),
                    None => request,
                },
            };
        }

        Ok(request.send().await?)
    }

    async fn finish(response: reqwest::Response, redirects: usize) -> Result<TransportResponse> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;

        Ok(TransportResponse {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            redirects,
            url,
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse> {
        let mut method = request.method.clone();
        let mut url = request.url.clone();
        let mut headers = request.headers.clone();
        let mut body = request.body.clone();
        let mut redirects = 0;

        if request.credentials == Credentials::Omit {
            headers.remove(header::COOKIE);
        }
        if request.cache == Some(CacheMode::NoStore) && !headers.contains_key(header::CACHE_CONTROL) {
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }

        loop {
            trace!(method = %method, url = %url, "Transport exchange");
            let response = self.execute(&method, &url, &headers, body.as_ref()).await?;
            let status = response.status();

            if !status.is_redirection() {
                return Self::finish(response, redirects).await;
            }

            let Some(next) = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| url.join(location).ok())
            else {
                return Self::finish(response, redirects).await;
            };

            match request.max_redirects {
                Some(max) if redirects >= max => return Self::finish(response, redirects).await,
                None if redirects >= DEFAULT_MAX_REDIRECTS => {
                    return Err(FetchError::TooManyRedirects {
                        max: DEFAULT_MAX_REDIRECTS,
                        hops: redirects,
                    });
                }
                _ => {}
            }

            let switch_to_get = status == StatusCode::SEE_OTHER
                || (matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND)
                    && method == Method::POST);

            if switch_to_get {
                if method != Method::HEAD {
                    method = Method::GET;
                }
                body = None;
                headers.remove(header::CONTENT_TYPE);
                headers.remove(header::CONTENT_LENGTH);
            } else if body.as_ref().is_some_and(|b| !b.is_replayable()) {
                debug!(status = %status, "Cannot replay streamed body across redirect");
                return Self::finish(response, redirects).await;
            }

            if next.origin() != url.origin() {
                headers.remove(header::AUTHORIZATION);
                headers.remove(header::COOKIE);
            }

            redirects += 1;
            debug!(from = %url, to = %next, hop = redirects, "Following redirect");
            url = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_transport_config() {
        let config = ReqwestTransportConfig::default();
        assert!(config.gzip);
        assert!(config.brotli);
        assert!(config.user_agent.starts_with("armature-fetch/"));
    }

    #[test]
    fn test_transport_builds() {
        assert!(ReqwestTransport::new(ReqwestTransportConfig::default()).is_ok());
    }
}
