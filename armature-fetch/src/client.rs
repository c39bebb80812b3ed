//! Fetch client implementation.

use http::{HeaderMap, HeaderValue, Method, header};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::cancel::RequestSignal;
use crate::config::{self, DefaultsProvider, SharedDefaults};
use crate::cookie::{CookieStore, NoCookies};
use crate::interceptor::Interceptors;
use crate::prepare::prepare;
use crate::response::materialize;
use crate::transport::{ReqwestTransport, ReqwestTransportConfig, Transport};
use crate::{RequestBody, RequestConfig, Response, Result};

struct ClientInner {
    transport: Arc<dyn Transport>,
    cookies: Arc<dyn CookieStore>,
    global: Arc<dyn DefaultsProvider>,
    defaults: SharedDefaults,
    interceptors: Interceptors,
}

/// Fetch-style HTTP client with layered defaults and interceptors.
///
/// Clones share defaults and interceptors. Use [`Client::create`] for an
/// independent instance.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Client using the process-wide defaults and the reqwest transport.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Merge `defaults` into the process-wide defaults.
    pub fn set_global_defaults(defaults: RequestConfig) {
        config::global_defaults().merge(defaults);
    }

    /// Snapshot of the process-wide defaults.
    pub fn global_defaults() -> RequestConfig {
        config::global_defaults().snapshot()
    }

    /// Merge `defaults` into this client's defaults.
    pub fn set_defaults(&self, defaults: RequestConfig) {
        self.inner.defaults.merge(defaults);
    }

    /// Snapshot of this client's defaults.
    pub fn defaults(&self) -> RequestConfig {
        self.inner.defaults.snapshot()
    }

    /// Request and response interceptor chains.
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// New client sharing transport, cookies and global defaults, starting
    /// from a copy of this client's defaults and no interceptors.
    pub fn create(&self) -> Client {
        Client {
            inner: Arc::new(ClientInner {
                transport: self.inner.transport.clone(),
                cookies: self.inner.cookies.clone(),
                global: self.inner.global.clone(),
                defaults: SharedDefaults::from_config(self.defaults()),
                interceptors: Interceptors::default(),
            }),
        }
    }

    /// Effective configuration for `options` given the current defaults.
    pub fn resolve(&self, options: RequestConfig) -> RequestConfig {
        config::resolve(&*self.inner.global, &self.inner.defaults, options)
    }

    /// Send a GET request.
    pub async fn get(
        &self,
        url: impl Into<String>,
        options: impl Into<Option<RequestConfig>>,
    ) -> Result<Response> {
        self.dispatch(Method::GET, url.into(), None, options.into()).await
    }

    /// Send a DELETE request.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        options: impl Into<Option<RequestConfig>>,
    ) -> Result<Response> {
        self.dispatch(Method::DELETE, url.into(), None, options.into()).await
    }

    /// Send a HEAD request.
    pub async fn head(
        &self,
        url: impl Into<String>,
        options: impl Into<Option<RequestConfig>>,
    ) -> Result<Response> {
        self.dispatch(Method::HEAD, url.into(), None, options.into()).await
    }

    /// Send an OPTIONS request.
    pub async fn options(
        &self,
        url: impl Into<String>,
        options: impl Into<Option<RequestConfig>>,
    ) -> Result<Response> {
        self.dispatch(Method::OPTIONS, url.into(), None, options.into()).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: impl Into<String>,
        body: &B,
        options: impl Into<Option<RequestConfig>>,
    ) -> Result<Response> {
        let body = json_body(body)?;
        self.dispatch(Method::POST, url.into(), Some(body), options.into()).await
    }

    /// Send a PUT request with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: impl Into<String>,
        body: &B,
        options: impl Into<Option<RequestConfig>>,
    ) -> Result<Response> {
        let body = json_body(body)?;
        self.dispatch(Method::PUT, url.into(), Some(body), options.into()).await
    }

    /// Send a PATCH request with a JSON body.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: impl Into<String>,
        body: &B,
        options: impl Into<Option<RequestConfig>>,
    ) -> Result<Response> {
        let body = json_body(body)?;
        self.dispatch(Method::PATCH, url.into(), Some(body), options.into()).await
    }

    async fn dispatch(
        &self,
        method: Method,
        url: String,
        json: Option<RequestBody>,
        options: Option<RequestConfig>,
    ) -> Result<Response> {
        let mut options = options.unwrap_or_default();
        options.method = Some(method);
        options.url = Some(url);

        let is_json = json.is_some();
        if let Some(body) = json {
            options.body = Some(body);
        }

        let mut config = self.resolve(options);
        if is_json {
            let headers = config.headers.get_or_insert_with(HeaderMap::new);
            if !headers.contains_key(header::CONTENT_TYPE) {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
        }

        self.run(config).await
    }

    /// Send a request described entirely by `options`.
    pub async fn request(&self, options: RequestConfig) -> Result<Response> {
        let config = self.resolve(options);
        self.run(config).await
    }

    async fn run(&self, config: RequestConfig) -> Result<Response> {
        let interceptors = &self.inner.interceptors;
        let config = interceptors.request.apply(config).await?;

        let outcome = self.exchange(config).await;
        if let Err(e) = &outcome {
            debug!(error = %e, "HTTP request failed");
        }

        interceptors.response.apply_to(outcome).await
    }

    async fn exchange(&self, config: RequestConfig) -> Result<Response> {
        let signal = RequestSignal::new(config.timeout, config.cancel_token.clone());
        let (config, request) = prepare(config, &*self.inner.cookies)?;
        let request = Arc::new(request);

        debug!(method = %request.method, url = %request.url, "Sending HTTP request");
        let raw = signal.guard(self.inner.transport.send(&request)).await?;
        debug!(
            status = %raw.status,
            redirects = raw.redirects,
            url = %raw.url,
            "Received HTTP response"
        );

        materialize(config, request, raw)
    }
}

fn json_body<B: Serialize + ?Sized>(body: &B) -> Result<RequestBody> {
    Ok(RequestBody::Text(serde_json::to_string(body)?))
}

/// Builder for [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    cookies: Option<Arc<dyn CookieStore>>,
    global: Option<Arc<dyn DefaultsProvider>>,
    defaults: RequestConfig,
}

impl ClientBuilder {
    /// Use a custom transport instead of reqwest.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Cookie store consulted for XSRF headers.
    pub fn cookie_store(mut self, cookies: impl CookieStore + 'static) -> Self {
        self.cookies = Some(Arc::new(cookies));
        self
    }

    /// Replace the process-wide defaults with another provider.
    pub fn global_defaults(mut self, provider: impl DefaultsProvider + 'static) -> Self {
        self.global = Some(Arc::new(provider));
        self
    }

    /// Initial instance defaults.
    pub fn defaults(mut self, defaults: RequestConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(ReqwestTransportConfig::default())?),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                cookies: self.cookies.unwrap_or_else(|| Arc::new(NoCookies)),
                global: self
                    .global
                    .unwrap_or_else(|| Arc::new(config::global_defaults().clone())),
                defaults: SharedDefaults::from_config(self.defaults),
                interceptors: Interceptors::default(),
            }),
        })
    }
}
