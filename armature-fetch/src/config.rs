//! Request configuration and layered defaults.
//!
//! Every field of [`RequestConfig`] is optional so that a config can act as
//! a partial layer. The effective configuration of a request is
//! `global.merge(instance).merge(per_call)`, where for each field the later
//! layer wins when it is set. Merging is shallow: a later `headers` map
//! replaces an earlier one as a whole.

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::body::RequestBody;
use crate::cancel::CancelToken;
use crate::response::ResponseData;

/// Custom query string serializer.
pub type ParamsSerializer = Arc<dyn Fn(&Params) -> String + Send + Sync>;

/// Predicate deciding whether a status code counts as success.
pub type ValidateStatus = Arc<dyn Fn(StatusCode) -> bool + Send + Sync>;

/// Transform applied to the outgoing body and headers.
pub type TransformRequest =
    Arc<dyn Fn(Option<RequestBody>, &mut HeaderMap) -> Option<RequestBody> + Send + Sync>;

/// Transform applied to decoded response data.
pub type TransformResponse = Arc<dyn Fn(ResponseData) -> ResponseData + Send + Sync>;

/// Ordered, flat query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Look up a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Params
where
    K: Into<String>,
    V: ToString,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Username/password pair for Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl BasicAuth {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Proxy descriptor. Only used to compute an alternate target URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Scheme, `http` when unset.
    pub protocol: Option<String>,
    /// Proxy host. A proxy without host is ignored.
    pub host: Option<String>,
    /// Proxy port.
    pub port: Option<u16>,
    /// Proxy credentials.
    pub auth: Option<BasicAuth>,
}

impl ProxyConfig {
    /// Create a proxy descriptor for a host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Default::default()
        }
    }

    /// Set the scheme.
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set proxy credentials.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth::new(username, password));
        self
    }
}

/// Credentials mode forwarded to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    /// Never send credentials.
    Omit,
    /// Send credentials to the same origin only.
    SameOrigin,
    /// Always send credentials.
    Include,
}

/// Cache directive forwarded to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Prefer any cached response.
    ForceCache,
    /// Bypass caches entirely.
    NoStore,
}

/// How the response body is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// JSON document.
    #[default]
    Json,
    /// UTF-8 text.
    Text,
    /// Opaque binary blob.
    Blob,
    /// Raw byte buffer.
    ArrayBuffer,
}

/// Partial request configuration.
#[derive(Clone, Default)]
pub struct RequestConfig {
    /// HTTP method.
    pub method: Option<Method>,
    /// Request path or absolute URL.
    pub url: Option<String>,
    /// Prefix for relative request URLs.
    pub base_url: Option<String>,
    /// Request headers.
    pub headers: Option<HeaderMap>,
    /// Query parameters.
    pub params: Option<Params>,
    /// Custom query string serializer.
    pub params_serializer: Option<ParamsSerializer>,
    /// Request body.
    pub body: Option<RequestBody>,
    /// Time before the request is aborted.
    pub timeout: Option<Duration>,
    /// Basic authentication credentials.
    pub auth: Option<BasicAuth>,
    /// Proxy descriptor.
    pub proxy: Option<ProxyConfig>,
    /// Shorthand for [`Credentials::Include`].
    pub with_credentials: Option<bool>,
    /// Credentials mode.
    pub credentials: Option<Credentials>,
    /// Cookie holding the XSRF token.
    pub xsrf_cookie_name: Option<String>,
    /// Header receiving the XSRF token.
    pub xsrf_header_name: Option<String>,
    /// Maximum request content length in bytes.
    pub max_content_length: Option<u64>,
    /// Maximum request body length in bytes.
    pub max_body_length: Option<u64>,
    /// Maximum redirects.
    pub max_redirects: Option<usize>,
    /// Status predicate, `200..300` when unset.
    pub validate_status: Option<ValidateStatus>,
    /// Response decoding.
    pub response_type: Option<ResponseType>,
    /// Request transforms, applied in order.
    pub transform_request: Option<Vec<TransformRequest>>,
    /// Response transforms, applied in order.
    pub transform_response: Option<Vec<TransformResponse>>,
    /// External cancellation.
    pub cancel_token: Option<CancelToken>,
    /// Cache directive.
    pub cache: Option<CacheMode>,
}

macro_rules! merge_fields {
    ($base:ident, $over:ident; $($field:ident),+ $(,)?) => {
        RequestConfig {
            $($field: $over.$field.or($base.$field),)+
        }
    };
}

impl RequestConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow merge: every field set in `other` replaces the field in `self`.
    pub fn merge(self, other: RequestConfig) -> RequestConfig {
        let base = self;
        merge_fields!(base, other;
            method,
            url,
            base_url,
            headers,
            params,
            params_serializer,
            body,
            timeout,
            auth,
            proxy,
            with_credentials,
            credentials,
            xsrf_cookie_name,
            xsrf_header_name,
            max_content_length,
            max_body_length,
            max_redirects,
            validate_status,
            response_type,
            transform_request,
            transform_response,
            cancel_token,
            cache,
        )
    }

    /// Merge layers left to right; later layers win.
    pub fn merge_all<I>(layers: I) -> RequestConfig
    where
        I: IntoIterator<Item = RequestConfig>,
    {
        layers
            .into_iter()
            .fold(RequestConfig::default(), RequestConfig::merge)
    }

    /// Effective status predicate.
    pub fn is_valid_status(&self, status: StatusCode) -> bool {
        match &self.validate_status {
            Some(validate) => validate(status),
            None => status.is_success(),
        }
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the request path or URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Add a header. Invalid names or values are skipped.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        match (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers
                    .get_or_insert_with(HeaderMap::new)
                    .insert(name, value);
            }
            _ => {
                tracing::warn!(header = name.as_ref(), "Ignoring invalid header");
            }
        }
        self
    }

    /// Replace all headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.get_or_insert_with(Params::new).insert(key, value);
        self
    }

    /// Replace all query parameters.
    pub fn params(mut self, params: impl Into<Params>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Set a custom query string serializer.
    pub fn params_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&Params) -> String + Send + Sync + 'static,
    {
        self.params_serializer = Some(Arc::new(serializer));
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set Basic authentication credentials.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth::new(username, password));
        self
    }

    /// Set the proxy descriptor.
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Send credentials on cross-origin requests.
    pub fn with_credentials(mut self, enable: bool) -> Self {
        self.with_credentials = Some(enable);
        self
    }

    /// Set the credentials mode.
    pub fn credentials(mut self, mode: Credentials) -> Self {
        self.credentials = Some(mode);
        self
    }

    /// Copy the named cookie into the named header on every request.
    pub fn xsrf(mut self, cookie_name: impl Into<String>, header_name: impl Into<String>) -> Self {
        self.xsrf_cookie_name = Some(cookie_name.into());
        self.xsrf_header_name = Some(header_name.into());
        self
    }

    /// Set the maximum content length.
    pub fn max_content_length(mut self, max: u64) -> Self {
        self.max_content_length = Some(max);
        self
    }

    /// Set the maximum body length.
    pub fn max_body_length(mut self, max: u64) -> Self {
        self.max_body_length = Some(max);
        self
    }

    /// Set the maximum number of redirects.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = Some(max);
        self
    }

    /// Set the status predicate.
    pub fn validate_status<F>(mut self, validate: F) -> Self
    where
        F: Fn(StatusCode) -> bool + Send + Sync + 'static,
    {
        self.validate_status = Some(Arc::new(validate));
        self
    }

    /// Set the response decoding.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Append a request transform.
    pub fn transform_request<F>(mut self, transform: F) -> Self
    where
        F: Fn(Option<RequestBody>, &mut HeaderMap) -> Option<RequestBody> + Send + Sync + 'static,
    {
        self.transform_request
            .get_or_insert_with(Vec::new)
            .push(Arc::new(transform));
        self
    }

    /// Append a response transform.
    pub fn transform_response<F>(mut self, transform: F) -> Self
    where
        F: Fn(ResponseData) -> ResponseData + Send + Sync + 'static,
    {
        self.transform_response
            .get_or_insert_with(Vec::new)
            .push(Arc::new(transform));
        self
    }

    /// Attach an external cancel token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Set the cache directive.
    pub fn cache(mut self, mode: CacheMode) -> Self {
        self.cache = Some(mode);
        self
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("params_serializer", &self.params_serializer.is_some())
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("auth", &self.auth)
            .field("proxy", &self.proxy)
            .field("with_credentials", &self.with_credentials)
            .field("credentials", &self.credentials)
            .field("xsrf_cookie_name", &self.xsrf_cookie_name)
            .field("xsrf_header_name", &self.xsrf_header_name)
            .field("max_content_length", &self.max_content_length)
            .field("max_body_length", &self.max_body_length)
            .field("max_redirects", &self.max_redirects)
            .field("validate_status", &self.validate_status.is_some())
            .field("response_type", &self.response_type)
            .field(
                "transform_request",
                &self.transform_request.as_ref().map(Vec::len),
            )
            .field(
                "transform_response",
                &self.transform_response.as_ref().map(Vec::len),
            )
            .field("cancel_token", &self.cancel_token)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Source of a defaults layer, read once per request.
pub trait DefaultsProvider: Send + Sync {
    /// Current defaults.
    fn snapshot(&self) -> RequestConfig;
}

impl DefaultsProvider for RequestConfig {
    fn snapshot(&self) -> RequestConfig {
        self.clone()
    }
}

/// Mutable defaults layer shared between clones.
#[derive(Debug, Clone, Default)]
pub struct SharedDefaults {
    inner: Arc<RwLock<RequestConfig>>,
}

impl SharedDefaults {
    /// Create an empty defaults layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a layer seeded with `config`.
    pub fn from_config(config: RequestConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Shallow-merge `config` into the current defaults.
    pub fn merge(&self, config: RequestConfig) {
        let mut current = self.inner.write();
        let previous = std::mem::take(&mut *current);
        *current = previous.merge(config);
    }

    /// Drop every default.
    pub fn reset(&self) {
        *self.inner.write() = RequestConfig::default();
    }
}

impl DefaultsProvider for SharedDefaults {
    fn snapshot(&self) -> RequestConfig {
        self.inner.read().clone()
    }
}

static GLOBAL_DEFAULTS: Lazy<SharedDefaults> = Lazy::new(SharedDefaults::new);

/// Process-wide defaults layer.
pub fn global_defaults() -> &'static SharedDefaults {
    &GLOBAL_DEFAULTS
}

/// Compute the effective configuration of one request.
pub fn resolve(
    global: &dyn DefaultsProvider,
    instance: &dyn DefaultsProvider,
    per_call: RequestConfig,
) -> RequestConfig {
    RequestConfig::merge_all([global.snapshot(), instance.snapshot(), per_call])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_layer_wins_per_field() {
        let global = RequestConfig::new()
            .timeout(Duration::from_millis(1))
            .base_url("https://global.example");
        let instance = RequestConfig::new()
            .base_url("https://instance.example")
            .max_redirects(2);
        let options = RequestConfig::new().max_redirects(3);

        let resolved = resolve(&global, &instance, options);

        assert_eq!(resolved.timeout, Some(Duration::from_millis(1)));
        assert_eq!(resolved.base_url.as_deref(), Some("https://instance.example"));
        assert_eq!(resolved.max_redirects, Some(3));
    }

    #[test]
    fn test_headers_are_not_deep_merged() {
        let base = RequestConfig::new().header("x-a", "1").header("x-b", "1");
        let over = RequestConfig::new().header("x-b", "2");

        let merged = base.merge(over);
        let headers = merged.headers.unwrap();

        assert!(headers.get("x-a").is_none());
        assert_eq!(headers.get("x-b").unwrap(), "2");
    }

    #[test]
    fn test_shared_defaults_merge_accumulates() {
        let defaults = SharedDefaults::new();
        defaults.merge(RequestConfig::new().timeout(Duration::from_secs(1)));
        defaults.merge(RequestConfig::new().base_url("https://api.example"));
        defaults.merge(RequestConfig::new().timeout(Duration::from_secs(2)));

        let snapshot = defaults.snapshot();
        assert_eq!(snapshot.timeout, Some(Duration::from_secs(2)));
        assert_eq!(snapshot.base_url.as_deref(), Some("https://api.example"));

        defaults.reset();
        assert!(defaults.snapshot().base_url.is_none());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let defaults = SharedDefaults::new();
        defaults.merge(RequestConfig::new().max_redirects(1));
        let before = resolve(&defaults, &RequestConfig::new(), RequestConfig::new());

        defaults.merge(RequestConfig::new().max_redirects(5));
        let after = resolve(&defaults, &RequestConfig::new(), RequestConfig::new());

        assert_eq!(before.max_redirects, Some(1));
        assert_eq!(after.max_redirects, Some(5));
    }

    #[test]
    fn test_params_insert_replaces_in_place() {
        let mut params = Params::from([("a", "1"), ("b", "2")]);
        params.insert("a", 3);

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
        assert_eq!(params.get("b"), Some("2"));
    }

    #[test]
    fn test_default_status_validation() {
        let config = RequestConfig::new();
        assert!(config.is_valid_status(StatusCode::OK));
        assert!(config.is_valid_status(StatusCode::NO_CONTENT));
        assert!(!config.is_valid_status(StatusCode::NOT_FOUND));
        assert!(!config.is_valid_status(StatusCode::MULTIPLE_CHOICES));

        let lenient = config.validate_status(|_| true);
        assert!(lenient.is_valid_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let config = RequestConfig::new().header("bad header", "x");
        assert!(config.headers.is_none());
    }
}
