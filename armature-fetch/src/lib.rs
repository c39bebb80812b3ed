//! # Armature Fetch
//!
//! A fetch-style HTTP client with layered defaults, interceptor chains and a
//! normalized response envelope.
//!
//! ## Features
//!
//! - **Layered Defaults**: Global, instance, per-call and interceptor layers
//! - **Interceptors**: Ordered request/response chains with error recovery
//! - **Request Preparation**: Basic auth, XSRF headers, credentials mode, body limits, proxy
//! - **Timeouts and Cancellation**: Per-request deadlines and cancel tokens
//! - **Response Decoding**: JSON, text or binary bodies with transforms and status validation
//! - **Pluggable Transport**: reqwest by default, any [`Transport`] implementation otherwise
//!   (`armature-fetch-testing` ships a scripted one for tests)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use armature_fetch::{Client, RequestConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new()?;
//!     client.set_defaults(
//!         RequestConfig::new()
//!             .base_url("https://api.example.com")
//!             .timeout(Duration::from_secs(10)),
//!     );
//!
//!     let response = client
//!         .get("/users", RequestConfig::new().param("page", 2))
//!         .await?;
//!
//!     println!("Status: {}", response.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Interceptors
//!
//! ```rust,no_run
//! use armature_fetch::{Client, RequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new()?;
//!
//!     client
//!         .interceptors()
//!         .request
//!         .register_fn(|config: RequestConfig| async move {
//!             Ok(config.header("authorization", "Bearer token"))
//!         });
//!
//!     let response = client
//!         .post("https://api.example.com/orders", &serde_json::json!({"item": "widget"}), None)
//!         .await?;
//!
//!     println!("Created: {:?}", response.data);
//!     Ok(())
//! }
//! ```

mod body;
mod cancel;
mod client;
mod compose;
mod config;
mod cookie;
mod error;
mod interceptor;
mod prepare;
mod response;
mod transport;

pub use body::{ByteStream, FormPart, PartValue, RequestBody};
pub use cancel::CancelToken;
pub use client::{Client, ClientBuilder};
pub use compose::{build_url, is_absolute_url, serialize_params};
pub use config::{
    BasicAuth, CacheMode, Credentials, DefaultsProvider, Params, ParamsSerializer, ProxyConfig,
    RequestConfig, ResponseType, SharedDefaults, TransformRequest, TransformResponse,
    ValidateStatus, global_defaults, resolve,
};
pub use cookie::{CookieJar, CookieStore, NoCookies};
pub use error::{BodyLimit, FetchError, Result};
pub use interceptor::{
    Fulfilled, HandlerId, InterceptorHandler, InterceptorManager, Interceptors,
    LoggingInterceptor, Rejected,
};
pub use prepare::{
    apply_xsrf, basic_auth_header, check_request_body_size, prepare, proxy_url,
    resolve_credentials,
};
pub use response::{Response, ResponseData, ResponseEnvelope, materialize};
pub use transport::{
    DEFAULT_MAX_REDIRECTS, ReqwestTransport, ReqwestTransportConfig, Transport, TransportRequest,
    TransportResponse,
};

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use armature_fetch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::client::{Client, ClientBuilder};
    pub use crate::config::{Credentials, ProxyConfig, RequestConfig, ResponseType};
    pub use crate::error::{FetchError, Result};
    pub use crate::interceptor::{InterceptorHandler, LoggingInterceptor};
    pub use crate::response::{Response, ResponseData, ResponseEnvelope};
    pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
}
