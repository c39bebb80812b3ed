//! Request and response interceptors.
//!
//! An [`InterceptorManager`] holds an ordered list of handlers. Applying it
//! folds a value through the list: each handler's fulfilled transform gets
//! the previous output, and when a previous step failed, the error goes to
//! the handler's rejected callback instead (or passes through unchanged
//! when there is none).

use async_trait::async_trait;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::{FetchError, RequestConfig, Response, Result};

/// Success-path transform.
#[async_trait]
pub trait Fulfilled<T>: Send + Sync {
    /// Transform the current value.
    async fn call(&self, value: T) -> Result<T>;
}

/// Error-path handler. Returning `Ok` resumes the chain.
#[async_trait]
pub trait Rejected<T>: Send + Sync {
    /// Recover from or replace the current error.
    async fn call(&self, error: FetchError) -> Result<T>;
}

#[async_trait]
impl<T, F, Fut> Fulfilled<T> for F
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    async fn call(&self, value: T) -> Result<T> {
        (self)(value).await
    }
}

#[async_trait]
impl<T, F, Fut> Rejected<T> for F
where
    T: Send + 'static,
    F: Fn(FetchError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    async fn call(&self, error: FetchError) -> Result<T> {
        (self)(error).await
    }
}

/// Identifier returned on registration, usable with [`InterceptorManager::eject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

impl HandlerId {
    /// Position in the registration order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A fulfilled/rejected pair.
pub struct InterceptorHandler<T> {
    fulfilled: Option<Arc<dyn Fulfilled<T>>>,
    rejected: Option<Arc<dyn Rejected<T>>>,
}

impl<T> InterceptorHandler<T> {
    /// Handler with a fulfilled transform and no recovery.
    pub fn new(fulfilled: impl Fulfilled<T> + 'static) -> Self {
        Self {
            fulfilled: Some(Arc::new(fulfilled)),
            rejected: None,
        }
    }

    /// Assemble a handler from optional parts.
    pub fn from_parts(
        fulfilled: Option<Arc<dyn Fulfilled<T>>>,
        rejected: Option<Arc<dyn Rejected<T>>>,
    ) -> Self {
        Self {
            fulfilled,
            rejected,
        }
    }

    /// Attach a rejected callback.
    pub fn with_rejected(mut self, rejected: impl Rejected<T> + 'static) -> Self {
        self.rejected = Some(Arc::new(rejected));
        self
    }

    /// Whether the handler has a fulfilled transform.
    pub fn is_callable(&self) -> bool {
        self.fulfilled.is_some()
    }

    /// Whether the handler has a rejected callback.
    pub fn has_rejected(&self) -> bool {
        self.rejected.is_some()
    }
}

impl<T> Clone for InterceptorHandler<T> {
    fn clone(&self) -> Self {
        Self {
            fulfilled: self.fulfilled.clone(),
            rejected: self.rejected.clone(),
        }
    }
}

impl<T> std::fmt::Debug for InterceptorHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorHandler")
            .field("fulfilled", &self.fulfilled.is_some())
            .field("rejected", &self.rejected.is_some())
            .finish()
    }
}

/// Ordered registry of handlers for one value type.
pub struct InterceptorManager<T> {
    handlers: RwLock<Vec<InterceptorHandler<T>>>,
}

impl<T: Send + 'static> InterceptorManager<T> {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler. Fails when it has no fulfilled transform.
    pub fn register(&self, handler: InterceptorHandler<T>) -> Result<HandlerId> {
        if !handler.is_callable() {
            return Err(FetchError::InvalidHandler(
                "fulfilled interceptor must be a function".to_string(),
            ));
        }
        let mut handlers = self.handlers.write();
        handlers.push(handler);
        Ok(HandlerId(handlers.len() - 1))
    }

    /// Register a fulfilled transform.
    pub fn register_fn<F, Fut>(&self, fulfilled: F) -> HandlerId
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.push(InterceptorHandler::new(fulfilled))
    }

    /// Register a fulfilled transform with a rejected callback.
    pub fn register_with_recovery<F, Fut, R, RFut>(&self, fulfilled: F, rejected: R) -> HandlerId
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        R: Fn(FetchError) -> RFut + Send + Sync + 'static,
        RFut: Future<Output = Result<T>> + Send + 'static,
    {
        self.push(InterceptorHandler::new(fulfilled).with_rejected(rejected))
    }

    fn push(&self, handler: InterceptorHandler<T>) -> HandlerId {
        let mut handlers = self.handlers.write();
        handlers.push(handler);
        HandlerId(handlers.len() - 1)
    }

    /// Remove a handler. Other ids stay valid.
    pub fn eject(&self, id: HandlerId) -> bool {
        match self.handlers.write().get_mut(id.0) {
            Some(slot) if slot.is_callable() => {
                *slot = InterceptorHandler::from_parts(None, None);
                true
            }
            _ => false,
        }
    }

    /// Remove every handler.
    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    /// Number of active handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().iter().filter(|h| h.is_callable()).count()
    }

    /// Whether there are no active handlers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the raw ordered handler list, ejected slots included.
    pub fn list_handlers(&self) -> Vec<InterceptorHandler<T>> {
        self.handlers.read().clone()
    }

    /// Fold `initial` through the handlers in registration order.
    pub async fn apply(&self, initial: T) -> Result<T> {
        self.apply_to(Ok(initial)).await
    }

    /// Fold a prior outcome through the handlers. A leading error reaches
    /// the first handler's rejected callback.
    pub async fn apply_to(&self, initial: Result<T>) -> Result<T> {
        let handlers = self.list_handlers();
        let mut state = initial;

        for (index, handler) in handlers.iter().enumerate() {
            let Some(fulfilled) = &handler.fulfilled else {
                warn!(index, "Skipping interceptor without a fulfilled handler");
                continue;
            };

            state = match state {
                Ok(value) => {
                    trace!(index, "Running fulfilled interceptor");
                    fulfilled.call(value).await
                }
                Err(error) => match &handler.rejected {
                    Some(rejected) => {
                        trace!(index, error = %error, "Running rejected interceptor");
                        rejected.call(error).await
                    }
                    None => Err(error),
                },
            };
        }

        state
    }
}

impl<T: Send + 'static> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The request and response chains of one client.
#[derive(Default)]
pub struct Interceptors {
    /// Applied to the resolved configuration before the request is prepared.
    pub request: InterceptorManager<RequestConfig>,
    /// Applied to the response envelope before it is returned.
    pub response: InterceptorManager<Response>,
}

/// Logging interceptor that logs requests and responses.
pub struct LoggingInterceptor {
    log_headers: bool,
}

impl LoggingInterceptor {
    /// Create a new logging interceptor.
    pub fn new() -> Self {
        Self { log_headers: false }
    }

    /// Enable logging of headers.
    pub fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fulfilled<RequestConfig> for LoggingInterceptor {
    async fn call(&self, config: RequestConfig) -> Result<RequestConfig> {
        tracing::debug!(
            method = ?config.method,
            base_url = ?config.base_url,
            url = ?config.url,
            "Sending HTTP request"
        );

        if self.log_headers
            && let Some(headers) = &config.headers
        {
            for (name, value) in headers {
                tracing::trace!(header = %name, value = ?value, "Request header");
            }
        }

        Ok(config)
    }
}

#[async_trait]
impl Fulfilled<Response> for LoggingInterceptor {
    async fn call(&self, response: Response) -> Result<Response> {
        tracing::debug!(
            status = %response.status,
            url = %response.url,
            "Received HTTP response"
        );

        if self.log_headers {
            for (name, value) in &response.headers {
                tracing::trace!(header = %name, value = ?value, "Response header");
            }
        }

        Ok(response)
    }
}
