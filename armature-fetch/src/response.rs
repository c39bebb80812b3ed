//! Response envelope and materialization.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::config::{RequestConfig, ResponseType};
use crate::transport::{TransportRequest, TransportResponse};
use crate::{FetchError, Result};

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// JSON document (`Null` for an empty body).
    Json(Value),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes (blob / array buffer).
    Binary(Bytes),
}

impl ResponseData {
    /// JSON value, if decoded as JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Text, if decoded as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Bytes, if decoded as binary.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Deserialize into `T`. Text is treated as a JSON string, binary data
    /// as a JSON document.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        let parsed = match self {
            Self::Json(value) => serde_json::from_value(value),
            Self::Text(text) => serde_json::from_value(Value::String(text)),
            Self::Binary(bytes) => serde_json::from_slice(&bytes),
        };
        parsed.map_err(|e| FetchError::ResponseParse(e.to_string()))
    }
}

/// Normalized response.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope<T = ResponseData> {
    /// Decoded and transformed body.
    pub data: T,
    /// Status code.
    pub status: StatusCode,
    /// Reason phrase.
    pub status_text: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Effective configuration of the request.
    pub config: RequestConfig,
    /// Final URL.
    pub url: Url,
    /// Request as handed to the transport.
    pub request: Option<Arc<TransportRequest>>,
}

/// Untyped response, as seen by response interceptors.
pub type Response = ResponseEnvelope<ResponseData>;

impl<T> ResponseEnvelope<T> {
    /// Replace the body, keeping everything else.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            data: f(self.data),
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
            config: self.config,
            url: self.url,
            request: self.request,
        }
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the content type if available.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

impl Response {
    /// Convert into a typed envelope.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<ResponseEnvelope<T>> {
        let data = self.data.clone().deserialize()?;
        Ok(self.map(|_| data))
    }

    /// Deserialize a copy of the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        self.data.clone().deserialize()
    }

    /// Body text, if decoded as text.
    pub fn text(&self) -> Option<&str> {
        self.data.as_text()
    }
}

fn decode(response_type: ResponseType, body: Bytes) -> Result<ResponseData> {
    match response_type {
        ResponseType::Json => {
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(ResponseData::Json(Value::Null));
            }
            serde_json::from_slice(&body)
                .map(ResponseData::Json)
                .map_err(|e| FetchError::ResponseParse(e.to_string()))
        }
        ResponseType::Text => String::from_utf8(body.to_vec())
            .map(ResponseData::Text)
            .map_err(|e| FetchError::ResponseParse(e.to_string())),
        ResponseType::Blob | ResponseType::ArrayBuffer => Ok(ResponseData::Binary(body)),
    }
}

/// Turn a raw transport response into an envelope.
///
/// Order: redirect limit, decoding, response transforms, status validation.
pub fn materialize(
    config: RequestConfig,
    request: Arc<TransportRequest>,
    raw: TransportResponse,
) -> Result<Response> {
    if let Some(max) = config.max_redirects
        && raw.redirected()
        && raw.redirects >= max
    {
        return Err(FetchError::TooManyRedirects {
            max,
            hops: raw.redirects,
        });
    }

    let mut data = decode(config.response_type.unwrap_or_default(), raw.body)?;

    if let Some(transforms) = &config.transform_response {
        for transform in transforms {
            data = transform(data);
        }
    }

    if !config.is_valid_status(raw.status) {
        return Err(FetchError::RequestFailed {
            status: raw.status.as_u16(),
        });
    }

    Ok(ResponseEnvelope {
        data,
        status: raw.status,
        status_text: raw.status_text,
        headers: raw.headers,
        config,
        url: raw.url,
        request: Some(request),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use http::Method;
    use serde::Deserialize;
    use serde_json::json;

    fn request() -> Arc<TransportRequest> {
        Arc::new(TransportRequest {
            method: Method::GET,
            url: Url::parse("https://api.example/users").unwrap(),
            headers: HeaderMap::new(),
            body: None,
            credentials: Credentials::SameOrigin,
            cache: None,
            max_redirects: None,
        })
    }

    fn raw(status: u16, body: &'static [u8]) -> TransportResponse {
        let status = StatusCode::from_u16(status).unwrap();
        TransportResponse {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            redirects: 0,
            url: Url::parse("https://api.example/users").unwrap(),
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn test_json_envelope() {
        let response = materialize(RequestConfig::new(), request(), raw(200, br#"{"id":1}"#)).unwrap();
        assert_eq!(response.data, ResponseData::Json(json!({"id": 1})));
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.status_text, "OK");
        assert!(response.request.is_some());
    }

    #[test]
    fn test_empty_body_is_null() {
        let response = materialize(RequestConfig::new(), request(), raw(204, b"")).unwrap();
        assert_eq!(response.data, ResponseData::Json(Value::Null));
    }

    #[test]
    fn test_malformed_json_fails() {
        let err = materialize(RequestConfig::new(), request(), raw(200, b"{nope")).unwrap_err();
        assert!(matches!(err, FetchError::ResponseParse(_)));
    }

    #[test]
    fn test_response_types() {
        let text = RequestConfig::new().response_type(ResponseType::Text);
        let response = materialize(text, request(), raw(200, b"plain")).unwrap();
        assert_eq!(response.text(), Some("plain"));

        let blob = RequestConfig::new().response_type(ResponseType::Blob);
        let response = materialize(blob, request(), raw(200, b"\x00\x01")).unwrap();
        assert_eq!(response.data.as_bytes().map(|b| b.len()), Some(2));
    }

    #[test]
    fn test_invalid_utf8_text_fails() {
        let text = RequestConfig::new().response_type(ResponseType::Text);
        let err = materialize(text, request(), raw(200, b"\xff\xfe")).unwrap_err();
        assert!(matches!(err, FetchError::ResponseParse(_)));
    }

    #[test]
    fn test_status_validation() {
        let err = materialize(RequestConfig::new(), request(), raw(404, b"{}")).unwrap_err();
        assert!(matches!(err, FetchError::RequestFailed { status: 404 }));

        let lenient = RequestConfig::new().validate_status(|_| true);
        let response = materialize(lenient, request(), raw(404, b"{}")).unwrap();
        assert_eq!(response.status.as_u16(), 404);
    }

    #[test]
    fn test_transforms_run_in_order() {
        let config = RequestConfig::new()
            .response_type(ResponseType::Text)
            .transform_response(|data| match data {
                ResponseData::Text(t) => ResponseData::Text(format!("{t}-a")),
                other => other,
            })
            .transform_response(|data| match data {
                ResponseData::Text(t) => ResponseData::Text(format!("{t}-b")),
                other => other,
            });
        let response = materialize(config, request(), raw(200, b"x")).unwrap();
        assert_eq!(response.text(), Some("x-a-b"));
    }

    #[test]
    fn test_redirect_limit() {
        let mut redirected = raw(200, b"{}");
        redirected.redirects = 2;

        let err = materialize(RequestConfig::new().max_redirects(2), request(), redirected.clone())
            .unwrap_err();
        assert!(matches!(err, FetchError::TooManyRedirects { max: 2, hops: 2 }));

        assert!(materialize(RequestConfig::new().max_redirects(3), request(), redirected.clone()).is_ok());
        assert!(materialize(RequestConfig::new(), request(), redirected).is_ok());
    }

    #[test]
    fn test_into_typed() {
        #[derive(Deserialize)]
        struct User {
            id: u32,
            name: String,
        }

        let response =
            materialize(RequestConfig::new(), request(), raw(200, br#"{"id":7,"name":"ada"}"#)).unwrap();
        let typed = response.into_typed::<User>().unwrap();
        assert_eq!(typed.data.id, 7);
        assert_eq!(typed.data.name, "ada");
        assert_eq!(typed.status, StatusCode::OK);
    }
}
