//! URL and query string composition.

use crate::config::{Params, ParamsSerializer};
use crate::{FetchError, Result};

/// Whether `path` is an absolute URL (`scheme://...`) or protocol-relative (`//...`).
pub fn is_absolute_url(path: &str) -> bool {
    if path.starts_with("//") {
        return true;
    }

    let Some((scheme, _)) = path.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Default query serializer: `application/x-www-form-urlencoded`, insertion order.
pub fn serialize_params(params: &Params) -> Result<String> {
    serde_urlencoded::to_string(params.pairs()).map_err(|e| FetchError::Serialization(e.to_string()))
}

/// Build the request URL from a base, a path and query parameters.
///
/// The base is prepended verbatim to relative paths; no slash normalization
/// is done, so `("https://a/", "/b")` yields `https://a//b`.
pub fn build_url(
    base_url: Option<&str>,
    path: &str,
    params: Option<&Params>,
    serializer: Option<&ParamsSerializer>,
) -> Result<String> {
    let mut url = match base_url {
        Some(base) if !base.is_empty() && !is_absolute_url(path) => format!("{base}{path}"),
        _ => path.to_string(),
    };

    if let Some(params) = params.filter(|p| !p.is_empty()) {
        let query = match serializer {
            Some(serialize) => serialize(params),
            None => serialize_params(params)?,
        };
        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query);
        }
    }

    Ok(url)
}
