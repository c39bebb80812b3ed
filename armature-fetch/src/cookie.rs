//! Cookie store used for XSRF header derivation.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Read access to ambient cookies.
pub trait CookieStore: Send + Sync {
    /// Value of the named cookie.
    fn get(&self, name: &str) -> Option<String>;
}

/// Store without cookies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCookies;

impl CookieStore for NoCookies {
    fn get(&self, _name: &str) -> Option<String> {
        None
    }
}

/// In-memory cookie jar.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Arc<RwLock<HashMap<String, String>>>,
}

impl CookieJar {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cookie.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.write().insert(name.into(), value.into());
    }

    /// Remove a cookie.
    pub fn remove(&self, name: &str) -> Option<String> {
        self.cookies.write().remove(name)
    }

    /// Load cookies from a `Cookie` header value (`a=1; b=2`).
    pub fn parse_header(&self, header: &str) {
        let mut cookies = self.cookies.write();
        for pair in header.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    cookies.insert(name.to_string(), value.trim().to_string());
                }
            }
        }
    }
}

impl CookieStore for CookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jar_set_get_remove() {
        let jar = CookieJar::new();
        jar.set("XSRF-TOKEN", "abc");
        assert_eq!(jar.get("XSRF-TOKEN").as_deref(), Some("abc"));
        assert_eq!(jar.remove("XSRF-TOKEN").as_deref(), Some("abc"));
        assert!(jar.get("XSRF-TOKEN").is_none());
    }

    #[test]
    fn test_parse_header() {
        let jar = CookieJar::new();
        jar.parse_header("session=s1; XSRF-TOKEN=t0k3n ;broken; =x");
        assert_eq!(jar.get("session").as_deref(), Some("s1"));
        assert_eq!(jar.get("XSRF-TOKEN").as_deref(), Some("t0k3n"));
        assert!(jar.get("broken").is_none());
    }

    #[test]
    fn test_no_cookies() {
        assert!(NoCookies.get("anything").is_none());
    }
}
