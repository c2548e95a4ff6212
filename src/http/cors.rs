//! Cross-origin headers for every response.
//!
//! # Responsibilities
//! - Echo the caller's `Origin`, or fall back to the service base URL
//! - Advertise the fixed method and header allow-lists
//!
//! # Design Decisions
//! - Pure: takes a response and returns it decorated; no process-wide header state
//! - Headers are inserted, never appended, so attaching twice is a no-op

use axum::http::{
    header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    },
    header::InvalidHeaderValue,
    HeaderValue,
};

use crate::http::reply::HeaderWritable;

pub const ALLOW_METHODS: &str = "GET, PUT, POST, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Origin, Content-Type, Accept, Authorization, X-Requested-With, X-Experience-API-Version, X-Experience-API-Consistent-Through, Updated";
pub const ALLOW_CREDENTIALS: &str = "true";

/// Cross-origin policy of one service instance.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    fallback_origin: HeaderValue,
}

impl CorsPolicy {
    /// `base_url` is used as `Access-Control-Allow-Origin` when the request has no `Origin`.
    pub fn new(base_url: &str) -> Result<Self, InvalidHeaderValue> {
        let fallback_origin = HeaderValue::from_str(base_url.trim_end_matches('/'))?;
        Ok(Self { fallback_origin })
    }

    pub fn fallback_origin(&self) -> &HeaderValue {
        &self.fallback_origin
    }

    /// Decorate `response` with the four cross-origin headers.
    pub fn attach<R: HeaderWritable>(&self, origin: Option<&HeaderValue>, response: R) -> R {
        attach_cors(response, origin.unwrap_or(&self.fallback_origin))
    }
}

/// Set the cross-origin headers on `response`, overwriting prior values.
pub fn attach_cors<R: HeaderWritable>(mut response: R, allow_origin: &HeaderValue) -> R {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin.clone());
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static(ALLOW_CREDENTIALS),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Failure;
    use crate::http::reply::Reply;
    use axum::http::HeaderMap;

    fn policy() -> CorsPolicy {
        CorsPolicy::new("http://lrs.example.com/").unwrap()
    }

    #[test]
    fn test_echoes_request_origin() {
        let origin = HeaderValue::from_static("https://app.example.org");
        let headers = policy().attach(Some(&origin), HeaderMap::new());

        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.org");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], ALLOW_HEADERS);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[test]
    fn test_falls_back_to_base_url() {
        let headers = policy().attach(None, HeaderMap::new());
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "http://lrs.example.com");
    }

    #[test]
    fn test_attaching_twice_does_not_duplicate() {
        let origin = HeaderValue::from_static("https://a.example");
        let policy = policy();
        let reply = policy.attach(Some(&origin), Reply::from(Failure::generic("boom")));
        let reply = policy.attach(Some(&origin), reply);

        for name in [
            ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
        ] {
            assert_eq!(reply.headers().get_all(&name).iter().count(), 1, "{name}");
        }
    }

    #[test]
    fn test_overwrites_existing_values() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.append(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET"));
        headers.append(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("PATCH"));

        let headers = policy().attach(None, headers);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "http://lrs.example.com");
        let methods: Vec<_> = headers.get_all(ACCESS_CONTROL_ALLOW_METHODS).iter().collect();
        assert_eq!(methods, vec![ALLOW_METHODS]);
    }
}
