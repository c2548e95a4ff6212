//! Per-request context handed to the dispatcher and its hooks.
//!
//! # Responsibilities
//! - Capture transport method, headers and body once per request
//! - Collect named parameters from the query string and form bodies
//! - Offer read-only access for the lifetime of the request
//!
//! # Design Decisions
//! - Parameters arrive as text; decoding is left to the parameter pipeline
//! - Form fields override query fields of the same name
//! - The raw body is kept: resources store it verbatim

use std::collections::HashMap;

use axum::{
    body::{Body, Bytes},
    http::{header, header::AsHeaderName, HeaderMap, HeaderName, HeaderValue, Method, Request},
};
use serde_json::Value;
use url::form_urlencoded;

use crate::failure::Failure;

/// Parameter carrying the request content in the alternate request syntax.
pub const CONTENT_PARAM: &str = "content";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Immutable view of one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    headers: HeaderMap,
    params: HashMap<String, Value>,
    body: Bytes,
}

impl RequestContext {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            params: HashMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Read the whole request, buffering at most `body_limit` bytes of body.
    pub async fn from_request(request: Request<Body>, body_limit: usize) -> Result<Self, Failure> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, body_limit)
            .await
            .map_err(|e| Failure::generic(format!("Unable to read request body - {}", e)))?;

        let mut params = HashMap::new();
        if let Some(query) = parts.uri.query() {
            collect_pairs(query.as_bytes(), &mut params);
        }

        let is_form = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_start().starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false);
        if is_form {
            collect_pairs(&body, &mut params);
        }

        Ok(Self {
            method: parts.method,
            headers: parts.headers,
            params,
            body,
        })
    }

    /// Method reported by the transport (before any override).
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn params(&self) -> &HashMap<String, Value> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// True when the parameter is present and not null.
    pub fn has_param(&self, name: &str) -> bool {
        matches!(self.params.get(name), Some(v) if !v.is_null())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Request content: the body, or the `content` parameter when the body is empty.
    pub fn content(&self) -> Option<Bytes> {
        if !self.body.is_empty() && !self.is_form() {
            return Some(self.body.clone());
        }
        match self.params.get(CONTENT_PARAM) {
            Some(Value::String(text)) => Some(Bytes::from(text.clone())),
            Some(Value::Null) | None => None,
            Some(other) => Some(Bytes::from(other.to_string())),
        }
    }

    fn is_form(&self) -> bool {
        self.header(header::CONTENT_TYPE)
            .map(|v| v.trim_start().starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false)
    }
}

fn collect_pairs(input: &[u8], params: &mut HashMap<String, Value>) {
    for (name, value) in form_urlencoded::parse(input) {
        params.insert(name.into_owned(), Value::String(value.into_owned()));
    }
}
