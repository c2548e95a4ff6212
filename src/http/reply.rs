//! Response values produced by the dispatcher.
//!
//! # Responsibilities
//! - Carry status, headers and body from a hook back to the transport
//! - Expose header injection through the [`HeaderWritable`] capability
//! - Convert failures into envelope replies
//!
//! # Design Decisions
//! - Header injection is a trait, so the CORS step works on any response type
//!   that can have headers set, not on one concrete type
//! - Headers set on a `Reply` replace headers of the same name when converted

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use crate::failure::{Envelope, Failure};

/// Capability of a response value to have headers set on it.
pub trait HeaderWritable {
    fn headers_mut(&mut self) -> &mut HeaderMap;
}

impl HeaderWritable for HeaderMap {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self
    }
}

impl<B> HeaderWritable for Response<B> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        Response::headers_mut(self)
    }
}

/// Body of a [`Reply`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Empty,
    Json(Value),
    Bytes(Bytes),
    Envelope(Envelope),
}

/// The response a hook (or the dispatcher itself) produces.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: ReplyBody,
}

impl Reply {
    pub fn new(status: StatusCode, body: ReplyBody) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, ReplyBody::Empty)
    }

    pub fn json(status: StatusCode, value: Value) -> Self {
        Self::new(status, ReplyBody::Json(value))
    }

    /// Raw bytes with an explicit content type.
    pub fn bytes(status: StatusCode, content_type: HeaderValue, bytes: Bytes) -> Self {
        Self::new(status, ReplyBody::Bytes(bytes)).with_header(header::CONTENT_TYPE, content_type)
    }

    pub fn envelope(status: StatusCode, envelope: Envelope) -> Self {
        Self::new(status, ReplyBody::Envelope(envelope))
    }

    /// Same status and headers with no body, as a HEAD reply.
    pub fn without_body(mut self) -> Self {
        self.body = ReplyBody::Empty;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ReplyBody {
        &self.body
    }
}

impl HeaderWritable for Reply {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

impl From<Failure> for Reply {
    fn from(failure: Failure) -> Self {
        Reply::envelope(failure.status(), failure.envelope())
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> axum::response::Response {
        let mut response = match self.body {
            ReplyBody::Empty => Body::empty().into_response(),
            ReplyBody::Json(value) => Json(value).into_response(),
            ReplyBody::Bytes(bytes) => Body::from(bytes).into_response(),
            ReplyBody::Envelope(envelope) => Json(envelope).into_response(),
        };
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for name in self.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in self.headers.iter() {
            headers.append(name.clone(), value.clone());
        }
        response
    }
}
