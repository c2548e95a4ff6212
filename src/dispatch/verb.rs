//! Effective verb resolution.

use std::fmt;

use crate::http::context::RequestContext;

/// Parameter that overrides the transport method (for clients limited to GET/POST).
pub const METHOD_OVERRIDE_PARAM: &str = "method";

/// Value of the `Allow` header sent with 405 replies.
pub const ALLOWED_VERBS: &str = "GET, HEAD, PUT, POST, DELETE, OPTIONS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Get,
    Head,
    Put,
    Post,
    Delete,
    Options,
    Other(String),
}

/// Operation hook a verb maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// `show` or `index`, depending on the identifier parameter.
    Get,
    Update,
    Store,
    Destroy,
}

impl Verb {
    /// Prefer the `method` parameter; fall back to the transport method.
    pub fn resolve(ctx: &RequestContext) -> Self {
        match ctx.param(METHOD_OVERRIDE_PARAM).and_then(|v| v.as_str()) {
            Some(method) if !method.trim().is_empty() => Self::parse(method.trim()),
            _ => Self::parse(ctx.method().as_str()),
        }
    }

    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Verb::Get,
            "HEAD" => Verb::Head,
            "PUT" => Verb::Put,
            "POST" => Verb::Post,
            "DELETE" => Verb::Delete,
            "OPTIONS" => Verb::Options,
            other => Verb::Other(other.to_string()),
        }
    }

    pub fn hook(&self) -> Option<Hook> {
        match self {
            Verb::Get | Verb::Head => Some(Hook::Get),
            Verb::Put => Some(Hook::Update),
            Verb::Post => Some(Hook::Store),
            Verb::Delete => Some(Hook::Destroy),
            Verb::Options | Verb::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
            Verb::Put => "PUT",
            Verb::Post => "POST",
            Verb::Delete => "DELETE",
            Verb::Options => "OPTIONS",
            Verb::Other(other) => other,
        }
    }

    /// Bounded label for metrics; every unsupported verb shares `OTHER`.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
            Verb::Put => "PUT",
            Verb::Post => "POST",
            Verb::Delete => "DELETE",
            Verb::Options => "OPTIONS",
            Verb::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
