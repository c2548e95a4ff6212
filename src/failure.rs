//! Failure taxonomy and the JSON error envelope.
//!
//! # Responsibilities
//! - Classify every failure raised during dispatch into one of four kinds
//! - Map each kind to its HTTP status code
//! - Serialize the canonical `{error, success, message, trace?}` body
//!
//! # Design Decisions
//! - The taxonomy is closed: foreign errors degrade to `Generic`
//! - The status code travels as the HTTP status, never inside the body
//! - `error: true` is still emitted for older clients and always mirrors `success: false`

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::Location;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// A failure raised by a hook or a pipeline step.
#[derive(Debug, Clone, Error)]
pub enum Failure {
    /// The type validator rejected one or more parameters.
    #[error("{}", .0.join(","))]
    Validation(Vec<String>),

    /// The request conflicts with the current state of the resource.
    #[error("{message}")]
    Conflict { message: String, trace: Option<String> },

    /// A request precondition (version header, If-Match, ...) did not hold.
    #[error("{message}")]
    Precondition { message: String, trace: Option<String> },

    /// Anything else.
    #[error("{message}")]
    Generic { message: String, trace: Option<String> },
}

/// Discriminant of [`Failure`], used for logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Validation,
    Conflict,
    Precondition,
    Generic,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Conflict => "conflict",
            FailureKind::Precondition => "precondition",
            FailureKind::Generic => "generic",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Failure {
    pub fn validation(errors: Vec<String>) -> Self {
        Failure::Validation(errors)
    }

    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Failure::Conflict {
            message: message.into(),
            trace: Some(capture_trace()),
        }
    }

    #[track_caller]
    pub fn precondition(message: impl Into<String>) -> Self {
        Failure::Precondition {
            message: message.into(),
            trace: Some(capture_trace()),
        }
    }

    #[track_caller]
    pub fn generic(message: impl Into<String>) -> Self {
        Failure::Generic {
            message: message.into(),
            trace: Some(capture_trace()),
        }
    }

    /// Degrade any error outside the taxonomy to a `Generic` failure.
    #[track_caller]
    pub fn uncategorized<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self::generic(error.to_string())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Validation(_) => FailureKind::Validation,
            Failure::Conflict { .. } => FailureKind::Conflict,
            Failure::Precondition { .. } => FailureKind::Precondition,
            Failure::Generic { .. } => FailureKind::Generic,
        }
    }

    /// HTTP status for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Failure::Validation(_) => StatusCode::BAD_REQUEST,
            Failure::Conflict { .. } => StatusCode::CONFLICT,
            Failure::Precondition { .. } => StatusCode::PRECONDITION_FAILED,
            Failure::Generic { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn trace(&self) -> Option<&str> {
        match self {
            Failure::Validation(_) => None,
            Failure::Conflict { trace, .. }
            | Failure::Precondition { trace, .. }
            | Failure::Generic { trace, .. } => trace.as_deref(),
        }
    }

    /// Drop the diagnostic trace, keeping kind and message.
    pub fn without_trace(self) -> Self {
        match self {
            Failure::Validation(errors) => Failure::Validation(errors),
            Failure::Conflict { message, .. } => Failure::Conflict { message, trace: None },
            Failure::Precondition { message, .. } => Failure::Precondition { message, trace: None },
            Failure::Generic { message, .. } => Failure::Generic { message, trace: None },
        }
    }

    pub fn envelope(&self) -> Envelope {
        let message = match self {
            Failure::Validation(errors) => EnvelopeMessage::List(errors.clone()),
            Failure::Conflict { message, .. }
            | Failure::Precondition { message, .. }
            | Failure::Generic { message, .. } => EnvelopeMessage::Text(message.clone()),
        };

        Envelope {
            error: true,
            success: false,
            message,
            trace: self.trace().map(str::to_owned),
        }
    }
}

/// A bare message with no failure object behind it: no trace.
impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::Generic {
            message,
            trace: None,
        }
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::from(message.to_owned())
    }
}

impl From<serde_json::Error> for Failure {
    fn from(error: serde_json::Error) -> Self {
        Failure::uncategorized(&error)
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}

/// Body written on every error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    /// Deprecated alias of `!success`.
    pub error: bool,
    pub success: bool,
    pub message: EnvelopeMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl Envelope {
    /// Envelope for an error that is not a [`Failure`] (e.g. an unsupported verb).
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            error: true,
            success: false,
            message: EnvelopeMessage::Text(message.into()),
            trace: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EnvelopeMessage {
    Text(String),
    List(Vec<String>),
}

#[track_caller]
fn capture_trace() -> String {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => backtrace.to_string(),
        _ => format!("#0 {}", Location::caller()),
    }
}
