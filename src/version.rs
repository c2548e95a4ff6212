//! Protocol version gate.
//!
//! Operations that require a compliant client call [`check_version`] themselves;
//! the dispatcher never applies it globally.

use axum::http::{HeaderMap, HeaderName};

use crate::failure::Failure;

pub const X_EXPERIENCE_API_VERSION: HeaderName = HeaderName::from_static("x-experience-api-version");

/// Accepted `major.minor.` prefix; any patch release passes.
pub const SUPPORTED_VERSION_PREFIX: &str = "1.0.";

pub const UNACCEPTED_VERSION: &str = "This is not an accepted version of xAPI.";

/// Reject requests whose version header is missing or not a 1.0.x release.
#[track_caller]
pub fn check_version(headers: &HeaderMap) -> Result<(), Failure> {
    let version = headers
        .get(X_EXPERIENCE_API_VERSION)
        .and_then(|v| v.to_str().ok());

    match version {
        Some(v) if v.starts_with(SUPPORTED_VERSION_PREFIX) => Ok(()),
        _ => {
            tracing::debug!(version = ?version, "Rejected xAPI version");
            Err(Failure::precondition(UNACCEPTED_VERSION))
        }
    }
}
