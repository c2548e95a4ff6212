//! Request-dispatch and validation core of an xAPI endpoint.
//!
//! A [`Dispatcher`] resolves the effective verb of a request, invokes the matching
//! [`Resource`] hook, turns any [`Failure`] into a JSON envelope with the right status,
//! and attaches cross-origin headers on every path.

pub mod config;
pub mod dispatch;
pub mod failure;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod params;
pub mod resources;
pub mod version;

pub use config::EndpointConfig;
pub use dispatch::{Dispatcher, Resource};
pub use failure::{Envelope, Failure};
pub use http::{EndpointServer, Reply, RequestContext};
pub use lifecycle::Shutdown;
