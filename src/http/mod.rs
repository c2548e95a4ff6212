//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, resource mounts)
//!     → request.rs (request ID)
//!     → context.rs (method, headers, query/form parameters, body)
//!     → [dispatcher invokes the resource hook]
//!     → reply.rs (status, headers, body or failure envelope)
//!     → cors.rs (cross-origin headers)
//!     → Send to client
//! ```

pub mod context;
pub mod cors;
pub mod reply;
pub mod request;
pub mod server;

pub use context::RequestContext;
pub use cors::CorsPolicy;
pub use reply::{HeaderWritable, Reply, ReplyBody};
pub use request::X_REQUEST_ID;
pub use server::EndpointServer;
