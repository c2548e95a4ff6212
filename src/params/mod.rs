//! Parameter pipeline.
//!
//! # Data Flow
//! ```text
//! raw parameter (text or structured)
//!     → decode.rs (JSON text → structure, never fails)
//!     → validator.rs (declared type check, "params" section)
//!     → pipeline.rs (optional / required / named-with-default)
//!     → decoded Value or Failure
//! ```
//!
//! # Design Decisions
//! - Decode failures keep the raw value; only the validator rejects
//! - A missing required parameter is a generic failure, not a validation failure

pub mod decode;
pub mod pipeline;
pub mod validator;

pub use decode::decode_value;
pub use pipeline::ParamPipeline;
pub use validator::{CheckStatus, TypeReport, TypeValidator, XapiTypeValidator, PARAMS_SECTION};
