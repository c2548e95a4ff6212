//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext
//!     → verb.rs (method override, verb → hook)
//!     → dispatcher.rs (invoke hook, catch failures and panics)
//!     → resource.rs hooks (show / index / update / store / destroy)
//!     → Reply (hook result or failure envelope)
//!     → CORS headers attached
//! ```

pub mod dispatcher;
pub mod resource;
pub mod verb;

pub use dispatcher::Dispatcher;
pub use resource::{HookResult, Resource};
pub use verb::{Hook, Verb};
