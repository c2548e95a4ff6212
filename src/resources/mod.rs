//! Resources served behind the dispatcher.
//!
//! # Design Decisions
//! - Storage lives in process memory; persistence is a host concern
//! - Each resource validates its own parameters through the parameter pipeline

pub mod document;

pub use document::DocumentResource;
