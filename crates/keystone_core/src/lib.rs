//! KEYSTONE Core Types
//!
//! This crate contains pure types and logic with no I/O: resource
//! identifiers, the closed set of resource kinds, attribute values and
//! reference expressions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod kind;
pub mod reference;
pub mod value;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use id::{ResourceId, RunId};
pub use kind::ResourceKind;
pub use reference::Reference;
pub use value::{Value, ValueKind};
