//! `ledgergate-core`: shared identity and error primitives.
//!
//! This crate contains **pure** building blocks (no I/O, no policy): the
//! strongly-typed identifiers every other crate speaks in, the closed set of
//! resource kinds the platform knows about, and the shared error model.

pub mod error;
pub mod id;
pub mod resource;

pub use error::{CoreError, CoreResult};
pub use id::{RequestId, ResourceId, TenantId, UserId};
pub use resource::ResourceKind;
