//! `tenantguard-core`: identifiers and error primitives shared by the
//! authorization crates.
//!
//! This crate carries no IO and no policy; it only names things.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{TenantId, UserId};
