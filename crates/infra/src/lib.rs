//! Infrastructure layer: role store clients, the async validation
//! orchestrator, and configuration.

pub mod config;
pub mod role_store;
pub mod tenants;
pub mod validation;

pub use config::Config;
pub use role_store::{InMemoryRoleStore, PostgresRoleStore};
pub use tenants::load_accessible_tenants;
pub use validation::{AccessCheck, AccessError, AccessValidator, CLIENT_AREA_RESOURCE, RequestId, ValidationState};
