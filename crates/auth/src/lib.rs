//! `tenantguard-auth`: tenant-scoped authorization model (deny by default).
//!
//! Pure decision logic plus the interfaces it reads through. No HTTP, no
//! storage implementation, no global state: the selected tenant is always an
//! explicit argument.

pub mod audit;
pub mod authorize;
pub mod decision;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod store;
pub mod tenant;

pub use audit::{AuditDecision, AuditError, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use authorize::{evaluate, evaluate_in_tenant, evaluate_named};
pub use decision::{DenialKind, DenyReason, PermissionDecision};
pub use permissions::{Action, ParseActionError, Resource, UnknownResource, role_permits};
pub use principal::{Principal, RoleBinding, Tenant, TenantStatus};
pub use roles::{AccessLevel, ParseRoleError, Role};
pub use store::{RoleStore, RoleStoreError};
pub use tenant::{
    accessible_tenants, can_access_tenant, check_tenant_binding, resolve_access_level,
    resolve_tenant_access_level, validate_tenant_access,
};
