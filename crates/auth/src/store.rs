//! Role store client interface.
//!
//! The store is remote and externally owned; the authorization core only
//! reads from it. Implementations live in `tenantguard-infra`.

use std::sync::Arc;

use thiserror::Error;

use tenantguard_core::{TenantId, UserId};

use crate::{RoleBinding, Tenant};

/// Role store failure.
///
/// `NotFound` is a valid negative answer. Every other variant is an
/// infrastructure failure and must be treated as "could not decide".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleStoreError {
    #[error("not found")]
    NotFound,

    #[error("transport error: {0}")]
    Transport(String),

    /// A row exists but cannot be decoded (e.g. a role outside the closed set).
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl RoleStoreError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RoleStoreError::NotFound)
    }
}

/// Async read interface over role bindings and tenant records.
#[async_trait::async_trait]
pub trait RoleStore: Send + Sync {
    /// The binding for exactly `(user_id, tenant_id)`.
    async fn fetch_binding(&self, user_id: UserId, tenant_id: TenantId) -> Result<RoleBinding, RoleStoreError>;

    /// All bindings held by `user_id`, across tenants. Empty is not an error.
    async fn fetch_all_bindings(&self, user_id: UserId) -> Result<Vec<RoleBinding>, RoleStoreError>;

    async fn fetch_tenant(&self, tenant_id: TenantId) -> Result<Tenant, RoleStoreError>;
}

#[async_trait::async_trait]
impl<S> RoleStore for Arc<S>
where
    S: RoleStore + ?Sized,
{
    async fn fetch_binding(&self, user_id: UserId, tenant_id: TenantId) -> Result<RoleBinding, RoleStoreError> {
        (**self).fetch_binding(user_id, tenant_id).await
    }

    async fn fetch_all_bindings(&self, user_id: UserId) -> Result<Vec<RoleBinding>, RoleStoreError> {
        (**self).fetch_all_bindings(user_id).await
    }

    async fn fetch_tenant(&self, tenant_id: TenantId) -> Result<Tenant, RoleStoreError> {
        (**self).fetch_tenant(tenant_id).await
    }
}
