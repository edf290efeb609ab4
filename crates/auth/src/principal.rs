use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use tenantguard_core::{TenantId, UserId};

use crate::Role;

/// An authenticated identity attempting an action.
///
/// Immutable once loaded for a request/session. `is_super_admin` comes from
/// identity metadata, never from the role-binding table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub email: Option<String>,
    #[serde(default)]
    pub is_super_admin: bool,
}

impl Principal {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            is_super_admin: false,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn super_admin(id: UserId) -> Self {
        Self {
            id,
            email: None,
            is_super_admin: true,
        }
    }

    /// Build a principal from identity-provider metadata.
    ///
    /// Super-admin is recognised from either `{"is_super_admin": true}` or
    /// `{"role": "super_admin"}`. Anything else (missing keys, wrong types)
    /// leaves the flag off.
    pub fn from_metadata(id: UserId, email: Option<String>, metadata: &JsonValue) -> Self {
        let flagged = metadata
            .get("is_super_admin")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);
        let by_role = metadata.get("role").and_then(JsonValue::as_str) == Some("super_admin");

        Self {
            id,
            email,
            is_super_admin: flagged || by_role,
        }
    }
}

/// Lifecycle status of a tenant row.
///
/// Unrecognised statuses are kept verbatim rather than rejected; the tenant
/// table is owned elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TenantStatus {
    Active,
    Inactive,
    Other(String),
}

impl From<String> for TenantStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => TenantStatus::Active,
            "inactive" => TenantStatus::Inactive,
            _ => TenantStatus::Other(value),
        }
    }
}

impl From<TenantStatus> for String {
    fn from(value: TenantStatus) -> Self {
        match value {
            TenantStatus::Active => "active".to_string(),
            TenantStatus::Inactive => "inactive".to_string(),
            TenantStatus::Other(s) => s,
        }
    }
}

/// A tenant record, read-only from the authorization core's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub status: TenantStatus,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// Grants one principal exactly one role within exactly one tenant.
///
/// At most one binding exists per (user, tenant). Bindings are never updated
/// in place; a role change is a revoke followed by a new link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleBinding {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: Role,
}

impl RoleBinding {
    pub fn new(user_id: UserId, tenant_id: TenantId, role: Role) -> Self {
        Self {
            user_id,
            tenant_id,
            role,
        }
    }

    /// True when this binding belongs to `principal`.
    pub fn is_held_by(&self, principal: &Principal) -> bool {
        self.user_id == principal.id
    }
}
