//! Tenant access resolver.
//!
//! Answers "which tenants", "this tenant?", and "how much authority" for a
//! principal, plus the single-tenant validation rule used by the page-level
//! access check.

use std::collections::HashSet;

use tenantguard_core::TenantId;

use crate::store::{RoleStore, RoleStoreError};
use crate::{AccessLevel, DenyReason, PermissionDecision, Principal, Role, RoleBinding};

/// Tenant ids the principal may access.
///
/// Super-admin gets the tenants of the bindings it happens to hold, not every
/// tenant in the system. Callers listing tenants for a super-admin must query
/// the tenant table themselves if they want the full set.
pub fn accessible_tenants(principal: &Principal, bindings: &[RoleBinding]) -> HashSet<TenantId> {
    bindings
        .iter()
        .filter(|b| b.is_held_by(principal))
        .map(|b| b.tenant_id)
        .collect()
}

pub fn can_access_tenant(principal: &Principal, bindings: &[RoleBinding], tenant_id: TenantId) -> bool {
    principal.is_super_admin
        || bindings
            .iter()
            .any(|b| b.is_held_by(principal) && b.tenant_id == tenant_id)
}

/// Highest authority across all of the principal's bindings.
pub fn resolve_access_level(principal: &Principal, bindings: &[RoleBinding]) -> AccessLevel {
    if principal.is_super_admin {
        return AccessLevel::SuperAdmin;
    }

    bindings
        .iter()
        .filter(|b| b.is_held_by(principal))
        .map(|b| b.role.access_level())
        .max()
        .unwrap_or(AccessLevel::None)
}

/// Authority within one tenant. Bindings held elsewhere do not count.
pub fn resolve_tenant_access_level(
    principal: &Principal,
    bindings: &[RoleBinding],
    tenant_id: TenantId,
) -> AccessLevel {
    if principal.is_super_admin {
        return AccessLevel::SuperAdmin;
    }

    bindings
        .iter()
        .filter(|b| b.is_held_by(principal) && b.tenant_id == tenant_id)
        .map(|b| b.role.access_level())
        .max()
        .unwrap_or(AccessLevel::None)
}

/// Apply the page-level business rule to the binding fetched for
/// `(principal, tenant_id)`.
///
/// - no binding: deny, "no permissions defined"
/// - `aluno`: always denied, regardless of the permission table
/// - `admin`: allowed
/// - `cliente`: allowed only inside `selected_tenant`
///
/// A binding that does not match `(principal, tenant_id)` is treated as
/// absent.
pub fn check_tenant_binding(
    principal: &Principal,
    binding: Option<&RoleBinding>,
    tenant_id: TenantId,
    selected_tenant: Option<TenantId>,
) -> PermissionDecision {
    let binding = binding.filter(|b| b.is_held_by(principal) && b.tenant_id == tenant_id);
    let Some(binding) = binding else {
        return PermissionDecision::deny(DenyReason::NoPermissionsDefined);
    };

    match binding.role {
        Role::Aluno => PermissionDecision::deny_role(Role::Aluno, DenyReason::StudentsForbidden),
        Role::Admin => PermissionDecision::allow(Some(Role::Admin)),
        Role::Cliente if selected_tenant == Some(tenant_id) => PermissionDecision::allow(Some(Role::Cliente)),
        Role::Cliente => PermissionDecision::deny_role(Role::Cliente, DenyReason::CrossTenant),
    }
}

/// Fetch the binding for `(principal, tenant_id)` and apply
/// [`check_tenant_binding`].
///
/// A `NotFound` from the store is a decision (deny); any other store error is
/// returned so the caller can fail closed.
pub async fn validate_tenant_access<S>(
    store: &S,
    principal: &Principal,
    tenant_id: TenantId,
    selected_tenant: Option<TenantId>,
) -> Result<PermissionDecision, RoleStoreError>
where
    S: RoleStore + ?Sized,
{
    let binding = match store.fetch_binding(principal.id, tenant_id).await {
        Ok(binding) => Some(binding),
        Err(RoleStoreError::NotFound) => None,
        Err(e) => return Err(e),
    };

    Ok(check_tenant_binding(principal, binding.as_ref(), tenant_id, selected_tenant))
}
