//! Permission evaluator.
//!
//! - No IO
//! - No panics
//! - Deterministic: same inputs, same decision, independent of binding order

use tenantguard_core::TenantId;

use crate::permissions::role_permits;
use crate::{Action, DenyReason, PermissionDecision, Principal, Resource, RoleBinding};

/// Decide whether `principal` may perform `action` on `resource`.
///
/// `bindings` are all role bindings held by the principal, across tenants; any
/// single binding whose role satisfies the table grants the action. Bindings
/// that belong to another user are ignored.
///
/// Super-admin bypasses the table entirely and is allowed even with zero
/// bindings.
pub fn evaluate(
    principal: Option<&Principal>,
    bindings: &[RoleBinding],
    resource: Resource,
    action: Action,
) -> PermissionDecision {
    let Some(principal) = principal else {
        return PermissionDecision::deny(DenyReason::Unauthenticated);
    };

    if principal.is_super_admin {
        return PermissionDecision::allow(None);
    }

    let mut held = bindings.iter().filter(|b| b.is_held_by(principal)).peekable();
    if held.peek().is_none() {
        return PermissionDecision::deny(DenyReason::NoRoleAssigned);
    }

    // Report the highest-ranked granting role so the result does not depend
    // on the order bindings were fetched in.
    let granting = held
        .map(|b| b.role)
        .filter(|role| role_permits(*role, resource, action))
        .max_by_key(|role| role.access_level());

    match granting {
        Some(role) => PermissionDecision::allow(Some(role)),
        None => PermissionDecision::deny(DenyReason::InsufficientRole { resource, action }),
    }
}

/// Like [`evaluate`], but for a resource name taken from outside the type
/// system (route segments, stored policies).
///
/// Names outside the catalog deny with [`DenyReason::UnknownResource`] for
/// every principal, super-admin included.
pub fn evaluate_named(
    principal: Option<&Principal>,
    bindings: &[RoleBinding],
    resource: &str,
    action: Action,
) -> PermissionDecision {
    if principal.is_none() {
        return PermissionDecision::deny(DenyReason::Unauthenticated);
    }

    match resource.parse::<Resource>() {
        Ok(resource) => evaluate(principal, bindings, resource, action),
        Err(_) => PermissionDecision::deny(DenyReason::UnknownResource),
    }
}

/// Evaluate using only the bindings scoped to `tenant_id`.
///
/// A binding held in another tenant never grants anything here: no binding
/// for this tenant means no authority in it.
pub fn evaluate_in_tenant(
    principal: Option<&Principal>,
    bindings: &[RoleBinding],
    tenant_id: TenantId,
    resource: Resource,
    action: Action,
) -> PermissionDecision {
    let scoped: Vec<RoleBinding> = bindings
        .iter()
        .filter(|b| b.tenant_id == tenant_id)
        .copied()
        .collect();

    evaluate(principal, &scoped, resource, action)
}
