//! Decision values produced by the evaluator and the tenant resolver.
//!
//! Denials are modeled outcomes, not errors: they are returned to the caller
//! as data. The `Display` text of [`DenyReason`] is the user-facing reason and
//! never carries identifiers or internal detail.

use serde::Serialize;
use thiserror::Error;

use crate::{Action, Resource, Role};

/// Why access was denied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DenyReason {
    #[error("unauthenticated")]
    Unauthenticated,

    /// The principal holds no binding that could apply.
    #[error("no role assigned")]
    NoRoleAssigned,

    /// The store had no binding row for the requested tenant.
    #[error("no permissions defined")]
    NoPermissionsDefined,

    #[error("students have no access to this page")]
    StudentsForbidden,

    #[error("cross-tenant access denied")]
    CrossTenant,

    #[error("role does not permit {action} on {resource}")]
    InsufficientRole { resource: Resource, action: Action },

    #[error("unknown resource")]
    UnknownResource,
}

impl DenyReason {
    pub fn kind(&self) -> DenialKind {
        match self {
            DenyReason::Unauthenticated => DenialKind::Unauthenticated,
            DenyReason::NoRoleAssigned | DenyReason::NoPermissionsDefined => DenialKind::NoRoleAssigned,
            DenyReason::StudentsForbidden
            | DenyReason::CrossTenant
            | DenyReason::InsufficientRole { .. } => DenialKind::RoleForbidden,
            DenyReason::UnknownResource => DenialKind::UnknownResource,
        }
    }
}

/// Coarse classification of a denial, for logs and audit consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    NoRoleAssigned,
    RoleForbidden,
    UnknownResource,
    StoreTransportError,
}

/// Outcome of a single permission check.
///
/// `matched_role` is the binding role the decision was made on: the granting
/// role for an allow, or the offending role when a role-specific business
/// rule denied. It is `None` for super-admin allows and for denials that
/// never reached a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDecision {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    pub matched_role: Option<Role>,
}

impl PermissionDecision {
    pub fn allow(matched_role: Option<Role>) -> Self {
        Self {
            allowed: true,
            reason: None,
            matched_role,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            matched_role: None,
        }
    }

    pub fn deny_role(role: Role, reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            matched_role: Some(role),
        }
    }

    /// Human-readable reason, if the decision is a denial.
    pub fn reason_text(&self) -> Option<String> {
        self.reason.as_ref().map(ToString::to_string)
    }
}
