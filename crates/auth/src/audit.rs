//! Access-check audit events.
//!
//! Emission is fire-and-forget: a sink failure is logged and dropped, it can
//! never change a decision that has already been made.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use tenantguard_core::{TenantId, UserId};

use crate::PermissionDecision;

pub const ACCESS_CHECK: &str = "access_check";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub action: &'static str,
    pub resource: String,
    pub tenant_id: Option<TenantId>,
    pub principal_id: Option<UserId>,
    pub decision: AuditDecision,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn access_check(
        resource: impl Into<String>,
        tenant_id: Option<TenantId>,
        principal_id: Option<UserId>,
        allowed: bool,
        reason: Option<String>,
    ) -> Self {
        Self {
            action: ACCESS_CHECK,
            resource: resource.into(),
            tenant_id,
            principal_id,
            decision: if allowed { AuditDecision::Allow } else { AuditDecision::Deny },
            reason,
            occurred_at: Utc::now(),
        }
    }

    pub fn from_decision(
        resource: impl Into<String>,
        tenant_id: Option<TenantId>,
        principal_id: Option<UserId>,
        decision: &PermissionDecision,
    ) -> Self {
        Self::access_check(resource, tenant_id, principal_id, decision.allowed, decision.reason_text())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("audit delivery failed: {0}")]
pub struct AuditError(pub String);

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Record `event`, logging and discarding any delivery failure.
pub fn emit(sink: &dyn AuditSink, event: &AuditEvent) {
    if let Err(e) = sink.record(event) {
        tracing::warn!(error = %e, resource = %event.resource, "dropping audit event");
    }
}

/// Writes audit events as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        tracing::info!(
            target: "tenantguard::audit",
            action = event.action,
            resource = %event.resource,
            tenant_id = ?event.tenant_id,
            principal_id = ?event.principal_id,
            decision = ?event.decision,
            reason = event.reason.as_deref().unwrap_or(""),
            "access check"
        );
        Ok(())
    }
}

/// In-memory audit sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.read() {
            Ok(events) => events.clone(),
            Err(_) => vec![],
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut events = self
            .events
            .write()
            .map_err(|_| AuditError("audit buffer poisoned".to_string()))?;
        events.push(event.clone());
        Ok(())
    }
}
