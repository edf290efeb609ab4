//! Async validation orchestrator.
//!
//! Each call to [`AccessValidator::validate_client_access`] walks
//! `Idle/Resolved/Failed -> Loading -> Resolved | Failed` and publishes every
//! transition on a `watch` channel. Calls are not coalesced: concurrent calls
//! each own their transitions and the last one to finish wins the published
//! state. Callers that need strict ordering compare the returned
//! [`RequestId`] with [`AccessValidator::is_latest`].
//!
//! Every path that cannot positively establish access denies.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use tenantguard_auth::audit::{self, AuditEvent};
use tenantguard_auth::{
    Action, AuditSink, DenialKind, DenyReason, PermissionDecision, Principal, Resource, Role, RoleStore,
    RoleStoreError, TracingAuditSink, evaluate, evaluate_in_tenant, validate_tenant_access,
};
use tenantguard_core::TenantId;

/// Resource recorded in audit events for the page-level client-area check.
///
/// The client area is the `clientes` listing, so its checks are audited under
/// that resource name.
pub const CLIENT_AREA_RESOURCE: Resource = Resource::Clientes;

/// Monotonically increasing tag of one validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Error surfaced to callers of the orchestrator.
///
/// `Display` is the user-facing message. For `Verification` the store failure
/// is kept as the source for logging and never rendered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("user not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Denied(#[from] DenyReason),

    #[error("error verifying permissions")]
    Verification(#[source] RoleStoreError),
}

impl AccessError {
    pub fn kind(&self) -> DenialKind {
        match self {
            AccessError::NotAuthenticated => DenialKind::Unauthenticated,
            AccessError::Denied(reason) => reason.kind(),
            AccessError::Verification(_) => DenialKind::StoreTransportError,
        }
    }
}

/// Result of one page-level access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCheck {
    pub request: RequestId,
    pub can_access: bool,
    pub user_role: Option<Role>,
    pub error: Option<AccessError>,
}

impl AccessCheck {
    fn from_decision(request: RequestId, decision: &PermissionDecision) -> Self {
        Self {
            request,
            can_access: decision.allowed,
            user_role: decision.matched_role,
            error: decision.reason.clone().map(AccessError::Denied),
        }
    }

    fn denied(request: RequestId, error: AccessError) -> Self {
        Self {
            request,
            can_access: false,
            user_role: None,
            error: Some(error),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// Observable state of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationState {
    #[default]
    Idle,
    Loading {
        request: RequestId,
    },
    Resolved {
        request: RequestId,
        check: AccessCheck,
    },
    Failed {
        request: RequestId,
        error: AccessError,
    },
}

impl ValidationState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ValidationState::Loading { .. })
    }

    pub fn request(&self) -> Option<RequestId> {
        match self {
            ValidationState::Idle => None,
            ValidationState::Loading { request }
            | ValidationState::Resolved { request, .. }
            | ValidationState::Failed { request, .. } => Some(*request),
        }
    }

    /// The error of the terminal state, if any. `Loading` clears it.
    pub fn error(&self) -> Option<&AccessError> {
        match self {
            ValidationState::Resolved { check, .. } => check.error.as_ref(),
            ValidationState::Failed { error, .. } => Some(error),
            ValidationState::Idle | ValidationState::Loading { .. } => None,
        }
    }
}

pub struct AccessValidator {
    store: Arc<dyn RoleStore>,
    audit: Arc<dyn AuditSink>,
    state: watch::Sender<ValidationState>,
    last_request: AtomicU64,
}

impl AccessValidator {
    /// Orchestrator that audits through `tracing`.
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self::with_audit(store, Arc::new(TracingAuditSink))
    }

    pub fn with_audit(store: Arc<dyn RoleStore>, audit: Arc<dyn AuditSink>) -> Self {
        let (state, _) = watch::channel(ValidationState::Idle);
        Self {
            store,
            audit,
            state,
            last_request: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ValidationState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ValidationState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn error(&self) -> Option<AccessError> {
        self.state.borrow().error().cloned()
    }

    /// True if no call has started since `request`.
    pub fn is_latest(&self, request: RequestId) -> bool {
        self.last_request.load(Ordering::SeqCst) == request.0
    }

    fn begin(&self) -> RequestId {
        RequestId(self.last_request.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Check whether `principal` may open the client area of `tenant_id`.
    ///
    /// `selected_tenant` is the tenant the caller's session currently has
    /// selected; a `cliente` is only admitted there.
    #[instrument(skip(self, principal), fields(principal_id = ?principal.map(|p| p.id)))]
    pub async fn validate_client_access(
        &self,
        principal: Option<&Principal>,
        selected_tenant: Option<TenantId>,
        tenant_id: TenantId,
    ) -> AccessCheck {
        let request = self.begin();

        let Some(principal) = principal else {
            let check = AccessCheck::denied(request, AccessError::NotAuthenticated);
            self.audit_check(None, tenant_id, &check);
            self.state.send_replace(ValidationState::Resolved {
                request,
                check: check.clone(),
            });
            return check;
        };

        self.state.send_replace(ValidationState::Loading { request });

        match validate_tenant_access(self.store.as_ref(), principal, tenant_id, selected_tenant).await {
            Ok(decision) => {
                let check = AccessCheck::from_decision(request, &decision);
                tracing::debug!(request = request.get(), can_access = check.can_access, "access resolved");
                self.audit_check(Some(principal), tenant_id, &check);
                self.state.send_replace(ValidationState::Resolved {
                    request,
                    check: check.clone(),
                });
                check
            }
            Err(e) => {
                tracing::warn!(request = request.get(), error = %e, "role lookup failed; denying access");
                let error = AccessError::Verification(e);
                let check = AccessCheck::denied(request, error.clone());
                self.audit_check(Some(principal), tenant_id, &check);
                self.state.send_replace(ValidationState::Failed { request, error });
                check
            }
        }
    }

    /// Resource/action check within one tenant, using every binding the
    /// principal holds there. Does not touch the observable state.
    ///
    /// Store failures come back as `Err(AccessError::Verification)`; callers
    /// must treat them as a denial.
    #[instrument(skip(self, principal), fields(principal_id = ?principal.map(|p| p.id)))]
    pub async fn authorize(
        &self,
        principal: Option<&Principal>,
        tenant_id: TenantId,
        resource: Resource,
        action: Action,
    ) -> Result<PermissionDecision, AccessError> {
        let Some(principal) = principal else {
            let decision = evaluate(None, &[], resource, action);
            self.audit_decision(None, tenant_id, resource, &decision);
            return Ok(decision);
        };

        let bindings = if principal.is_super_admin {
            Vec::new()
        } else {
            match self.store.fetch_all_bindings(principal.id).await {
                Ok(bindings) => bindings,
                Err(e) => {
                    tracing::warn!(error = %e, %resource, %action, "binding lookup failed; denying access");
                    let error = AccessError::Verification(e);
                    audit::emit(
                        self.audit.as_ref(),
                        &AuditEvent::access_check(
                            resource.as_str(),
                            Some(tenant_id),
                            Some(principal.id),
                            false,
                            Some(error.to_string()),
                        ),
                    );
                    return Err(error);
                }
            }
        };

        let decision = evaluate_in_tenant(Some(principal), &bindings, tenant_id, resource, action);
        self.audit_decision(Some(principal), tenant_id, resource, &decision);
        Ok(decision)
    }

    fn audit_check(&self, principal: Option<&Principal>, tenant_id: TenantId, check: &AccessCheck) {
        let event = AuditEvent::access_check(
            CLIENT_AREA_RESOURCE.as_str(),
            Some(tenant_id),
            principal.map(|p| p.id),
            check.can_access,
            check.error_message(),
        );
        audit::emit(self.audit.as_ref(), &event);
    }

    fn audit_decision(
        &self,
        principal: Option<&Principal>,
        tenant_id: TenantId,
        resource: Resource,
        decision: &PermissionDecision,
    ) {
        let event = AuditEvent::from_decision(resource.as_str(), Some(tenant_id), principal.map(|p| p.id), decision);
        audit::emit(self.audit.as_ref(), &event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use tokio::sync::Notify;

    use tenantguard_auth::audit::AuditError;
    use tenantguard_auth::{AuditDecision, InMemoryAuditSink, RoleBinding, Tenant};
    use tenantguard_core::UserId;

    use crate::role_store::InMemoryRoleStore;

    /// Holds lookups for the gated tenants until released.
    struct GatedStore {
        inner: InMemoryRoleStore,
        gated: HashSet<TenantId>,
        gate: Notify,
    }

    #[async_trait::async_trait]
    impl RoleStore for GatedStore {
        async fn fetch_binding(&self, user_id: UserId, tenant_id: TenantId) -> Result<RoleBinding, RoleStoreError> {
            if self.gated.contains(&tenant_id) {
                self.gate.notified().await;
            }
            self.inner.fetch_binding(user_id, tenant_id).await
        }

        async fn fetch_all_bindings(&self, user_id: UserId) -> Result<Vec<RoleBinding>, RoleStoreError> {
            self.inner.fetch_all_bindings(user_id).await
        }

        async fn fetch_tenant(&self, tenant_id: TenantId) -> Result<Tenant, RoleStoreError> {
            self.inner.fetch_tenant(tenant_id).await
        }
    }

    struct RejectingSink;

    impl AuditSink for RejectingSink {
        fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
            Err(AuditError("collector down".into()))
        }
    }

    fn setup() -> (Arc<InMemoryRoleStore>, Arc<InMemoryAuditSink>, AccessValidator) {
        let store = InMemoryRoleStore::arc();
        let audit = Arc::new(InMemoryAuditSink::new());
        let validator = AccessValidator::with_audit(store.clone(), audit.clone());
        (store, audit, validator)
    }

    #[tokio::test]
    async fn starts_idle() {
        let (_, _, validator) = setup();
        assert_eq!(validator.state(), ValidationState::Idle);
        assert!(!validator.is_loading());
        assert!(validator.error().is_none());
    }

    #[tokio::test]
    async fn student_is_denied_with_role() {
        let (store, _, validator) = setup();
        let p = Principal::new(UserId::new());
        let a = TenantId::new();
        store.link(RoleBinding::new(p.id, a, Role::Aluno)).unwrap();

        let check = validator.validate_client_access(Some(&p), Some(a), a).await;
        assert!(!check.can_access);
        assert_eq!(check.user_role, Some(Role::Aluno));
        assert_eq!(check.error_message().as_deref(), Some("students have no access to this page"));
        assert!(matches!(validator.state(), ValidationState::Resolved { .. }));
    }

    #[tokio::test]
    async fn cliente_outside_selected_tenant_is_denied() {
        let (store, _, validator) = setup();
        let p = Principal::new(UserId::new());
        let (a, b) = (TenantId::new(), TenantId::new());
        store.link(RoleBinding::new(p.id, b, Role::Cliente)).unwrap();

        let check = validator.validate_client_access(Some(&p), Some(a), b).await;
        assert!(!check.can_access);
        assert_eq!(check.error_message().as_deref(), Some("cross-tenant access denied"));
        assert_eq!(check.error.as_ref().map(AccessError::kind), Some(DenialKind::RoleForbidden));

        let check = validator.validate_client_access(Some(&p), Some(b), b).await;
        assert!(check.can_access);
        assert!(check.error.is_none());
    }

    #[tokio::test]
    async fn admin_is_allowed_anywhere_bound() {
        let (store, _, validator) = setup();
        let p = Principal::new(UserId::new());
        let (a, b) = (TenantId::new(), TenantId::new());
        store.link(RoleBinding::new(p.id, b, Role::Admin)).unwrap();

        let check = validator.validate_client_access(Some(&p), Some(a), b).await;
        assert!(check.can_access);
        assert_eq!(check.user_role, Some(Role::Admin));
    }

    #[tokio::test]
    async fn missing_binding_is_a_decision_not_a_failure() {
        let (_, _, validator) = setup();
        let p = Principal::new(UserId::new());
        let c = TenantId::new();

        let check = validator.validate_client_access(Some(&p), Some(c), c).await;
        assert!(!check.can_access);
        assert_eq!(check.error_message().as_deref(), Some("no permissions defined"));
        assert!(matches!(validator.state(), ValidationState::Resolved { .. }));
    }

    #[tokio::test]
    async fn transport_failure_fails_closed() {
        let (store, _, validator) = setup();
        let p = Principal::new(UserId::new());
        let d = TenantId::new();
        store.link(RoleBinding::new(p.id, d, Role::Admin)).unwrap();
        store.set_unavailable(true);

        let check = validator.validate_client_access(Some(&p), Some(d), d).await;
        assert!(!check.can_access);
        assert_eq!(check.error_message().as_deref(), Some("error verifying permissions"));
        assert!(matches!(validator.state(), ValidationState::Failed { .. }));
        assert_eq!(validator.error().map(|e| e.kind()), Some(DenialKind::StoreTransportError));

        // The cause stays available for logging but out of the message.
        let error = validator.error().unwrap();
        let source = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("transport error: role store unavailable"));
    }

    #[tokio::test]
    async fn failed_state_is_recoverable() {
        let (store, _, validator) = setup();
        let p = Principal::new(UserId::new());
        let d = TenantId::new();
        store.link(RoleBinding::new(p.id, d, Role::Admin)).unwrap();

        store.set_unavailable(true);
        validator.validate_client_access(Some(&p), Some(d), d).await;
        store.set_unavailable(false);

        let check = validator.validate_client_access(Some(&p), Some(d), d).await;
        assert!(check.can_access);
        assert!(validator.error().is_none());
    }

    #[tokio::test]
    async fn unauthenticated_short_circuits() {
        let (store, audit, validator) = setup();
        store.set_unavailable(true);

        let check = validator.validate_client_access(None, None, TenantId::new()).await;
        assert!(!check.can_access);
        assert_eq!(check.error, Some(AccessError::NotAuthenticated));
        assert_eq!(check.error_message().as_deref(), Some("user not authenticated"));
        // The store was never consulted, so the outcome is not a failure.
        assert!(matches!(validator.state(), ValidationState::Resolved { .. }));
        assert_eq!(audit.events()[0].principal_id, None);
    }

    #[tokio::test]
    async fn repeated_calls_yield_identical_decisions() {
        let (store, _, validator) = setup();
        let p = Principal::new(UserId::new());
        let a = TenantId::new();
        store.link(RoleBinding::new(p.id, a, Role::Cliente)).unwrap();

        let first = validator.validate_client_access(Some(&p), Some(a), a).await;
        let second = validator.validate_client_access(Some(&p), Some(a), a).await;

        assert_eq!(second.request.get(), first.request.get() + 1);
        assert_eq!(
            (first.can_access, first.user_role, first.error),
            (second.can_access, second.user_role, second.error)
        );
    }

    #[tokio::test]
    async fn loading_is_observable() {
        let a = TenantId::new();
        let store = Arc::new(GatedStore {
            inner: InMemoryRoleStore::new(),
            gated: HashSet::from([a]),
            gate: Notify::new(),
        });
        let validator = AccessValidator::new(store.clone());
        let p = Principal::new(UserId::new());
        let mut rx = validator.subscribe();

        let run = validator.validate_client_access(Some(&p), Some(a), a);
        let observe = async {
            rx.changed().await.unwrap();
            let seen = rx.borrow_and_update().clone();
            store.gate.notify_one();
            seen
        };
        let (check, seen) = tokio::join!(run, observe);

        assert_eq!(seen, ValidationState::Loading { request: check.request });
        assert!(!validator.is_loading());
    }

    #[tokio::test]
    async fn last_finished_call_wins_and_stale_results_are_detectable() {
        let (slow_tenant, fast_tenant) = (TenantId::new(), TenantId::new());
        let store = Arc::new(GatedStore {
            inner: InMemoryRoleStore::new(),
            gated: HashSet::from([slow_tenant]),
            gate: Notify::new(),
        });
        let p = Principal::new(UserId::new());
        store.inner.link(RoleBinding::new(p.id, slow_tenant, Role::Admin)).unwrap();
        let validator = AccessValidator::new(store.clone());

        let slow = validator.validate_client_access(Some(&p), Some(slow_tenant), slow_tenant);
        let fast = async {
            let check = validator
                .validate_client_access(Some(&p), Some(fast_tenant), fast_tenant)
                .await;
            store.gate.notify_one();
            check
        };
        let (slow_check, fast_check) = tokio::join!(slow, fast);

        assert!(slow_check.request < fast_check.request);
        assert!(!validator.is_latest(slow_check.request));
        assert!(validator.is_latest(fast_check.request));
        assert_eq!(validator.state().request(), Some(slow_check.request));
    }

    #[tokio::test]
    async fn every_decision_is_audited() {
        let (store, audit, validator) = setup();
        let p = Principal::new(UserId::new());
        let a = TenantId::new();
        store.link(RoleBinding::new(p.id, a, Role::Admin)).unwrap();

        validator.validate_client_access(Some(&p), Some(a), a).await;
        validator.validate_client_access(Some(&p), Some(a), TenantId::new()).await;

        let events = audit.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.action == "access_check" && e.principal_id == Some(p.id)));
        assert_eq!(events[0].decision, AuditDecision::Allow);
        assert_eq!(events[1].decision, AuditDecision::Deny);
        assert_eq!(events[1].reason.as_deref(), Some("no permissions defined"));
        assert!(events.iter().all(|e| e.resource == CLIENT_AREA_RESOURCE.as_str()));
        assert_eq!(events[0].resource, "clientes");
    }

    #[tokio::test]
    async fn audit_failure_does_not_change_decision() {
        let store = InMemoryRoleStore::arc();
        let p = Principal::new(UserId::new());
        let a = TenantId::new();
        store.link(RoleBinding::new(p.id, a, Role::Admin)).unwrap();
        let validator = AccessValidator::with_audit(store, Arc::new(RejectingSink));

        assert!(validator.validate_client_access(Some(&p), Some(a), a).await.can_access);
    }

    #[tokio::test]
    async fn authorize_uses_only_bindings_of_the_tenant() {
        let (store, audit, validator) = setup();
        let p = Principal::new(UserId::new());
        let (a, b) = (TenantId::new(), TenantId::new());
        store.link(RoleBinding::new(p.id, a, Role::Cliente)).unwrap();
        store.link(RoleBinding::new(p.id, b, Role::Admin)).unwrap();

        let in_a = validator.authorize(Some(&p), a, Resource::Parcelas, Action::Delete).await.unwrap();
        assert!(!in_a.allowed);
        let in_b = validator.authorize(Some(&p), b, Resource::Parcelas, Action::Delete).await.unwrap();
        assert!(in_b.allowed);

        assert_eq!(audit.events().len(), 2);
        assert_eq!(validator.state(), ValidationState::Idle);
    }

    #[tokio::test]
    async fn authorize_super_admin_skips_store() {
        let (store, _, validator) = setup();
        store.set_unavailable(true);
        let admin = Principal::super_admin(UserId::new());

        let decision = validator
            .authorize(Some(&admin), TenantId::new(), Resource::Dashboard, Action::Delete)
            .await
            .unwrap();
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn authorize_fails_closed_on_store_error() {
        let (store, audit, validator) = setup();
        store.set_unavailable(true);
        let p = Principal::new(UserId::new());

        let err = validator
            .authorize(Some(&p), TenantId::new(), Resource::Dashboard, Action::Read)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DenialKind::StoreTransportError);
        assert_eq!(audit.events()[0].decision, AuditDecision::Deny);
    }

    #[tokio::test]
    async fn authorize_without_principal() {
        let (_, _, validator) = setup();
        let decision = validator
            .authorize(None, TenantId::new(), Resource::Dashboard, Action::Read)
            .await
            .unwrap();
        assert_eq!(decision.reason, Some(DenyReason::Unauthenticated));
    }
}
