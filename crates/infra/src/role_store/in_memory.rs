use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tenantguard_auth::{Role, RoleBinding, RoleStore, RoleStoreError, Tenant};
use tenantguard_core::{DomainError, DomainResult, TenantId, UserId};

/// In-memory role store for tests/dev.
///
/// Holds at most one binding per (user, tenant). Bindings are replaced, never
/// edited: [`change_role`](Self::change_role) removes and re-inserts under a
/// single write lock.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    bindings: RwLock<HashMap<(UserId, TenantId), RoleBinding>>,
    tenants: RwLock<HashMap<TenantId, Tenant>>,
    unavailable: AtomicBool,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Simulate the store being unreachable: every read fails with a
    /// transport error until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn insert_tenant(&self, tenant: Tenant) -> DomainResult<()> {
        let mut tenants = self
            .tenants
            .write()
            .map_err(|_| DomainError::unavailable("tenant table lock poisoned"))?;
        tenants.insert(tenant.id, tenant);
        Ok(())
    }

    /// Link a user to a tenant. Fails if the user already has a binding there.
    pub fn link(&self, binding: RoleBinding) -> DomainResult<()> {
        let mut bindings = self
            .bindings
            .write()
            .map_err(|_| DomainError::unavailable("binding table lock poisoned"))?;
        let key = (binding.user_id, binding.tenant_id);
        if bindings.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "user {} already bound to tenant {}",
                binding.user_id, binding.tenant_id
            )));
        }
        bindings.insert(key, binding);
        Ok(())
    }

    pub fn revoke(&self, user_id: UserId, tenant_id: TenantId) -> DomainResult<RoleBinding> {
        let mut bindings = self
            .bindings
            .write()
            .map_err(|_| DomainError::unavailable("binding table lock poisoned"))?;
        bindings.remove(&(user_id, tenant_id)).ok_or(DomainError::NotFound)
    }

    /// Replace the user's role in a tenant (delete + insert).
    pub fn change_role(&self, user_id: UserId, tenant_id: TenantId, role: Role) -> DomainResult<RoleBinding> {
        let mut bindings = self
            .bindings
            .write()
            .map_err(|_| DomainError::unavailable("binding table lock poisoned"))?;
        bindings.remove(&(user_id, tenant_id)).ok_or(DomainError::NotFound)?;
        let replacement = RoleBinding::new(user_id, tenant_id, role);
        bindings.insert((user_id, tenant_id), replacement);
        Ok(replacement)
    }

    fn ensure_available(&self) -> Result<(), RoleStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RoleStoreError::transport("role store unavailable"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn fetch_binding(&self, user_id: UserId, tenant_id: TenantId) -> Result<RoleBinding, RoleStoreError> {
        self.ensure_available()?;
        let bindings = self
            .bindings
            .read()
            .map_err(|_| RoleStoreError::transport("binding table lock poisoned"))?;
        bindings
            .get(&(user_id, tenant_id))
            .copied()
            .ok_or(RoleStoreError::NotFound)
    }

    async fn fetch_all_bindings(&self, user_id: UserId) -> Result<Vec<RoleBinding>, RoleStoreError> {
        self.ensure_available()?;
        let bindings = self
            .bindings
            .read()
            .map_err(|_| RoleStoreError::transport("binding table lock poisoned"))?;
        let mut held: Vec<RoleBinding> = bindings
            .values()
            .filter(|b| b.user_id == user_id)
            .copied()
            .collect();
        held.sort_by_key(|b| b.tenant_id);
        Ok(held)
    }

    async fn fetch_tenant(&self, tenant_id: TenantId) -> Result<Tenant, RoleStoreError> {
        self.ensure_available()?;
        let tenants = self
            .tenants
            .read()
            .map_err(|_| RoleStoreError::transport("tenant table lock poisoned"))?;
        tenants.get(&tenant_id).cloned().ok_or(RoleStoreError::NotFound)
    }
}
