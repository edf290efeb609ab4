//! Tenant listing for a principal.

use tenantguard_auth::{Principal, RoleStore, RoleStoreError, Tenant, accessible_tenants};

/// Load the tenant records the principal may access, sorted by name.
///
/// Bindings pointing at tenants the store no longer has are skipped; any
/// other store error aborts the listing.
pub async fn load_accessible_tenants<S>(store: &S, principal: &Principal) -> Result<Vec<Tenant>, RoleStoreError>
where
    S: RoleStore + ?Sized,
{
    let bindings = store.fetch_all_bindings(principal.id).await?;

    let mut tenants = Vec::new();
    for tenant_id in accessible_tenants(principal, &bindings) {
        match store.fetch_tenant(tenant_id).await {
            Ok(tenant) => tenants.push(tenant),
            Err(RoleStoreError::NotFound) => {
                tracing::debug!(%tenant_id, "binding references missing tenant");
            }
            Err(e) => return Err(e),
        }
    }

    tenants.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(tenants)
}
