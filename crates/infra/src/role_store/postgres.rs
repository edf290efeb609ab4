//! Postgres-backed role store.
//!
//! Reads two externally-owned tables and never writes to them:
//!
//! ```sql
//! user_roles (user_id uuid, tenant_id uuid, role text, PRIMARY KEY (user_id, tenant_id))
//! tenants    (id uuid PRIMARY KEY, name text, status text)
//! ```

use std::sync::Arc;

use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::instrument;

use tenantguard_auth::{Role, RoleBinding, RoleStore, RoleStoreError, Tenant, TenantStatus};
use tenantguard_core::{TenantId, UserId};

pub struct PostgresRoleStore {
    pool: Arc<PgPool>,
}

impl PostgresRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Build a store whose pool connects on first use.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, RoleStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RoleStoreError {
    match err {
        sqlx::Error::RowNotFound => RoleStoreError::NotFound,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) | sqlx::Error::Decode(_) => {
            RoleStoreError::corrupt(format!("{operation}: {err}"))
        }
        other => RoleStoreError::transport(format!("{operation}: {other}")),
    }
}

fn binding_from_row(row: &PgRow) -> Result<RoleBinding, RoleStoreError> {
    let user_id: uuid::Uuid = row.try_get("user_id").map_err(|e| map_sqlx_error("decode user_id", e))?;
    let tenant_id: uuid::Uuid = row.try_get("tenant_id").map_err(|e| map_sqlx_error("decode tenant_id", e))?;
    let role: String = row.try_get("role").map_err(|e| map_sqlx_error("decode role", e))?;
    let role = parse_role(&role)?;

    Ok(RoleBinding::new(UserId::from_uuid(user_id), TenantId::from_uuid(tenant_id), role))
}

fn parse_role(raw: &str) -> Result<Role, RoleStoreError> {
    raw.parse::<Role>().map_err(|e| RoleStoreError::corrupt(e.to_string()))
}

#[async_trait::async_trait]
impl RoleStore for PostgresRoleStore {
    #[instrument(skip(self), fields(operation = "fetch_binding"))]
    async fn fetch_binding(&self, user_id: UserId, tenant_id: TenantId) -> Result<RoleBinding, RoleStoreError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, tenant_id, role
            FROM user_roles
            WHERE user_id = $1 AND tenant_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_binding", e))?;

        match row {
            Some(row) => binding_from_row(&row),
            None => Err(RoleStoreError::NotFound),
        }
    }

    #[instrument(skip(self), fields(operation = "fetch_all_bindings"))]
    async fn fetch_all_bindings(&self, user_id: UserId) -> Result<Vec<RoleBinding>, RoleStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, tenant_id, role
            FROM user_roles
            WHERE user_id = $1
            ORDER BY tenant_id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_all_bindings", e))?;

        rows.iter().map(binding_from_row).collect()
    }

    #[instrument(skip(self), fields(operation = "fetch_tenant"))]
    async fn fetch_tenant(&self, tenant_id: TenantId) -> Result<Tenant, RoleStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, status
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_tenant", e))?
        .ok_or(RoleStoreError::NotFound)?;

        let id: uuid::Uuid = row.try_get("id").map_err(|e| map_sqlx_error("decode id", e))?;
        let name: String = row.try_get("name").map_err(|e| map_sqlx_error("decode name", e))?;
        let status: String = row.try_get("status").map_err(|e| map_sqlx_error("decode status", e))?;

        Ok(Tenant {
            id: TenantId::from_uuid(id),
            name,
            status: TenantStatus::from(status),
        })
    }
}
