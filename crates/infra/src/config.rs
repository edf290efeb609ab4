//! Environment-driven configuration.

use std::sync::Arc;

use anyhow::Context;

use tenantguard_auth::RoleStore;
use tenantguard_observability::{LogConfig, LogFormat};

use crate::role_store::{InMemoryRoleStore, PostgresRoleStore};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// When unset, the in-memory role store is used.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let db_max_connections = match lookup("TENANTGUARD_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("TENANTGUARD_DB_MAX_CONNECTIONS must be a positive integer, got '{raw}'"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        anyhow::ensure!(db_max_connections > 0, "TENANTGUARD_DB_MAX_CONNECTIONS must be greater than zero");

        let format = match lookup("TENANTGUARD_LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw)
                .with_context(|| format!("TENANTGUARD_LOG_FORMAT must be 'json' or 'pretty', got '{raw}'"))?,
            None => LogFormat::Json,
        };

        Ok(Self {
            database_url,
            db_max_connections,
            log: LogConfig {
                format,
                ..LogConfig::default()
            },
        })
    }

    /// Build the configured role store.
    ///
    /// The Postgres pool connects lazily and runs its maintenance on the
    /// ambient Tokio runtime.
    pub async fn role_store(&self) -> anyhow::Result<Arc<dyn RoleStore>> {
        match &self.database_url {
            Some(url) => postgres_role_store(url, self.db_max_connections),
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory role store");
                let store: Arc<dyn RoleStore> = InMemoryRoleStore::arc();
                Ok(store)
            }
        }
    }
}

fn postgres_role_store(url: &str, max_connections: u32) -> anyhow::Result<Arc<dyn RoleStore>> {
    tokio::runtime::Handle::try_current().context("postgres role store requires a Tokio runtime")?;
    let store = PostgresRoleStore::connect_lazy(url, max_connections).context("failed to configure postgres role store")?;
    tracing::info!(max_connections, "using postgres role store");
    let store: Arc<dyn RoleStore> = Arc::new(store);
    Ok(store)
}
