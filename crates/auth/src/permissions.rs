//! Resource catalog, actions, and the static resource × role permission table.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;

/// Business resource subject to access control.
///
/// The catalog is closed; a name outside it cannot be constructed, only
/// rejected with [`UnknownResource`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Clientes,
    Contratos,
    Alunos,
    Produtos,
    Ofertas,
    Jornadas,
    Passos,
    Parcelas,
    Dashboard,
}

impl Resource {
    pub const ALL: [Resource; 9] = [
        Resource::Clientes,
        Resource::Contratos,
        Resource::Alunos,
        Resource::Produtos,
        Resource::Ofertas,
        Resource::Jornadas,
        Resource::Passos,
        Resource::Parcelas,
        Resource::Dashboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Clientes => "clientes",
            Resource::Contratos => "contratos",
            Resource::Alunos => "alunos",
            Resource::Produtos => "produtos",
            Resource::Ofertas => "ofertas",
            Resource::Jornadas => "jornadas",
            Resource::Passos => "passos",
            Resource::Parcelas => "parcelas",
            Resource::Dashboard => "dashboard",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown resource '{0}'")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}

/// Operation performed on a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown action '{0}'")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseActionError(s.to_string()))
    }
}

/// Whether a single tenant-scoped role may perform `action` on `resource`.
///
/// Pure lookup into the static table. Super-admin never reaches this table.
pub fn role_permits(role: Role, resource: Resource, action: Action) -> bool {
    match (resource, role) {
        // Listing clients is open to every bound role; mutations are admin-only.
        (Resource::Clientes, _) => action == Action::Read || role == Role::Admin,
        (Resource::Parcelas, Role::Admin) => true,
        (Resource::Parcelas, Role::Cliente) => action != Action::Delete,
        (_, Role::Admin | Role::Cliente) => true,
        (_, Role::Aluno) => false,
    }
}
