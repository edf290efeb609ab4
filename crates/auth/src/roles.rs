use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tenant-scoped role held through a [`RoleBinding`](crate::RoleBinding).
///
/// The set is closed. `super_admin` is deliberately absent: it is derived from
/// identity metadata on the [`Principal`](crate::Principal), never stored as a
/// binding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Cliente,
    Aluno,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Cliente, Role::Aluno];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cliente => "cliente",
            Role::Aluno => "aluno",
        }
    }

    pub fn access_level(&self) -> AccessLevel {
        match self {
            Role::Admin => AccessLevel::Admin,
            Role::Cliente => AccessLevel::Cliente,
            Role::Aluno => AccessLevel::Aluno,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "cliente" => Ok(Role::Cliente),
            "aluno" => Ok(Role::Aluno),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Effective authority ranking, computed per evaluation and never persisted.
///
/// Variant order is the ranking: `None < Aluno < Cliente < Admin < SuperAdmin`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    None,
    Aluno,
    Cliente,
    Admin,
    SuperAdmin,
}

impl core::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            AccessLevel::None => "none",
            AccessLevel::Aluno => "aluno",
            AccessLevel::Cliente => "cliente",
            AccessLevel::Admin => "admin",
            AccessLevel::SuperAdmin => "super_admin",
        })
    }
}
