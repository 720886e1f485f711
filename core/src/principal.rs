use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Account role. Admins manage agents and distribute lists; agents only
/// receive list items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "agent" => Ok(Role::Agent),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility of an admin account: `Global` admins see every agent, `Scoped`
/// admins see only the agents explicitly assigned to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdminScope {
    Global,
    Scoped,
}

impl AdminScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminScope::Global => "global",
            AdminScope::Scoped => "scoped",
        }
    }
}

impl std::str::FromStr for AdminScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(AdminScope::Global),
            "scoped" => Ok(AdminScope::Scoped),
            other => Err(format!("unknown admin scope '{other}'")),
        }
    }
}

/// The authenticated identity carried by a verified session token.
/// Read-only downstream of issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Agent ids embedded at login for scoped admins; absent for global
    /// admins and agents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agents: Option<Vec<Uuid>>,
}
