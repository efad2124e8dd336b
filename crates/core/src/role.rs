//! Asset roles and their membership rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// A user or group that can be bound to a role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum Principal {
    User(String),
    Group(String),
}

impl Principal {
    pub fn user(name: impl Into<String>) -> Self {
        Principal::User(name.into())
    }

    pub fn group(name: impl Into<String>) -> Self {
        Principal::Group(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Principal::User(n) | Principal::Group(n) => n,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User(n) => write!(f, "user:{}", n),
            Principal::Group(n) => write!(f, "group:{}", n),
        }
    }
}

/// Parses `user:<name>`, `group:<name>`, or a bare user name.
impl FromStr for Principal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = match s.split_once(':') {
            Some(("user", name)) => ("user", name),
            Some(("group", name)) => ("group", name),
            _ => ("user", s),
        };
        if name.is_empty() {
            return Err(format!("empty principal name in '{}'", s));
        }
        Ok(match kind {
            "group" => Principal::Group(name.to_string()),
            _ => Principal::User(name.to_string()),
        })
    }
}

/// A role definition: its name and whether it holds at most one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub single: bool,
}

impl Role {
    /// Membership after adding `principal`. Single-valued roles replace their
    /// member and accept users only.
    pub fn add_member(
        &self,
        members: &[Principal],
        principal: Principal,
    ) -> Result<Vec<Principal>, AssetError> {
        if self.single {
            if let Principal::Group(group) = &principal {
                return Err(AssetError::GroupInSingleRole {
                    role: self.name.clone(),
                    group: group.clone(),
                });
            }
            return Ok(vec![principal]);
        }
        let mut next = members.to_vec();
        if !next.contains(&principal) {
            next.push(principal);
        }
        Ok(next)
    }

    pub fn remove_member(
        &self,
        members: &[Principal],
        principal: &Principal,
    ) -> Result<Vec<Principal>, AssetError> {
        if !members.contains(principal) {
            return Err(AssetError::NotARoleMember {
                role: self.name.clone(),
                principal: principal.to_string(),
            });
        }
        Ok(members.iter().filter(|m| *m != principal).cloned().collect())
    }
}

/// The fixed table of roles an asset supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roles {
    roles: Vec<Role>,
}

impl Default for Roles {
    fn default() -> Self {
        Self {
            roles: vec![
                Role {
                    name: "Owner".to_string(),
                    single: true,
                },
                Role {
                    name: "HeldBy".to_string(),
                    single: false,
                },
                Role {
                    name: "Contact".to_string(),
                    single: false,
                },
            ],
        }
    }
}

impl Roles {
    pub fn get(&self, name: &str) -> Result<&Role, AssetError> {
        self.roles
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| AssetError::UnknownRole(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter()
    }
}
