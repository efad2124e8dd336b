use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Rights an actor can hold on the assets of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Right {
    ShowAsset,
    CreateAsset,
    ModifyAsset,
}

impl Right {
    pub const ALL: [Right; 3] = [Right::ShowAsset, Right::CreateAsset, Right::ModifyAsset];

    pub fn as_str(&self) -> &'static str {
        match self {
            Right::ShowAsset => "ShowAsset",
            Right::CreateAsset => "CreateAsset",
            Right::ModifyAsset => "ModifyAsset",
        }
    }
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Right {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Right::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown right '{}'", s))
    }
}

/// Who a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grantee {
    Everyone,
    User(String),
}

impl Grantee {
    pub fn covers(&self, user: &str) -> bool {
        match self {
            Grantee::Everyone => true,
            Grantee::User(name) => name == user,
        }
    }
}

/// A set of rights granted to a grantee, on one catalog or on all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: Grantee,
    pub rights: Vec<Right>,
    /// Catalog id. `None` grants the rights on every catalog.
    pub catalog: Option<i64>,
}

impl Grant {
    pub fn allows(&self, user: &str, right: Right, catalog: i64) -> bool {
        self.grantee.covers(user)
            && self.rights.contains(&right)
            && self.catalog.is_none_or(|c| c == catalog)
    }
}
