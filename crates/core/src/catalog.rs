use serde::{Deserialize, Serialize};

/// A catalog groups assets and assigns them a lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub id: i64,
    pub name: String,
    /// Name of the lifecycle governing this catalog's assets.
    pub lifecycle: String,
    pub description: String,
    pub disabled: bool,
}
