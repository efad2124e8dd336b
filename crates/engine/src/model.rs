use std::collections::BTreeMap;

use assets_core::{Principal, StatusCategory};
use assets_storage::AssetRecord;
use serde::{Deserialize, Serialize};

/// Everything needed to create an asset in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAsset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Catalog id or name.
    pub catalog: String,
    /// Requested status. The lifecycle's creation default when absent.
    #[serde(default)]
    pub status: Option<String>,
    /// Initial role members keyed by role name.
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<Principal>>,
    /// Initial custom-field values keyed by field name.
    #[serde(default)]
    pub custom_fields: BTreeMap<String, Vec<String>>,
}

impl CreateAsset {
    pub fn new(name: impl Into<String>, catalog: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            catalog: catalog.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>, principal: Principal) -> Self {
        self.roles.entry(role.into()).or_default().push(principal);
        self
    }

    pub fn with_field<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.custom_fields
            .insert(field.into(), values.into_iter().map(Into::into).collect());
        self
    }
}

/// An asset with its catalog name, roles and custom-field values resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: AssetRecord,
    pub catalog_name: String,
    pub category: Option<StatusCategory>,
    pub roles: BTreeMap<String, Vec<Principal>>,
    pub custom_fields: BTreeMap<String, Vec<String>>,
}
