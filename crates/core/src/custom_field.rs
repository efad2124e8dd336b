use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::AssetError;

/// A custom field definition that can carry values on assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomField {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Catalog names this field applies to. `None` means every catalog.
    pub catalogs: Option<Vec<String>>,
    /// Upper bound on values per asset. `None` means unlimited.
    pub max_values: Option<usize>,
    /// Closed list of allowed values, if the field is a select list.
    pub values: Option<Vec<String>>,
}

impl CustomField {
    pub fn applies_to(&self, catalog: &Catalog) -> bool {
        self.catalogs
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == &catalog.name))
    }

    /// Check a full replacement value list for an asset in `catalog`.
    /// An empty list clears the field and is always accepted.
    pub fn validate_values(&self, catalog: &Catalog, values: &[String]) -> Result<(), AssetError> {
        if !self.applies_to(catalog) {
            return Err(AssetError::FieldNotApplicable {
                field: self.name.clone(),
                catalog: catalog.name.clone(),
            });
        }
        if let Some(max) = self.max_values {
            if values.len() > max {
                return Err(AssetError::TooManyValues {
                    field: self.name.clone(),
                    max,
                    got: values.len(),
                });
            }
        }
        if let Some(allowed) = &self.values {
            if let Some(bad) = values.iter().find(|v| !allowed.contains(v)) {
                return Err(AssetError::InvalidFieldValue {
                    field: self.name.clone(),
                    value: bad.clone(),
                });
            }
        }
        Ok(())
    }
}
