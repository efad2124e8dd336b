use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::custom_field::CustomField;
use crate::lifecycle::Lifecycle;
use crate::right::Grant;
use crate::role::Roles;

/// Immutable configuration table shared by every component.
///
/// Only [`crate::config::AssetsConfig::build`] constructs one, so every
/// catalog's lifecycle is known to exist.
#[derive(Debug, Clone)]
pub struct Registry {
    lifecycles: BTreeMap<String, Lifecycle>,
    catalogs: Vec<Catalog>,
    custom_fields: Vec<CustomField>,
    roles: Roles,
    grants: Vec<Grant>,
}

impl Registry {
    pub(crate) fn new(
        lifecycles: BTreeMap<String, Lifecycle>,
        catalogs: Vec<Catalog>,
        custom_fields: Vec<CustomField>,
        roles: Roles,
        grants: Vec<Grant>,
    ) -> Self {
        Self {
            lifecycles,
            catalogs,
            custom_fields,
            roles,
            grants,
        }
    }

    pub fn lifecycle(&self, name: &str) -> Option<&Lifecycle> {
        self.lifecycles.get(name)
    }

    pub fn lifecycles(&self) -> impl Iterator<Item = &Lifecycle> {
        self.lifecycles.values()
    }

    pub fn lifecycle_for(&self, catalog: &Catalog) -> Option<&Lifecycle> {
        self.lifecycles.get(&catalog.lifecycle)
    }

    pub fn catalog(&self, id: i64) -> Option<&Catalog> {
        self.catalogs.iter().find(|c| c.id == id)
    }

    pub fn catalog_by_name(&self, name: &str) -> Option<&Catalog> {
        self.catalogs.iter().find(|c| c.name == name)
    }

    /// Look a catalog up by numeric id or by name.
    pub fn resolve_catalog(&self, key: &str) -> Option<&Catalog> {
        match key.parse::<i64>() {
            Ok(id) => self.catalog(id),
            Err(_) => self.catalog_by_name(key),
        }
    }

    pub fn catalogs(&self) -> &[Catalog] {
        &self.catalogs
    }

    pub fn custom_fields(&self) -> &[CustomField] {
        &self.custom_fields
    }

    pub fn custom_field(&self, name: &str) -> Option<&CustomField> {
        self.custom_fields.iter().find(|f| f.name == name)
    }

    pub fn custom_fields_for<'a>(
        &'a self,
        catalog: &'a Catalog,
    ) -> impl Iterator<Item = &'a CustomField> + 'a {
        self.custom_fields.iter().filter(move |f| f.applies_to(catalog))
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }
}
