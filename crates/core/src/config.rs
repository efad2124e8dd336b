//! TOML configuration: lifecycles, catalogs, custom fields and grants.
//!
//! The file is parsed into [`AssetsConfig`] and then checked and frozen into
//! a [`Registry`] by [`AssetsConfig::build`]. In lifecycle transition tables
//! the key `""` names the creation origin; it never becomes a status.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::custom_field::CustomField;
use crate::error::ConfigError;
use crate::lifecycle::{FromStatus, Lifecycle};
use crate::registry::Registry;
use crate::right::{Grant, Grantee, Right};
use crate::role::Roles;

/// Name of the lifecycle used when a catalog does not name one.
pub const DEFAULT_LIFECYCLE: &str = "assets";

/// Name of the catalog created when the configuration declares none.
pub const DEFAULT_CATALOG: &str = "General assets";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetsConfig {
    #[serde(default)]
    pub lifecycles: BTreeMap<String, LifecycleConfig>,
    #[serde(default)]
    pub catalogs: Vec<CatalogConfig>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub grants: Vec<GrantConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub initial: Vec<String>,
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub inactive: Vec<String>,
    /// Origin status -> reachable statuses. `""` is the creation origin.
    #[serde(default)]
    pub transitions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub defaults: LifecycleDefaults,
    pub deleted: Option<String>,
    /// `"from -> to"` pattern -> right name.
    #[serde(default)]
    pub rights: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleDefaults {
    pub on_create: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    pub name: String,
    #[serde(default = "default_lifecycle_name")]
    pub lifecycle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub disabled: bool,
}

fn default_lifecycle_name() -> String {
    DEFAULT_LIFECYCLE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantConfig {
    /// A user name, or `*` for everyone.
    pub principal: String,
    pub rights: Vec<String>,
    /// Catalog name. Absent grants the rights on every catalog.
    pub catalog: Option<String>,
}

impl LifecycleConfig {
    pub fn to_lifecycle(&self, name: &str) -> Result<Lifecycle, ConfigError> {
        let mut builder = Lifecycle::builder(name)
            .initial(self.initial.iter().cloned())
            .active(self.active.iter().cloned())
            .inactive(self.inactive.iter().cloned());
        for (from, targets) in &self.transitions {
            let origin = if from.is_empty() {
                FromStatus::None
            } else {
                FromStatus::from(from.as_str())
            };
            for to in targets {
                builder = builder.transition(origin.clone(), to.clone());
            }
        }
        if let Some(on_create) = &self.defaults.on_create {
            builder = builder.default_on_create(on_create.clone());
        }
        if let Some(deleted) = &self.deleted {
            builder = builder.deleted(deleted.clone());
        }
        for (pattern, right) in &self.rights {
            builder = builder.right(pattern.clone(), right.clone());
        }
        builder.build()
    }
}

/// The lifecycle used when a configuration declares none.
pub fn default_assets_lifecycle() -> LifecycleConfig {
    let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let mut transitions = BTreeMap::new();
    transitions.insert(String::new(), list(&["new", "allocated", "in-use"]));
    transitions.insert(
        "new".to_string(),
        list(&["allocated", "in-use", "stolen", "deleted"]),
    );
    transitions.insert(
        "allocated".to_string(),
        list(&["in-use", "recycled", "stolen", "deleted"]),
    );
    transitions.insert(
        "in-use".to_string(),
        list(&["allocated", "recycled", "stolen", "deleted"]),
    );
    transitions.insert(
        "recycled".to_string(),
        list(&["allocated", "in-use"]),
    );
    transitions.insert("stolen".to_string(), list(&["allocated", "in-use"]));
    transitions.insert("deleted".to_string(), list(&["allocated", "in-use"]));

    let mut rights = BTreeMap::new();
    rights.insert("deleted -> *".to_string(), "CreateAsset".to_string());

    LifecycleConfig {
        initial: list(&["new"]),
        active: list(&["allocated", "in-use"]),
        inactive: list(&["recycled", "stolen", "deleted"]),
        transitions,
        defaults: LifecycleDefaults {
            on_create: Some("new".to_string()),
        },
        deleted: Some("deleted".to_string()),
        rights,
    }
}

impl AssetsConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// Validate everything and freeze it into a [`Registry`].
    ///
    /// Catalog ids are assigned in file order starting at 1.
    pub fn build(&self) -> Result<Registry, ConfigError> {
        let mut lifecycles = BTreeMap::new();
        if self.lifecycles.is_empty() {
            lifecycles.insert(
                DEFAULT_LIFECYCLE.to_string(),
                default_assets_lifecycle().to_lifecycle(DEFAULT_LIFECYCLE)?,
            );
        }
        for (name, lc) in &self.lifecycles {
            lifecycles.insert(name.clone(), lc.to_lifecycle(name)?);
        }

        let default_catalogs = [CatalogConfig {
            name: DEFAULT_CATALOG.to_string(),
            lifecycle: DEFAULT_LIFECYCLE.to_string(),
            description: String::new(),
            disabled: false,
        }];
        let catalog_configs: &[CatalogConfig] = if self.catalogs.is_empty() {
            &default_catalogs
        } else {
            &self.catalogs
        };

        let mut catalogs = Vec::with_capacity(catalog_configs.len());
        let mut catalog_names = BTreeSet::new();
        for (idx, c) in catalog_configs.iter().enumerate() {
            let err = |message: &str| ConfigError::Catalog {
                catalog: c.name.clone(),
                message: message.to_string(),
            };
            if c.name.is_empty() || c.name.chars().all(|ch| ch.is_ascii_digit()) {
                return Err(err("name must be non-empty and not only digits"));
            }
            if !catalog_names.insert(c.name.as_str()) {
                return Err(err("declared more than once"));
            }
            if !lifecycles.contains_key(&c.lifecycle) {
                return Err(err(&format!("unknown lifecycle '{}'", c.lifecycle)));
            }
            catalogs.push(Catalog {
                id: idx as i64 + 1,
                name: c.name.clone(),
                lifecycle: c.lifecycle.clone(),
                description: c.description.clone(),
                disabled: c.disabled,
            });
        }

        let mut field_names = BTreeSet::new();
        for f in &self.custom_fields {
            let err = |message: String| ConfigError::CustomField {
                field: f.name.clone(),
                message,
            };
            if f.name.is_empty() {
                return Err(err("name must be non-empty".to_string()));
            }
            if !field_names.insert(f.name.as_str()) {
                return Err(err("declared more than once".to_string()));
            }
            if f.max_values == Some(0) {
                return Err(err("max_values must be at least 1".to_string()));
            }
            for name in f.catalogs.iter().flatten() {
                if !catalog_names.contains(name.as_str()) {
                    return Err(err(format!("unknown catalog '{}'", name)));
                }
            }
        }

        let mut grants = Vec::with_capacity(self.grants.len());
        for g in &self.grants {
            let err = |message: String| ConfigError::Grant {
                principal: g.principal.clone(),
                message,
            };
            let grantee = match g.principal.as_str() {
                "" => return Err(err("principal must be non-empty".to_string())),
                "*" => Grantee::Everyone,
                user => Grantee::User(user.to_string()),
            };
            let rights = g
                .rights
                .iter()
                .map(|r| r.parse::<Right>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(err)?;
            let catalog = match &g.catalog {
                None => None,
                Some(name) => Some(
                    catalogs
                        .iter()
                        .find(|c| &c.name == name)
                        .map(|c| c.id)
                        .ok_or_else(|| err(format!("unknown catalog '{}'", name)))?,
                ),
            };
            grants.push(Grant {
                grantee,
                rights,
                catalog,
            });
        }

        Ok(Registry::new(
            lifecycles,
            catalogs,
            self.custom_fields.clone(),
            Roles::default(),
            grants,
        ))
    }
}
