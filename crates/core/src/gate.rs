//! The lifecycle gate: decides whether a record may enter or move to a status.
//!
//! Records expose what the gate needs through [`StatusOwner`]; the gate
//! resolves the owning catalog's lifecycle from the shared [`Registry`] and
//! delegates to the pure predicates on [`Lifecycle`]. Nothing here mutates.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::LifecycleError;
use crate::lifecycle::{FromStatus, Lifecycle};
use crate::registry::Registry;
use crate::right::Right;

/// A record whose status is governed by its catalog's lifecycle.
pub trait StatusOwner {
    fn status(&self) -> &str;
    fn catalog_id(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("No such catalog #{0}")]
    UnknownCatalog(i64),

    #[error("Catalog '{catalog}' uses unknown lifecycle '{lifecycle}'")]
    UnknownLifecycle { catalog: String, lifecycle: String },

    #[error(transparent)]
    Rejected(#[from] LifecycleError),
}

#[derive(Debug, Clone)]
pub struct LifecycleGate {
    registry: Arc<Registry>,
}

impl LifecycleGate {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn lifecycle_for_catalog(&self, catalog: &Catalog) -> Result<&Lifecycle, GateError> {
        self.registry
            .lifecycle_for(catalog)
            .ok_or_else(|| GateError::UnknownLifecycle {
                catalog: catalog.name.clone(),
                lifecycle: catalog.lifecycle.clone(),
            })
    }

    fn lifecycle_for_owner(&self, owner: &impl StatusOwner) -> Result<&Lifecycle, GateError> {
        let catalog = self
            .registry
            .catalog(owner.catalog_id())
            .ok_or(GateError::UnknownCatalog(owner.catalog_id()))?;
        self.lifecycle_for_catalog(catalog)
    }

    /// Status a new record in `catalog` gets, or why it cannot be created.
    pub fn check_create(
        &self,
        catalog: &Catalog,
        requested: Option<&str>,
    ) -> Result<String, GateError> {
        Ok(self.lifecycle_for_catalog(catalog)?.check_create(requested)?)
    }

    /// Check that `owner` may move to `to` under its catalog's lifecycle.
    pub fn check_update(&self, owner: &impl StatusOwner, to: &str) -> Result<(), GateError> {
        Ok(self
            .lifecycle_for_owner(owner)?
            .check_change(owner.status(), to)?)
    }

    /// The extra right the lifecycle demands for `owner -> to`, if any.
    pub fn required_right(
        &self,
        owner: &impl StatusOwner,
        to: &str,
    ) -> Result<Option<Right>, GateError> {
        let from = FromStatus::from(owner.status());
        Ok(self.lifecycle_for_owner(owner)?.required_right(&from, to))
    }
}
