//! Permission checks for asset operations.
//!
//! The service asks an [`Authorizer`] before every read or write. Which
//! rights exist and how they are granted is decided elsewhere; the two
//! reference implementations cover configured grants and tests.

use assets_core::{Catalog, Grant, Registry, Right};

/// Decides whether a user holds a right on a catalog.
pub trait Authorizer: Send + Sync {
    fn has_right(&self, user: &str, right: Right, catalog: &Catalog) -> bool;
}

impl<T: Authorizer + ?Sized> Authorizer for Box<T> {
    fn has_right(&self, user: &str, right: Right, catalog: &Catalog) -> bool {
        (**self).has_right(user, right, catalog)
    }
}

/// Grants every right to everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn has_right(&self, _user: &str, _right: Right, _catalog: &Catalog) -> bool {
        true
    }
}

/// The `[[grants]]` table from configuration.
#[derive(Debug, Clone, Default)]
pub struct GrantTable {
    grants: Vec<Grant>,
}

impl GrantTable {
    pub fn new(grants: Vec<Grant>) -> Self {
        Self { grants }
    }

    pub fn from_registry(registry: &Registry) -> Self {
        Self::new(registry.grants().to_vec())
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl Authorizer for GrantTable {
    fn has_right(&self, user: &str, right: Right, catalog: &Catalog) -> bool {
        self.grants
            .iter()
            .any(|grant| grant.allows(user, right, catalog.id))
    }
}
