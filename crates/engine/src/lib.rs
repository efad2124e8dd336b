//! assets-engine: create and update assets through the lifecycle gate.
//!
//! [`AssetService`] ties the configuration [`Registry`](assets_core::Registry),
//! an [`AssetStorage`](assets_storage::AssetStorage) backend and an
//! [`Authorizer`] together. Each mutation runs in one storage snapshot and
//! writes its change record alongside the change.

pub mod authorize;
pub mod error;
pub mod model;
pub mod service;

pub use authorize::{AllowAll, Authorizer, GrantTable};
pub use error::ServiceError;
pub use model::{AssetView, CreateAsset};
pub use service::AssetService;
