//! assets-core: lifecycle gate and configuration model for asset records.
//!
//! # Public API
//!
//! - [`Lifecycle`] -- legal statuses, transition table, creation default
//! - [`LifecycleGate`] -- resolves a record's lifecycle and applies the checks
//! - [`StatusOwner`] -- what a record exposes to the gate
//! - [`AssetsConfig`] / [`Registry`] -- TOML configuration and its frozen form
//! - [`Catalog`], [`CustomField`], [`Role`], [`Principal`], [`Right`]

pub mod asset;
pub mod catalog;
pub mod config;
pub mod custom_field;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod registry;
pub mod right;
pub mod role;

pub use asset::validate_name;
pub use catalog::Catalog;
pub use config::AssetsConfig;
pub use custom_field::CustomField;
pub use error::{AssetError, ConfigError, LifecycleError};
pub use gate::{GateError, LifecycleGate, StatusOwner};
pub use lifecycle::{FromStatus, Lifecycle, LifecycleBuilder, StatusCategory};
pub use registry::Registry;
pub use right::{Grant, Grantee, Right};
pub use role::{Principal, Role, Roles};
