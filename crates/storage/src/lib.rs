//! Transactional storage for assets, their role members, custom-field
//! values and change history.

pub mod conformance;
mod error;
pub mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::{InMemoryStorage, MemorySnapshot};
pub use record::{
    AssetRecord, ChangeKind, ChangeRecord, CustomFieldValueRecord, NewAsset, NewChange,
    RoleMemberRecord,
};
pub use traits::AssetStorage;
