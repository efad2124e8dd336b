use assets_core::Principal;
use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{
    AssetRecord, ChangeRecord, CustomFieldValueRecord, NewAsset, NewChange, RoleMemberRecord,
};

/// Transactional persistence for asset rows, role membership, custom-field
/// values and change records.
///
/// ## Snapshots
///
/// Writes go through `&mut Self::Snapshot`. A caller opens one with
/// `begin_snapshot()`, stages its writes, then hands it to either
/// `commit_snapshot` or `abort_snapshot`. Both consume it.
///
/// If a `Snapshot` is dropped without committing, nothing it wrote may
/// become visible.
///
/// ## Versions
///
/// `update_asset` is conditional on the record's `version` still being the
/// one the caller read. A backend may detect a lost race either in
/// `update_asset` or when committing; both report
/// `StorageError::ConcurrentConflict` and leave committed state untouched.
///
/// Backends are shared across tasks, hence `Send + Sync + 'static`.
#[async_trait]
pub trait AssetStorage: Send + Sync + 'static {
    /// The snapshot (transaction) type used by this storage backend.
    type Snapshot: Send;

    // ── Snapshot lifecycle ────────────────────────────────────────────────────

    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError>;

    /// Commit a snapshot, making all mutations durable at once.
    async fn commit_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    /// Abort (roll back) a snapshot, discarding all mutations.
    async fn abort_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    // ── Asset operations (within snapshot) ───────────────────────────────────

    /// Insert a new asset at version 0 and return it with its assigned id.
    ///
    /// Ids are positive and strictly increasing; ids consumed by aborted
    /// snapshots are not reused.
    async fn insert_asset(
        &self,
        snapshot: &mut Self::Snapshot,
        asset: NewAsset,
    ) -> Result<AssetRecord, StorageError>;

    /// Read an asset as this snapshot sees it (including its own writes).
    ///
    /// Returns `Err(StorageError::AssetNotFound)` if the asset does not exist.
    async fn get_asset_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        asset_id: i64,
    ) -> Result<AssetRecord, StorageError>;

    /// Write every mutable column of `asset`, conditional on `asset.version`
    /// being current. Returns the new version number on success.
    async fn update_asset(
        &self,
        snapshot: &mut Self::Snapshot,
        asset: &AssetRecord,
    ) -> Result<i64, StorageError>;

    // ── Role and custom-field operations (within snapshot) ──────────────────

    async fn role_members_in(
        &self,
        snapshot: &mut Self::Snapshot,
        asset_id: i64,
        role: &str,
    ) -> Result<Vec<Principal>, StorageError>;

    /// Replace the membership of `role` on the asset.
    async fn set_role_members(
        &self,
        snapshot: &mut Self::Snapshot,
        asset_id: i64,
        role: &str,
        members: Vec<Principal>,
    ) -> Result<(), StorageError>;

    async fn custom_field_values_in(
        &self,
        snapshot: &mut Self::Snapshot,
        asset_id: i64,
        field: &str,
    ) -> Result<Vec<String>, StorageError>;

    /// Replace the values of `field` on the asset. An empty list clears it.
    async fn set_custom_field_values(
        &self,
        snapshot: &mut Self::Snapshot,
        asset_id: i64,
        field: &str,
        values: Vec<String>,
    ) -> Result<(), StorageError>;

    /// Insert a change record and return its assigned id.
    ///
    /// CRITICAL: must be inserted in the SAME snapshot as the mutation it
    /// documents. That is what guarantees no change without a record.
    async fn insert_change(
        &self,
        snapshot: &mut Self::Snapshot,
        change: NewChange,
    ) -> Result<i64, StorageError>;

    // ── Query operations (committed state only) ──────────────────────────────

    async fn get_asset(&self, asset_id: i64) -> Result<AssetRecord, StorageError>;

    /// List assets ordered by id, optionally filtered by catalog and status.
    async fn list_assets(
        &self,
        catalog: Option<i64>,
        status: Option<&str>,
    ) -> Result<Vec<AssetRecord>, StorageError>;

    /// Non-empty roles of an asset, ordered by role name.
    async fn get_role_members(&self, asset_id: i64)
        -> Result<Vec<RoleMemberRecord>, StorageError>;

    /// Non-empty custom fields of an asset, ordered by field name.
    async fn get_custom_field_values(
        &self,
        asset_id: i64,
    ) -> Result<Vec<CustomFieldValueRecord>, StorageError>;

    /// Change records of an asset, oldest first.
    async fn list_changes(&self, asset_id: i64) -> Result<Vec<ChangeRecord>, StorageError>;
}
