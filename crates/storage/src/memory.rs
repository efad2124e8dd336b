//! In-process `AssetStorage` backend.
//!
//! Each snapshot buffers its writes and applies them under one lock at
//! commit. Updates remember the committed version they started from, and
//! commit refuses the whole snapshot if any of those versions moved.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use assets_core::Principal;
use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{
    AssetRecord, ChangeRecord, CustomFieldValueRecord, NewAsset, NewChange, RoleMemberRecord,
};
use crate::traits::AssetStorage;

type FieldKey = (i64, String);

#[derive(Debug, Default)]
struct Tables {
    assets: BTreeMap<i64, AssetRecord>,
    roles: BTreeMap<FieldKey, Vec<Principal>>,
    custom_fields: BTreeMap<FieldKey, Vec<String>>,
    changes: Vec<ChangeRecord>,
}

/// Buffered writes of one in-progress transaction.
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    assets: BTreeMap<i64, AssetRecord>,
    /// Committed version each updated asset was read at. `None` for assets
    /// inserted by this snapshot.
    base_versions: BTreeMap<i64, Option<i64>>,
    roles: BTreeMap<FieldKey, Vec<Principal>>,
    custom_fields: BTreeMap<FieldKey, Vec<String>>,
    changes: Vec<ChangeRecord>,
}

#[derive(Debug)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
    next_asset_id: AtomicI64,
    next_change_id: AtomicI64,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            next_asset_id: AtomicI64::new(1),
            next_change_id: AtomicI64::new(1),
        }
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Backend("storage lock poisoned".to_string()))
    }

    fn current_asset(
        &self,
        snapshot: &MemorySnapshot,
        asset_id: i64,
    ) -> Result<AssetRecord, StorageError> {
        if let Some(staged) = snapshot.assets.get(&asset_id) {
            return Ok(staged.clone());
        }
        self.tables()?
            .assets
            .get(&asset_id)
            .cloned()
            .ok_or(StorageError::AssetNotFound { asset_id })
    }
}

#[async_trait]
impl AssetStorage for InMemoryStorage {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        Ok(MemorySnapshot::default())
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        let mut tables = self.tables()?;

        for (&asset_id, base) in &snapshot.base_versions {
            if let Some(expected_version) = *base {
                let current = tables.assets.get(&asset_id).map(|a| a.version);
                if current != Some(expected_version) {
                    return Err(StorageError::ConcurrentConflict {
                        asset_id,
                        expected_version,
                    });
                }
            }
        }

        tables.assets.extend(snapshot.assets);
        tables.roles.extend(snapshot.roles);
        tables.custom_fields.extend(snapshot.custom_fields);
        tables.changes.extend(snapshot.changes);
        Ok(())
    }

    async fn abort_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        drop(snapshot);
        Ok(())
    }

    async fn insert_asset(
        &self,
        snapshot: &mut MemorySnapshot,
        asset: NewAsset,
    ) -> Result<AssetRecord, StorageError> {
        let id = self.next_asset_id.fetch_add(1, Ordering::SeqCst);
        let record = AssetRecord {
            id,
            name: asset.name,
            description: asset.description,
            catalog: asset.catalog,
            status: asset.status,
            last_updated_by: asset.creator.clone(),
            last_updated: asset.created.clone(),
            creator: asset.creator,
            created: asset.created,
            version: 0,
        };
        snapshot.assets.insert(id, record.clone());
        snapshot.base_versions.insert(id, None);
        Ok(record)
    }

    async fn get_asset_for_update(
        &self,
        snapshot: &mut MemorySnapshot,
        asset_id: i64,
    ) -> Result<AssetRecord, StorageError> {
        self.current_asset(snapshot, asset_id)
    }

    async fn update_asset(
        &self,
        snapshot: &mut MemorySnapshot,
        asset: &AssetRecord,
    ) -> Result<i64, StorageError> {
        let current = self.current_asset(snapshot, asset.id)?;
        if current.version != asset.version {
            return Err(StorageError::ConcurrentConflict {
                asset_id: asset.id,
                expected_version: asset.version,
            });
        }
        snapshot
            .base_versions
            .entry(asset.id)
            .or_insert(Some(current.version));
        let mut next = asset.clone();
        next.version = current.version + 1;
        let version = next.version;
        snapshot.assets.insert(asset.id, next);
        Ok(version)
    }

    async fn role_members_in(
        &self,
        snapshot: &mut MemorySnapshot,
        asset_id: i64,
        role: &str,
    ) -> Result<Vec<Principal>, StorageError> {
        self.current_asset(snapshot, asset_id)?;
        let key = (asset_id, role.to_string());
        if let Some(staged) = snapshot.roles.get(&key) {
            return Ok(staged.clone());
        }
        Ok(self.tables()?.roles.get(&key).cloned().unwrap_or_default())
    }

    async fn set_role_members(
        &self,
        snapshot: &mut MemorySnapshot,
        asset_id: i64,
        role: &str,
        members: Vec<Principal>,
    ) -> Result<(), StorageError> {
        self.current_asset(snapshot, asset_id)?;
        snapshot.roles.insert((asset_id, role.to_string()), members);
        Ok(())
    }

    async fn custom_field_values_in(
        &self,
        snapshot: &mut MemorySnapshot,
        asset_id: i64,
        field: &str,
    ) -> Result<Vec<String>, StorageError> {
        self.current_asset(snapshot, asset_id)?;
        let key = (asset_id, field.to_string());
        if let Some(staged) = snapshot.custom_fields.get(&key) {
            return Ok(staged.clone());
        }
        Ok(self
            .tables()?
            .custom_fields
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_custom_field_values(
        &self,
        snapshot: &mut MemorySnapshot,
        asset_id: i64,
        field: &str,
        values: Vec<String>,
    ) -> Result<(), StorageError> {
        self.current_asset(snapshot, asset_id)?;
        snapshot
            .custom_fields
            .insert((asset_id, field.to_string()), values);
        Ok(())
    }

    async fn insert_change(
        &self,
        snapshot: &mut MemorySnapshot,
        change: NewChange,
    ) -> Result<i64, StorageError> {
        self.current_asset(snapshot, change.asset_id)?;
        let id = self.next_change_id.fetch_add(1, Ordering::SeqCst);
        snapshot.changes.push(change.with_id(id));
        Ok(id)
    }

    async fn get_asset(&self, asset_id: i64) -> Result<AssetRecord, StorageError> {
        self.tables()?
            .assets
            .get(&asset_id)
            .cloned()
            .ok_or(StorageError::AssetNotFound { asset_id })
    }

    async fn list_assets(
        &self,
        catalog: Option<i64>,
        status: Option<&str>,
    ) -> Result<Vec<AssetRecord>, StorageError> {
        Ok(self
            .tables()?
            .assets
            .values()
            .filter(|a| catalog.is_none_or(|c| a.catalog == c))
            .filter(|a| status.is_none_or(|s| a.status == s))
            .cloned()
            .collect())
    }

    async fn get_role_members(
        &self,
        asset_id: i64,
    ) -> Result<Vec<RoleMemberRecord>, StorageError> {
        Ok(self
            .tables()?
            .roles
            .iter()
            .filter(|((id, _), members)| *id == asset_id && !members.is_empty())
            .map(|((id, role), members)| RoleMemberRecord {
                asset_id: *id,
                role: role.clone(),
                members: members.clone(),
            })
            .collect())
    }

    async fn get_custom_field_values(
        &self,
        asset_id: i64,
    ) -> Result<Vec<CustomFieldValueRecord>, StorageError> {
        Ok(self
            .tables()?
            .custom_fields
            .iter()
            .filter(|((id, _), values)| *id == asset_id && !values.is_empty())
            .map(|((id, field), values)| CustomFieldValueRecord {
                asset_id: *id,
                field: field.clone(),
                values: values.clone(),
            })
            .collect())
    }

    async fn list_changes(&self, asset_id: i64) -> Result<Vec<ChangeRecord>, StorageError> {
        Ok(self
            .tables()?
            .changes
            .iter()
            .filter(|c| c.asset_id == asset_id)
            .cloned()
            .collect())
    }
}
