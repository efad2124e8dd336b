//! Asset create/update orchestration.
//!
//! Every mutation follows the same shape: validate what can be validated
//! without storage, open one snapshot, read the asset for update, run the
//! lifecycle gate and permission checks, write the change together with its
//! change record, then commit. Any failure aborts the snapshot, so a
//! rejected request leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use assets_core::{
    validate_name, AssetError, Catalog, CustomField, FromStatus, LifecycleError, LifecycleGate,
    Principal, Registry, Right,
};
use assets_storage::{
    AssetRecord, AssetStorage, ChangeKind, ChangeRecord, CustomFieldValueRecord, NewAsset,
    NewChange, RoleMemberRecord,
};
use tracing::{debug, info};

use crate::authorize::{Authorizer, GrantTable};
use crate::error::ServiceError;
use crate::model::{AssetView, CreateAsset};

pub struct AssetService<S, A = GrantTable> {
    storage: S,
    gate: LifecycleGate,
    authorizer: A,
}

impl<S: AssetStorage, A: Authorizer> AssetService<S, A> {
    pub fn new(storage: S, registry: Arc<Registry>, authorizer: A) -> Self {
        Self {
            storage,
            gate: LifecycleGate::new(registry),
            authorizer,
        }
    }

    pub fn registry(&self) -> &Registry {
        self.gate.registry()
    }

    pub fn gate(&self) -> &LifecycleGate {
        &self.gate
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Create an asset with its initial roles and custom-field values.
    ///
    /// The asset row, role members, field values and the `Create` change
    /// record are written in one snapshot. If any step fails nothing is
    /// persisted.
    pub async fn create_asset(
        &self,
        actor: &str,
        request: CreateAsset,
    ) -> Result<AssetRecord, ServiceError> {
        let CreateAsset {
            name,
            description,
            catalog,
            status,
            roles,
            custom_fields,
        } = request;

        let catalog = self.enabled_catalog(&catalog)?;
        self.require(actor, Right::CreateAsset, catalog)?;
        validate_name(&name)?;

        let status = self.gate.check_create(catalog, status.as_deref())?;
        let lifecycle = self.gate.lifecycle_for_catalog(catalog)?;
        if let Some(right) = lifecycle.required_right(&FromStatus::None, &status) {
            self.require(actor, right, catalog)?;
        }

        let roles = self.resolve_roles(roles)?;
        for (field, values) in &custom_fields {
            self.custom_field(field)?.validate_values(catalog, values)?;
        }

        let now = now_rfc3339();
        let new_asset = NewAsset {
            name,
            description,
            catalog: catalog.id,
            status,
            creator: actor.to_string(),
            created: now,
        };

        let mut snapshot = self.storage.begin_snapshot().await?;
        let result = self
            .write_new_asset(&mut snapshot, new_asset, roles, custom_fields)
            .await;
        let asset = self.finish(snapshot, result).await?;

        info!(
            asset_id = asset.id,
            catalog = %catalog.name,
            status = %asset.status,
            user = actor,
            "asset created"
        );
        Ok(asset)
    }

    /// Move an asset to `status` through its catalog's lifecycle.
    pub async fn set_status(
        &self,
        actor: &str,
        id: i64,
        status: &str,
    ) -> Result<AssetRecord, ServiceError> {
        let mut snapshot = self.storage.begin_snapshot().await?;
        let result = self
            .apply_status(&mut snapshot, actor, id, Some(status))
            .await;
        self.finish(snapshot, result).await
    }

    /// Move an asset to its lifecycle's `deleted` status. Assets are never
    /// removed from storage.
    pub async fn delete_asset(&self, actor: &str, id: i64) -> Result<AssetRecord, ServiceError> {
        let mut snapshot = self.storage.begin_snapshot().await?;
        let result = self.apply_status(&mut snapshot, actor, id, None).await;
        self.finish(snapshot, result).await
    }

    pub async fn set_name(
        &self,
        actor: &str,
        id: i64,
        name: &str,
    ) -> Result<AssetRecord, ServiceError> {
        validate_name(name)?;
        let mut snapshot = self.storage.begin_snapshot().await?;
        let result = self
            .apply_attribute(&mut snapshot, actor, id, "Name", name, |a| &mut a.name)
            .await;
        self.finish(snapshot, result).await
    }

    pub async fn set_description(
        &self,
        actor: &str,
        id: i64,
        description: &str,
    ) -> Result<AssetRecord, ServiceError> {
        let mut snapshot = self.storage.begin_snapshot().await?;
        let result = self
            .apply_attribute(&mut snapshot, actor, id, "Description", description, |a| {
                &mut a.description
            })
            .await;
        self.finish(snapshot, result).await
    }

    /// Move an asset to another catalog. The target must be enabled, the
    /// actor needs `CreateAsset` there, and the asset's current status must
    /// be legal in the target's lifecycle.
    pub async fn set_catalog(
        &self,
        actor: &str,
        id: i64,
        catalog: &str,
    ) -> Result<AssetRecord, ServiceError> {
        let mut snapshot = self.storage.begin_snapshot().await?;
        let result = self.apply_catalog(&mut snapshot, actor, id, catalog).await;
        self.finish(snapshot, result).await
    }

    /// Add `principal` to `role`. Single-valued roles replace their member.
    /// Returns the role's members afterwards.
    pub async fn add_role_member(
        &self,
        actor: &str,
        id: i64,
        role: &str,
        principal: Principal,
    ) -> Result<Vec<Principal>, ServiceError> {
        let mut snapshot = self.storage.begin_snapshot().await?;
        let result = self
            .apply_role_member(&mut snapshot, actor, id, role, principal, true)
            .await;
        self.finish(snapshot, result).await
    }

    pub async fn remove_role_member(
        &self,
        actor: &str,
        id: i64,
        role: &str,
        principal: Principal,
    ) -> Result<Vec<Principal>, ServiceError> {
        let mut snapshot = self.storage.begin_snapshot().await?;
        let result = self
            .apply_role_member(&mut snapshot, actor, id, role, principal, false)
            .await;
        self.finish(snapshot, result).await
    }

    /// Replace all values of a custom field. An empty list clears it.
    pub async fn set_custom_field(
        &self,
        actor: &str,
        id: i64,
        field: &str,
        values: Vec<String>,
    ) -> Result<Vec<String>, ServiceError> {
        let mut snapshot = self.storage.begin_snapshot().await?;
        let result = self
            .apply_custom_field(&mut snapshot, actor, id, field, values)
            .await;
        self.finish(snapshot, result).await
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub async fn load(&self, actor: &str, id: i64) -> Result<AssetRecord, ServiceError> {
        let asset = self.storage.get_asset(id).await?;
        self.require(actor, Right::ShowAsset, self.catalog(asset.catalog)?)?;
        Ok(asset)
    }

    pub async fn roles(&self, actor: &str, id: i64) -> Result<Vec<RoleMemberRecord>, ServiceError> {
        self.load(actor, id).await?;
        Ok(self.storage.get_role_members(id).await?)
    }

    pub async fn custom_fields(
        &self,
        actor: &str,
        id: i64,
    ) -> Result<Vec<CustomFieldValueRecord>, ServiceError> {
        self.load(actor, id).await?;
        Ok(self.storage.get_custom_field_values(id).await?)
    }

    pub async fn history(&self, actor: &str, id: i64) -> Result<Vec<ChangeRecord>, ServiceError> {
        self.load(actor, id).await?;
        Ok(self.storage.list_changes(id).await?)
    }

    /// The asset with everything a reader wants alongside it.
    pub async fn view(&self, actor: &str, id: i64) -> Result<AssetView, ServiceError> {
        let asset = self.load(actor, id).await?;
        let catalog = self.catalog(asset.catalog)?;
        let category = self
            .gate
            .lifecycle_for_catalog(catalog)?
            .category(&asset.status);
        let roles = self
            .storage
            .get_role_members(id)
            .await?
            .into_iter()
            .map(|r| (r.role, r.members))
            .collect();
        let custom_fields = self
            .storage
            .get_custom_field_values(id)
            .await?
            .into_iter()
            .map(|f| (f.field, f.values))
            .collect();
        Ok(AssetView {
            catalog_name: catalog.name.clone(),
            category,
            roles,
            custom_fields,
            asset,
        })
    }

    /// Assets the actor may see, optionally narrowed to one catalog (id or
    /// name) and one status.
    pub async fn search(
        &self,
        actor: &str,
        catalog: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<AssetRecord>, ServiceError> {
        let catalog_id = match catalog {
            Some(key) => Some(
                self.registry()
                    .resolve_catalog(key)
                    .ok_or_else(|| ServiceError::UnknownCatalog(key.to_string()))?
                    .id,
            ),
            None => None,
        };
        let assets = self.storage.list_assets(catalog_id, status).await?;
        Ok(assets
            .into_iter()
            .filter(|a| {
                self.registry()
                    .catalog(a.catalog)
                    .is_some_and(|c| self.authorizer.has_right(actor, Right::ShowAsset, c))
            })
            .collect())
    }

    // ── Snapshot bodies ──────────────────────────────────────────────────

    async fn write_new_asset(
        &self,
        snapshot: &mut S::Snapshot,
        new_asset: NewAsset,
        roles: Vec<(String, Vec<Principal>)>,
        custom_fields: BTreeMap<String, Vec<String>>,
    ) -> Result<AssetRecord, ServiceError> {
        let creator = new_asset.creator.clone();
        let asset = self.storage.insert_asset(snapshot, new_asset).await?;
        for (role, members) in roles {
            if !members.is_empty() {
                self.storage
                    .set_role_members(snapshot, asset.id, &role, members)
                    .await?;
            }
        }
        for (field, values) in custom_fields {
            if !values.is_empty() {
                self.storage
                    .set_custom_field_values(snapshot, asset.id, &field, values)
                    .await?;
            }
        }
        self.storage
            .insert_change(
                snapshot,
                change(asset.id, &creator, ChangeKind::Create, None, None, None),
            )
            .await?;
        Ok(asset)
    }

    /// `to == None` means the lifecycle's deleted status.
    async fn apply_status(
        &self,
        snapshot: &mut S::Snapshot,
        actor: &str,
        id: i64,
        to: Option<&str>,
    ) -> Result<AssetRecord, ServiceError> {
        let mut asset = self.storage.get_asset_for_update(snapshot, id).await?;
        let catalog = self.catalog(asset.catalog)?;
        self.require(actor, Right::ModifyAsset, catalog)?;
        let lifecycle = self.gate.lifecycle_for_catalog(catalog)?;

        let to = match to {
            Some(status) => status.to_string(),
            None => lifecycle
                .deleted_status()
                .ok_or_else(|| ServiceError::NoDeletedStatus(lifecycle.name().to_string()))?
                .to_string(),
        };
        if asset.status == to {
            debug!(asset_id = id, status = %to, "status unchanged");
            return Ok(asset);
        }

        self.gate.check_update(&asset, &to)?;
        if let Some(right) = self.gate.required_right(&asset, &to)? {
            self.require(actor, right, catalog)?;
        }

        let old = std::mem::replace(&mut asset.status, to.clone());
        self.save(snapshot, &mut asset, actor).await?;
        self.storage
            .insert_change(
                snapshot,
                change(
                    id,
                    actor,
                    ChangeKind::Status,
                    Some("Status"),
                    Some(old.clone()),
                    Some(to.clone()),
                ),
            )
            .await?;

        info!(asset_id = id, from = %old, to = %to, user = actor, "status changed");
        Ok(asset)
    }

    async fn apply_attribute(
        &self,
        snapshot: &mut S::Snapshot,
        actor: &str,
        id: i64,
        field: &str,
        value: &str,
        slot: fn(&mut AssetRecord) -> &mut String,
    ) -> Result<AssetRecord, ServiceError> {
        let mut asset = self.storage.get_asset_for_update(snapshot, id).await?;
        self.require(actor, Right::ModifyAsset, self.catalog(asset.catalog)?)?;
        if *slot(&mut asset) == value {
            debug!(asset_id = id, field, "value unchanged");
            return Ok(asset);
        }

        let old = std::mem::replace(slot(&mut asset), value.to_string());
        self.save(snapshot, &mut asset, actor).await?;
        self.storage
            .insert_change(
                snapshot,
                change(
                    id,
                    actor,
                    ChangeKind::Set,
                    Some(field),
                    Some(old),
                    Some(value.to_string()),
                ),
            )
            .await?;
        Ok(asset)
    }

    async fn apply_catalog(
        &self,
        snapshot: &mut S::Snapshot,
        actor: &str,
        id: i64,
        key: &str,
    ) -> Result<AssetRecord, ServiceError> {
        let mut asset = self.storage.get_asset_for_update(snapshot, id).await?;
        let current = self.catalog(asset.catalog)?;
        self.require(actor, Right::ModifyAsset, current)?;
        let target = self.enabled_catalog(key)?;
        if target.id == current.id {
            return Ok(asset);
        }
        self.require(actor, Right::CreateAsset, target)?;

        let lifecycle = self.gate.lifecycle_for_catalog(target)?;
        if !lifecycle.is_valid_status(&asset.status) {
            return Err(LifecycleError::InvalidStatus {
                lifecycle: lifecycle.name().to_string(),
                status: asset.status.clone(),
            }
            .into());
        }

        asset.catalog = target.id;
        self.save(snapshot, &mut asset, actor).await?;
        self.storage
            .insert_change(
                snapshot,
                change(
                    id,
                    actor,
                    ChangeKind::Set,
                    Some("Catalog"),
                    Some(current.name.clone()),
                    Some(target.name.clone()),
                ),
            )
            .await?;

        info!(
            asset_id = id,
            from = %current.name,
            to = %target.name,
            user = actor,
            "asset moved to another catalog"
        );
        Ok(asset)
    }

    async fn apply_role_member(
        &self,
        snapshot: &mut S::Snapshot,
        actor: &str,
        id: i64,
        role: &str,
        principal: Principal,
        add: bool,
    ) -> Result<Vec<Principal>, ServiceError> {
        let mut asset = self.storage.get_asset_for_update(snapshot, id).await?;
        self.require(actor, Right::ModifyAsset, self.catalog(asset.catalog)?)?;
        let role = self.registry().roles().get(role)?;
        let members = self
            .storage
            .role_members_in(snapshot, id, &role.name)
            .await?;

        let (next, kind, old_value, new_value) = if add {
            let next = role.add_member(&members, principal.clone())?;
            let replaced = if role.single {
                members.first().map(ToString::to_string)
            } else {
                None
            };
            (next, ChangeKind::AddRoleMember, replaced, Some(principal.to_string()))
        } else {
            let next = role.remove_member(&members, &principal)?;
            (next, ChangeKind::DeleteRoleMember, Some(principal.to_string()), None)
        };
        if next == members {
            debug!(asset_id = id, role = %role.name, "role membership unchanged");
            return Ok(members);
        }

        self.storage
            .set_role_members(snapshot, id, &role.name, next.clone())
            .await?;
        self.save(snapshot, &mut asset, actor).await?;
        self.storage
            .insert_change(
                snapshot,
                change(id, actor, kind, Some(&role.name), old_value, new_value),
            )
            .await?;
        Ok(next)
    }

    async fn apply_custom_field(
        &self,
        snapshot: &mut S::Snapshot,
        actor: &str,
        id: i64,
        field: &str,
        values: Vec<String>,
    ) -> Result<Vec<String>, ServiceError> {
        let mut asset = self.storage.get_asset_for_update(snapshot, id).await?;
        let catalog = self.catalog(asset.catalog)?;
        self.require(actor, Right::ModifyAsset, catalog)?;
        let definition = self.custom_field(field)?;
        definition.validate_values(catalog, &values)?;

        let current = self
            .storage
            .custom_field_values_in(snapshot, id, &definition.name)
            .await?;
        if current == values {
            return Ok(values);
        }

        self.storage
            .set_custom_field_values(snapshot, id, &definition.name, values.clone())
            .await?;
        self.save(snapshot, &mut asset, actor).await?;
        self.storage
            .insert_change(
                snapshot,
                change(
                    id,
                    actor,
                    ChangeKind::CustomField,
                    Some(&definition.name),
                    joined(&current),
                    joined(&values),
                ),
            )
            .await?;
        Ok(values)
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    /// Commit on success, abort on failure.
    async fn finish<T>(
        &self,
        snapshot: S::Snapshot,
        result: Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        match result {
            Ok(value) => {
                self.storage.commit_snapshot(snapshot).await?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.storage.abort_snapshot(snapshot).await;
                debug!(error = %e, "snapshot aborted");
                Err(e)
            }
        }
    }

    /// Stamp the audit columns and write the asset row under OCC.
    async fn save(
        &self,
        snapshot: &mut S::Snapshot,
        asset: &mut AssetRecord,
        actor: &str,
    ) -> Result<(), ServiceError> {
        asset.last_updated_by = actor.to_string();
        asset.last_updated = now_rfc3339();
        asset.version = self.storage.update_asset(snapshot, asset).await?;
        Ok(())
    }

    fn require(&self, actor: &str, right: Right, catalog: &Catalog) -> Result<(), ServiceError> {
        if self.authorizer.has_right(actor, right, catalog) {
            return Ok(());
        }
        debug!(user = actor, %right, catalog = %catalog.name, "permission denied");
        Err(ServiceError::PermissionDenied {
            user: actor.to_string(),
            right,
            catalog: catalog.name.clone(),
        })
    }

    fn catalog(&self, id: i64) -> Result<&Catalog, ServiceError> {
        self.registry()
            .catalog(id)
            .ok_or_else(|| ServiceError::UnknownCatalog(id.to_string()))
    }

    fn enabled_catalog(&self, key: &str) -> Result<&Catalog, ServiceError> {
        let catalog = self
            .registry()
            .resolve_catalog(key)
            .ok_or_else(|| ServiceError::UnknownCatalog(key.to_string()))?;
        if catalog.disabled {
            return Err(ServiceError::CatalogDisabled(catalog.name.clone()));
        }
        Ok(catalog)
    }

    fn custom_field(&self, name: &str) -> Result<&CustomField, ServiceError> {
        self.registry()
            .custom_field(name)
            .ok_or_else(|| AssetError::UnknownField(name.to_string()).into())
    }

    /// Apply requested role members in order, so a single-valued role keeps
    /// the last one given.
    fn resolve_roles(
        &self,
        requested: BTreeMap<String, Vec<Principal>>,
    ) -> Result<Vec<(String, Vec<Principal>)>, ServiceError> {
        let mut resolved = Vec::with_capacity(requested.len());
        for (name, principals) in requested {
            let role = self.registry().roles().get(&name)?;
            let mut members = Vec::new();
            for principal in principals {
                members = role.add_member(&members, principal)?;
            }
            resolved.push((role.name.clone(), members));
        }
        Ok(resolved)
    }
}

fn change(
    asset_id: i64,
    actor: &str,
    kind: ChangeKind,
    field: Option<&str>,
    old_value: Option<String>,
    new_value: Option<String>,
) -> NewChange {
    NewChange {
        asset_id,
        kind,
        field: field.map(str::to_string),
        old_value,
        new_value,
        creator: actor.to_string(),
        created: now_rfc3339(),
    }
}

fn joined(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// Current UTC time as an RFC 3339 timestamp with second precision.
fn now_rfc3339() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
