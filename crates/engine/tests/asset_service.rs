//! End-to-end behavior of `AssetService` over the in-memory backend.
//!
//! Covers the lifecycle gate on create and update, atomic rollback, role
//! and custom-field rules, transition rights, catalog moves and optimistic
//! concurrency.

use std::sync::Arc;

use assets_core::{AssetError, AssetsConfig, LifecycleError, Principal, Registry, Right};
use assets_engine::{AllowAll, AssetService, CreateAsset, GrantTable, ServiceError};
use assets_storage::{
    AssetRecord, AssetStorage, ChangeKind, ChangeRecord, CustomFieldValueRecord, InMemoryStorage,
    MemorySnapshot, NewAsset, NewChange, RoleMemberRecord, StorageError,
};
use async_trait::async_trait;

const CONFIG: &str = r#"
[lifecycles.assets]
initial = ["new"]
active = ["allocated", "in-use"]
inactive = ["recycled", "stolen", "deleted"]
deleted = "deleted"
[lifecycles.assets.defaults]
on_create = "new"
[lifecycles.assets.transitions]
"" = ["new", "allocated", "in-use"]
new = ["allocated", "in-use", "stolen", "deleted"]
allocated = ["in-use", "recycled", "stolen", "deleted"]
in-use = ["allocated", "recycled", "stolen", "deleted"]
recycled = ["allocated", "in-use"]
stolen = ["allocated", "in-use"]
deleted = ["allocated", "in-use"]
[lifecycles.assets.rights]
"deleted -> *" = "CreateAsset"

[lifecycles.theft]
initial = ["new"]
inactive = ["stolen", "recycled"]
[lifecycles.theft.defaults]
on_create = "new"
[lifecycles.theft.transitions]
"" = ["new"]
new = ["stolen", "recycled"]

[[catalogs]]
name = "General assets"
lifecycle = "assets"

[[catalogs]]
name = "Bikes"
lifecycle = "theft"

[[catalogs]]
name = "Retired"
lifecycle = "assets"
disabled = true

[[custom_fields]]
name = "Serial Number"
catalogs = ["General assets"]
max_values = 1

[[custom_fields]]
name = "Color"
values = ["red", "blue"]

[[custom_fields]]
name = "Tags"

[[grants]]
principal = "alice"
rights = ["ShowAsset", "CreateAsset", "ModifyAsset"]

[[grants]]
principal = "bob"
rights = ["ShowAsset", "ModifyAsset"]
"#;

fn registry() -> Arc<Registry> {
    Arc::new(AssetsConfig::from_toml_str(CONFIG).unwrap().build().unwrap())
}

fn service() -> AssetService<InMemoryStorage> {
    let registry = registry();
    let grants = GrantTable::from_registry(&registry);
    AssetService::new(InMemoryStorage::new(), registry, grants)
}

async fn laptop(svc: &AssetService<InMemoryStorage>) -> AssetRecord {
    svc.create_asset("alice", CreateAsset::new("Laptop", "General assets"))
        .await
        .unwrap()
}

fn kinds(changes: &[ChangeRecord]) -> Vec<ChangeKind> {
    changes.iter().map(|c| c.kind).collect()
}

// ──────────────────────────────────────────────
// Creation
// ──────────────────────────────────────────────

#[tokio::test]
async fn create_without_status_uses_lifecycle_default() {
    let svc = service();
    let asset = laptop(&svc).await;
    assert_eq!(asset.status, "new");
    assert_eq!(asset.version, 0);
    assert_eq!(asset.creator, "alice");

    let history = svc.history("alice", asset.id).await.unwrap();
    assert_eq!(kinds(&history), vec![ChangeKind::Create]);
}

#[tokio::test]
async fn create_stores_explicit_reachable_status_exactly() {
    let svc = service();
    let asset = svc
        .create_asset(
            "alice",
            CreateAsset::new("Printer", "1").with_status("in-use"),
        )
        .await
        .unwrap();
    assert_eq!(svc.load("alice", asset.id).await.unwrap().status, "in-use");
}

#[tokio::test]
async fn create_rejects_status_unreachable_from_none() {
    let svc = service();
    let err = svc
        .create_asset(
            "alice",
            CreateAsset::new("Laptop", "General assets").with_status("stolen"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "New records cannot have status 'stolen'.");
    assert!(svc.search("alice", None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_rejects_unknown_status() {
    let svc = service();
    let err = svc
        .create_asset(
            "alice",
            CreateAsset::new("Laptop", "General assets").with_status("archived"),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Status 'archived' isn't a valid status for this record type."
    );
}

#[tokio::test]
async fn create_is_case_sensitive() {
    let svc = service();
    let err = svc
        .create_asset(
            "alice",
            CreateAsset::new("Laptop", "General assets").with_status("New"),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Lifecycle(LifecycleError::InvalidStatus { .. })
    ));
}

#[tokio::test]
async fn create_validates_name_and_catalog() {
    let svc = service();
    let err = svc
        .create_asset("alice", CreateAsset::new("", "General assets"))
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::Asset(AssetError::EmptyName));

    let err = svc
        .create_asset("alice", CreateAsset::new("12345", "General assets"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::Asset(AssetError::NumericName("12345".to_string()))
    );

    let err = svc
        .create_asset("alice", CreateAsset::new("Laptop", "Nowhere"))
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::UnknownCatalog("Nowhere".to_string()));

    let err = svc
        .create_asset("alice", CreateAsset::new("Laptop", "Retired"))
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::CatalogDisabled("Retired".to_string()));
}

#[tokio::test]
async fn create_requires_create_right() {
    let svc = service();
    let err = svc
        .create_asset("bob", CreateAsset::new("Laptop", "General assets"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::PermissionDenied {
            right: Right::CreateAsset,
            ..
        }
    ));
}

#[tokio::test]
async fn create_writes_roles_and_fields_together() {
    let svc = service();
    let asset = svc
        .create_asset(
            "alice",
            CreateAsset::new("Laptop", "General assets")
                .with_role("Owner", Principal::user("alice"))
                .with_role("HeldBy", Principal::group("it"))
                .with_field("Serial Number", ["SN-1"])
                .with_field("Tags", ["loaner", "spare"]),
        )
        .await
        .unwrap();

    let view = svc.view("alice", asset.id).await.unwrap();
    assert_eq!(view.catalog_name, "General assets");
    assert_eq!(view.roles["Owner"], vec![Principal::user("alice")]);
    assert_eq!(view.roles["HeldBy"], vec![Principal::group("it")]);
    assert_eq!(view.custom_fields["Serial Number"], vec!["SN-1"]);
    assert_eq!(view.custom_fields["Tags"], vec!["loaner", "spare"]);
}

#[tokio::test]
async fn create_rejects_bad_roles_and_fields_before_writing() {
    let svc = service();
    let cases = [
        (
            CreateAsset::new("Laptop", "General assets")
                .with_role("Owner", Principal::group("it")),
            ServiceError::Asset(AssetError::GroupInSingleRole {
                role: "Owner".to_string(),
                group: "it".to_string(),
            }),
        ),
        (
            CreateAsset::new("Laptop", "General assets")
                .with_role("Janitor", Principal::user("bob")),
            ServiceError::Asset(AssetError::UnknownRole("Janitor".to_string())),
        ),
        (
            CreateAsset::new("Laptop", "General assets").with_field("Serial Number", ["a", "b"]),
            ServiceError::Asset(AssetError::TooManyValues {
                field: "Serial Number".to_string(),
                max: 1,
                got: 2,
            }),
        ),
        (
            CreateAsset::new("Bike", "Bikes").with_field("Serial Number", ["a"]),
            ServiceError::Asset(AssetError::FieldNotApplicable {
                field: "Serial Number".to_string(),
                catalog: "Bikes".to_string(),
            }),
        ),
    ];
    for (request, expected) in cases {
        assert_eq!(svc.create_asset("alice", request).await.unwrap_err(), expected);
    }
    assert!(svc.search("alice", None, None).await.unwrap().is_empty());
}

// ──────────────────────────────────────────────
// Status changes
// ──────────────────────────────────────────────

#[tokio::test]
async fn theft_scenario() {
    let svc = service();
    let bike = svc
        .create_asset("alice", CreateAsset::new("Bike", "Bikes"))
        .await
        .unwrap();
    assert_eq!(bike.status, "new");

    let err = svc.set_status("alice", bike.id, "missing").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Status 'missing' isn't a valid status for this record type."
    );
    assert_eq!(svc.load("alice", bike.id).await.unwrap().status, "new");

    let recycled = svc.set_status("alice", bike.id, "recycled").await.unwrap();
    assert_eq!(recycled.status, "recycled");
    assert_eq!(recycled.version, 1);

    let err = svc.set_status("alice", bike.id, "new").await.unwrap_err();
    assert_eq!(err.to_string(), "Can't change status from 'recycled' to 'new'.");

    let history = svc.history("alice", bike.id).await.unwrap();
    assert_eq!(kinds(&history), vec![ChangeKind::Create, ChangeKind::Status]);
    assert_eq!(history[1].old_value.as_deref(), Some("new"));
    assert_eq!(history[1].new_value.as_deref(), Some("recycled"));
}

#[tokio::test]
async fn missing_edge_leaves_no_change_record() {
    let svc = service();
    let asset = laptop(&svc).await;
    svc.delete_asset("alice", asset.id).await.unwrap();

    let err = svc.set_status("alice", asset.id, "new").await.unwrap_err();
    assert_eq!(err.to_string(), "Can't change status from 'deleted' to 'new'.");

    let current = svc.load("alice", asset.id).await.unwrap();
    assert_eq!(current.status, "deleted");
    let history = svc.history("alice", asset.id).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn unchanged_status_is_a_no_op() {
    let svc = service();
    let asset = laptop(&svc).await;
    let same = svc.set_status("alice", asset.id, "new").await.unwrap();
    assert_eq!(same.version, 0);
    assert_eq!(svc.history("alice", asset.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_needs_a_deleted_status() {
    let svc = service();
    let bike = svc
        .create_asset("alice", CreateAsset::new("Bike", "Bikes"))
        .await
        .unwrap();
    let err = svc.delete_asset("alice", bike.id).await.unwrap_err();
    assert_eq!(err, ServiceError::NoDeletedStatus("theft".to_string()));
}

#[tokio::test]
async fn reopening_deleted_asset_requires_create_right() {
    let svc = service();
    let asset = laptop(&svc).await;

    let deleted = svc.delete_asset("bob", asset.id).await.unwrap();
    assert_eq!(deleted.status, "deleted");
    assert_eq!(deleted.last_updated_by, "bob");

    let err = svc.set_status("bob", asset.id, "in-use").await.unwrap_err();
    assert_eq!(
        err,
        ServiceError::PermissionDenied {
            user: "bob".to_string(),
            right: Right::CreateAsset,
            catalog: "General assets".to_string(),
        }
    );

    let reopened = svc.set_status("alice", asset.id, "in-use").await.unwrap();
    assert_eq!(reopened.status, "in-use");
}

#[tokio::test]
async fn modify_right_is_required_for_updates() {
    let svc = service();
    let asset = laptop(&svc).await;
    let err = svc.set_status("carol", asset.id, "in-use").await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::PermissionDenied {
            right: Right::ModifyAsset,
            ..
        }
    ));
}

#[tokio::test]
async fn unknown_asset_is_not_found() {
    let svc = service();
    assert_eq!(
        svc.set_status("alice", 42, "new").await.unwrap_err(),
        ServiceError::AssetNotFound(42)
    );
    assert_eq!(
        svc.load("alice", 42).await.unwrap_err(),
        ServiceError::AssetNotFound(42)
    );
}

// ──────────────────────────────────────────────
// Attributes and catalogs
// ──────────────────────────────────────────────

#[tokio::test]
async fn rename_records_set_change() {
    let svc = service();
    let asset = laptop(&svc).await;

    let renamed = svc.set_name("bob", asset.id, "Laptop 2").await.unwrap();
    assert_eq!(renamed.name, "Laptop 2");
    svc.set_name("bob", asset.id, "Laptop 2").await.unwrap();
    assert!(svc.set_name("bob", asset.id, "007").await.is_err());

    svc.set_description("bob", asset.id, "spare unit")
        .await
        .unwrap();

    let history = svc.history("alice", asset.id).await.unwrap();
    assert_eq!(
        kinds(&history),
        vec![ChangeKind::Create, ChangeKind::Set, ChangeKind::Set]
    );
    assert_eq!(history[1].field.as_deref(), Some("Name"));
    assert_eq!(history[1].old_value.as_deref(), Some("Laptop"));
    assert_eq!(history[2].field.as_deref(), Some("Description"));
}

#[tokio::test]
async fn catalog_move_checks_target_lifecycle() {
    let svc = service();
    let in_use = svc
        .create_asset(
            "alice",
            CreateAsset::new("Laptop", "General assets").with_status("in-use"),
        )
        .await
        .unwrap();
    let err = svc.set_catalog("alice", in_use.id, "Bikes").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Status 'in-use' isn't a valid status for this record type."
    );

    let fresh = laptop(&svc).await;
    let moved = svc.set_catalog("alice", fresh.id, "Bikes").await.unwrap();
    assert_eq!(moved.catalog, 2);
    let history = svc.history("alice", fresh.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.field.as_deref(), Some("Catalog"));
    assert_eq!(last.old_value.as_deref(), Some("General assets"));
    assert_eq!(last.new_value.as_deref(), Some("Bikes"));

    let err = svc.set_catalog("alice", fresh.id, "Retired").await.unwrap_err();
    assert_eq!(err, ServiceError::CatalogDisabled("Retired".to_string()));
}

#[tokio::test]
async fn catalog_move_requires_create_right_on_target() {
    let svc = service();
    let asset = laptop(&svc).await;
    let err = svc.set_catalog("bob", asset.id, "Bikes").await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::PermissionDenied {
            right: Right::CreateAsset,
            ..
        }
    ));
}

// ──────────────────────────────────────────────
// Roles and custom fields
// ──────────────────────────────────────────────

#[tokio::test]
async fn single_valued_role_replaces_member() {
    let svc = service();
    let asset = laptop(&svc).await;

    svc.add_role_member("alice", asset.id, "Owner", Principal::user("alice"))
        .await
        .unwrap();
    let owners = svc
        .add_role_member("alice", asset.id, "Owner", Principal::user("bob"))
        .await
        .unwrap();
    assert_eq!(owners, vec![Principal::user("bob")]);

    let history = svc.history("alice", asset.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.kind, ChangeKind::AddRoleMember);
    assert_eq!(last.old_value.as_deref(), Some("user:alice"));
    assert_eq!(last.new_value.as_deref(), Some("user:bob"));
}

#[tokio::test]
async fn multi_valued_role_accumulates_and_removes() {
    let svc = service();
    let asset = laptop(&svc).await;

    svc.add_role_member("alice", asset.id, "Contact", Principal::user("carol"))
        .await
        .unwrap();
    let contacts = svc
        .add_role_member("alice", asset.id, "Contact", Principal::group("helpdesk"))
        .await
        .unwrap();
    assert_eq!(contacts.len(), 2);

    let contacts = svc
        .remove_role_member("alice", asset.id, "Contact", Principal::user("carol"))
        .await
        .unwrap();
    assert_eq!(contacts, vec![Principal::group("helpdesk")]);

    let err = svc
        .remove_role_member("alice", asset.id, "Contact", Principal::user("carol"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Asset(AssetError::NotARoleMember { .. })
    ));

    let roles: Vec<RoleMemberRecord> = svc.roles("alice", asset.id).await.unwrap();
    assert_eq!(roles.len(), 1);
    let history = svc.history("alice", asset.id).await.unwrap();
    assert_eq!(
        kinds(&history),
        vec![
            ChangeKind::Create,
            ChangeKind::AddRoleMember,
            ChangeKind::AddRoleMember,
            ChangeKind::DeleteRoleMember,
        ]
    );
}

#[tokio::test]
async fn custom_field_rules_apply_on_update() {
    let svc = service();
    let asset = laptop(&svc).await;

    let values = svc
        .set_custom_field("alice", asset.id, "Color", vec!["red".to_string()])
        .await
        .unwrap();
    assert_eq!(values, vec!["red"]);

    let err = svc
        .set_custom_field("alice", asset.id, "Color", vec!["green".to_string()])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::Asset(AssetError::InvalidFieldValue {
            field: "Color".to_string(),
            value: "green".to_string(),
        })
    );

    let err = svc
        .set_custom_field("alice", asset.id, "Weight", vec!["3kg".to_string()])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::Asset(AssetError::UnknownField("Weight".to_string()))
    );

    svc.set_custom_field("alice", asset.id, "Color", Vec::new())
        .await
        .unwrap();
    let fields: Vec<CustomFieldValueRecord> =
        svc.custom_fields("alice", asset.id).await.unwrap();
    assert!(fields.is_empty());

    let history = svc.history("alice", asset.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.kind, ChangeKind::CustomField);
    assert_eq!(last.old_value.as_deref(), Some("red"));
    assert_eq!(last.new_value, None);
}

// ──────────────────────────────────────────────
// Visibility
// ──────────────────────────────────────────────

#[tokio::test]
async fn search_only_returns_visible_assets() {
    let svc = service();
    laptop(&svc).await;
    svc.create_asset("alice", CreateAsset::new("Bike", "Bikes"))
        .await
        .unwrap();

    assert_eq!(svc.search("alice", None, None).await.unwrap().len(), 2);
    assert_eq!(svc.search("bob", Some("Bikes"), None).await.unwrap().len(), 1);
    assert_eq!(
        svc.search("alice", Some("1"), Some("new")).await.unwrap().len(),
        1
    );
    assert!(svc.search("carol", None, None).await.unwrap().is_empty());
    assert_eq!(
        svc.search("alice", Some("Nowhere"), None).await.unwrap_err(),
        ServiceError::UnknownCatalog("Nowhere".to_string())
    );
}

#[tokio::test]
async fn show_right_is_required_to_read() {
    let svc = service();
    let asset = laptop(&svc).await;
    assert!(matches!(
        svc.history("carol", asset.id).await.unwrap_err(),
        ServiceError::PermissionDenied {
            right: Right::ShowAsset,
            ..
        }
    ));
}

// ──────────────────────────────────────────────
// Failure injection: rollback and lost races
// ──────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Every change-record insert fails.
    FailChange,
    /// A rival snapshot moves the asset to "stolen" right after it is read
    /// for update.
    InterfereOnRead,
}

struct FaultyStorage {
    inner: InMemoryStorage,
    fault: Fault,
}

#[async_trait]
impl AssetStorage for FaultyStorage {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        self.inner.begin_snapshot().await
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        self.inner.commit_snapshot(snapshot).await
    }

    async fn abort_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        self.inner.abort_snapshot(snapshot).await
    }

    async fn insert_asset(
        &self,
        snapshot: &mut MemorySnapshot,
        asset: NewAsset,
    ) -> Result<AssetRecord, StorageError> {
        self.inner.insert_asset(snapshot, asset).await
    }

    async fn get_asset_for_update(
        &self,
        snapshot: &mut MemorySnapshot,
        asset_id: i64,
    ) -> Result<AssetRecord, StorageError> {
        let asset = self.inner.get_asset_for_update(snapshot, asset_id).await?;
        if self.fault == Fault::InterfereOnRead {
            let mut rival = self.inner.begin_snapshot().await?;
            let mut theirs = self.inner.get_asset_for_update(&mut rival, asset_id).await?;
            theirs.status = "stolen".to_string();
            self.inner.update_asset(&mut rival, &theirs).await?;
            self.inner.commit_snapshot(rival).await?;
        }
        Ok(asset)
    }

    async fn update_asset(
        &self,
        snapshot: &mut MemorySnapshot,
        asset: &AssetRecord,
    ) -> Result<i64, StorageError> {
        self.inner.update_asset(snapshot, asset).await
    }

    async fn role_members_in(
        &self,
        snapshot: &mut MemorySnapshot,
        asset_id: i64,
        role: &str,
    ) -> Result<Vec<Principal>, StorageError> {
        self.inner.role_members_in(snapshot, asset_id, role).await
    }

    async fn set_role_members(
        &self,
        snapshot: &mut MemorySnapshot,
        asset_id: i64,
        role: &str,
        members: Vec<Principal>,
    ) -> Result<(), StorageError> {
        self.inner
            .set_role_members(snapshot, asset_id, role, members)
            .await
    }

    async fn custom_field_values_in(
        &self,
        snapshot: &mut MemorySnapshot,
        asset_id: i64,
        field: &str,
    ) -> Result<Vec<String>, StorageError> {
        self.inner
            .custom_field_values_in(snapshot, asset_id, field)
            .await
    }

    async fn set_custom_field_values(
        &self,
        snapshot: &mut MemorySnapshot,
        asset_id: i64,
        field: &str,
        values: Vec<String>,
    ) -> Result<(), StorageError> {
        self.inner
            .set_custom_field_values(snapshot, asset_id, field, values)
            .await
    }

    async fn insert_change(
        &self,
        snapshot: &mut MemorySnapshot,
        change: NewChange,
    ) -> Result<i64, StorageError> {
        if self.fault == Fault::FailChange {
            return Err(StorageError::Backend("disk full".to_string()));
        }
        self.inner.insert_change(snapshot, change).await
    }

    async fn get_asset(&self, asset_id: i64) -> Result<AssetRecord, StorageError> {
        self.inner.get_asset(asset_id).await
    }

    async fn list_assets(
        &self,
        catalog: Option<i64>,
        status: Option<&str>,
    ) -> Result<Vec<AssetRecord>, StorageError> {
        self.inner.list_assets(catalog, status).await
    }

    async fn get_role_members(
        &self,
        asset_id: i64,
    ) -> Result<Vec<RoleMemberRecord>, StorageError> {
        self.inner.get_role_members(asset_id).await
    }

    async fn get_custom_field_values(
        &self,
        asset_id: i64,
    ) -> Result<Vec<CustomFieldValueRecord>, StorageError> {
        self.inner.get_custom_field_values(asset_id).await
    }

    async fn list_changes(&self, asset_id: i64) -> Result<Vec<ChangeRecord>, StorageError> {
        self.inner.list_changes(asset_id).await
    }
}

fn faulty_service(fault: Fault) -> AssetService<FaultyStorage, AllowAll> {
    let storage = FaultyStorage {
        inner: InMemoryStorage::new(),
        fault,
    };
    AssetService::new(storage, registry(), AllowAll)
}

#[tokio::test]
async fn failed_creation_rolls_back_everything() {
    let svc = faulty_service(Fault::FailChange);
    let err = svc
        .create_asset(
            "alice",
            CreateAsset::new("Laptop", "General assets")
                .with_role("Owner", Principal::user("alice"))
                .with_field("Tags", ["spare"]),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::Storage(StorageError::Backend("disk full".to_string()))
    );

    assert!(svc.search("alice", None, None).await.unwrap().is_empty());
    let storage = svc.storage();
    assert!(storage.get_role_members(1).await.unwrap().is_empty());
    assert!(storage.get_custom_field_values(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn lost_race_reports_conflict_and_keeps_winner() {
    let svc = faulty_service(Fault::InterfereOnRead);
    let asset = svc
        .create_asset("alice", CreateAsset::new("Laptop", "General assets"))
        .await
        .unwrap();

    let err = svc
        .set_status("alice", asset.id, "allocated")
        .await
        .unwrap_err();
    assert!(err.is_conflict(), "expected a conflict, got {err:?}");

    let current = svc.load("alice", asset.id).await.unwrap();
    assert_eq!(current.status, "stolen");
    assert_eq!(current.version, 1);
    // The rival wrote no change record and ours was rolled back.
    assert_eq!(svc.history("alice", asset.id).await.unwrap().len(), 1);
}
