use assets_core::{Principal, StatusOwner};
use serde::{Deserialize, Serialize};

/// An asset row as stored in the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Owning catalog id.
    pub catalog: i64,
    pub status: String,
    pub creator: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created: String,
    pub last_updated_by: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub last_updated: String,
    /// Bumped by one on every committed update. Starts at 0.
    pub version: i64,
}

impl StatusOwner for AssetRecord {
    fn status(&self) -> &str {
        &self.status
    }

    fn catalog_id(&self) -> i64 {
        self.catalog
    }
}

/// The columns a caller supplies when inserting an asset. The backend
/// assigns the id and starts the version at 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAsset {
    pub name: String,
    pub description: String,
    pub catalog: i64,
    pub status: String,
    pub creator: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created: String,
}

/// Members of one role on one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMemberRecord {
    pub asset_id: i64,
    pub role: String,
    pub members: Vec<Principal>,
}

/// Values of one custom field on one asset, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldValueRecord {
    pub asset_id: i64,
    pub field: String,
    pub values: Vec<String>,
}

/// What a change record documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Create,
    Status,
    Set,
    AddRoleMember,
    DeleteRoleMember,
    CustomField,
}

/// An immutable audit entry for one change to an asset.
///
/// Every asset mutation must insert its change record in the same snapshot
/// as the mutation itself. No change without a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: i64,
    pub asset_id: i64,
    pub kind: ChangeKind,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub creator: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created: String,
}

/// A change record before the backend assigns its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChange {
    pub asset_id: i64,
    pub kind: ChangeKind,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub creator: String,
    pub created: String,
}

impl NewChange {
    pub fn with_id(self, id: i64) -> ChangeRecord {
        ChangeRecord {
            id,
            asset_id: self.asset_id,
            kind: self.kind,
            field: self.field,
            old_value: self.old_value,
            new_value: self.new_value,
            creator: self.creator,
            created: self.created,
        }
    }
}
