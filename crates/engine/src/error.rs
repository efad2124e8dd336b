use assets_core::{AssetError, GateError, LifecycleError, Right};
use assets_storage::StorageError;

/// Everything an [`AssetService`](crate::AssetService) operation can fail with.
///
/// Gate rejections and attribute validation keep their own message text so
/// callers can show it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Storage(StorageError),

    #[error("Permission Denied: '{user}' lacks {right} on catalog '{catalog}'")]
    PermissionDenied {
        user: String,
        right: Right,
        catalog: String,
    },

    #[error("Invalid catalog '{0}'")]
    UnknownCatalog(String),

    #[error("Catalog '{0}' is disabled")]
    CatalogDisabled(String),

    #[error("Asset #{0} not found")]
    AssetNotFound(i64),

    #[error("Lifecycle '{0}' has no deleted status")]
    NoDeletedStatus(String),

    #[error("Catalog '{catalog}' uses unknown lifecycle '{lifecycle}'")]
    UnknownLifecycle { catalog: String, lifecycle: String },
}

impl ServiceError {
    /// True when the caller lost an optimistic concurrency race and may retry.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ServiceError::Storage(StorageError::ConcurrentConflict { .. })
        )
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::AssetNotFound { asset_id } => ServiceError::AssetNotFound(asset_id),
            other => ServiceError::Storage(other),
        }
    }
}

impl From<GateError> for ServiceError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::Rejected(e) => ServiceError::Lifecycle(e),
            GateError::UnknownCatalog(id) => ServiceError::UnknownCatalog(id.to_string()),
            GateError::UnknownLifecycle { catalog, lifecycle } => {
                ServiceError::UnknownLifecycle { catalog, lifecycle }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assets_core::FromStatus;

    #[test]
    fn gate_rejection_keeps_user_message() {
        let err = ServiceError::from(GateError::Rejected(LifecycleError::IllegalTransition {
            lifecycle: "assets".to_string(),
            from: FromStatus::Status("deleted".to_string()),
            to: "new".to_string(),
        }));
        assert_eq!(err.to_string(), "Can't change status from 'deleted' to 'new'.");
    }

    #[test]
    fn missing_asset_maps_to_not_found() {
        let err = ServiceError::from(StorageError::AssetNotFound { asset_id: 7 });
        assert_eq!(err, ServiceError::AssetNotFound(7));
        assert!(!err.is_conflict());
    }

    #[test]
    fn conflict_is_detected() {
        let err = ServiceError::from(StorageError::ConcurrentConflict {
            asset_id: 1,
            expected_version: 3,
        });
        assert!(err.is_conflict());
    }
}
