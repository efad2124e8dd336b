/// Failures reported by an [`AssetStorage`](crate::AssetStorage) backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The asset's committed version moved past the one the caller read.
    #[error("concurrent conflict on asset #{asset_id}: expected version {expected_version}")]
    ConcurrentConflict { asset_id: i64, expected_version: i64 },

    /// No asset with the given id.
    #[error("asset not found: #{asset_id}")]
    AssetNotFound { asset_id: i64 },

    /// Anything else the backend could not do.
    #[error("storage backend error: {0}")]
    Backend(String),
}
