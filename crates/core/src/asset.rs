use crate::error::AssetError;

/// Asset names must be non-empty and must not look like a numeric id.
pub fn validate_name(name: &str) -> Result<(), AssetError> {
    if name.is_empty() {
        return Err(AssetError::EmptyName);
    }
    if name.chars().all(|c| c.is_numeric()) {
        return Err(AssetError::NumericName(name.to_string()));
    }
    Ok(())
}
