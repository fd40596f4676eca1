//! Error types for asset resolution and record synthesis

use crate::constants::AssetRole;

/// Failures raised by an [`ObjectStore`](crate::storage::ObjectStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {url}")]
    NotFound { url: String },

    #[error("storage {operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },
}

impl StorageError {
    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        StorageError::Service {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StacError {
    #[error("{locator} is not a valid storage locator: {reason}")]
    InvalidKeyFormat { locator: String, reason: String },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("Missing required assets: {}", format_roles(missing))]
    IncompleteAssetSet { missing: Vec<AssetRole> },

    #[error("multiple files match the {role} asset: {first} and {second}")]
    AmbiguousAsset {
        role: AssetRole,
        first: String,
        second: String,
    },

    #[error("malformed item id {id:?}: {reason} (token {token:?})")]
    MalformedIdentity {
        id: String,
        token: String,
        reason: String,
    },

    #[error("raster has {actual} bands but the band template declares {expected}")]
    BandCountMismatch { expected: usize, actual: usize },

    #[error("record failed validation: {}", .0.join("; "))]
    SchemaValidation(Vec<String>),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("raster introspection failed: {0}")]
    Raster(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StacError {
    pub(crate) fn invalid_key(locator: &str, reason: impl Into<String>) -> Self {
        StacError::InvalidKeyFormat {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(id: &str, token: &str, reason: impl Into<String>) -> Self {
        StacError::MalformedIdentity {
            id: id.to_string(),
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

fn format_roles(roles: &[AssetRole]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T, E = StacError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_asset_set_names_roles() {
        let err = StacError::IncompleteAssetSet {
            missing: vec![AssetRole::TrainingDataCsv],
        };
        assert_eq!(err.to_string(), "Missing required assets: training_data_csv");
    }

    #[test]
    fn test_storage_errors_stay_distinguishable() {
        let err: StacError = StorageError::service("list", "access denied").into();
        match err {
            StacError::Storage(StorageError::Service { operation, .. }) => {
                assert_eq!(operation, "list")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
