//! Asset discovery: from the key of a COG to the full set of companion files

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::constants::{required_roles, role_table, AssetRole};
use crate::error::{Result, StacError, StorageError};
use crate::storage::{ObjectStore, S3Url};

/// Storage locator of every file that makes up one item, keyed by role.
pub type AssetKeyMap = BTreeMap<AssetRole, String>;

/// Role whose suffix matches `filename`, if any. Suffixes are disjoint, so
/// at most one role can match.
pub fn classify(filename: &str) -> Option<AssetRole> {
    role_table()
        .iter()
        .find(|spec| spec.role.matches_file(filename))
        .map(|spec| spec.role)
}

/// Required roles absent from `matched`, in role order.
pub fn missing_roles<'a>(
    required: &BTreeSet<AssetRole>,
    matched: impl IntoIterator<Item = &'a AssetRole>,
) -> Vec<AssetRole> {
    let matched: BTreeSet<AssetRole> = matched.into_iter().copied().collect();
    required.difference(&matched).copied().collect()
}

/// Whether `filename` belongs to the item named `stem`: the stem must be
/// followed by `_` or `.`, so tile `..._00000041` is not a companion of
/// `..._0000004`.
pub fn shares_stem(filename: &str, stem: &str) -> bool {
    filename
        .strip_prefix(stem)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == '_' || c == '.')
}

/// Whether `destination` needs a fresh copy of `source`: it does when the
/// destination is absent or its fingerprint or size differ.
pub fn should_copy<S: ObjectStore>(
    store: &S,
    source: &S3Url,
    destination: &S3Url,
) -> Result<bool, StorageError> {
    let source_meta = store.head(source)?;
    match store.head(destination) {
        Ok(dest_meta) => Ok(dest_meta != source_meta),
        Err(e) if e.is_not_found() => Ok(true),
        Err(e) => Err(e),
    }
}

pub struct AssetResolver<S> {
    store: S,
}

impl<S: ObjectStore> AssetResolver<S> {
    pub fn new(store: S) -> Self {
        AssetResolver { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Locate the companion assets of the COG at `primary_key`.
    ///
    /// With a `destination_prefix`, every matched file is staged under that
    /// prefix (copied only when it changed) and the returned locators point
    /// at the staged copies. Nothing is copied unless all required roles are
    /// present.
    pub fn resolve(&self, primary_key: &str, destination_prefix: Option<&str>) -> Result<AssetKeyMap> {
        let primary = S3Url::parse(primary_key)?;
        let destination = destination_prefix.map(S3Url::parse_prefix).transpose()?;

        let primary_name = primary.filename().to_string();
        let cog = AssetRole::Cog.spec();
        let stem = match cog.strip_suffix(&primary_name) {
            Some(stem) if classify(&primary_name) == Some(AssetRole::Cog) => stem,
            _ => {
                return Err(StacError::invalid_key(
                    primary_key,
                    format!("expected a file ending in {}", cog.suffixes().join(" or ")),
                ))
            }
        };

        self.store.head(&primary).map_err(|e| match e {
            StorageError::NotFound { url } => StacError::NotFound(url),
            other => StacError::Storage(other),
        })?;

        let prefix = primary.parent_prefix();
        let siblings = self.store.list(&primary.bucket, &prefix)?;
        debug!("Found {} objects under s3://{}/{}", siblings.len(), primary.bucket, prefix);

        let mut matched: BTreeMap<AssetRole, S3Url> = BTreeMap::new();
        for key in siblings {
            let sibling = S3Url::new(primary.bucket.clone(), key);
            let filename = sibling.filename();
            if !shares_stem(filename, stem) {
                continue;
            }
            let Some(role) = classify(filename) else {
                debug!("Ignoring {}", sibling);
                continue;
            };
            if let Some(existing) = matched.get(&role) {
                return Err(StacError::AmbiguousAsset {
                    role,
                    first: existing.to_string(),
                    second: sibling.to_string(),
                });
            }
            debug!("Matched {} as {}", sibling, role);
            matched.insert(role, sibling);
        }

        let missing = missing_roles(&required_roles(), matched.keys());
        if !missing.is_empty() {
            return Err(StacError::IncompleteAssetSet { missing });
        }

        let mut asset_keys = AssetKeyMap::new();
        for (role, source) in matched {
            let location = match &destination {
                Some(dest_prefix) => {
                    let target = dest_prefix.join(source.filename());
                    self.stage(&source, &target)?;
                    target
                }
                None => source,
            };
            asset_keys.insert(role, location.to_string());
        }

        info!("Resolved {} assets for {}", asset_keys.len(), primary_key);
        Ok(asset_keys)
    }

    fn stage(&self, source: &S3Url, target: &S3Url) -> Result<()> {
        if should_copy(&self.store, source, target)? {
            info!("Copying {} to {}", source, target);
            self.store.copy(source, target)?;
        } else {
            debug!("Skipping {}: {} is up to date", source, target);
        }
        Ok(())
    }
}
