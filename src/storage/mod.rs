//! Object storage seam
//!
//! The resolver only needs metadata lookups, single-level listing and
//! server-side copies, plus uploads of generated records, so that is all
//! the [`ObjectStore`] trait exposes.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::error::{Result, StacError, StorageError};

pub mod memory;
pub mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

pub const S3_SCHEME: &str = "s3://";

/// Parsed `s3://bucket/key` locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct S3Url {
    pub bucket: String,
    pub key: String,
}

impl S3Url {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        S3Url {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse an object locator. Both bucket and key must be present.
    pub fn parse(locator: &str) -> Result<Self> {
        let url = Self::parse_prefix(locator)?;
        if url.key.is_empty() {
            return Err(StacError::invalid_key(locator, "missing object key"));
        }
        Ok(url)
    }

    /// Parse a prefix locator; the key part may be empty (bucket root).
    pub fn parse_prefix(locator: &str) -> Result<Self> {
        let rest = locator
            .strip_prefix(S3_SCHEME)
            .ok_or_else(|| StacError::invalid_key(locator, format!("expected {S3_SCHEME} scheme")))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(StacError::invalid_key(locator, "missing bucket"));
        }
        Ok(S3Url::new(bucket, key))
    }

    /// Final path component of the key.
    pub fn filename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Key of the containing "directory", with a trailing slash, or empty at
    /// the bucket root.
    pub fn parent_prefix(&self) -> String {
        match self.key.rfind('/') {
            Some(idx) => self.key[..=idx].to_string(),
            None => String::new(),
        }
    }

    /// Locator for `filename` placed under this prefix. Leading and trailing
    /// slashes on the prefix are ignored.
    pub fn join(&self, filename: &str) -> S3Url {
        let dir = self.key.trim_matches('/');
        let key = if dir.is_empty() {
            filename.to_string()
        } else {
            format!("{dir}/{filename}")
        };
        S3Url::new(self.bucket.clone(), key)
    }

    /// GDAL virtual filesystem path for this object.
    pub fn to_vsi_path(&self) -> String {
        format!("/vsis3/{}/{}", self.bucket, self.key)
    }
}

impl fmt::Display for S3Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", S3_SCHEME, self.bucket, self.key)
    }
}

/// Change-detection metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Content fingerprint (ETag).
    pub etag: String,
    pub size: u64,
}

/// Minimal blob store used by the resolver and the CLI writers.
///
/// Implementations block the caller; timeouts and retries are their own
/// business. `head` must report a missing object as
/// [`StorageError::NotFound`] so callers can tell it apart from other
/// failures.
pub trait ObjectStore {
    fn head(&self, url: &S3Url) -> Result<ObjectMeta, StorageError>;

    /// Keys directly under `prefix` (no recursion into deeper "directories").
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;

    fn copy(&self, source: &S3Url, destination: &S3Url) -> Result<(), StorageError>;

    fn put(&self, url: &S3Url, body: Vec<u8>) -> Result<(), StorageError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn head(&self, url: &S3Url) -> Result<ObjectMeta, StorageError> {
        (**self).head(url)
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        (**self).list(bucket, prefix)
    }

    fn copy(&self, source: &S3Url, destination: &S3Url) -> Result<(), StorageError> {
        (**self).copy(source, destination)
    }

    fn put(&self, url: &S3Url, body: Vec<u8>) -> Result<(), StorageError> {
        (**self).put(url, body)
    }
}

/// Where a generated record is written: a local file or an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Local(PathBuf),
    S3(S3Url),
}

impl Destination {
    pub fn parse(destination: &str) -> Result<Self> {
        if destination.starts_with(S3_SCHEME) {
            Ok(Destination::S3(S3Url::parse(destination)?))
        } else {
            Ok(Destination::Local(PathBuf::from(destination)))
        }
    }

    /// Write `body`. Local parent directories are created; `store` is only
    /// opened for object destinations.
    pub fn write<S, F>(&self, body: Vec<u8>, store: F) -> Result<()>
    where
        S: ObjectStore,
        F: FnOnce() -> Result<S, StorageError>,
    {
        match self {
            Destination::Local(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, body)?;
            }
            Destination::S3(url) => store()?.put(url, body)?,
        }
        info!("Wrote {}", self);
        Ok(())
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Local(path) => write!(f, "{}", path.display()),
            Destination::S3(url) => write!(f, "{url}"),
        }
    }
}

/// Keep only keys that sit directly under `prefix`.
pub(crate) fn is_direct_child(prefix: &str, key: &str) -> bool {
    key.strip_prefix(prefix)
        .map(|rest| !rest.is_empty() && !rest.contains('/'))
        .unwrap_or(false)
}
