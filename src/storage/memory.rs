//! In-process object store
//!
//! Objects are fingerprinted with a SHA-256 of their content, so a copied
//! object keeps the fingerprint of its source the way a server-side S3 copy
//! keeps its ETag. Used for tests and dry runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use super::{is_direct_child, ObjectMeta, ObjectStore, S3Url};
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    etag: String,
}

#[derive(Debug, Default)]
struct Inner {
    buckets: BTreeSet<String>,
    objects: BTreeMap<(String, String), StoredObject>,
    copies: Vec<(S3Url, S3Url)>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.lock().buckets.insert(bucket.to_string());
    }

    /// Store `body` at `bucket/key`, creating the bucket if needed.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        let body = body.into();
        let mut inner = self.lock();
        inner.buckets.insert(bucket.to_string());
        inner.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                etag: fingerprint(&body),
                body,
            },
        );
    }

    pub fn get(&self, url: &S3Url) -> Option<Vec<u8>> {
        self.lock()
            .objects
            .get(&(url.bucket.clone(), url.key.clone()))
            .map(|o| o.body.clone())
    }

    /// Every copy performed so far, in order.
    pub fn copies(&self) -> Vec<(S3Url, S3Url)> {
        self.lock().copies.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn fingerprint(body: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(body))
}

fn no_such_bucket(operation: &'static str, bucket: &str) -> StorageError {
    StorageError::service(operation, format!("NoSuchBucket: {bucket}"))
}

impl ObjectStore for MemoryStore {
    fn head(&self, url: &S3Url) -> Result<ObjectMeta, StorageError> {
        let inner = self.lock();
        if !inner.buckets.contains(&url.bucket) {
            // S3 answers HEAD on a missing bucket with a bare 404 as well
            return Err(StorageError::NotFound {
                url: url.to_string(),
            });
        }
        inner
            .objects
            .get(&(url.bucket.clone(), url.key.clone()))
            .map(|o| ObjectMeta {
                etag: o.etag.clone(),
                size: o.body.len() as u64,
            })
            .ok_or_else(|| StorageError::NotFound {
                url: url.to_string(),
            })
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let inner = self.lock();
        if !inner.buckets.contains(bucket) {
            return Err(no_such_bucket("list", bucket));
        }
        Ok(inner
            .objects
            .keys()
            .filter(|(b, k)| b == bucket && is_direct_child(prefix, k))
            .map(|(_, k)| k.clone())
            .collect())
    }

    fn copy(&self, source: &S3Url, destination: &S3Url) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if !inner.buckets.contains(&destination.bucket) {
            return Err(no_such_bucket("copy", &destination.bucket));
        }
        let object = inner
            .objects
            .get(&(source.bucket.clone(), source.key.clone()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                url: source.to_string(),
            })?;
        inner
            .objects
            .insert((destination.bucket.clone(), destination.key.clone()), object);
        inner.copies.push((source.clone(), destination.clone()));
        Ok(())
    }

    fn put(&self, url: &S3Url, body: Vec<u8>) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if !inner.buckets.contains(&url.bucket) {
            return Err(no_such_bucket("put", &url.bucket));
        }
        inner.objects.insert(
            (url.bucket.clone(), url.key.clone()),
            StoredObject {
                etag: fingerprint(&body),
                body,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_keeps_fingerprint() {
        let store = MemoryStore::new();
        store.insert("src", "a/x.tif", b"content".to_vec());
        store.create_bucket("dst");

        let src = S3Url::new("src", "a/x.tif");
        let dst = S3Url::new("dst", "x.tif");
        store.copy(&src, &dst).unwrap();

        assert_eq!(store.head(&src).unwrap(), store.head(&dst).unwrap());
        assert_eq!(store.copies().len(), 1);
    }

    #[test]
    fn test_missing_object_is_not_found() {
        let store = MemoryStore::new();
        store.create_bucket("b");
        let err = store.head(&S3Url::new("b", "nope.tif")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_is_single_level() {
        let store = MemoryStore::new();
        store.insert("b", "dir/a.tif", b"1".to_vec());
        store.insert("b", "dir/sub/b.tif", b"2".to_vec());
        store.insert("b", "other/c.tif", b"3".to_vec());
        assert_eq!(store.list("b", "dir/").unwrap(), vec!["dir/a.tif".to_string()]);
    }

    #[test]
    fn test_list_missing_bucket_is_service_error() {
        let store = MemoryStore::new();
        let err = store.list("nope", "dir/").unwrap_err();
        assert!(!err.is_not_found());
    }
}
