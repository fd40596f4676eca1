//! AWS S3 backed [`ObjectStore`]
//!
//! The SDK is async; this store owns a current-thread runtime and blocks on
//! each request so the rest of the crate stays synchronous.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::MetadataDirective;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use super::{is_direct_child, ObjectMeta, ObjectStore, S3Url};
use crate::error::StorageError;

/// Characters escaped in a CopyObject source key; `/` separates segments.
const COPY_SOURCE_KEY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// `bucket/key` with the key URL-encoded, as CopyObject expects.
pub(crate) fn copy_source(url: &S3Url) -> String {
    format!("{}/{}", url.bucket, utf8_percent_encode(&url.key, COPY_SOURCE_KEY))
}

pub struct S3Store {
    client: aws_sdk_s3::Client,
    runtime: tokio::runtime::Runtime,
}

impl S3Store {
    /// Build a client from the default AWS credential chain. An explicit
    /// endpoint targets S3-compatible services (MinIO, localstack).
    pub fn from_env(endpoint_url: Option<&str>, force_path_style: bool) -> Result<Self, StorageError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::service("init", format!("tokio runtime init failed: {e}")))?;

        let cfg = runtime.block_on(aws_config::load_defaults(aws_config::BehaviorVersion::latest()));
        let mut builder = aws_sdk_s3::config::Builder::from(&cfg);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url);
        }
        if force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(S3Store {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            runtime,
        })
    }
}

impl ObjectStore for S3Store {
    fn head(&self, url: &S3Url) -> Result<ObjectMeta, StorageError> {
        let result = self.runtime.block_on(
            self.client
                .head_object()
                .bucket(&url.bucket)
                .key(&url.key)
                .send(),
        );

        match result {
            Ok(output) => Ok(ObjectMeta {
                etag: output.e_tag().unwrap_or_default().to_string(),
                size: output.content_length().unwrap_or(0).max(0) as u64,
            }),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                Err(StorageError::NotFound {
                    url: url.to_string(),
                })
            }
            Err(e) => Err(StorageError::service("head_object", format!("{url}: {e:?}"))),
        }
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.runtime.block_on(async {
            let mut keys = Vec::new();
            let mut token: Option<String> = None;
            loop {
                let mut req = self
                    .client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(prefix)
                    .delimiter("/");
                if let Some(t) = token.as_deref() {
                    req = req.continuation_token(t);
                }
                let resp = req.send().await.map_err(|e| {
                    StorageError::service("list_objects_v2", format!("s3://{bucket}/{prefix}: {e:?}"))
                })?;

                for obj in resp.contents() {
                    if let Some(key) = obj.key() {
                        if is_direct_child(prefix, key) {
                            keys.push(key.to_string());
                        }
                    }
                }

                if resp.is_truncated().unwrap_or(false) {
                    token = resp.next_continuation_token().map(str::to_string);
                    if token.is_none() {
                        break;
                    }
                } else {
                    break;
                }
            }
            debug!("Listed {} objects under s3://{}/{}", keys.len(), bucket, prefix);
            Ok(keys)
        })
    }

    fn copy(&self, source: &S3Url, destination: &S3Url) -> Result<(), StorageError> {
        self.runtime
            .block_on(
                self.client
                    .copy_object()
                    .copy_source(copy_source(source))
                    .bucket(&destination.bucket)
                    .key(&destination.key)
                    .metadata_directive(MetadataDirective::Copy)
                    .send(),
            )
            .map_err(|e| StorageError::service("copy_object", format!("{source} -> {destination}: {e:?}")))?;
        Ok(())
    }

    fn put(&self, url: &S3Url, body: Vec<u8>) -> Result<(), StorageError> {
        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(&url.bucket)
                    .key(&url.key)
                    .body(ByteStream::from(body))
                    .send(),
            )
            .map_err(|e| StorageError::service("put_object", format!("{url}: {e:?}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_source_encodes_key() {
        let url = S3Url::new("maap-ops-workspace", "boreal/run 1/a+b_ü.tif");
        assert_eq!(copy_source(&url), "maap-ops-workspace/boreal/run%201/a%2Bb_%C3%BC.tif");
    }

    #[test]
    fn test_copy_source_keeps_plain_keys() {
        let url = S3Url::new("b", "test/path/boreal_ht_2020_202501131736787421_0000004.tif");
        assert_eq!(copy_source(&url), "b/test/path/boreal_ht_2020_202501131736787421_0000004.tif");
    }
}
