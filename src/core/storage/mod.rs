//! Bucket access for the pipeline.
//!
//! [`BucketStore`] wraps an injected [`ObjectStore`] so the ingest handler can
//! run against S3 in production and `InMemory` in tests. Presigned URLs are
//! produced separately by [`presign`], since they need the S3 SDK signer.

pub mod keys;
pub mod presign;

use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, Error as ObjectStoreError, GetOptions, ObjectStore, PutOptions,
    PutPayload,
};
use thiserror::Error;
use tracing::debug;

use crate::config::PipelineConfig;

pub use keys::{KeyError, KeyPrefix, ObjectKeys, base_name, decode_key, extension, stem};
pub use presign::{PresignError, S3Presigner, UrlPresigner};

/// User metadata tag carrying a per-object voice override.
pub const VOICE_METADATA_KEY: &str = "voice";

/// Errors reading or writing objects.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is misconfigured: {0}")]
    Configuration(String),

    #[error("invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage request for {key} failed: {source}")]
    Backend {
        key: String,
        #[source]
        source: ObjectStoreError,
    },
}

/// Why the voice tag of an object could not be read.
///
/// Both kinds are recoverable: callers fall back to the default voice.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("object not found")]
    NotFound,

    #[error("metadata lookup failed: {0}")]
    Unreachable(String),
}

/// The pipeline's bucket.
#[derive(Debug, Clone)]
pub struct BucketStore {
    bucket: String,
    store: Arc<dyn ObjectStore>,
}

impl BucketStore {
    pub fn new(bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket: bucket.into(),
            store,
        }
    }

    /// Build an S3-backed store from the pipeline configuration.
    ///
    /// Settings absent from the config are taken from the standard `AWS_*`
    /// environment variables.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, StorageError> {
        let aws = &config.aws;
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket_name);

        if let Some(region) = &aws.region {
            builder = builder.with_region(region);
        }
        if let Some(access_key) = &aws.access_key_id {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = &aws.secret_access_key {
            builder = builder.with_secret_access_key(secret_key);
        }
        if let Some(token) = &aws.session_token {
            builder = builder.with_token(token);
        }
        if let Some(endpoint) = &aws.s3_endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Configuration(e.to_string()))?;

        Ok(Self::new(config.bucket_name.clone(), Arc::new(store)))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Read the full contents of `key`.
    pub async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = object_path(key)?;
        let result = self.store.get(&path).await.map_err(|e| backend(key, e))?;
        result.bytes().await.map_err(|e| backend(key, e))
    }

    /// The voice tag of `key`, if one is set and non-blank.
    pub async fn voice_override(&self, key: &str) -> Result<Option<String>, MetadataError> {
        let path =
            object_path(key).map_err(|e| MetadataError::Unreachable(e.to_string()))?;

        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = match self.store.get_opts(&path, options).await {
            Ok(result) => result,
            Err(ObjectStoreError::NotFound { .. }) => return Err(MetadataError::NotFound),
            Err(e) => return Err(MetadataError::Unreachable(e.to_string())),
        };

        let voice = result
            .attributes
            .get(&Attribute::Metadata(VOICE_METADATA_KEY.into()))
            .map(|value| {
                let value: &str = value.as_ref();
                value.trim().to_string()
            })
            .filter(|value| !value.is_empty());

        Ok(voice)
    }

    /// Write `body` to `key` with the given content type, replacing any existing object.
    pub async fn write(
        &self,
        key: &str,
        body: Bytes,
        content_type: &'static str,
    ) -> Result<(), StorageError> {
        let path = object_path(key)?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let size = body.len();
        self.store
            .put_opts(&path, PutPayload::from(body), options)
            .await
            .map_err(|e| backend(key, e))?;

        debug!(bucket = %self.bucket, key = %key, size, content_type, "Object written");
        Ok(())
    }
}

fn object_path(key: &str) -> Result<ObjectPath, StorageError> {
    ObjectPath::parse(key).map_err(|e| StorageError::InvalidKey {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn backend(key: &str, source: ObjectStoreError) -> StorageError {
    match source {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
        source => StorageError::Backend {
            key: key.to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn store() -> (Arc<InMemory>, BucketStore) {
        let memory = Arc::new(InMemory::new());
        let bucket = BucketStore::new("test-bucket", memory.clone());
        (memory, bucket)
    }

    async fn put_with_voice(memory: &InMemory, key: &str, voice: &'static str) {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::Metadata(VOICE_METADATA_KEY.into()), voice.into());
        memory
            .put_opts(
                &ObjectPath::parse(key).unwrap(),
                PutPayload::from_static(b"hello"),
                PutOptions {
                    attributes,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_read_existing_and_missing() {
        let (memory, bucket) = store();
        memory
            .put(
                &ObjectPath::parse("input/a.txt").unwrap(),
                PutPayload::from_static(b"abc"),
            )
            .await
            .unwrap();

        assert_eq!(bucket.read("input/a.txt").await.unwrap(), Bytes::from_static(b"abc"));
        assert!(matches!(
            bucket.read("input/missing.txt").await,
            Err(StorageError::NotFound(key)) if key == "input/missing.txt"
        ));
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected() {
        let (_, bucket) = store();
        assert!(matches!(
            bucket.read("input/../secret.txt").await,
            Err(StorageError::InvalidKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_voice_override() {
        let (memory, bucket) = store();
        put_with_voice(&memory, "input/tagged.txt", "Matthew").await;
        put_with_voice(&memory, "input/blank.txt", "  ").await;
        memory
            .put(
                &ObjectPath::parse("input/untagged.txt").unwrap(),
                PutPayload::from_static(b"x"),
            )
            .await
            .unwrap();

        assert_eq!(
            bucket.voice_override("input/tagged.txt").await.unwrap(),
            Some("Matthew".to_string())
        );
        assert_eq!(bucket.voice_override("input/blank.txt").await.unwrap(), None);
        assert_eq!(bucket.voice_override("input/untagged.txt").await.unwrap(), None);
        assert!(matches!(
            bucket.voice_override("input/gone.txt").await,
            Err(MetadataError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_write_sets_content_type_and_overwrites() {
        let (memory, bucket) = store();
        bucket
            .write("output/a.mp3", Bytes::from_static(b"first"), "audio/mpeg")
            .await
            .unwrap();
        bucket
            .write("output/a.mp3", Bytes::from_static(b"second"), "audio/mpeg")
            .await
            .unwrap();

        let result = memory
            .get(&ObjectPath::parse("output/a.mp3").unwrap())
            .await
            .unwrap();
        assert_eq!(
            result
                .attributes
                .get(&Attribute::ContentType)
                .map(|v| AsRef::<str>::as_ref(v).to_string()),
            Some("audio/mpeg".to_string())
        );
        assert_eq!(result.bytes().await.unwrap(), Bytes::from_static(b"second"));
    }
}
