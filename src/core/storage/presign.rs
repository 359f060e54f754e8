//! Presigned S3 URLs.
//!
//! A presigned URL is a capability for exactly one method on one key until it
//! expires. Upload URLs additionally sign the `content-type` header and the
//! `x-amz-meta-voice` tag, so the client must send both unchanged.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::presigning::PresigningConfig;
use thiserror::Error;
use tracing::debug;

use super::VOICE_METADATA_KEY;

#[derive(Debug, Error)]
pub enum PresignError {
    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("failed to presign request: {0}")]
    Signing(String),
}

/// Issues method-scoped, time-limited URLs for objects in one bucket.
#[async_trait]
pub trait UrlPresigner: Send + Sync {
    /// URL for a single PUT of `key` carrying `content_type` and the voice tag.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        voice: &str,
        expires_in: Duration,
    ) -> Result<String, PresignError>;

    /// URL for GET of `key`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, PresignError>;
}

/// Presigner backed by the AWS SDK S3 client.
#[derive(Debug, Clone)]
pub struct S3Presigner {
    client: S3Client,
    bucket: String,
}

impl S3Presigner {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build the S3 client from shared SDK config, with an optional endpoint override.
    ///
    /// Custom endpoints (MinIO, LocalStack) are addressed path-style.
    pub fn from_sdk_config(
        sdk_config: &SdkConfig,
        bucket: impl Into<String>,
        endpoint: Option<&str>,
    ) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(S3Client::from_conf(builder.build()), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn presigning_config(expires_in: Duration) -> Result<PresigningConfig, PresignError> {
    PresigningConfig::expires_in(expires_in).map_err(|e| PresignError::InvalidExpiry(e.to_string()))
}

#[async_trait]
impl UrlPresigner for S3Presigner {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        voice: &str,
        expires_in: Duration,
    ) -> Result<String, PresignError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .metadata(VOICE_METADATA_KEY, voice)
            .presigned(presigning_config(expires_in)?)
            .await
            .map_err(|e| PresignError::Signing(e.to_string()))?;

        debug!(bucket = %self.bucket, key = %key, content_type, "Presigned PUT");
        Ok(request.uri().to_string())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, PresignError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config(expires_in)?)
            .await
            .map_err(|e| PresignError::Signing(e.to_string()))?;

        debug!(bucket = %self.bucket, key = %key, "Presigned GET");
        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    fn presigner() -> S3Presigner {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIATEST", "secret", None, None, "test"))
            .build();
        S3Presigner::new(S3Client::from_conf(config), "docs-bucket")
    }

    #[tokio::test]
    async fn test_presign_get_is_scoped_to_key_and_expiry() {
        let url = presigner()
            .presign_get("output/doc.mp3", Duration::from_secs(900))
            .await
            .unwrap();

        assert!(url.starts_with("https://"));
        assert!(url.contains("docs-bucket"));
        assert!(url.contains("/output/doc.mp3?"));
        assert!(url.contains("X-Amz-Expires=900"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_presign_put_signs_upload() {
        let url = presigner()
            .presign_put(
                "input/doc.pdf",
                "application/pdf",
                "Joanna",
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert!(url.contains("/input/doc.pdf?"));
        assert!(url.contains("X-Amz-Expires=60"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_expiry_beyond_one_week_is_rejected() {
        let result = presigner()
            .presign_get("output/doc.mp3", Duration::from_secs(604_801))
            .await;
        assert!(matches!(result, Err(PresignError::InvalidExpiry(_))));
    }
}
