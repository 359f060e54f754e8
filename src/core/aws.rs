//! Shared AWS SDK configuration.
//!
//! Polly and the S3 presigner are built from one [`SdkConfig`] so they resolve
//! region and credentials identically.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use tracing::debug;

use crate::config::AwsSettings;

/// Provider name attached to credentials taken from the pipeline config.
const CREDENTIALS_PROVIDER_NAME: &str = "docspeak";

/// Load the SDK configuration, preferring explicit settings over the default chain.
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }

    if let (Some(access_key), Some(secret_key)) =
        (&settings.access_key_id, &settings.secret_access_key)
    {
        debug!("Using explicit AWS credentials from configuration");
        loader = loader.credentials_provider(Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            settings.session_token.clone(),
            None,
            CREDENTIALS_PROVIDER_NAME,
        ));
    } else {
        debug!("Using AWS default credential chain");
    }

    loader.load().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_explicit_region_and_credentials() {
        let settings = AwsSettings {
            region: Some("eu-central-1".to_string()),
            access_key_id: Some("AKIATEST".to_string()),
            secret_access_key: Some("secret".to_string()),
            session_token: None,
            s3_endpoint: None,
        };

        let sdk_config = load_sdk_config(&settings).await;
        assert_eq!(
            sdk_config.region().map(|r| r.as_ref()),
            Some("eu-central-1")
        );
        assert!(sdk_config.credentials_provider().is_some());
    }
}
