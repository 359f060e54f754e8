use std::sync::Arc;

use object_store::ObjectStore;
use tracing::info;

use crate::config::PipelineConfig;
use crate::core::aws::load_sdk_config;
use crate::core::storage::{BucketStore, S3Presigner, UrlPresigner};
use crate::core::tts::{AwsPollySynthesizer, SpeechSynthesizer};
use crate::errors::AppResult;
use crate::handlers::{IngestHandler, UrlSigner};

/// Process-wide state shared by every request.
///
/// Service clients are built once here and injected into the handlers.
pub struct AppState {
    pub config: PipelineConfig,
    pub ingest: IngestHandler,
    pub signer: UrlSigner,
}

impl AppState {
    /// Build AWS-backed clients from `config`.
    pub async fn new(config: PipelineConfig) -> AppResult<Arc<Self>> {
        let sdk_config = load_sdk_config(&config.aws).await;

        let bucket = BucketStore::from_config(&config)?;
        let synthesizer =
            AwsPollySynthesizer::from_sdk_config(&sdk_config, config.polly_config())?;
        let presigner = S3Presigner::from_sdk_config(
            &sdk_config,
            config.bucket_name.clone(),
            config.aws.s3_endpoint.as_deref(),
        );

        info!(
            bucket = %config.bucket_name,
            input_prefix = %config.input_prefix,
            output_prefix = %config.output_prefix,
            voice = %config.voice_id,
            format = %config.output_format,
            "Application state initialized"
        );

        Ok(Self::assemble(
            config,
            bucket,
            Arc::new(synthesizer),
            Arc::new(presigner),
        ))
    }

    /// Build state around injected services.
    pub fn from_parts(
        config: PipelineConfig,
        store: Arc<dyn ObjectStore>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        presigner: Arc<dyn UrlPresigner>,
    ) -> Arc<Self> {
        let bucket = BucketStore::new(config.bucket_name.clone(), store);
        Self::assemble(config, bucket, synthesizer, presigner)
    }

    fn assemble(
        config: PipelineConfig,
        bucket: BucketStore,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        presigner: Arc<dyn UrlPresigner>,
    ) -> Arc<Self> {
        let keys = config.object_keys();

        let ingest = IngestHandler::new(
            bucket,
            keys.clone(),
            synthesizer,
            config.default_voice(),
            config.output_format,
        );
        let signer = UrlSigner::new(
            presigner,
            keys,
            config.bucket_name.clone(),
            config.voice_id.clone(),
            config.url_expiry(),
        );

        Arc::new(Self {
            config,
            ingest,
            signer,
        })
    }
}
