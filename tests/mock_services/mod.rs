//! In-process stand-ins for Amazon Polly and the S3 presigner.
//!
//! Object storage uses `object_store::memory::InMemory` directly.

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};

use docspeak::core::storage::{PresignError, UrlPresigner, VOICE_METADATA_KEY};
use docspeak::core::tts::{
    PollyOutputFormat, PollyVoice, SpeechSynthesizer, SynthesisError, SynthesisResult,
};
use docspeak::{AppState, PipelineConfig};

pub const BUCKET: &str = "docs";

/// One recorded synthesis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisCall {
    pub text: String,
    pub voice: String,
    pub format: PollyOutputFormat,
}

/// Synthesizer that records requests and returns deterministic audio.
///
/// Text containing the configured marker fails with a provider error.
#[derive(Default)]
pub struct MockSynthesizer {
    calls: Mutex<Vec<SynthesisCall>>,
    fail_marker: Option<String>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_marker: Some(marker.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<SynthesisCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Audio the mock returns for `text` spoken by `voice`.
    pub fn audio_for(text: &str, voice: &str) -> Bytes {
        Bytes::from(format!("AUDIO[{voice}]{text}"))
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &PollyVoice,
        output_format: PollyOutputFormat,
    ) -> SynthesisResult<Bytes> {
        self.calls.lock().unwrap().push(SynthesisCall {
            text: text.to_string(),
            voice: voice.to_string(),
            format: output_format,
        });

        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(SynthesisError::ProviderError(
                    "ThrottlingException: Rate exceeded".to_string(),
                ));
            }
        }

        Ok(Self::audio_for(text, voice.as_str()))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Presigner producing readable fake URLs.
#[derive(Default)]
pub struct MockPresigner {
    put_calls: AtomicUsize,
    get_calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockPresigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let presigner = Self::default();
        presigner.fail.store(true, Ordering::Relaxed);
        presigner
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::Relaxed)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), PresignError> {
        if self.fail.load(Ordering::Relaxed) {
            Err(PresignError::Signing("no credentials".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UrlPresigner for MockPresigner {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        voice: &str,
        expires_in: Duration,
    ) -> Result<String, PresignError> {
        self.put_calls.fetch_add(1, Ordering::Relaxed);
        self.check()?;
        Ok(format!(
            "https://{BUCKET}.s3.test/{key}?method=PUT&content-type={content_type}&voice={voice}&expires={}",
            expires_in.as_secs()
        ))
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, PresignError> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        self.check()?;
        Ok(format!(
            "https://{BUCKET}.s3.test/{key}?method=GET&expires={}",
            expires_in.as_secs()
        ))
    }
}

/// Configuration for bucket `docs` plus the given variables.
pub fn test_config(vars: &[(&str, &str)]) -> PipelineConfig {
    let mut env: HashMap<String, String> = HashMap::new();
    env.insert("BUCKET_NAME".to_string(), BUCKET.to_string());
    for (name, value) in vars {
        env.insert(name.to_string(), value.to_string());
    }
    PipelineConfig::from_lookup(move |name| env.get(name).cloned()).unwrap()
}

/// Everything a test needs to drive and inspect the pipeline.
pub struct TestHarness {
    pub store: Arc<InMemory>,
    pub synthesizer: Arc<MockSynthesizer>,
    pub presigner: Arc<MockPresigner>,
    pub state: Arc<AppState>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with(test_config(&[]), MockSynthesizer::new(), MockPresigner::new())
    }

    pub fn with(
        config: PipelineConfig,
        synthesizer: MockSynthesizer,
        presigner: MockPresigner,
    ) -> Self {
        let store = Arc::new(InMemory::new());
        let synthesizer = Arc::new(synthesizer);
        let presigner = Arc::new(presigner);
        let state = AppState::from_parts(
            config,
            store.clone(),
            synthesizer.clone(),
            presigner.clone(),
        );
        Self {
            store,
            synthesizer,
            presigner,
            state,
        }
    }

    pub async fn put(&self, key: &str, body: impl Into<Bytes>) {
        self.store
            .put(&ObjectPath::parse(key).unwrap(), PutPayload::from(body.into()))
            .await
            .unwrap();
    }

    pub async fn put_with_voice(&self, key: &str, body: impl Into<Bytes>, voice: &'static str) {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::Metadata(VOICE_METADATA_KEY.into()), voice.into());
        self.store
            .put_opts(
                &ObjectPath::parse(key).unwrap(),
                PutPayload::from(body.into()),
                PutOptions {
                    attributes,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    /// Body and content type of `key`, or `None` if it does not exist.
    pub async fn object(&self, key: &str) -> Option<(Bytes, Option<String>)> {
        let result = self.store.get(&ObjectPath::parse(key).unwrap()).await.ok()?;
        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| AsRef::<str>::as_ref(value).to_string());
        let body = result.bytes().await.unwrap();
        Some((body, content_type))
    }
}
