//! Document ingest: S3 object-created notifications to synthesized audio.
//!
//! Each record of a notification is processed on its own, in order:
//!
//! 1. decode the URL-encoded key
//! 2. skip keys outside the input prefix or with an unsupported extension
//! 3. read the object
//! 4. resolve the voice from the `voice` metadata tag, else the default
//! 5. extract text on the blocking pool
//! 6. synthesize
//! 7. write the audio under the output prefix
//!
//! A failure at any step ends processing for that record only. The report
//! lists one outcome per record; its status is always `ok`.

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, extract::State};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::core::extract::{DocumentFormat, EXTRACTION_TIMEOUT, extract_format};
use crate::core::storage::{BucketStore, MetadataError, ObjectKeys, decode_key};
use crate::core::tts::{PollyOutputFormat, PollyVoice, SpeechSynthesizer};
use crate::state::AppState;

// =============================================================================
// Event payload
// =============================================================================

/// S3 event notification document.
///
/// Only the fields the pipeline reads are modelled. A document without
/// `Records` is an empty batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Object {
    /// URL-encoded, with spaces as `+`
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl S3EventRecord {
    /// An `ObjectCreated:Put` record for `key` (already URL-encoded) in `bucket`.
    pub fn object_created(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            event_name: Some("ObjectCreated:Put".to_string()),
            s3: S3Entity {
                bucket: S3Bucket {
                    name: bucket.into(),
                },
                object: S3Object {
                    key: key.into(),
                    size: None,
                },
            },
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// Step at which a record failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decode,
    Read,
    Extract,
    Synthesize,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Written {
        output_key: String,
        audio_bytes: usize,
        voice: String,
    },
    Skipped {
        reason: String,
    },
    Failed {
        stage: Stage,
        error: String,
    },
}

impl Outcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    fn failed(stage: Stage, error: impl ToString) -> Self {
        Self::Failed {
            stage,
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectOutcome {
    /// Decoded key, or the raw key when decoding failed
    pub key: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub status: &'static str,
    pub outcomes: Vec<ObjectOutcome>,
}

impl IngestReport {
    pub fn written(&self) -> impl Iterator<Item = &ObjectOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Written { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &ObjectOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed { .. }))
    }
}

// =============================================================================
// Handler
// =============================================================================

/// Converts notified documents into audio objects.
pub struct IngestHandler {
    bucket: BucketStore,
    keys: ObjectKeys,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    default_voice: PollyVoice,
    output_format: PollyOutputFormat,
    extraction_timeout: Duration,
}

impl IngestHandler {
    pub fn new(
        bucket: BucketStore,
        keys: ObjectKeys,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        default_voice: PollyVoice,
        output_format: PollyOutputFormat,
    ) -> Self {
        Self {
            bucket,
            keys,
            synthesizer,
            default_voice,
            output_format,
            extraction_timeout: EXTRACTION_TIMEOUT,
        }
    }

    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    /// Process every record of `event` in order.
    pub async fn handle(&self, event: &S3Event) -> IngestReport {
        let mut outcomes = Vec::with_capacity(event.records.len());
        for record in &event.records {
            outcomes.push(self.process_record(record).await);
        }

        let report = IngestReport {
            status: "ok",
            outcomes,
        };
        info!(
            records = report.outcomes.len(),
            written = report.written().count(),
            failed = report.failed().count(),
            "Ingest batch complete"
        );
        report
    }

    async fn process_record(&self, record: &S3EventRecord) -> ObjectOutcome {
        let raw_key = &record.s3.object.key;
        let key = match decode_key(raw_key) {
            Ok(key) => key,
            Err(e) => {
                warn!(raw_key = %raw_key, error = %e, "Failed to decode object key");
                return ObjectOutcome {
                    key: raw_key.clone(),
                    outcome: Outcome::failed(Stage::Decode, e),
                };
            }
        };

        let outcome = self
            .process_object(&record.s3.bucket.name, &key)
            .instrument(info_span!("ingest", key = %key))
            .await;

        ObjectOutcome { key, outcome }
    }

    async fn process_object(&self, bucket: &str, key: &str) -> Outcome {
        if bucket != self.bucket.bucket() {
            info!(bucket = %bucket, "Skipping object from another bucket");
            return Outcome::skipped(format!("bucket {bucket} is not {}", self.bucket.bucket()));
        }

        let Some(format) = self.keys.input_format(key) else {
            info!("Skipping key");
            return Outcome::skipped(format!(
                "not a supported document under {}",
                self.keys.input_prefix()
            ));
        };

        let bytes = match self.bucket.read(key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(stage = "read", error = %e, "Failed to read object");
                return Outcome::failed(Stage::Read, e);
            }
        };

        let voice = self.resolve_voice(key).await;

        let text = match self.extract(bytes, format).await {
            Ok(text) => text,
            Err(e) => {
                error!(stage = "extract", format = %format, error = %e, "Failed to extract text");
                return Outcome::failed(Stage::Extract, e);
            }
        };

        let audio = match self
            .synthesizer
            .synthesize(&text, &voice, self.output_format)
            .await
        {
            Ok(audio) => audio,
            Err(e) => {
                error!(
                    stage = "synthesize",
                    provider = self.synthesizer.provider_name(),
                    voice = %voice,
                    error = %e,
                    "Failed to synthesize speech"
                );
                return Outcome::failed(Stage::Synthesize, e);
            }
        };

        let output_key = self.keys.output_key_for(key);
        let audio_bytes = audio.len();
        if let Err(e) = self
            .bucket
            .write(&output_key, audio, self.output_format.mime_type())
            .await
        {
            error!(stage = "write", output_key = %output_key, error = %e, "Failed to write audio");
            return Outcome::failed(Stage::Write, e);
        }

        info!(output_key = %output_key, voice = %voice, audio_bytes, "Wrote audio");
        Outcome::Written {
            output_key,
            audio_bytes,
            voice: voice.to_string(),
        }
    }

    /// Voice tag of the object, or the default voice when absent or unreadable.
    async fn resolve_voice(&self, key: &str) -> PollyVoice {
        match self.bucket.voice_override(key).await {
            Ok(Some(voice)) if PollyVoice::is_valid_id(&voice) => {
                PollyVoice::from_str_or_default(&voice)
            }
            Ok(Some(voice)) => {
                warn!(voice = %voice, "Ignoring malformed voice metadata");
                self.default_voice.clone()
            }
            Ok(None) => self.default_voice.clone(),
            Err(MetadataError::NotFound) => {
                debug!("Object metadata not found, using default voice");
                self.default_voice.clone()
            }
            Err(e @ MetadataError::Unreachable(_)) => {
                warn!(error = %e, "Metadata lookup failed, using default voice");
                self.default_voice.clone()
            }
        }
    }

    async fn extract(&self, bytes: Bytes, format: DocumentFormat) -> Result<String, String> {
        let task = tokio::task::spawn_blocking(move || extract_format(&bytes, format));

        match tokio::time::timeout(self.extraction_timeout, task).await {
            Ok(Ok(result)) => result.map_err(|e| e.to_string()),
            Ok(Err(e)) => Err(format!("extraction task failed: {e}")),
            Err(_) => Err(format!(
                "extraction timed out after {}s",
                self.extraction_timeout.as_secs()
            )),
        }
    }
}

/// `POST /events/s3`
///
/// Always answers 200; per-object results are in the body.
pub async fn s3_event_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<S3Event>,
) -> Json<IngestReport> {
    Json(state.ingest.handle(&event).await)
}
