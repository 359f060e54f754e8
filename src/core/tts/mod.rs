//! Speech synthesis.
//!
//! The pipeline talks to the speech service through [`SpeechSynthesizer`] so
//! the ingest handler can be exercised without network access. The production
//! implementation is [`AwsPollySynthesizer`].

pub mod aws_polly;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use aws_polly::{
    AwsPollyConfig, AwsPollySynthesizer, MAX_TEXT_LENGTH, PollyEngine, PollyOutputFormat,
    PollyVoice,
};

/// Failures of a single synthesis call.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Text is empty")]
    EmptyText,

    #[error("Text is {len} characters, the limit is {max}")]
    TextTooLong { len: usize, max: usize },

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Audio stream error: {0}")]
    AudioStream(String),
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// Converts text into encoded audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice`, returning the complete audio in `output_format`.
    async fn synthesize(
        &self,
        text: &str,
        voice: &PollyVoice,
        output_format: PollyOutputFormat,
    ) -> SynthesisResult<Bytes>;

    /// Short name used in logs.
    fn provider_name(&self) -> &'static str;
}
