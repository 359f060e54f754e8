//! Amazon Polly synthesizer.
//!
//! Implements [`SpeechSynthesizer`] with the `SynthesizeSpeech` operation of
//! the AWS SDK for Rust. The SDK handles request signing and credential
//! resolution; the client is built once per process and shared.
//!
//! # API Reference
//!
//! - Service: Amazon Polly
//! - Operation: SynthesizeSpeech
//! - Output formats: mp3, ogg_vorbis, pcm
//! - Request limit: 3000 characters of plain text

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use aws_sdk_polly::Client as PollyClient;
use aws_sdk_polly::types::{Engine, OutputFormat, TextType, VoiceId};
use aws_config::SdkConfig;
use bytes::Bytes;
use tracing::{debug, error};

use super::config::{AwsPollyConfig, MAX_TEXT_LENGTH, PollyEngine, PollyOutputFormat, PollyVoice};
use crate::core::tts::{SpeechSynthesizer, SynthesisError, SynthesisResult};

fn engine_to_sdk(engine: PollyEngine) -> Engine {
    match engine {
        PollyEngine::Standard => Engine::Standard,
        PollyEngine::Neural => Engine::Neural,
        PollyEngine::LongForm => Engine::LongForm,
        PollyEngine::Generative => Engine::Generative,
    }
}

fn output_format_to_sdk(format: PollyOutputFormat) -> OutputFormat {
    match format {
        PollyOutputFormat::Mp3 => OutputFormat::Mp3,
        PollyOutputFormat::OggVorbis => OutputFormat::OggVorbis,
        PollyOutputFormat::Pcm => OutputFormat::Pcm,
    }
}

/// Reject text Polly would refuse before spending a request on it.
pub(crate) fn validate_text(text: &str) -> SynthesisResult<()> {
    if text.trim().is_empty() {
        return Err(SynthesisError::EmptyText);
    }
    let len = text.chars().count();
    if len > MAX_TEXT_LENGTH {
        return Err(SynthesisError::TextTooLong {
            len,
            max: MAX_TEXT_LENGTH,
        });
    }
    Ok(())
}

/// Speech synthesizer backed by Amazon Polly.
pub struct AwsPollySynthesizer {
    client: PollyClient,
    config: AwsPollyConfig,
    /// Request counter for log correlation
    request_counter: AtomicU64,
}

impl AwsPollySynthesizer {
    pub fn new(client: PollyClient, config: AwsPollyConfig) -> SynthesisResult<Self> {
        config
            .validate()
            .map_err(SynthesisError::InvalidConfiguration)?;

        Ok(Self {
            client,
            config,
            request_counter: AtomicU64::new(0),
        })
    }

    /// Build the Polly client from a shared AWS SDK configuration.
    pub fn from_sdk_config(sdk_config: &SdkConfig, config: AwsPollyConfig) -> SynthesisResult<Self> {
        Self::new(PollyClient::new(sdk_config), config)
    }

    pub fn engine(&self) -> Option<PollyEngine> {
        self.config.engine
    }
}

#[async_trait]
impl SpeechSynthesizer for AwsPollySynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &PollyVoice,
        output_format: PollyOutputFormat,
    ) -> SynthesisResult<Bytes> {
        validate_text(text)?;

        let request_id = self.request_counter.fetch_add(1, Ordering::Relaxed) + 1;

        debug!(
            request_id = request_id,
            text_len = text.len(),
            voice = %voice,
            format = %output_format,
            "Synthesizing text with Amazon Polly"
        );

        let mut request = self
            .client
            .synthesize_speech()
            .text(text)
            .text_type(TextType::Text)
            .voice_id(VoiceId::from(voice.as_str()))
            .output_format(output_format_to_sdk(output_format));

        if let Some(engine) = self.config.engine {
            request = request.engine(engine_to_sdk(engine));
        }

        for lexicon in &self.config.lexicon_names {
            request = request.lexicon_names(lexicon.clone());
        }

        let response = request.send().await.map_err(|e| {
            error!(request_id = request_id, error = %e, "Polly API error");
            SynthesisError::ProviderError(format!(
                "Polly API error: {}",
                aws_sdk_polly::error::DisplayErrorContext(&e)
            ))
        })?;

        let audio = response.audio_stream.collect().await.map_err(|e| {
            error!(request_id = request_id, error = %e, "Failed to read audio stream");
            SynthesisError::AudioStream(format!("Failed to read audio stream: {e}"))
        })?;

        let bytes = audio.into_bytes();

        debug!(
            request_id = request_id,
            audio_bytes = bytes.len(),
            "Successfully synthesized audio"
        );

        Ok(bytes)
    }

    fn provider_name(&self) -> &'static str {
        "aws-polly"
    }
}
