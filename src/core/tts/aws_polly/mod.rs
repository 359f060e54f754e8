//! Amazon Polly synthesis.
//!
//! Uses the AWS SDK for Rust to call Polly's SynthesizeSpeech API. The SDK
//! handles request signing and credential resolution.
//!
//! # Authentication
//!
//! Credentials are resolved once when the shared SDK configuration is built
//! (see [`crate::core::aws::load_sdk_config`]):
//! 1. `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` from the pipeline config
//! 2. The default chain: environment, `~/.aws/credentials`, IAM roles
//!
//! # Example
//!
//! ```rust,ignore
//! use docspeak::core::tts::{SpeechSynthesizer, AwsPollyConfig, AwsPollySynthesizer};
//! use docspeak::core::tts::aws_polly::{PollyOutputFormat, PollyVoice};
//!
//! let sdk_config = aws_config::load_from_env().await;
//! let polly = AwsPollySynthesizer::from_sdk_config(&sdk_config, AwsPollyConfig::default())?;
//! let mp3 = polly
//!     .synthesize("Hello from Amazon Polly!", &PollyVoice::Joanna, PollyOutputFormat::Mp3)
//!     .await?;
//! ```

mod config;
mod provider;


pub use config::{
    AwsPollyConfig, MAX_TEXT_LENGTH, MAX_VOICE_ID_LENGTH, PollyEngine, PollyOutputFormat,
    PollyVoice,
};
pub use provider::AwsPollySynthesizer;
