//! Configuration module for docspeak
//!
//! This module handles pipeline configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use docspeak::config::PipelineConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = PipelineConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config = PipelineConfig::from_file(Path::new("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

mod yaml;

pub use yaml::YamlConfig;

use crate::core::storage::ObjectKeys;
use crate::core::tts::{AwsPollyConfig, PollyEngine, PollyOutputFormat, PollyVoice};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_INPUT_PREFIX: &str = "input/";
pub const DEFAULT_OUTPUT_PREFIX: &str = "output/";
pub const DEFAULT_VOICE_ID: &str = "Joanna";
pub const DEFAULT_URL_EXPIRY_SECS: u64 = 900;
/// Longest lifetime S3 accepts for a SigV4 presigned URL (7 days).
pub const MAX_URL_EXPIRY_SECS: u64 = 604_800;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

fn invalid(name: &'static str, value: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.into(),
        reason: reason.into(),
    }
}

/// AWS connection settings shared by the object store, Polly and the presigner.
///
/// Anything left unset is resolved by the AWS default provider chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// S3-compatible endpoint override (MinIO, LocalStack)
    pub s3_endpoint: Option<String>,
}

impl AwsSettings {
    /// Both halves of a static key pair are configured.
    pub fn has_explicit_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

/// Implement Drop to zeroize secret fields when AwsSettings is dropped.
impl Drop for AwsSettings {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.access_key_id {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.secret_access_key {
            secret.zeroize();
        }
        if let Some(ref mut token) = self.session_token {
            token.zeroize();
        }
    }
}

/// Pipeline configuration
///
/// Contains everything the ingest handler and the URL signer need:
/// - Server settings (host, port)
/// - Bucket layout (bucket, input/output prefixes)
/// - Synthesis settings (default voice, output format, engine, lexicons)
/// - Signed URL lifetime
/// - AWS connection settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Bucket layout
    pub bucket_name: String,
    pub input_prefix: String,
    pub output_prefix: String,

    // Synthesis
    pub voice_id: String,
    pub output_format: PollyOutputFormat,
    pub engine: Option<PollyEngine>,
    pub lexicons: Vec<String>,

    // Signer
    pub url_expiry_secs: u64,

    pub aws: AwsSettings,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// `.env` is loaded into the environment by `main` before this runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if the YAML file cannot be read or is malformed, or if
    /// the merged configuration fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        Self::from_sources(|name| std::env::var(name).ok(), Some(yaml_config))
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_sources(lookup, None)
    }

    /// Merge variables from `lookup` with optional YAML overrides, then validate.
    pub fn from_sources<F>(lookup: F, yaml_config: Option<YamlConfig>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank variables count as unset.
        let env = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let yaml_config = yaml_config.unwrap_or_default();
        let server = yaml_config.server.unwrap_or_default();
        let storage = yaml_config.storage.unwrap_or_default();
        let synthesis = yaml_config.synthesis.unwrap_or_default();
        let signer = yaml_config.signer.unwrap_or_default();
        let aws = yaml_config.aws.unwrap_or_default();

        let host = server
            .host
            .or_else(|| env("HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match server.port {
            Some(port) => port,
            None => parse_env(&env, "PORT")?.unwrap_or(DEFAULT_PORT),
        };

        let bucket_name = storage
            .bucket
            .filter(|bucket| !bucket.trim().is_empty())
            .or_else(|| env("BUCKET_NAME"))
            .ok_or(ConfigError::Missing("BUCKET_NAME"))?;
        let input_prefix = storage
            .input_prefix
            .or_else(|| env("INPUT_PREFIX"))
            .unwrap_or_else(|| DEFAULT_INPUT_PREFIX.to_string());
        let output_prefix = storage
            .output_prefix
            .or_else(|| env("OUTPUT_PREFIX"))
            .unwrap_or_else(|| DEFAULT_OUTPUT_PREFIX.to_string());

        let voice_id = synthesis
            .voice_id
            .or_else(|| env("VOICE_ID"))
            .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string());
        if !PollyVoice::is_valid_id(&voice_id) {
            return Err(invalid(
                "VOICE_ID",
                voice_id,
                "expected 1-32 ASCII letters or digits",
            ));
        }

        let output_format = match synthesis.output_format.or_else(|| env("OUTPUT_FORMAT")) {
            Some(raw) => PollyOutputFormat::parse(&raw)
                .ok_or_else(|| invalid("OUTPUT_FORMAT", raw, "expected mp3, ogg_vorbis or pcm"))?,
            None => PollyOutputFormat::default(),
        };

        let engine = match synthesis.engine.or_else(|| env("POLLY_ENGINE")) {
            Some(raw) => Some(PollyEngine::parse(&raw).ok_or_else(|| {
                invalid(
                    "POLLY_ENGINE",
                    raw,
                    "expected standard, neural, long-form or generative",
                )
            })?),
            None => None,
        };

        let lexicons = match synthesis.lexicons {
            Some(lexicons) => lexicons,
            None => env("POLLY_LEXICONS")
                .map(|raw| {
                    raw.split(',')
                        .map(|name| name.trim().to_string())
                        .filter(|name| !name.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };
        let polly = AwsPollyConfig {
            engine,
            lexicon_names: lexicons.clone(),
        };
        polly
            .validate()
            .map_err(|reason| invalid("POLLY_LEXICONS", lexicons.join(","), reason))?;

        let url_expiry_secs = match signer.url_expiry_secs {
            Some(secs) => secs,
            None => parse_env(&env, "URL_EXPIRY_SECS")?.unwrap_or(DEFAULT_URL_EXPIRY_SECS),
        };
        if !(1..=MAX_URL_EXPIRY_SECS).contains(&url_expiry_secs) {
            return Err(invalid(
                "URL_EXPIRY_SECS",
                url_expiry_secs.to_string(),
                format!("expected 1..={MAX_URL_EXPIRY_SECS}"),
            ));
        }

        let aws = AwsSettings {
            region: aws
                .region
                .or_else(|| env("AWS_REGION"))
                .or_else(|| env("AWS_DEFAULT_REGION")),
            access_key_id: aws.access_key_id.or_else(|| env("AWS_ACCESS_KEY_ID")),
            secret_access_key: aws
                .secret_access_key
                .or_else(|| env("AWS_SECRET_ACCESS_KEY")),
            session_token: aws.session_token.or_else(|| env("AWS_SESSION_TOKEN")),
            s3_endpoint: aws.s3_endpoint.or_else(|| env("S3_ENDPOINT")),
        };
        if aws.access_key_id.is_some() != aws.secret_access_key.is_some() {
            return Err(invalid(
                "AWS_ACCESS_KEY_ID",
                "<redacted>",
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together",
            ));
        }

        Ok(Self {
            host,
            port,
            bucket_name,
            input_prefix,
            output_prefix,
            voice_id,
            output_format,
            engine,
            lexicons,
            url_expiry_secs,
            aws,
        })
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Key layout derived from the configured prefixes and output format.
    pub fn object_keys(&self) -> ObjectKeys {
        ObjectKeys::new(
            &self.input_prefix,
            &self.output_prefix,
            self.output_format.file_extension(),
        )
    }

    pub fn default_voice(&self) -> PollyVoice {
        PollyVoice::from_str_or_default(&self.voice_id)
    }

    pub fn polly_config(&self) -> AwsPollyConfig {
        AwsPollyConfig {
            engine: self.engine,
            lexicon_names: self.lexicons.clone(),
        }
    }

    pub fn url_expiry(&self) -> Duration {
        Duration::from_secs(self.url_expiry_secs)
    }
}

fn parse_env<T, F>(env: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    env(name)
        .map(|raw| raw.parse::<T>().map_err(|e| invalid(name, raw.clone(), e.to_string())))
        .transpose()
}
