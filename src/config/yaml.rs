use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override the corresponding environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///
/// storage:
///   bucket: "my-docs"
///   input_prefix: "input/"
///   output_prefix: "output/"
///
/// synthesis:
///   voice_id: "Joanna"
///   output_format: "mp3"
///   engine: "neural"
///   lexicons: ["acronyms"]
///
/// signer:
///   url_expiry_secs: 900
///
/// aws:
///   region: "us-east-1"
///   access_key_id: "AKIA..."
///   secret_access_key: "..."
///   session_token: "..."
///   s3_endpoint: "http://localhost:9000"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub storage: Option<StorageYaml>,
    pub synthesis: Option<SynthesisYaml>,
    pub signer: Option<SignerYaml>,
    pub aws: Option<AwsYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Bucket layout from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageYaml {
    pub bucket: Option<String>,
    pub input_prefix: Option<String>,
    pub output_prefix: Option<String>,
}

/// Speech synthesis settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    pub voice_id: Option<String>,
    pub output_format: Option<String>,
    pub engine: Option<String>,
    pub lexicons: Option<Vec<String>>,
}

/// URL signer settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SignerYaml {
    pub url_expiry_secs: Option<u64>,
}

/// AWS connection settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AwsYaml {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub s3_endpoint: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(serde_yaml::from_str(&contents)?)
    }
}
