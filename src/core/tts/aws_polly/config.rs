//! Configuration types for Amazon Polly synthesis.
//!
//! - Engine selection (standard, neural, long-form, generative)
//! - Audio output formats (mp3, ogg_vorbis, pcm) with their content types and
//!   the file extension used for output objects
//! - Voice identifiers, including per-object overrides read from metadata
//!
//! # Example
//!
//! ```rust
//! use docspeak::core::tts::aws_polly::{PollyOutputFormat, PollyVoice};
//!
//! let format = PollyOutputFormat::from_str_or_default("mp3");
//! assert_eq!(format.mime_type(), "audio/mpeg");
//! assert_eq!(format.file_extension(), "mp3");
//! assert_eq!(PollyVoice::from_str_or_default("joanna"), PollyVoice::Joanna);
//! ```

use serde::{Deserialize, Serialize};

/// Maximum text length for a single SynthesizeSpeech request (characters).
pub const MAX_TEXT_LENGTH: usize = 3000;

/// Longest voice identifier accepted from clients.
pub const MAX_VOICE_ID_LENGTH: usize = 32;

// =============================================================================
// Polly Engine
// =============================================================================

/// Amazon Polly synthesis engine options.
///
/// When no engine is configured the request omits it and Polly uses the
/// voice's default (standard for most voices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollyEngine {
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "neural")]
    Neural,
    #[serde(rename = "long-form")]
    LongForm,
    #[serde(rename = "generative")]
    Generative,
}

impl PollyEngine {
    /// Convert to AWS API string.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Neural => "neural",
            Self::LongForm => "long-form",
            Self::Generative => "generative",
        }
    }

    /// Strict parse, used for configuration values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "neural" => Some(Self::Neural),
            "long-form" | "longform" | "long_form" => Some(Self::LongForm),
            "generative" => Some(Self::Generative),
            _ => None,
        }
    }
}

impl std::fmt::Display for PollyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Polly Output Format
// =============================================================================

/// Audio output formats supported by Amazon Polly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PollyOutputFormat {
    #[default]
    #[serde(rename = "mp3")]
    Mp3,
    #[serde(rename = "ogg_vorbis")]
    OggVorbis,
    /// 16-bit signed little-endian mono
    #[serde(rename = "pcm")]
    Pcm,
}

impl PollyOutputFormat {
    /// Convert to AWS API string.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg_vorbis",
            Self::Pcm => "pcm",
        }
    }

    /// Content type written on output objects.
    #[inline]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::OggVorbis => "audio/ogg",
            Self::Pcm => "audio/pcm",
        }
    }

    /// Extension of output object keys, without the dot.
    #[inline]
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg",
            Self::Pcm => "pcm",
        }
    }

    /// Strict parse, used for configuration values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mp3" | "mpeg" => Some(Self::Mp3),
            "ogg_vorbis" | "ogg" | "vorbis" => Some(Self::OggVorbis),
            "pcm" | "raw" => Some(Self::Pcm),
            _ => None,
        }
    }

    /// Parse from string, with fallback to Mp3.
    pub fn from_str_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }
}

impl std::fmt::Display for PollyOutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Polly Voice
// =============================================================================

/// Common Amazon Polly voices.
///
/// Anything else is carried through as [`PollyVoice::Custom`] so that newly
/// released voices work without a code change; Polly rejects unknown ids.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PollyVoice {
    // US English
    #[default]
    Joanna,
    Matthew,
    Salli,
    Kendra,
    Kimberly,
    Joey,
    Ruth,
    Stephen,
    Ivy,
    Justin,
    // UK English
    Amy,
    Emma,
    Brian,
    Arthur,
    // Other English
    Olivia,
    Aria,
    // Other languages
    Lea,
    Hans,
    Vicki,
    Lucia,
    Mia,
    Camila,
    Bianca,
    Mizuki,

    #[serde(rename = "custom")]
    Custom(String),
}

static NAMED_VOICES: [PollyVoice; 24] = [
    PollyVoice::Joanna,
    PollyVoice::Matthew,
    PollyVoice::Salli,
    PollyVoice::Kendra,
    PollyVoice::Kimberly,
    PollyVoice::Joey,
    PollyVoice::Ruth,
    PollyVoice::Stephen,
    PollyVoice::Ivy,
    PollyVoice::Justin,
    PollyVoice::Amy,
    PollyVoice::Emma,
    PollyVoice::Brian,
    PollyVoice::Arthur,
    PollyVoice::Olivia,
    PollyVoice::Aria,
    PollyVoice::Lea,
    PollyVoice::Hans,
    PollyVoice::Vicki,
    PollyVoice::Lucia,
    PollyVoice::Mia,
    PollyVoice::Camila,
    PollyVoice::Bianca,
    PollyVoice::Mizuki,
];

impl PollyVoice {
    /// Convert to AWS voice ID string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Joanna => "Joanna",
            Self::Matthew => "Matthew",
            Self::Salli => "Salli",
            Self::Kendra => "Kendra",
            Self::Kimberly => "Kimberly",
            Self::Joey => "Joey",
            Self::Ruth => "Ruth",
            Self::Stephen => "Stephen",
            Self::Ivy => "Ivy",
            Self::Justin => "Justin",
            Self::Amy => "Amy",
            Self::Emma => "Emma",
            Self::Brian => "Brian",
            Self::Arthur => "Arthur",
            Self::Olivia => "Olivia",
            Self::Aria => "Aria",
            Self::Lea => "Lea",
            Self::Hans => "Hans",
            Self::Vicki => "Vicki",
            Self::Lucia => "Lucia",
            Self::Mia => "Mia",
            Self::Camila => "Camila",
            Self::Bianca => "Bianca",
            Self::Mizuki => "Mizuki",
            Self::Custom(id) => id,
        }
    }

    /// Named voice matching `s` case-insensitively, else `Custom` with `s` as given.
    ///
    /// Unrecognized ids keep their original case; Polly voice ids are case-sensitive.
    pub fn from_str_or_default(s: &str) -> Self {
        let trimmed = s.trim();
        NAMED_VOICES
            .iter()
            .find(|voice| voice.as_str().eq_ignore_ascii_case(trimmed))
            .cloned()
            .unwrap_or_else(|| Self::Custom(trimmed.to_string()))
    }

    /// Whether `s` is shaped like a Polly voice id: 1 to 32 ASCII letters or digits.
    pub fn is_valid_id(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= MAX_VOICE_ID_LENGTH
            && s.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}

impl std::fmt::Display for PollyVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// Settings for the Polly synthesizer that do not vary per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsPollyConfig {
    /// Engine override; `None` lets Polly pick the voice default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<PollyEngine>,

    /// Custom lexicon names to apply (Polly allows up to 5)
    #[serde(default)]
    pub lexicon_names: Vec<String>,
}

impl AwsPollyConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.lexicon_names.len() > 5 {
            return Err("Maximum 5 lexicons can be applied per request".to_string());
        }
        Ok(())
    }
}
