//! Object key rules shared by the ingest handler and the URL signer.
//!
//! Both sides must agree on where the audio for an input document lands, so
//! the prefix checks, extension parsing and the output key mapping live here
//! and nowhere else:
//!
//! ```text
//! <input-prefix>/<dirs>/<stem>.<ext>  ->  <output-prefix>/<stem>.<audio-ext>
//! ```
//!
//! The stem is the base name with only the *last* extension removed, so
//! `input/report.v2.pdf` maps to `output/report.v2.mp3`.

use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::core::extract::DocumentFormat;

/// Validation failures for client-supplied or notified keys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("key must not be empty")]
    Empty,

    #[error("key is not valid UTF-8 after URL-decoding")]
    InvalidEncoding,

    #[error("key must be under {prefix} and end with {expected}")]
    Rejected { prefix: String, expected: String },
}

/// A directory-style key prefix, normalized to end in exactly one `/`.
///
/// `input`, `input/` and `input//` are the same prefix. An empty prefix
/// matches every key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            Self(String::new())
        } else {
            Self(format!("{trimmed}/"))
        }
    }

    /// The normalized prefix, including its trailing slash.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        key.starts_with(&self.0)
    }
}

impl std::fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// URL-unescape a key the way S3 event notifications encode it (`+` is a space).
pub fn decode_key(raw: &str) -> Result<String, KeyError> {
    let plus_as_space = raw.replace('+', " ");
    percent_decode_str(&plus_as_space)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| KeyError::InvalidEncoding)
}

/// The last path segment of a key.
pub fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// The base name with its last extension removed.
pub fn stem(key: &str) -> &str {
    let name = base_name(key);
    match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    }
}

/// The text after the last dot of the base name, if any.
pub fn extension(key: &str) -> Option<&str> {
    let name = base_name(key);
    name.rfind('.').map(|dot| &name[dot + 1..])
}

/// Key layout of the bucket: where inputs are accepted and outputs are written.
#[derive(Debug, Clone)]
pub struct ObjectKeys {
    input_prefix: KeyPrefix,
    output_prefix: KeyPrefix,
    audio_extension: &'static str,
}

impl ObjectKeys {
    pub fn new(input_prefix: &str, output_prefix: &str, audio_extension: &'static str) -> Self {
        Self {
            input_prefix: KeyPrefix::new(input_prefix),
            output_prefix: KeyPrefix::new(output_prefix),
            audio_extension,
        }
    }

    pub fn input_prefix(&self) -> &KeyPrefix {
        &self.input_prefix
    }

    pub fn output_prefix(&self) -> &KeyPrefix {
        &self.output_prefix
    }

    pub fn audio_extension(&self) -> &'static str {
        self.audio_extension
    }

    /// The document format of an acceptable input key, or `None` when the key
    /// is outside the input prefix or has an unsupported extension.
    pub fn input_format(&self, key: &str) -> Option<DocumentFormat> {
        if !self.input_prefix.contains(key) {
            return None;
        }
        extension(key).and_then(DocumentFormat::from_extension)
    }

    /// Validate a client-requested upload key.
    pub fn validate_input_key(&self, key: &str) -> Result<DocumentFormat, KeyError> {
        if key.is_empty() {
            return Err(KeyError::Empty);
        }
        self.input_format(key).ok_or_else(|| KeyError::Rejected {
            prefix: self.input_prefix.to_string(),
            expected: supported_extensions_label(),
        })
    }

    /// Validate a client-requested download key.
    pub fn validate_output_key(&self, key: &str) -> Result<(), KeyError> {
        if key.is_empty() {
            return Err(KeyError::Empty);
        }
        let suffix = format!(".{}", self.audio_extension);
        if self.output_prefix.contains(key) && key.ends_with(&suffix) {
            Ok(())
        } else {
            Err(KeyError::Rejected {
                prefix: self.output_prefix.to_string(),
                expected: suffix,
            })
        }
    }

    /// Where the audio for `input_key` is written.
    pub fn output_key_for(&self, input_key: &str) -> String {
        format!(
            "{}{}.{}",
            self.output_prefix,
            stem(input_key),
            self.audio_extension
        )
    }
}

fn supported_extensions_label() -> String {
    DocumentFormat::ALL
        .iter()
        .map(|format| format!(".{}", format.extension()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> ObjectKeys {
        ObjectKeys::new("input/", "output/", "mp3")
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(KeyPrefix::new("input").as_str(), "input/");
        assert_eq!(KeyPrefix::new("input/").as_str(), "input/");
        assert_eq!(KeyPrefix::new(" input// ").as_str(), "input/");
        assert_eq!(KeyPrefix::new("").as_str(), "");
        assert_eq!(KeyPrefix::new("/").as_str(), "");
        assert!(KeyPrefix::new("").contains("anything.txt"));
    }

    #[test]
    fn test_prefix_does_not_match_sibling_directory() {
        assert!(!KeyPrefix::new("input").contains("inputs/a.txt"));
    }

    #[test]
    fn test_output_key_strips_last_extension_only() {
        assert_eq!(keys().output_key_for("input/report.v2.pdf"), "output/report.v2.mp3");
        assert_eq!(keys().output_key_for("input/doc.docx"), "output/doc.mp3");
    }

    #[test]
    fn test_output_key_drops_nested_directories() {
        assert_eq!(keys().output_key_for("input/a/b/story.txt"), "output/story.mp3");
    }

    #[test]
    fn test_output_key_without_extension() {
        assert_eq!(keys().output_key_for("input/README"), "output/README.mp3");
    }

    #[test]
    fn test_output_key_with_other_audio_extension() {
        let keys = ObjectKeys::new("in", "out", "ogg");
        assert_eq!(keys.output_key_for("in/notes.txt"), "out/notes.ogg");
    }

    #[test]
    fn test_decode_key() {
        assert_eq!(decode_key("input/my+notes%21.txt").unwrap(), "input/my notes!.txt");
        assert_eq!(decode_key("input/plain.txt").unwrap(), "input/plain.txt");
        assert_eq!(decode_key("input/caf%C3%A9.txt").unwrap(), "input/café.txt");
        assert_eq!(decode_key("input/a%2Bb.txt").unwrap(), "input/a+b.txt");
        assert_eq!(decode_key("input/%FF.txt"), Err(KeyError::InvalidEncoding));
    }

    #[test]
    fn test_input_format_filter() {
        let keys = keys();
        assert_eq!(keys.input_format("input/notes.txt"), Some(DocumentFormat::Text));
        assert_eq!(keys.input_format("input/Scan.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(keys.input_format("other/notes.txt"), None);
        assert_eq!(keys.input_format("input/notes.csv"), None);
        assert_eq!(keys.input_format("input/notes"), None);
    }

    #[test]
    fn test_validate_input_key_messages() {
        let err = keys().validate_input_key("uploads/x.txt").unwrap_err();
        assert_eq!(
            err.to_string(),
            "key must be under input/ and end with .txt, .pdf, .docx, .doc"
        );
        assert_eq!(keys().validate_input_key(""), Err(KeyError::Empty));
    }

    #[test]
    fn test_validate_output_key() {
        assert!(keys().validate_output_key("output/doc.mp3").is_ok());
        assert!(keys().validate_output_key("output/doc.wav").is_err());
        assert!(keys().validate_output_key("input/doc.mp3").is_err());
    }

    #[test]
    fn test_stem_and_extension_of_dotfile() {
        assert_eq!(stem("input/.hidden"), "");
        assert_eq!(extension("input/.hidden"), Some("hidden"));
        assert_eq!(extension("input.dir/noext"), None);
    }
}
