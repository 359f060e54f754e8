pub mod aws;
pub mod extract;
pub mod storage;
pub mod tts;

// Re-export commonly used types for convenience
pub use extract::{DocumentFormat, ExtractError, extract};

pub use storage::{
    BucketStore, KeyError, MetadataError, ObjectKeys, PresignError, S3Presigner, StorageError,
    UrlPresigner,
};

pub use tts::{
    AwsPollyConfig, AwsPollySynthesizer, PollyEngine, PollyOutputFormat, PollyVoice,
    SpeechSynthesizer, SynthesisError, SynthesisResult,
};
