use thiserror::Error;

use crate::config::ConfigError;
use crate::core::storage::StorageError;
use crate::core::tts::SynthesisError;

/// Failures while assembling the application from its configuration.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage setup failed: {0}")]
    Storage(#[from] StorageError),

    #[error("synthesizer setup failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

pub type AppResult<T> = Result<T, AppError>;
