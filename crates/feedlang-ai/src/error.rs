use std::path::PathBuf;

use feedlang_core::{LabelOrderError, Language, LanguageError};
use thiserror::Error;

/// Boxed error from the tokenizer or ONNX Runtime.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model artifact not found: {0}")]
    MissingArtifact(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model label order does not match the label set: {0}")]
    LabelOrder(#[from] LabelOrderError),

    #[error("failed to load tokenizer from {path}: {source}")]
    Tokenizer {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to create ONNX session from {path}: {source}")]
    Session {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("failed to tokenize text: {0}")]
    Tokenize(#[source] BoxError),

    #[error("inference failed: {0}")]
    Inference(#[source] BoxError),

    #[error("session mutex was poisoned by a previous panic")]
    SessionPoisoned,

    #[error("model produced {actual} logits, expected {expected}")]
    LogitCount { expected: usize, actual: usize },

    #[error("model produced no comparable logits")]
    InvalidLogits,

    #[error(transparent)]
    Label(#[from] LanguageError),
}

/// Failure of the canary check run on a freshly loaded model.
#[derive(Debug, Error)]
pub enum SelfCheckError {
    #[error("canary {text:?} classified as {actual}, expected {expected}")]
    Mismatch {
        text: String,
        expected: Language,
        actual: Language,
    },

    #[error("canary {text:?} failed to classify: {source}")]
    Classify {
        text: String,
        #[source]
        source: ClassifyError,
    },
}
