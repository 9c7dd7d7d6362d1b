//! Language-detection inference: model provisioning, ONNX Runtime loading,
//! and single-document classification.

pub mod artifacts;
pub mod classifier;
mod error;

#[cfg(feature = "onnx")]
mod loader;
#[cfg(feature = "http")]
mod provision;

pub use artifacts::ModelArtifacts;
pub use classifier::{LogitScorer, MAX_CHARS, classify, classify_all, self_check, truncate_chars};
pub use error::{ClassifyError, LoadError, SelfCheckError};
#[cfg(feature = "onnx")]
pub use loader::ModelHandle;
#[cfg(feature = "http")]
pub use provision::{DEFAULT_ENDPOINT, ModelStore, ProvisionError};
