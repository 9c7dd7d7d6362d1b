//! Pinning of the classification model to the label set it decodes with.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::language::{LABEL_COUNT, LABEL_SET, Language};

/// Default Hugging Face repository of the language-detection model.
pub const DEFAULT_MODEL_NAME: &str = "papluca/xlm-roberta-base-language-detection";
/// Branch the default spec resolves. Not a pin: provisioning records the
/// commit it resolved to, and a commit id passed as the revision is enforced.
pub const DEFAULT_REVISION: &str = "main";
/// Location of the ONNX export inside the model repository.
pub const DEFAULT_ONNX_FILE: &str = "onnx/model.onnx";

/// Texts of known language checked against a freshly loaded model before it
/// is used on real articles.
pub const CANARIES: &[(&str, Language)] = &[
    ("Bonjour, comment allez-vous aujourd'hui ?", Language::Fr),
    ("The quick brown fox jumps over the lazy dog", Language::En),
    ("Dies ist ein kurzer Satz auf Deutsch.", Language::De),
    ("Hoy hace buen tiempo y vamos a la playa.", Language::Es),
];

/// A model identifier, revision and artifact layout, versioned together with
/// [`LABEL_SET`].
///
/// The pairing with the label set is enforced on the artifacts themselves:
/// the model's `config.json` must carry an `id2label` table equal to
/// [`LABEL_SET`] (see [`verify_label_order`]). A revision that is a full
/// commit id ([`ModelSpec::is_pinned`]) additionally fixes the exact weights;
/// a branch name follows whatever the branch holds at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub revision: String,
    pub onnx_file: String,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            onnx_file: DEFAULT_ONNX_FILE.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelOrderError {
    #[error("model declares {actual} labels, expected {LABEL_COUNT}", LABEL_COUNT = LABEL_COUNT)]
    Count { actual: usize },
    #[error("model class {index} is {actual:?}, expected {expected:?}")]
    Mismatch {
        index: usize,
        expected: &'static str,
        actual: String,
    },
    #[error("id2label is not an object")]
    Malformed,
    #[error("model config has no id2label table")]
    Missing,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
            ..Self::default()
        }
    }

    /// Whether the revision is a full 40-hex-digit commit id rather than a
    /// branch or tag name.
    pub fn is_pinned(&self) -> bool {
        is_commit_id(&self.revision)
    }

    /// The label set this model is decoded with.
    pub fn labels(&self) -> &'static [Language] {
        &LABEL_SET
    }

    /// URL of a file in the model repository, in the Hugging Face hub layout.
    pub fn file_url(&self, endpoint: &str, path: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            endpoint.trim_end_matches('/'),
            self.name,
            self.revision,
            path
        )
    }
}

/// Whether `revision` is a full git commit id.
pub fn is_commit_id(revision: &str) -> bool {
    revision.len() == 40 && revision.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Check a model's `config.json` against [`LABEL_SET`].
///
/// A config without an `id2label` table is rejected: the label order of such
/// a model cannot be confirmed.
pub fn verify_label_order(config: &Value) -> Result<(), LabelOrderError> {
    let id2label = config.get("id2label").ok_or(LabelOrderError::Missing)?;
    let table = id2label.as_object().ok_or(LabelOrderError::Malformed)?;
    if table.len() != LABEL_COUNT {
        return Err(LabelOrderError::Count {
            actual: table.len(),
        });
    }
    for (index, expected) in LABEL_SET.iter().enumerate() {
        let actual = table
            .get(&index.to_string())
            .and_then(Value::as_str)
            .unwrap_or_default();
        if actual != expected.code() {
            return Err(LabelOrderError::Mismatch {
                index,
                expected: expected.code(),
                actual: actual.to_string(),
            });
        }
    }
    Ok(())
}
