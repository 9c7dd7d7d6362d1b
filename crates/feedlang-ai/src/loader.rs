//! ONNX Runtime model handle for the language-detection classifier.
//!
//! The model directory must contain `model.onnx`, `tokenizer.json`, and the
//! `config.json` the model was exported with. The config's `id2label` table
//! must match the label set before the model is used.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{info, warn};

use crate::artifacts::ModelArtifacts;
use crate::classifier::LogitScorer;
use crate::error::{BoxError, ClassifyError, LoadError};

/// Loaded tokenizer and sequence-classification model.
///
/// Immutable once loaded. ONNX Runtime needs exclusive access to a session
/// while it runs, so the session sits behind a mutex; weights and tokenizer
/// are never modified, and the handle can be shared across threads.
pub struct ModelHandle {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    token_type_ids: bool,
}

/// Token ids of one encoded document, shaped for a batch of one.
#[derive(Debug, PartialEq, Eq)]
struct Encoded {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl ModelHandle {
    /// Load a model directory written by [`crate::ModelStore::provision`].
    pub fn load(model_dir: &Path) -> Result<Self, LoadError> {
        let artifacts = ModelArtifacts::in_dir(model_dir);
        if let Some(missing) = artifacts.first_missing() {
            return Err(LoadError::MissingArtifact(missing.to_path_buf()));
        }

        check_label_order(&artifacts)?;

        let tokenizer = load_tokenizer(&artifacts.tokenizer)?;

        let session_error = |e: ort::Error| LoadError::Session {
            path: artifacts.model.clone(),
            source: e.into(),
        };
        let session = Session::builder()
            .map_err(session_error)?
            .commit_from_file(&artifacts.model)
            .map_err(session_error)?;

        // XLM-R style models take no segment ids; BERT style models do.
        let token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        let revision = artifacts.recorded_revision();
        if revision.is_none() {
            warn!(dir = %artifacts.dir.display(), "no recorded model revision");
        }
        info!(
            model = %artifacts.model.display(),
            revision = revision.as_deref().unwrap_or("unknown"),
            token_type_ids,
            "loaded language model"
        );
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            token_type_ids,
        })
    }
}

impl LogitScorer for ModelHandle {
    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifyError> {
        let encoded = encode(&self.tokenizer, text)?;
        let shape = [1i64, encoded.input_ids.len() as i64];

        let ids_tensor = Tensor::from_array((shape, encoded.input_ids.into_boxed_slice()))
            .map_err(inference)?;
        let mask_tensor = Tensor::from_array((shape, encoded.attention_mask.into_boxed_slice()))
            .map_err(inference)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifyError::SessionPoisoned)?;

        let run = if self.token_type_ids {
            let type_tensor =
                Tensor::from_array((shape, encoded.token_type_ids.into_boxed_slice()))
                    .map_err(inference)?;
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
            ])
        };
        let outputs = run.map_err(inference)?;

        // Logits: [1, num_labels].
        let (_, logits) = outputs[0].try_extract_tensor::<f32>().map_err(inference)?;
        Ok(logits.to_vec())
    }
}

fn inference<E: Into<BoxError>>(e: E) -> ClassifyError {
    ClassifyError::Inference(e.into())
}

/// Compare `config.json`'s `id2label` with the label set.
fn check_label_order(artifacts: &ModelArtifacts) -> Result<(), LoadError> {
    let raw = std::fs::read_to_string(&artifacts.config).map_err(|source| LoadError::Io {
        path: artifacts.config.clone(),
        source,
    })?;
    let config: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| LoadError::Config {
            path: artifacts.config.clone(),
            source,
        })?;
    feedlang_core::verify_label_order(&config)?;
    Ok(())
}

/// Load the tokenizer with any saved truncation or padding removed: the
/// document is already cut by characters and is encoded alone.
fn load_tokenizer(path: &Path) -> Result<Tokenizer, LoadError> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|source| LoadError::Tokenizer {
        path: path.to_path_buf(),
        source,
    })?;
    tokenizer
        .with_truncation(None)
        .map_err(|source| LoadError::Tokenizer {
            path: path.to_path_buf(),
            source,
        })?;
    tokenizer.with_padding(None);
    Ok(tokenizer)
}

fn encode(tokenizer: &Tokenizer, text: &str) -> Result<Encoded, ClassifyError> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(ClassifyError::Tokenize)?;
    let widen = |values: &[u32]| values.iter().map(|&v| i64::from(v)).collect::<Vec<_>>();
    Ok(Encoded {
        input_ids: widen(encoding.get_ids()),
        attention_mask: widen(encoding.get_attention_mask()),
        token_type_ids: widen(encoding.get_type_ids()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::str::FromStr;

    use feedlang_core::{CANARIES, LABEL_SET, LabelOrderError, Language, aggregate_feeds};

    use crate::classifier::{classify, self_check};

    /// Whitespace-split word-level tokenizer with a three-word vocabulary.
    const TINY_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "[UNK]": 0, "bonjour": 1, "hello": 2 },
            "unk_token": "[UNK]"
        }
    }"#;

    fn tiny_tokenizer() -> Tokenizer {
        Tokenizer::from_str(TINY_TOKENIZER).unwrap()
    }

    /// `config.json` with `id2label` listed in the given label order.
    fn config_with_labels<'a>(labels: impl Iterator<Item = &'a Language>) -> String {
        let mut id2label = serde_json::Map::new();
        for (i, lang) in labels.enumerate() {
            id2label.insert(i.to_string(), lang.code().into());
        }
        serde_json::json!({ "id2label": id2label }).to_string()
    }

    #[test]
    fn encode_produces_single_example_ids() {
        let encoded = encode(&tiny_tokenizer(), "hello bonjour inconnu").unwrap();
        assert_eq!(encoded.input_ids, vec![2, 1, 0]);
        assert_eq!(encoded.attention_mask, vec![1, 1, 1]);
        assert_eq!(encoded.token_type_ids, vec![0, 0, 0]);
    }

    #[test]
    fn encode_empty_text() {
        let encoded = encode(&tiny_tokenizer(), "").unwrap();
        assert!(encoded.input_ids.is_empty());
        assert_eq!(encoded.input_ids.len(), encoded.attention_mask.len());
    }

    #[test]
    fn load_reports_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        match ModelHandle::load(dir.path()) {
            Err(LoadError::MissingArtifact(path)) => {
                assert!(path.ends_with("tokenizer.json"));
            }
            Err(e) => panic!("expected MissingArtifact, got {e}"),
            Ok(_) => panic!("expected MissingArtifact, got a handle"),
        }
    }

    #[test]
    fn load_rejects_mismatched_label_order() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ModelArtifacts::in_dir(dir.path());
        std::fs::write(&artifacts.tokenizer, TINY_TOKENIZER).unwrap();
        std::fs::write(&artifacts.model, b"not a real model").unwrap();
        std::fs::write(&artifacts.config, config_with_labels(LABEL_SET.iter().rev())).unwrap();

        assert!(matches!(
            ModelHandle::load(dir.path()),
            Err(LoadError::LabelOrder(LabelOrderError::Mismatch { index: 0, .. }))
        ));
    }

    #[test]
    fn load_requires_config() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ModelArtifacts::in_dir(dir.path());
        std::fs::write(&artifacts.tokenizer, TINY_TOKENIZER).unwrap();
        std::fs::write(&artifacts.model, b"not a real model").unwrap();

        match ModelHandle::load(dir.path()) {
            Err(LoadError::MissingArtifact(path)) => assert_eq!(path, artifacts.config),
            Err(e) => panic!("expected MissingArtifact, got {e}"),
            Ok(_) => panic!("expected MissingArtifact, got a handle"),
        }
    }

    #[test]
    fn load_rejects_config_without_id2label() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ModelArtifacts::in_dir(dir.path());
        std::fs::write(&artifacts.tokenizer, TINY_TOKENIZER).unwrap();
        std::fs::write(&artifacts.model, b"not a real model").unwrap();
        std::fs::write(&artifacts.config, r#"{"model_type": "xlm-roberta"}"#).unwrap();

        assert!(matches!(
            ModelHandle::load(dir.path()),
            Err(LoadError::LabelOrder(LabelOrderError::Missing))
        ));
    }

    #[test]
    fn load_rejects_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ModelArtifacts::in_dir(dir.path());
        std::fs::write(&artifacts.tokenizer, TINY_TOKENIZER).unwrap();
        std::fs::write(&artifacts.model, b"not a real model").unwrap();
        std::fs::write(&artifacts.config, "{ not json").unwrap();

        assert!(matches!(
            ModelHandle::load(dir.path()),
            Err(LoadError::Config { .. })
        ));
    }

    #[test]
    fn load_rejects_invalid_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ModelArtifacts::in_dir(dir.path());
        std::fs::write(&artifacts.tokenizer, "{}").unwrap();
        std::fs::write(&artifacts.model, b"not a real model").unwrap();
        std::fs::write(&artifacts.config, config_with_labels(LABEL_SET.iter())).unwrap();

        assert!(matches!(
            ModelHandle::load(dir.path()),
            Err(LoadError::Tokenizer { .. })
        ));
    }

    // ── Tests against the real model (run with `cargo test -- --ignored`) ──

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("models")
            .join("xlm-roberta-base-language-detection")
    }

    fn require_model() -> ModelHandle {
        let dir = model_dir();
        if !dir.join("model.onnx").exists() {
            panic!(
                "Model not found. Provision it with:\n  \
                 feedlang provision --model-path {}",
                dir.display()
            );
        }
        ModelHandle::load(&dir).unwrap()
    }

    #[test]
    #[ignore = "requires the provisioned model under models/"]
    fn classifies_french_and_english() {
        let handle = require_model();
        assert_eq!(
            classify("Bonjour, comment allez-vous aujourd'hui ?", &handle).unwrap(),
            Language::Fr
        );
        assert_eq!(
            classify("The quick brown fox jumps over the lazy dog", &handle).unwrap(),
            Language::En
        );
    }

    #[test]
    #[ignore = "requires the provisioned model under models/"]
    fn canaries_pass() {
        let handle = require_model();
        self_check(&handle, CANARIES).unwrap();
    }

    #[test]
    #[ignore = "requires the provisioned model under models/"]
    fn truncation_and_determinism_on_real_model() {
        let handle = require_model();
        let text = "Le gouvernement a annoncé de nouvelles mesures. ".repeat(30);
        let head: String = text.chars().take(crate::MAX_CHARS).collect();

        let full = classify(&text, &handle).unwrap();
        assert_eq!(full, classify(&head, &handle).unwrap());
        assert_eq!(full, classify(&text, &handle).unwrap());
        // Empty text still yields a label.
        classify("", &handle).unwrap();
    }

    #[test]
    #[ignore = "requires the provisioned model under models/"]
    fn feed_of_en_en_fr_aggregates_to_en() {
        let handle = require_model();
        let articles = [
            "The council approved the new budget on Tuesday evening.",
            "Scientists have discovered a new species of frog in the rainforest.",
            "Le musée ouvrira ses portes au public la semaine prochaine.",
        ];
        let labels: Vec<Language> = articles
            .iter()
            .map(|a| classify(a, &handle).unwrap())
            .collect();
        assert_eq!(labels, vec![Language::En, Language::En, Language::Fr]);

        let map = aggregate_feeds([("feed-1".to_string(), labels)]);
        assert_eq!(map.get(&"feed-1".to_string()), Some(Language::En));
    }
}
