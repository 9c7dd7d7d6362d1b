//! On-disk layout of a provisioned model directory.

use std::path::{Path, PathBuf};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CONFIG_FILE: &str = "config.json";
pub const MODEL_FILE: &str = "model.onnx";
/// Registry commit the artifacts were downloaded from, when it was reported.
pub const REVISION_FILE: &str = "revision";

/// Paths of the artifacts inside a model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifacts {
    pub dir: PathBuf,
    pub tokenizer: PathBuf,
    pub config: PathBuf,
    pub model: PathBuf,
    pub revision: PathBuf,
}

impl ModelArtifacts {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            tokenizer: dir.join(TOKENIZER_FILE),
            config: dir.join(CONFIG_FILE),
            model: dir.join(MODEL_FILE),
            revision: dir.join(REVISION_FILE),
        }
    }

    /// The artifacts that must exist for the directory to be loadable.
    pub fn required(&self) -> [&Path; 3] {
        [&self.tokenizer, &self.config, &self.model]
    }

    /// The commit recorded at provisioning time, if any.
    pub fn recorded_revision(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.revision).ok()?;
        let commit = raw.trim();
        (!commit.is_empty()).then(|| commit.to_string())
    }

    /// First required artifact missing from disk, if any.
    pub fn first_missing(&self) -> Option<&Path> {
        self.required().into_iter().find(|p| !p.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let a = ModelArtifacts::in_dir(Path::new("/models/lang"));
        assert_eq!(a.tokenizer, Path::new("/models/lang/tokenizer.json"));
        assert_eq!(a.config, Path::new("/models/lang/config.json"));
        assert_eq!(a.model, Path::new("/models/lang/model.onnx"));
        assert_eq!(a.revision, Path::new("/models/lang/revision"));
    }

    #[test]
    fn reports_first_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let a = ModelArtifacts::in_dir(dir.path());
        assert_eq!(a.first_missing(), Some(a.tokenizer.as_path()));

        std::fs::write(&a.tokenizer, "{}").unwrap();
        assert_eq!(a.first_missing(), Some(a.config.as_path()));

        std::fs::write(&a.config, "{}").unwrap();
        assert_eq!(a.first_missing(), Some(a.model.as_path()));

        std::fs::write(&a.model, b"onnx").unwrap();
        assert_eq!(a.first_missing(), None);
    }

    #[test]
    fn recorded_revision_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let a = ModelArtifacts::in_dir(dir.path());
        assert_eq!(a.recorded_revision(), None);

        std::fs::write(&a.revision, "abc123\n").unwrap();
        assert_eq!(a.recorded_revision().as_deref(), Some("abc123"));

        std::fs::write(&a.revision, "  ").unwrap();
        assert_eq!(a.recorded_revision(), None);
    }
}
