//! Model provisioning from a Hugging Face compatible model registry.

use std::path::{Path, PathBuf};

use feedlang_core::ModelSpec;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::artifacts::{CONFIG_FILE, ModelArtifacts, TOKENIZER_FILE};

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Response header carrying the commit a `resolve/<revision>` URL resolved to.
const REPO_COMMIT_HEADER: &str = "x-repo-commit";

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("registry returned {status} for {url}")]
    Registry { url: String, status: u16 },
    #[error("{url} resolved to commit {actual}, expected {expected}")]
    Revision {
        url: String,
        expected: String,
        actual: String,
    },
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fetches model artifacts from the registry into a local model directory.
pub struct ModelStore {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT.to_string())
    }
}

impl ModelStore {
    /// `endpoint` is the registry root, like `https://huggingface.co`.
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `token` as a bearer token with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Download the tokenizer, config and ONNX model of `spec` into
    /// `target`, creating the directory if needed.
    ///
    /// Every call downloads and overwrites all artifacts. A failure part way
    /// leaves whatever was already written in place.
    ///
    /// The commit each file resolved to is read from the registry's response.
    /// All files must come from one commit, and from `spec.revision` itself
    /// when that is a commit id. The commit is recorded in the directory's
    /// `revision` file.
    pub async fn provision(
        &self,
        target: &Path,
        spec: &ModelSpec,
    ) -> Result<ModelArtifacts, ProvisionError> {
        tokio::fs::create_dir_all(target)
            .await
            .map_err(|source| ProvisionError::Io {
                path: target.to_path_buf(),
                source,
            })?;

        let artifacts = ModelArtifacts::in_dir(target);
        let files = [
            (TOKENIZER_FILE, &artifacts.tokenizer),
            (CONFIG_FILE, &artifacts.config),
            (spec.onnx_file.as_str(), &artifacts.model),
        ];

        info!(
            model = %spec.name,
            revision = %spec.revision,
            target = %target.display(),
            "provisioning model"
        );
        if !spec.is_pinned() {
            warn!(revision = %spec.revision, "model revision is not a commit id");
        }

        let mut resolved: Option<String> = None;
        for (remote, local) in files {
            let url = spec.file_url(&self.endpoint, remote);
            let Some(commit) = self.fetch(&url, local).await? else {
                continue;
            };
            let expected = if spec.is_pinned() {
                Some(spec.revision.as_str())
            } else {
                resolved.as_deref()
            };
            if let Some(expected) = expected {
                if !commit.eq_ignore_ascii_case(expected) {
                    return Err(ProvisionError::Revision {
                        url,
                        expected: expected.to_string(),
                        actual: commit,
                    });
                }
            }
            resolved.get_or_insert(commit);
        }

        record_revision(&artifacts.revision, resolved.as_deref()).await?;
        info!(
            target = %target.display(),
            commit = resolved.as_deref().unwrap_or("unknown"),
            "model provisioned"
        );
        Ok(artifacts)
    }

    /// Stream one file to `local`. Returns the commit the registry reported.
    async fn fetch(&self, url: &str, local: &Path) -> Result<Option<String>, ProvisionError> {
        let mut req = self.client.get(url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let mut resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProvisionError::Registry {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let commit = resp
            .headers()
            .get(REPO_COMMIT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let io_error = |source: std::io::Error| ProvisionError::Io {
            path: local.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::File::create(local).await.map_err(io_error)?;
        let mut bytes = 0u64;
        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await.map_err(io_error)?;
            bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(io_error)?;

        info!(url, bytes, "downloaded artifact");
        Ok(commit)
    }
}

/// Write the resolved commit, or clear a stale one when none was reported.
async fn record_revision(path: &Path, commit: Option<&str>) -> Result<(), ProvisionError> {
    let result = match commit {
        Some(commit) => tokio::fs::write(path, format!("{commit}\n")).await,
        None => match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        },
    };
    result.map_err(|source| ProvisionError::Io {
        path: path.to_path_buf(),
        source,
    })
}
