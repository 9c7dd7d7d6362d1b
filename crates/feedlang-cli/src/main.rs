mod display;
mod sync;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use feedlang_ai::{DEFAULT_ENDPOINT, ModelHandle, ModelStore, classify, self_check};
use feedlang_core::model_spec::{DEFAULT_MODEL_NAME, DEFAULT_ONNX_FILE, DEFAULT_REVISION};
use feedlang_core::{CANARIES, LABEL_SET, ModelSpec};
use feedlang_store::FeedStore;
use tracing::warn;

const DEFAULT_MODEL_DIR: &str = "models/xlm-roberta-base-language-detection";

/// Environment names read by earlier deployments, consulted when the
/// `FEEDLANG_*` variable and the flag are both absent.
const LEGACY_DB_PATH: &str = "DB_PATH";
const LEGACY_MODEL_PATH: &str = "MODEL_PATH";

#[derive(Parser)]
#[command(name = "feedlang", version, about = "Article and feed language detection")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the effective configuration.
    Config {
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long, env = "FEEDLANG_DB_PATH")]
        db_path: Option<PathBuf>,
    },
    /// Download the model artifacts into the model directory.
    Provision {
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        registry: RegistryArgs,
    },
    /// Classify one text and print its language code.
    Detect {
        #[command(flatten)]
        model: ModelArgs,
        /// Skip the canary check after loading.
        #[arg(long)]
        skip_self_check: bool,
        text: String,
    },
    /// Label pending articles and recompute every feed's language.
    SyncLanguages {
        #[command(flatten)]
        model: ModelArgs,
        /// Feed database [fallback env: DB_PATH].
        #[arg(long, env = "FEEDLANG_DB_PATH")]
        db_path: Option<PathBuf>,
        #[arg(long)]
        skip_self_check: bool,
    },
    /// Load the model and classify the canary texts.
    SelfCheck {
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Local model directory [fallback env: MODEL_PATH] [default:
    /// models/xlm-roberta-base-language-detection].
    #[arg(long, env = "FEEDLANG_MODEL_PATH")]
    model_path: Option<PathBuf>,
    /// Model repository on the registry.
    #[arg(long, env = "FEEDLANG_MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
    model_name: String,
    #[arg(long, env = "FEEDLANG_MODEL_REVISION", default_value = DEFAULT_REVISION)]
    model_revision: String,
    /// Path of the ONNX export inside the model repository.
    #[arg(long, env = "FEEDLANG_ONNX_FILE", default_value = DEFAULT_ONNX_FILE)]
    onnx_file: String,
}

impl ModelArgs {
    fn model_dir(&self) -> PathBuf {
        or_legacy(
            self.model_path.clone(),
            LEGACY_MODEL_PATH,
            std::env::var_os(LEGACY_MODEL_PATH),
        )
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR))
    }

    fn spec(&self) -> ModelSpec {
        ModelSpec {
            onnx_file: self.onnx_file.clone(),
            ..ModelSpec::new(&self.model_name, &self.model_revision)
        }
    }
}

#[derive(Args)]
struct RegistryArgs {
    #[arg(long, env = "HF_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    tracing::debug!("feedlang v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Config { model, db_path } => {
            let db_path = or_legacy(db_path, LEGACY_DB_PATH, std::env::var_os(LEGACY_DB_PATH));
            print_config(&model, db_path.as_deref())
        }
        Command::Provision { model, registry } => {
            let spec = model.spec();
            let model_dir = model.model_dir();
            let store = ModelStore::new(registry.endpoint).with_token(registry.token);
            let artifacts = store
                .provision(&model_dir, &spec)
                .await
                .with_context(|| {
                    format!("provisioning {} into {}", spec.name, model_dir.display())
                })?;
            eprintln!("  Model ready in {}", artifacts.dir.display());
            Ok(())
        }
        Command::Detect {
            model,
            skip_self_check,
            text,
        } => {
            let handle = load_model(&model.model_dir(), !skip_self_check)?;
            let lang = classify(&text, &handle).context("classifying text")?;
            println!("{lang}");
            Ok(())
        }
        Command::SyncLanguages {
            model,
            db_path,
            skip_self_check,
        } => {
            let db_path = or_legacy(db_path, LEGACY_DB_PATH, std::env::var_os(LEGACY_DB_PATH))
                .context("no feed database: pass --db-path or set FEEDLANG_DB_PATH")?;
            let handle = load_model(&model.model_dir(), !skip_self_check)?;
            let mut store = FeedStore::open_persistent(&db_path)
                .with_context(|| format!("opening {}", db_path.display()))?;
            let report = sync::run_language_cycle(&mut store, &handle)?;
            display::print_report(&report)
        }
        Command::SelfCheck { model } => {
            load_model(&model.model_dir(), true)?;
            eprintln!("  Self-check passed ({} canaries)", CANARIES.len());
            Ok(())
        }
    }
}

fn load_model(dir: &Path, check: bool) -> anyhow::Result<ModelHandle> {
    let handle = ModelHandle::load(dir)
        .with_context(|| format!("loading model from {}", dir.display()))?;
    if check {
        self_check(&handle, CANARIES).context("model failed its self-check")?;
    }
    Ok(handle)
}

/// Use `value` if given, else the legacy environment variable `name`.
fn or_legacy(value: Option<PathBuf>, name: &str, legacy: Option<OsString>) -> Option<PathBuf> {
    value.or_else(|| {
        let legacy = legacy.filter(|v| !v.is_empty())?;
        warn!("{name} is deprecated; use FEEDLANG_{name}");
        Some(PathBuf::from(legacy))
    })
}

fn print_config(model: &ModelArgs, db_path: Option<&Path>) -> anyhow::Result<()> {
    println!(
        "db_path:    {}",
        db_path.map_or_else(|| "(unset)".to_string(), |p| p.display().to_string())
    );
    println!("model_path: {}", model.model_dir().display());
    let spec = model.spec();
    println!("model:      {}", serde_json::to_string_pretty(&spec)?);
    if !spec.is_pinned() {
        println!("            (revision {} is not a commit id)", spec.revision);
    }
    let labels: Vec<&str> = LABEL_SET.iter().map(|l| l.code()).collect();
    println!("labels:     {}", labels.join(" "));
    Ok(())
}
