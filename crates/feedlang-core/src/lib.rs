//! Core types for feed language detection: the model's label set, the
//! model/label pinning, and per-feed majority aggregation.

pub mod aggregate;
pub mod language;
pub mod model_spec;
pub mod schema;

pub use aggregate::{FeedLanguageMap, FeedLanguageSink, aggregate_feeds, majority_language};
pub use language::{LABEL_COUNT, LABEL_SET, Language, LanguageError};
pub use model_spec::{CANARIES, LabelOrderError, ModelSpec, is_commit_id, verify_label_order};
