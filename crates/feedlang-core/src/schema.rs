//! Table and column names shared with the feed database, and the Arrow
//! schema of a cycle's feed-language output.
//!
//! The feed database is owned elsewhere; feedlang reads article text and
//! writes only the `language` columns below.

use arrow::datatypes::{DataType, Field, Schema};

pub const ARTICLES_TABLE: &str = "articles";
pub const FEEDS_TABLE: &str = "feeds";

pub const ID_COLUMN: &str = "id";
pub const FEED_ID_COLUMN: &str = "feed_id";
pub const CONTENT_COLUMN: &str = "content";
pub const LANGUAGE_COLUMN: &str = "language";

/// Schema of [`crate::FeedLanguageMap::to_record_batch`].
pub fn feed_language_schema() -> Schema {
    Schema::new(vec![
        Field::new(FEED_ID_COLUMN, DataType::Utf8, false),
        Field::new(LANGUAGE_COLUMN, DataType::Utf8, false),
    ])
}
