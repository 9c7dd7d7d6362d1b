//! DuckDB access to the feed database's language columns.

use std::collections::BTreeMap;
use std::path::Path;

use arrow::array::{Array, LargeStringArray, StringArray, StringViewArray};
use arrow::record_batch::RecordBatch;
use duckdb::{Connection, params};
use feedlang_core::schema::{ARTICLES_TABLE, FEEDS_TABLE};
use feedlang_core::{FeedLanguageMap, FeedLanguageSink, Language};
use tracing::{info, warn};

use crate::StoreError;

/// An article still waiting for a language label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: String,
    pub feed_id: String,
    pub content: String,
}

/// DuckDB feed database.
///
/// The `feeds` and `articles` tables are created and filled by the feed
/// synchroniser. This store reads article text and writes only the
/// `articles.language` and `feeds.language` columns. Ids of any SQL type are
/// handled as strings.
pub struct FeedStore {
    conn: Connection,
}

impl FeedStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Fail with [`StoreError::MissingTable`] unless both tables exist.
    pub fn require_tables(&self) -> Result<(), StoreError> {
        for table in [ARTICLES_TABLE, FEEDS_TABLE] {
            self.count_table(table)
                .map_err(|_| StoreError::MissingTable(table))?;
        }
        Ok(())
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*) FROM {table}");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ── Articles ──

    /// Articles with no language yet, ordered by id. A NULL body is read as
    /// empty text.
    pub fn pending_articles(&self) -> Result<Vec<Article>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT CAST(id AS VARCHAR) AS id,
                    CAST(feed_id AS VARCHAR) AS feed_id,
                    COALESCE(CAST(content AS VARCHAR), '') AS content
             FROM articles
             WHERE language IS NULL
             ORDER BY id",
        )?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();

        let mut articles = Vec::new();
        for batch in &batches {
            let ids = string_column(batch, "id")?;
            let feeds = string_column(batch, "feed_id")?;
            let contents = string_column(batch, "content")?;
            for row in 0..batch.num_rows() {
                let (Some(id), Some(feed_id)) = (ids.get(row), feeds.get(row)) else {
                    warn!(row, "skipping article with NULL id or feed_id");
                    continue;
                };
                articles.push(Article {
                    id: id.to_string(),
                    feed_id: feed_id.to_string(),
                    content: contents.get(row).unwrap_or_default().to_string(),
                });
            }
        }
        Ok(articles)
    }

    /// Store per-article labels in one transaction. Returns rows updated.
    pub fn set_article_languages(
        &mut self,
        labels: &[(String, Language)],
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt =
                tx.prepare("UPDATE articles SET language = ? WHERE CAST(id AS VARCHAR) = ?")?;
            for (id, lang) in labels {
                updated += stmt.execute(params![lang.code(), id.as_str()])?;
            }
        }
        tx.commit()?;
        info!(updated, "stored article languages");
        Ok(updated)
    }

    /// Labelled articles' languages grouped by feed id.
    ///
    /// Feeds with no labelled article do not appear. Codes outside the label
    /// set are skipped with a warning.
    pub fn article_languages_by_feed(&self) -> Result<BTreeMap<String, Vec<Language>>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT CAST(feed_id AS VARCHAR) AS feed_id, CAST(language AS VARCHAR) AS language
             FROM articles
             WHERE language IS NOT NULL AND feed_id IS NOT NULL",
        )?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();

        let mut by_feed: BTreeMap<String, Vec<Language>> = BTreeMap::new();
        for batch in &batches {
            let feeds = string_column(batch, "feed_id")?;
            let languages = string_column(batch, "language")?;
            for row in 0..batch.num_rows() {
                let (Some(feed_id), Some(code)) = (feeds.get(row), languages.get(row)) else {
                    continue;
                };
                match code.parse::<Language>() {
                    Ok(lang) => by_feed.entry(feed_id.to_string()).or_default().push(lang),
                    Err(e) => warn!(feed_id, error = %e, "ignoring stored article language"),
                }
            }
        }
        Ok(by_feed)
    }

    /// Stored language of one feed.
    pub fn feed_language(&self, feed_id: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT CAST(language AS VARCHAR) FROM feeds WHERE CAST(id AS VARCHAR) = ?")?;
        let mut rows = stmt.query([feed_id])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(None),
        }
    }
}

impl<K: Ord + AsRef<str>> FeedLanguageSink<K> for FeedStore {
    type Error = StoreError;

    /// Overwrite `feeds.language` for every feed in the map, in one
    /// transaction. Feeds absent from the table are ignored.
    fn replace_feed_languages(&mut self, map: &FeedLanguageMap<K>) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt =
                tx.prepare("UPDATE feeds SET language = ? WHERE CAST(id AS VARCHAR) = ?")?;
            for (feed_id, lang) in map.iter() {
                let feed_id: &str = feed_id.as_ref();
                updated += stmt.execute(params![lang.code(), feed_id])?;
            }
        }
        tx.commit()?;
        info!(feeds = map.len(), updated, "stored feed languages");
        Ok(updated)
    }
}

// ── Arrow extraction helpers ──

/// A string column of any of Arrow's string layouts.
enum StringColumn<'a> {
    Utf8(&'a StringArray),
    LargeUtf8(&'a LargeStringArray),
    Utf8View(&'a StringViewArray),
}

impl StringColumn<'_> {
    fn get(&self, row: usize) -> Option<&str> {
        match self {
            Self::Utf8(a) => (!a.is_null(row)).then(|| a.value(row)),
            Self::LargeUtf8(a) => (!a.is_null(row)).then(|| a.value(row)),
            Self::Utf8View(a) => (!a.is_null(row)).then(|| a.value(row)),
        }
    }
}

fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &'static str,
) -> Result<StringColumn<'a>, StoreError> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::ColumnType {
            column: name,
            data_type: "missing".to_string(),
        })?;
    let any = col.as_any();
    if let Some(a) = any.downcast_ref::<StringArray>() {
        Ok(StringColumn::Utf8(a))
    } else if let Some(a) = any.downcast_ref::<LargeStringArray>() {
        Ok(StringColumn::LargeUtf8(a))
    } else if let Some(a) = any.downcast_ref::<StringViewArray>() {
        Ok(StringColumn::Utf8View(a))
    } else {
        Err(StoreError::ColumnType {
            column: name,
            data_type: col.data_type().to_string(),
        })
    }
}
