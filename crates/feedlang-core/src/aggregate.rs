//! Feed-level language aggregation.
//!
//! Each article of a feed is classified on its own; the feed's language is
//! the majority vote over those per-article labels. Ties are resolved in
//! favour of the language that comes first in [`LABEL_SET`], which is what a
//! single counting pass in label-set order that keeps the first maximum does.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::StringArray;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::language::{LABEL_COUNT, LABEL_SET, Language};
use crate::schema;

/// Majority language of one feed's article labels.
///
/// Returns `None` when `labels` is empty: a feed with no classified articles
/// has no language, rather than a default one.
pub fn majority_language<I>(labels: I) -> Option<Language>
where
    I: IntoIterator<Item = Language>,
{
    let mut counts = [0usize; LABEL_COUNT];
    for lang in labels {
        counts[lang.index()] += 1;
    }

    let mut best: Option<(Language, usize)> = None;
    for lang in LABEL_SET {
        let count = counts[lang.index()];
        // Strictly greater: on a tie the earlier label-set entry is kept.
        if count > 0 && best.is_none_or(|(_, top)| count > top) {
            best = Some((lang, count));
        }
    }
    best.map(|(lang, _)| lang)
}

/// Aggregate per-article labels, grouped by feed, into a [`FeedLanguageMap`].
///
/// Feeds whose group is empty get no entry. Feed keys are expected to be
/// unique; a repeated key replaces the earlier result.
pub fn aggregate_feeds<K, I, L>(groups: I) -> FeedLanguageMap<K>
where
    K: Ord,
    I: IntoIterator<Item = (K, L)>,
    L: IntoIterator<Item = Language>,
{
    let mut map = FeedLanguageMap::new();
    for (feed, labels) in groups {
        if let Some(lang) = majority_language(labels) {
            map.insert(feed, lang);
        }
    }
    debug!(feeds = map.len(), "aggregated feed languages");
    map
}

/// Feed id -> dominant language, produced once per sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLanguageMap<K: Ord = String> {
    entries: BTreeMap<K, Language>,
}

impl<K: Ord> Default for FeedLanguageMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> FeedLanguageMap<K> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, feed: K, lang: Language) -> Option<Language> {
        self.entries.insert(feed, lang)
    }

    pub fn get(&self, feed: &K) -> Option<Language> {
        self.entries.get(feed).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in feed-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, Language)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }
}

impl<K: Ord + AsRef<str>> FeedLanguageMap<K> {
    /// Render the map as a two-column Arrow batch (`feed_id`, `language`).
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let feed_ids: StringArray = self
            .entries
            .keys()
            .map(|k| {
                let id: &str = k.as_ref();
                Some(id)
            })
            .collect();
        let languages: StringArray = self.entries.values().map(|l| Some(l.code())).collect();
        RecordBatch::try_new(
            Arc::new(schema::feed_language_schema()),
            vec![Arc::new(feed_ids), Arc::new(languages)],
        )
    }
}

impl<K: Ord> FromIterator<(K, Language)> for FeedLanguageMap<K> {
    fn from_iter<T: IntoIterator<Item = (K, Language)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Persistence boundary for a cycle's [`FeedLanguageMap`].
///
/// Implementations overwrite the stored language of every feed in the map
/// and apply the whole map as one unit.
pub trait FeedLanguageSink<K: Ord = String> {
    type Error;

    /// Returns the number of feeds whose stored language was written.
    fn replace_feed_languages(&mut self, map: &FeedLanguageMap<K>) -> Result<usize, Self::Error>;
}
