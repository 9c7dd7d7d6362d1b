//! Language sync cycle: classify pending articles, then relabel feeds.

use std::time::Instant;

use anyhow::Context;
use feedlang_ai::{LogitScorer, classify_all};
use feedlang_core::{FeedLanguageMap, FeedLanguageSink, aggregate_feeds};
use feedlang_store::FeedStore;
use tracing::info;

pub struct CycleReport {
    /// Articles that received a language this cycle.
    pub classified: usize,
    /// `(article id, error)` for every article that could not be classified.
    pub failed: Vec<(String, String)>,
    pub feeds: FeedLanguageMap,
    pub feeds_updated: usize,
    pub elapsed_secs: f64,
}

/// Run one cycle against `store`.
///
/// A failed article keeps its NULL language and is retried next cycle. Feed
/// languages are recomputed from every labelled article, not only the ones
/// classified in this cycle.
pub fn run_language_cycle<S>(store: &mut FeedStore, scorer: &S) -> anyhow::Result<CycleReport>
where
    S: LogitScorer + ?Sized,
{
    let start = Instant::now();
    store
        .require_tables()
        .context("feed database is missing its tables")?;

    // 1. Classify articles without a language.
    let pending = store
        .pending_articles()
        .context("reading pending articles")?;
    eprintln!("  {} articles to classify", pending.len());

    let docs = pending
        .iter()
        .map(|a| (a.id.as_str(), a.content.as_str()));
    let mut labels = Vec::with_capacity(pending.len());
    let mut failed = Vec::new();
    for (id, result) in classify_all(docs, scorer) {
        match result {
            Ok(lang) => labels.push((id.to_string(), lang)),
            Err(e) => failed.push((id.to_string(), e.to_string())),
        }
    }

    // 2. Persist article labels.
    store
        .set_article_languages(&labels)
        .context("storing article languages")?;

    // 3. Majority vote per feed, written as one unit.
    let by_feed = store
        .article_languages_by_feed()
        .context("reading article languages")?;
    let feeds = aggregate_feeds(by_feed);
    let feeds_updated = store
        .replace_feed_languages(&feeds)
        .context("storing feed languages")?;

    let elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        classified = labels.len(),
        failed = failed.len(),
        feeds_updated,
        elapsed_secs,
        "language cycle complete"
    );
    Ok(CycleReport {
        classified: labels.len(),
        failed,
        feeds,
        feeds_updated,
        elapsed_secs,
    })
}
