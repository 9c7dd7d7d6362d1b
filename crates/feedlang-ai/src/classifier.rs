//! Single-document language classification.
//!
//! A document is cut to its first [`MAX_CHARS`] characters, scored by the
//! model in one forward pass, and the highest-scoring class is decoded
//! through the label set. The cut is by Unicode scalar value, before
//! tokenization, so it bounds the input text and not the token count.

use feedlang_core::{LABEL_COUNT, Language};
use tracing::{debug, info, warn};

use crate::error::{ClassifyError, SelfCheckError};

/// Characters of a document that take part in classification.
pub const MAX_CHARS: usize = 512;

/// Something that turns text into one logit per label-set entry.
///
/// [`crate::ModelHandle`] is the production implementation. Implementations
/// must not mutate model state: the same text always yields the same logits.
pub trait LogitScorer {
    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifyError>;
}

/// Classify one document.
pub fn classify<S>(text: &str, scorer: &S) -> Result<Language, ClassifyError>
where
    S: LogitScorer + ?Sized,
{
    let text = truncate_chars(text, MAX_CHARS);
    let logits = scorer.logits(text)?;
    if logits.len() != LABEL_COUNT {
        return Err(ClassifyError::LogitCount {
            expected: LABEL_COUNT,
            actual: logits.len(),
        });
    }
    let index = argmax(&logits).ok_or(ClassifyError::InvalidLogits)?;
    let lang = Language::from_index(index)?;
    debug!(%lang, bytes = text.len(), "classified document");
    Ok(lang)
}

/// Classify many documents, one at a time.
///
/// Each document is independent: a failure is reported against its own key
/// and the remaining documents are still classified.
pub fn classify_all<'a, K, I, S>(docs: I, scorer: &S) -> Vec<(K, Result<Language, ClassifyError>)>
where
    I: IntoIterator<Item = (K, &'a str)>,
    S: LogitScorer + ?Sized,
{
    docs.into_iter()
        .map(|(key, text)| {
            let result = classify(text, scorer);
            if let Err(e) = &result {
                warn!(error = %e, "document classification failed");
            }
            (key, result)
        })
        .collect()
}

/// Classify each canary and compare with its known language.
///
/// Run once after loading a model and before trusting it with real
/// documents. Stops at the first canary that fails.
pub fn self_check<S>(scorer: &S, canaries: &[(&str, Language)]) -> Result<(), SelfCheckError>
where
    S: LogitScorer + ?Sized,
{
    for &(text, expected) in canaries {
        let actual = classify(text, scorer).map_err(|source| SelfCheckError::Classify {
            text: text.to_string(),
            source,
        })?;
        if actual != expected {
            return Err(SelfCheckError::Mismatch {
                text: text.to_string(),
                expected,
                actual,
            });
        }
    }
    info!(canaries = canaries.len(), "model self-check passed");
    Ok(())
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => &text[..byte_offset],
        None => text,
    }
}

/// Index of the largest score; the lowest index wins a tie.
///
/// NaN scores are never selected. Returns `None` if every score is NaN.
fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}
