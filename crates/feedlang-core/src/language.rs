//! The fixed label set of the language-detection model.
//!
//! Class index `i` of the model's output decodes to `LABEL_SET[i]`. The order
//! is the one the model was trained with and must never be rearranged: every
//! decoded label depends on it, and nothing at runtime can tell a reordered
//! list from a correct one except [`crate::verify_label_order`] on the model's config.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of classes produced by the model.
pub const LABEL_COUNT: usize = 20;

/// A language the classifier can emit, as an ISO 639-1 code.
///
/// Variants are declared in class-index order, so the derived `Ord` is the
/// label-set order used for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ja,
    Nl,
    Ar,
    Pl,
    De,
    It,
    Pt,
    Tr,
    Es,
    Hi,
    El,
    Ur,
    Bg,
    En,
    Fr,
    Zh,
    Ru,
    Th,
    Sw,
    Vi,
}

/// Class index -> language, in the model's trained order.
pub const LABEL_SET: [Language; LABEL_COUNT] = [
    Language::Ja,
    Language::Nl,
    Language::Ar,
    Language::Pl,
    Language::De,
    Language::It,
    Language::Pt,
    Language::Tr,
    Language::Es,
    Language::Hi,
    Language::El,
    Language::Ur,
    Language::Bg,
    Language::En,
    Language::Fr,
    Language::Zh,
    Language::Ru,
    Language::Th,
    Language::Sw,
    Language::Vi,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LanguageError {
    #[error("class index {0} is outside the label set")]
    IndexOutOfRange(usize),
    #[error("unsupported language code: {0:?}")]
    UnknownCode(String),
}

impl Language {
    /// Decode a model class index.
    pub fn from_index(index: usize) -> Result<Self, LanguageError> {
        LABEL_SET
            .get(index)
            .copied()
            .ok_or(LanguageError::IndexOutOfRange(index))
    }

    /// Position of this language in the label set.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Ja => "ja",
            Self::Nl => "nl",
            Self::Ar => "ar",
            Self::Pl => "pl",
            Self::De => "de",
            Self::It => "it",
            Self::Pt => "pt",
            Self::Tr => "tr",
            Self::Es => "es",
            Self::Hi => "hi",
            Self::El => "el",
            Self::Ur => "ur",
            Self::Bg => "bg",
            Self::En => "en",
            Self::Fr => "fr",
            Self::Zh => "zh",
            Self::Ru => "ru",
            Self::Th => "th",
            Self::Sw => "sw",
            Self::Vi => "vi",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LABEL_SET
            .iter()
            .copied()
            .find(|lang| lang.code() == s)
            .ok_or_else(|| LanguageError::UnknownCode(s.to_string()))
    }
}
