//! Language-specific stemming backed by the Snowball algorithms.

use std::{borrow::Cow, fmt};

use rust_stemmers::{Algorithm, Stemmer};

use crate::config::Language;

/// Stemmer for a single language.
pub struct WordStemmer {
    language: Language,
    stemmer: Stemmer,
}

impl WordStemmer {
    /// Creates a stemmer for `language`, or `None` when the language has no
    /// stemming algorithm.
    pub fn new(language: Language) -> Option<WordStemmer> {
        let algorithm = match language {
            Language::Unspecified => return None,
            Language::Arabic => Algorithm::Arabic,
            Language::Danish => Algorithm::Danish,
            Language::Dutch => Algorithm::Dutch,
            Language::English => Algorithm::English,
            Language::Finnish => Algorithm::Finnish,
            Language::French => Algorithm::French,
            Language::German => Algorithm::German,
            Language::Greek => Algorithm::Greek,
            Language::Hungarian => Algorithm::Hungarian,
            Language::Italian => Algorithm::Italian,
            Language::Norwegian => Algorithm::Norwegian,
            Language::Portuguese => Algorithm::Portuguese,
            Language::Romanian => Algorithm::Romanian,
            Language::Russian => Algorithm::Russian,
            Language::Spanish => Algorithm::Spanish,
            Language::Swedish => Algorithm::Swedish,
            Language::Tamil => Algorithm::Tamil,
            Language::Turkish => Algorithm::Turkish,
        };
        Some(WordStemmer {
            language,
            stemmer: Stemmer::create(algorithm),
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn stem<'a>(&self, word: &'a str) -> Cow<'a, str> {
        self.stemmer.stem(word)
    }
}

impl fmt::Debug for WordStemmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordStemmer")
            .field("language", &self.language)
            .finish()
    }
}
