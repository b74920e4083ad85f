//! Data generation utilities for testing.
//!
//! This module generates deterministic synthetic documents: for a given seed
//! the same keys and texts are produced on every run.

/// Words used by [`DocumentGenerator`] unless a custom vocabulary is given.
///
/// The list mixes plain words, words sharing prefixes and suffixes, inflected
/// forms that stem to a common root, and a few stop words.
pub const DEFAULT_VOCABULARY: &[&str] = &[
    "apple", "applet", "application", "apply", "banana", "band", "bandana", "cat", "cats",
    "catalog", "dog", "dogs", "doghouse", "run", "running", "runner", "sing", "singing", "ring",
    "string", "strong", "stronger", "quick", "quicker", "brown", "fox", "foxes", "lazy", "jump",
    "jumped", "jumping", "river", "rivers", "sea", "seahorse", "horse", "horses", "the", "a",
    "and", "of", "to", "in",
];

const SEPARATORS: &[&str] = &[" ", " ", " ", ", ", ". ", "; ", " - ", "\t"];

/// Seeded generator of keys and short texts.
pub struct DocumentGenerator {
    rng: fastrand::Rng,
    vocabulary: Vec<String>,
}

impl DocumentGenerator {
    /// Creates a generator over [`DEFAULT_VOCABULARY`].
    pub fn new(seed: u64) -> DocumentGenerator {
        DocumentGenerator::with_vocabulary(seed, DEFAULT_VOCABULARY.iter().copied())
    }

    /// Creates a generator over a custom, non-empty vocabulary.
    pub fn with_vocabulary<'a>(
        seed: u64,
        vocabulary: impl IntoIterator<Item = &'a str>,
    ) -> DocumentGenerator {
        let vocabulary: Vec<String> = vocabulary.into_iter().map(str::to_string).collect();
        assert!(!vocabulary.is_empty());
        DocumentGenerator {
            rng: fastrand::Rng::with_seed(seed),
            vocabulary,
        }
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Key name for the `index`-th document.
    pub fn key(index: usize) -> String {
        format!("doc:{index:06}")
    }

    /// Picks a random word from the vocabulary, occasionally upper-cased.
    pub fn word(&mut self) -> String {
        let word = &self.vocabulary[self.rng.usize(..self.vocabulary.len())];
        if self.rng.u8(..10) == 0 {
            word.to_uppercase()
        } else {
            word.clone()
        }
    }

    /// Generates a text of `min_words..=max_words` words joined by assorted
    /// whitespace and punctuation.
    pub fn text(&mut self, min_words: usize, max_words: usize) -> String {
        let count = self.rng.usize(min_words..=max_words);
        let mut text = String::new();
        for i in 0..count {
            if i > 0 {
                text.push_str(SEPARATORS[self.rng.usize(..SEPARATORS.len())]);
            }
            text.push_str(&self.word());
        }
        text
    }

    /// Generates `count` `(key, text)` pairs with keys `doc:000000` onwards.
    pub fn documents(&mut self, count: usize, max_words: usize) -> Vec<(String, String)> {
        (0..count)
            .map(|i| (DocumentGenerator::key(i), self.text(0, max_words)))
            .collect()
    }

    /// Random index in `0..bound`.
    pub fn index(&mut self, bound: usize) -> usize {
        self.rng.usize(..bound)
    }

    /// Random boolean with probability `numerator / denominator`.
    pub fn chance(&mut self, numerator: u32, denominator: u32) -> bool {
        self.rng.u32(..denominator) < numerator
    }
}
