//! Normalizer and tokenizer for text field values.
//!
//! The lexer turns raw field bytes into a stream of [`Token`]s. Words are split
//! on configured punctuation, ASCII whitespace and control bytes, and (for
//! UTF-8 input) any Unicode whitespace. A backslash escapes the next character
//! so that punctuation can be indexed as part of a word. Each word is then case
//! folded, checked against the stop-word list, and stemmed when it is long
//! enough. Words that normalize to nothing are dropped.
//!
//! Input that is not valid UTF-8 is not rejected. It is scanned byte by byte
//! with ASCII-only case folding instead.

use std::{borrow::Cow, ops::Range};

use ahash::AHashSet;
use sift_common::Result;

use crate::{
    config::{PositionGranularity, TextFieldConfig},
    key::{Position, Term},
};

pub mod punctuation;
pub mod stemmer;

use punctuation::{ESCAPE, PunctuationBitmap};
use stemmer::WordStemmer;

/// A normalized term together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: Term,
    /// Position in the unit selected by the field's position granularity.
    pub position: Position,
    /// Byte range of the raw word (escapes included) in the input.
    pub location: Range<usize>,
}

/// Per-field text normalizer, immutable after construction.
#[derive(Debug)]
pub struct Lexer {
    punctuation: PunctuationBitmap,
    stop_words: AHashSet<Vec<u8>>,
    stemmer: Option<WordStemmer>,
    min_stem_size: usize,
    case_folding: bool,
    granularity: PositionGranularity,
}

impl Lexer {
    /// Builds a lexer from a resolved field configuration.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-argument error if the punctuation set contains
    /// non-ASCII characters.
    pub fn new(config: &TextFieldConfig) -> Result<Lexer> {
        let punctuation = PunctuationBitmap::new(&config.punctuation)?;
        let stop_words = config
            .stop_words
            .iter()
            .map(|word| fold_case(word.as_bytes()).into_owned())
            .filter(|word| !word.is_empty())
            .collect();
        let stemmer = if config.stemming {
            WordStemmer::new(config.language)
        } else {
            None
        };
        Ok(Lexer {
            punctuation,
            stop_words,
            stemmer,
            min_stem_size: config.min_stem_size as usize,
            case_folding: config.case_folding,
            granularity: config.position_granularity,
        })
    }

    /// Returns a lazy iterator over the tokens of `text`.
    ///
    /// The iterator is finite and deterministic: tokenizing the same input with
    /// the same lexer always yields the same sequence.
    pub fn tokenize<'a>(&'a self, text: &'a [u8]) -> Tokens<'a> {
        let str_text = match std::str::from_utf8(text) {
            Ok(s) => Some(s),
            Err(e) => {
                log::warn!(
                    "text is not valid UTF-8 ({e}), falling back to byte tokenization"
                );
                None
            }
        };
        Tokens {
            lexer: self,
            text,
            str_text,
            cursor: 0,
            chars_before_cursor: 0,
            word_ordinal: 0,
        }
    }

    /// Normalizes a single query word the same way indexed words are
    /// normalized. Returns `None` for stop words and empty results.
    pub fn normalize_term(&self, word: &str) -> Option<Term> {
        self.normalize_word(&unescape(word.as_bytes()))
    }

    /// Normalizes a prefix, suffix or wildcard operand. Only case folding is
    /// applied, so that an affix matches the indexed forms it is a part of.
    pub fn normalize_affix(&self, word: &str) -> Term {
        let word = unescape(word.as_bytes());
        if self.case_folding {
            fold_case(&word).into_owned()
        } else {
            word
        }
    }

    /// Stop words match case-insensitively, whether or not indexed terms are
    /// case folded.
    pub fn is_stop_word(&self, word: &[u8]) -> bool {
        !self.stop_words.is_empty() && self.stop_words.contains(fold_case(word).as_ref())
    }

    pub fn is_stemming(&self) -> bool {
        self.stemmer.is_some()
    }

    pub fn position_granularity(&self) -> PositionGranularity {
        self.granularity
    }

    fn normalize_word(&self, word: &[u8]) -> Option<Term> {
        if word.is_empty() {
            return None;
        }
        let folded = if self.case_folding {
            fold_case(word)
        } else {
            Cow::Borrowed(word)
        };
        if self.is_stop_word(&folded) {
            return None;
        }
        let term = match (&self.stemmer, std::str::from_utf8(&folded)) {
            (Some(stemmer), Ok(s)) if s.chars().count() >= self.min_stem_size => {
                stemmer.stem(s).into_owned().into_bytes()
            }
            _ => folded.into_owned(),
        };
        (!term.is_empty()).then_some(term)
    }
}

fn fold_case(word: &[u8]) -> Cow<'_, [u8]> {
    match std::str::from_utf8(word) {
        Ok(s) if s.bytes().all(|b| !b.is_ascii_uppercase()) && s.is_ascii() => Cow::Borrowed(word),
        Ok(s) => Cow::Owned(s.to_lowercase().into_bytes()),
        Err(_) => Cow::Owned(word.to_ascii_lowercase()),
    }
}

/// Resolves backslash escapes. A trailing lone backslash is dropped.
fn unescape(word: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(word.len());
    let mut bytes = word.iter().copied();
    while let Some(b) = bytes.next() {
        if b == ESCAPE {
            if let Some(escaped) = bytes.next() {
                out.push(escaped);
            }
        } else {
            out.push(b);
        }
    }
    out
}

/// Lazy token iterator produced by [`Lexer::tokenize`].
#[derive(Clone)]
pub struct Tokens<'a> {
    lexer: &'a Lexer,
    text: &'a [u8],
    /// Set when `text` is valid UTF-8; scanning is then done per character.
    str_text: Option<&'a str>,
    cursor: usize,
    chars_before_cursor: usize,
    word_ordinal: usize,
}

impl Tokens<'_> {
    /// Returns whether the unit at `at` is a separator, and its width in bytes.
    fn scan_unit(&self, at: usize) -> (bool, usize) {
        match self.str_text {
            Some(s) => match s[at..].chars().next() {
                Some(c) => (self.lexer.punctuation.is_separator(c), c.len_utf8()),
                None => (true, 1),
            },
            None => (self.lexer.punctuation.contains(self.text[at]), 1),
        }
    }

    fn advance(&mut self, bytes: usize, chars: usize) {
        self.cursor += bytes;
        self.chars_before_cursor += chars;
    }

    fn skip_separators(&mut self) {
        let len = self.text.len();
        while self.cursor < len {
            if self.text[self.cursor] == ESCAPE {
                if self.cursor + 1 < len {
                    break;
                }
                self.advance(1, 1);
                continue;
            }
            let (separator, width) = self.scan_unit(self.cursor);
            if !separator {
                break;
            }
            self.advance(width, 1);
        }
    }

    fn gather_word(&mut self) -> Vec<u8> {
        let len = self.text.len();
        let mut word = Vec::new();
        while self.cursor < len {
            if self.text[self.cursor] == ESCAPE {
                if self.cursor + 1 >= len {
                    self.advance(1, 1);
                    break;
                }
                let (_, width) = self.scan_unit(self.cursor + 1);
                let escaped = self.cursor + 1..self.cursor + 1 + width;
                word.extend_from_slice(&self.text[escaped]);
                self.advance(1 + width, 2);
                continue;
            }
            let (separator, width) = self.scan_unit(self.cursor);
            if separator {
                break;
            }
            word.extend_from_slice(&self.text[self.cursor..self.cursor + width]);
            self.advance(width, 1);
        }
        word
    }
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            self.skip_separators();
            if self.cursor >= self.text.len() {
                return None;
            }
            let start = self.cursor;
            let start_char = self.chars_before_cursor;
            let ordinal = self.word_ordinal;
            let word = self.gather_word();
            self.word_ordinal += 1;

            if let Some(term) = self.lexer.normalize_word(&word) {
                let position = match self.lexer.granularity {
                    PositionGranularity::Byte => start,
                    PositionGranularity::Char => start_char,
                    PositionGranularity::Word => ordinal,
                };
                return Some(Token {
                    term,
                    position: Position::try_from(position).unwrap_or(Position::MAX),
                    location: start..self.cursor,
                });
            }
        }
    }
}
