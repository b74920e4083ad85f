//! Query evaluation over a text field.
//!
//! A [`TextPredicate`] is resolved against the field's lexer and the shared
//! corpus into a lazy stream of matching keys. Matched terms are discovered
//! one at a time, and a term's posting list is snapshotted for this field only
//! when the stream reaches it. No term lock or trie lock is held between
//! items, so writers are never blocked for the duration of a query.

use std::{fmt, sync::Arc};

use ahash::AHashSet;
use sift_common::{Result, error::Error};

use crate::{
    field_index::TextFieldIndex,
    key::{FieldId, Key, Term},
    postings::Postings,
};

/// Text match operand of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPredicate {
    /// Exact term, normalized like indexed text (stop words, stemming).
    Term(String),
    /// Terms starting with the operand.
    ///
    /// Affix operands are only case folded and are matched against the
    /// indexed, possibly stemmed, terms. With stemming on, `runn*` does not
    /// match text containing "running" (indexed as `run`) while `run*` does.
    Prefix(String),
    /// Terms ending with the operand. Needs a field with suffix search.
    ///
    /// Like [`TextPredicate::Prefix`], the operand is not stemmed and is
    /// matched against stemmed terms when stemming is on.
    Suffix(String),
    /// Terms starting with `prefix` and ending with `suffix`.
    Wildcard { prefix: String, suffix: String },
    /// Terms containing the operand anywhere.
    Infix(String),
}

impl TextPredicate {
    /// Parses a single query word: `word`, `pre*`, `*suf`, `pre*suf` or
    /// `*mid*`. A backslash escapes a literal `*`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for empty patterns, patterns made of
    /// wildcards only, and wildcard shapes other than the ones above.
    pub fn parse(pattern: &str) -> Result<TextPredicate> {
        let parts = split_unescaped_stars(pattern);
        let invalid = || {
            Error::invalid_arg(
                "pattern",
                format!("unsupported text pattern {pattern:?}"),
            )
        };
        let predicate = match parts.as_slice() {
            [word] if !word.is_empty() => TextPredicate::Term(word.to_string()),
            [prefix, suffix] => match (prefix.is_empty(), suffix.is_empty()) {
                (false, true) => TextPredicate::Prefix(prefix.to_string()),
                (true, false) => TextPredicate::Suffix(suffix.to_string()),
                (false, false) => TextPredicate::Wildcard {
                    prefix: prefix.to_string(),
                    suffix: suffix.to_string(),
                },
                (true, true) => return Err(invalid()),
            },
            [lead, middle, trail] if lead.is_empty() && trail.is_empty() && !middle.is_empty() => {
                TextPredicate::Infix(middle.to_string())
            }
            _ => return Err(invalid()),
        };
        Ok(predicate)
    }
}

fn split_unescaped_stars(pattern: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in pattern.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '*' => {
                parts.push(&pattern[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&pattern[start..]);
    parts
}

impl fmt::Display for TextPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextPredicate::Term(word) => write!(f, "{word}"),
            TextPredicate::Prefix(prefix) => write!(f, "{prefix}*"),
            TextPredicate::Suffix(suffix) => write!(f, "*{suffix}"),
            TextPredicate::Wildcard { prefix, suffix } => write!(f, "{prefix}*{suffix}"),
            TextPredicate::Infix(middle) => write!(f, "*{middle}*"),
        }
    }
}

type PostingsIter<'a> = Box<dyn Iterator<Item = Arc<Postings>> + 'a>;

/// Lazy stream of keys matching a query, produced by
/// [`TextFieldIndex::search`].
pub struct SearchResults<'a> {
    inner: Results<'a>,
}

enum Results<'a> {
    Positive(MatchingKeys<'a>),
    Negated(std::vec::IntoIter<Key>),
}

struct MatchingKeys<'a> {
    field: FieldId,
    postings: PostingsIter<'a>,
    pending: std::vec::IntoIter<Key>,
    seen: AHashSet<Key>,
}

impl Iterator for MatchingKeys<'_> {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        loop {
            for key in self.pending.by_ref() {
                if self.seen.insert(key.clone()) {
                    return Some(key);
                }
            }
            let postings = self.postings.next()?;
            self.pending = postings.keys_for_field(self.field).into_iter();
        }
    }
}

impl Iterator for SearchResults<'_> {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        match &mut self.inner {
            Results::Positive(matches) => matches.next(),
            Results::Negated(keys) => keys.next(),
        }
    }
}

impl TextFieldIndex {
    /// Evaluates `predicate` against this field.
    ///
    /// Each matching key is yielded once. With `negate`, the positive set is
    /// materialized first and every key tracked by the field that is not in it
    /// is yielded instead. An operand that normalizes to nothing (a stop word,
    /// for instance) matches no key.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error for suffix predicates on a field
    /// without suffix search.
    pub fn search(&self, predicate: &TextPredicate, negate: bool) -> Result<SearchResults<'_>> {
        let postings = self.matching_postings(predicate)?;
        let matches = MatchingKeys {
            field: self.field_number(),
            postings,
            pending: Vec::new().into_iter(),
            seen: AHashSet::new(),
        };
        let inner = if negate {
            let positive: AHashSet<Key> = matches.collect();
            let complement: Vec<Key> = self
                .tracked_keys()
                .into_iter()
                .filter(|key| !positive.contains(key))
                .collect();
            Results::Negated(complement.into_iter())
        } else {
            Results::Positive(matches)
        };
        Ok(SearchResults { inner })
    }

    fn matching_postings(&self, predicate: &TextPredicate) -> Result<PostingsIter<'_>> {
        let lexer = self.lexer();
        let corpus = self.corpus();
        let iter: PostingsIter<'_> = match predicate {
            TextPredicate::Term(word) => match lexer.normalize_term(word) {
                Some(term) => Box::new(corpus.lookup(&term).into_iter()),
                None => no_postings(),
            },
            TextPredicate::Prefix(prefix) => {
                let prefix = lexer.normalize_affix(prefix);
                if prefix.is_empty() {
                    return Ok(no_postings());
                }
                Box::new(corpus.prefix_terms(&prefix).map(|(_, postings)| postings))
            }
            TextPredicate::Suffix(suffix) => {
                if !self.supports_suffix_search() {
                    return Err(Error::invalid_operation(format!(
                        "suffix search on text field {} without a suffix trie",
                        self.field_number()
                    )));
                }
                let suffix = lexer.normalize_affix(suffix);
                if suffix.is_empty() {
                    return Ok(no_postings());
                }
                Box::new(corpus.suffix_terms(&suffix)?.map(|(_, postings)| postings))
            }
            TextPredicate::Wildcard { prefix, suffix } => {
                let prefix = lexer.normalize_affix(prefix);
                let suffix = lexer.normalize_affix(suffix);
                if prefix.is_empty() && suffix.is_empty() {
                    return Ok(no_postings());
                }
                let min_len = prefix.len() + suffix.len();
                Box::new(
                    corpus
                        .prefix_terms(&prefix)
                        .filter(move |(term, _)| term.len() >= min_len && term.ends_with(&suffix))
                        .map(|(_, postings)| postings),
                )
            }
            TextPredicate::Infix(middle) => {
                let middle = lexer.normalize_affix(middle);
                if middle.is_empty() {
                    return Ok(no_postings());
                }
                Box::new(
                    corpus
                        .all_terms()
                        .filter(move |(term, _)| contains_subslice(term, &middle))
                        .map(|(_, postings)| postings),
                )
            }
        };
        Ok(iter)
    }
}

fn no_postings<'a>() -> PostingsIter<'a> {
    Box::new(std::iter::empty())
}

fn contains_subslice(term: &Term, needle: &[u8]) -> bool {
    term.windows(needle.len()).any(|window| window == needle)
}
