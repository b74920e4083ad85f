//! Record lifecycle of a single text field.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use serde::Serialize;
use sift_common::{Result, error::Error};

use crate::{
    config::{FieldTextConfig, SchemaTextConfig, TextFieldConfig},
    key::{FieldId, Key, Position, Term, display_term},
    lexer::Lexer,
    lock_table::LockTable,
    reverse_index::ReverseIndex,
    text_index::{TermMutation, TextIndex},
};

/// Why a record is being removed from the index.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DeletionType {
    /// The field value disappeared or the index is being dropped.
    #[default]
    None,
    /// The record was deleted from the store.
    Deleted,
    /// The record expired.
    Expired,
}

/// Diagnostic counters of a text field index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIndexInfo {
    pub field: FieldId,
    /// Number of tracked records.
    pub num_records: usize,
    /// Number of distinct terms in the shared corpus.
    pub num_corpus_terms: usize,
    /// Number of distinct terms contributed by this field.
    pub num_field_terms: usize,
    /// Number of (record, term) pairs of this field.
    pub num_term_occurrences: usize,
    pub with_suffix_trie: bool,
    pub records_deleted: u64,
    pub records_expired: u64,
    pub config: TextFieldConfig,
}

#[derive(Debug, Default)]
struct FieldStats {
    deleted: AtomicU64,
    expired: AtomicU64,
}

/// Inverted index of one text field.
///
/// Term occurrences live in the corpus shared by every field of the schema;
/// the field keeps its own reverse-by-key index so that a record can be
/// removed or modified without re-tokenizing its previous text. Operations on
/// the same key are serialized through the key lock table. The key lock is
/// always taken before any term lock.
#[derive(Debug)]
pub struct TextFieldIndex {
    field: FieldId,
    config: TextFieldConfig,
    lexer: Lexer,
    corpus: Arc<TextIndex>,
    reverse: ReverseIndex,
    key_locks: LockTable,
    stats: FieldStats,
}

impl TextFieldIndex {
    /// Creates a standalone field index with a private corpus.
    pub fn new(schema: &SchemaTextConfig, field: &FieldTextConfig) -> Result<TextFieldIndex> {
        let config = TextFieldConfig::resolve(schema, field)?;
        let corpus = Arc::new(TextIndex::new(
            config.with_suffix_trie,
            config.limits.lock_shards,
        )?);
        TextFieldIndex::with_corpus(0, config, corpus)
    }

    /// Creates a field index on top of a shared corpus.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-argument error if the field asks for suffix
    /// search but the corpus has no suffix trie, or if the lexer cannot be
    /// built from the configuration.
    pub(crate) fn with_corpus(
        field: FieldId,
        config: TextFieldConfig,
        corpus: Arc<TextIndex>,
    ) -> Result<TextFieldIndex> {
        if config.with_suffix_trie && !corpus.has_suffix_trie() {
            return Err(Error::invalid_arg(
                "with_suffix_trie",
                "the schema corpus does not maintain a suffix trie",
            ));
        }
        let lexer = Lexer::new(&config)?;
        let key_locks = LockTable::new(config.limits.lock_shards)?;
        Ok(TextFieldIndex {
            field,
            config,
            lexer,
            corpus,
            reverse: ReverseIndex::new(),
            key_locks,
            stats: FieldStats::default(),
        })
    }

    pub fn field_number(&self) -> FieldId {
        self.field
    }

    pub fn config(&self) -> &TextFieldConfig {
        &self.config
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    pub fn corpus(&self) -> &Arc<TextIndex> {
        &self.corpus
    }

    /// Suffix search is available when the field asked for it.
    pub fn supports_suffix_search(&self) -> bool {
        self.config.with_suffix_trie
    }

    pub fn is_tracked(&self, key: &Key) -> bool {
        self.reverse.contains(key)
    }

    pub fn record_count(&self) -> usize {
        self.reverse.len()
    }

    /// Calls `f` for every key tracked at the time of the call.
    pub fn for_each_tracked_key(&self, mut f: impl FnMut(&Key)) {
        for key in self.reverse.keys() {
            f(&key);
        }
    }

    pub(crate) fn tracked_keys(&self) -> Vec<Key> {
        self.reverse.keys()
    }

    /// Tokenizes `text` into distinct terms with their positions, enforcing
    /// the configured limits.
    fn analyze(&self, text: &[u8]) -> Result<BTreeMap<Term, Vec<Position>>> {
        let limits = &self.config.limits;
        let mut terms: BTreeMap<Term, Vec<Position>> = BTreeMap::new();
        for token in self.lexer.tokenize(text) {
            if token.term.len() > limits.max_term_length {
                return Err(Error::limit_exceeded(
                    format!("length of term {:?}", display_term(&token.term)),
                    token.term.len(),
                    limits.max_term_length,
                ));
            }
            if !terms.contains_key(&token.term) && terms.len() >= limits.max_terms_per_record {
                return Err(Error::limit_exceeded(
                    "distinct terms per record",
                    terms.len() + 1,
                    limits.max_terms_per_record,
                ));
            }
            let positions = terms.entry(token.term).or_default();
            if self.config.with_offsets {
                positions.push(token.position);
            }
        }
        Ok(terms)
    }

    /// Indexes the text of a record.
    ///
    /// Returns `true` if the key was not tracked before. A key that is already
    /// tracked is modified instead and `false` is returned. Text that produces
    /// no terms still makes the key tracked.
    ///
    /// # Errors
    ///
    /// Returns a limit-exceeded error, leaving the index untouched, if the text
    /// contains an overlong term or too many distinct terms.
    pub fn add_record(&self, key: &Key, text: &[u8]) -> Result<bool> {
        let terms = self.analyze(text)?;
        let _key_guard = self.key_locks.lock(key.as_bytes());
        if let Some(previous) = self.reverse.get(key) {
            log::debug!("field {}: add of tracked key {key} becomes modify", self.field);
            self.replace_terms(key, &previous, terms)?;
            return Ok(false);
        }
        let mutations: BTreeMap<Term, TermMutation> = terms
            .into_iter()
            .map(|(term, positions)| (term, TermMutation::Set(positions)))
            .collect();
        self.corpus.apply(key, self.field, &mutations)?;
        log::debug!(
            "field {}: added key {key} with {} terms",
            self.field,
            mutations.len()
        );
        self.reverse.insert(key.clone(), mutations.into_keys().collect());
        Ok(true)
    }

    /// Removes every occurrence contributed by `key` and stops tracking it.
    /// Returns `false` if the key was not tracked.
    pub fn remove_record(&self, key: &Key, deletion: DeletionType) -> Result<bool> {
        let _key_guard = self.key_locks.lock(key.as_bytes());
        let Some(terms) = self.reverse.get(key) else {
            return Ok(false);
        };
        let mutations: BTreeMap<Term, TermMutation> = terms
            .into_iter()
            .map(|term| (term, TermMutation::Remove))
            .collect();
        self.corpus.apply(key, self.field, &mutations)?;
        self.reverse.remove(key);
        match deletion {
            DeletionType::None => {}
            DeletionType::Deleted => {
                self.stats.deleted.fetch_add(1, Ordering::Relaxed);
            }
            DeletionType::Expired => {
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
            }
        }
        log::debug!("field {}: removed key {key} ({deletion:?})", self.field);
        Ok(true)
    }

    /// Re-indexes a tracked record with new text.
    ///
    /// Terms that disappear are removed, new terms are added, and terms
    /// present in both versions have their positions replaced without ever
    /// being absent from the index. Returns `false` if the key is not tracked.
    pub fn modify_record(&self, key: &Key, text: &[u8]) -> Result<bool> {
        let terms = self.analyze(text)?;
        let _key_guard = self.key_locks.lock(key.as_bytes());
        let Some(previous) = self.reverse.get(key) else {
            return Ok(false);
        };
        self.replace_terms(key, &previous, terms)?;
        Ok(true)
    }

    fn replace_terms(
        &self,
        key: &Key,
        previous: &BTreeSet<Term>,
        terms: BTreeMap<Term, Vec<Position>>,
    ) -> Result<()> {
        let mut mutations: BTreeMap<Term, TermMutation> = previous
            .iter()
            .filter(|term| !terms.contains_key(*term))
            .map(|term| (term.clone(), TermMutation::Remove))
            .collect();
        let removed = mutations.len();
        let current: BTreeSet<Term> = terms.keys().cloned().collect();
        mutations.extend(
            terms
                .into_iter()
                .map(|(term, positions)| (term, TermMutation::Set(positions))),
        );
        self.corpus.apply(key, self.field, &mutations)?;
        log::debug!(
            "field {}: modified key {key}, {removed} terms removed, {} terms now",
            self.field,
            current.len()
        );
        self.reverse.insert(key.clone(), current);
        Ok(())
    }

    /// Terms and positions contributed by `key`, read under the key lock.
    pub(crate) fn snapshot_record(&self, key: &Key) -> Result<Option<Vec<(Term, Vec<Position>)>>> {
        let _key_guard = self.key_locks.lock(key.as_bytes());
        let Some(terms) = self.reverse.get(key) else {
            return Ok(None);
        };
        let mut record = Vec::with_capacity(terms.len());
        for term in terms {
            let positions = self
                .corpus
                .lookup(&term)
                .and_then(|postings| postings.positions(key, self.field))
                .ok_or_else(|| {
                    Error::inconsistency(format!(
                        "key {key} lists term {:?} without an occurrence",
                        display_term(&term)
                    ))
                })?;
            record.push((term, positions));
        }
        Ok(Some(record))
    }

    /// Re-creates a record from previously saved terms, bypassing the lexer.
    pub(crate) fn restore_record(
        &self,
        key: &Key,
        terms: BTreeMap<Term, Vec<Position>>,
    ) -> Result<()> {
        let _key_guard = self.key_locks.lock(key.as_bytes());
        if self.reverse.contains(key) {
            return Err(Error::invalid_format(
                "records",
                format!("duplicate key {key} in snapshot"),
            ));
        }
        let mutations: BTreeMap<Term, TermMutation> = terms
            .into_iter()
            .map(|(term, positions)| (term, TermMutation::Set(positions)))
            .collect();
        self.corpus.apply(key, self.field, &mutations)?;
        self.reverse.insert(key.clone(), mutations.into_keys().collect());
        Ok(())
    }

    pub fn info(&self) -> FieldIndexInfo {
        let entries = self.reverse.entries();
        let field_terms: BTreeSet<&Term> = entries.iter().flat_map(|(_, terms)| terms).collect();
        FieldIndexInfo {
            field: self.field,
            num_records: entries.len(),
            num_corpus_terms: self.corpus.term_count(),
            num_field_terms: field_terms.len(),
            num_term_occurrences: entries.iter().map(|(_, terms)| terms.len()).sum(),
            with_suffix_trie: self.corpus.has_suffix_trie(),
            records_deleted: self.stats.deleted.load(Ordering::Relaxed),
            records_expired: self.stats.expired.load(Ordering::Relaxed),
            config: self.config.clone(),
        }
    }

    /// Verifies, in both directions, that the reverse-by-key index and the
    /// corpus posting lists agree for this field, and checks the corpus
    /// invariants. Intended for quiescent states.
    pub fn check_consistency(&self) -> Result<()> {
        let result = self.check_consistency_inner();
        if let Err(e) = &result {
            log::error!("field {}: consistency check failed: {e}", self.field);
        }
        result
    }

    fn check_consistency_inner(&self) -> Result<()> {
        self.corpus.check_consistency()?;
        for (key, terms) in self.reverse.entries() {
            for term in &terms {
                let present = self
                    .corpus
                    .lookup(term)
                    .is_some_and(|postings| postings.contains(&key, self.field));
                if !present {
                    return Err(Error::inconsistency(format!(
                        "key {key} lists term {:?} in field {} but the posting list does not",
                        display_term(term),
                        self.field
                    )));
                }
            }
        }
        for (term, postings) in self.corpus.all_terms() {
            for key in postings.keys_for_field(self.field) {
                let listed = self
                    .reverse
                    .get(&key)
                    .is_some_and(|terms| terms.contains(&term));
                if !listed {
                    return Err(Error::inconsistency(format!(
                        "posting list of {:?} holds key {key} in field {} without a reverse entry",
                        display_term(&term),
                        self.field
                    )));
                }
            }
        }
        Ok(())
    }
}
