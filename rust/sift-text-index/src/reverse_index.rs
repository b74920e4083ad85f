//! Per-field mapping from a tracked key to the set of terms it contributes.

use std::{collections::BTreeSet, sync::RwLock};

use ahash::AHashMap;

use crate::key::{Key, Term};

/// Reverse-by-key index of one text field.
///
/// A key is tracked while it has an entry, even when its term set is empty
/// (a record whose text produced no terms). Mutations are serialized per key
/// by the owning field index.
#[derive(Debug, Default)]
pub struct ReverseIndex {
    entries: RwLock<AHashMap<Key, BTreeSet<Term>>>,
}

impl ReverseIndex {
    pub fn new() -> ReverseIndex {
        ReverseIndex::default()
    }

    pub fn get(&self, key: &Key) -> Option<BTreeSet<Term>> {
        self.entries.read().unwrap().get(key).cloned()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.entries.read().unwrap().contains_key(key)
    }

    /// Sets the term set of `key`, returning the previous one.
    pub fn insert(&self, key: Key, terms: BTreeSet<Term>) -> Option<BTreeSet<Term>> {
        self.entries.write().unwrap().insert(key, terms)
    }

    pub fn remove(&self, key: &Key) -> Option<BTreeSet<Term>> {
        self.entries.write().unwrap().remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the tracked keys, in key order.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.entries.read().unwrap().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Snapshot of all entries, in key order.
    pub fn entries(&self) -> Vec<(Key, BTreeSet<Term>)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .unwrap()
            .iter()
            .map(|(key, terms)| (key.clone(), terms.clone()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of (key, term) pairs.
    pub fn term_occurrences(&self) -> usize {
        self.entries.read().unwrap().values().map(BTreeSet::len).sum()
    }
}
