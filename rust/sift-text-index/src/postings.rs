//! Posting list of a single term.

use std::{collections::BTreeMap, sync::RwLock};

use crate::key::{FieldId, Key, Position};

/// Keys containing a term, with the fields and positions of each occurrence.
///
/// One posting list exists per term in the corpus and is shared by the prefix
/// and suffix tries. It is mutated only while the caller holds the term lock;
/// its own `RwLock` lets readers take consistent snapshots concurrently.
/// Positions are kept sorted and deduplicated. An empty position list marks
/// presence when offsets are disabled.
#[derive(Debug, Default)]
pub struct Postings {
    entries: RwLock<BTreeMap<Key, BTreeMap<FieldId, Vec<Position>>>>,
}

impl Postings {
    pub fn new() -> Postings {
        Postings::default()
    }

    /// Records the occurrence of the term in `field` of `key`, replacing any
    /// positions previously recorded for that pair.
    pub fn set(&self, key: &Key, field: FieldId, mut positions: Vec<Position>) {
        positions.sort_unstable();
        positions.dedup();
        self.entries
            .write()
            .unwrap()
            .entry(key.clone())
            .or_default()
            .insert(field, positions);
    }

    /// Removes the occurrence of the term in `field` of `key`. Returns `false`
    /// if there was none.
    pub fn remove(&self, key: &Key, field: FieldId) -> bool {
        let mut entries = self.entries.write().unwrap();
        let Some(fields) = entries.get_mut(key) else {
            return false;
        };
        let removed = fields.remove(&field).is_some();
        if fields.is_empty() {
            entries.remove(key);
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    pub fn key_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Total number of (key, field) occurrences.
    pub fn occurrence_count(&self) -> usize {
        self.entries.read().unwrap().values().map(BTreeMap::len).sum()
    }

    pub fn contains(&self, key: &Key, field: FieldId) -> bool {
        self.entries
            .read()
            .unwrap()
            .get(key)
            .is_some_and(|fields| fields.contains_key(&field))
    }

    pub fn positions(&self, key: &Key, field: FieldId) -> Option<Vec<Position>> {
        self.entries
            .read()
            .unwrap()
            .get(key)
            .and_then(|fields| fields.get(&field).cloned())
    }

    /// Snapshot of the keys having an occurrence in `field`, in key order.
    pub fn keys_for_field(&self, field: FieldId) -> Vec<Key> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|(_, fields)| fields.contains_key(&field))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn fields_for_key(&self, key: &Key) -> Vec<FieldId> {
        self.entries
            .read()
            .unwrap()
            .get(key)
            .map(|fields| fields.keys().copied().collect())
            .unwrap_or_default()
    }
}
