//! Shared term corpus: the prefix trie, the optional suffix trie, and the term
//! lock table that keeps the two in step.

use std::{collections::BTreeMap, sync::Arc};

use sift_common::{Result, error::Error, verify_arg};

use crate::{
    key::{FieldId, Key, Position, Term, display_term},
    lock_table::LockTable,
    postings::Postings,
    radix_tree::{MatchingTerms, PrefixTree, SuffixTree},
};

/// A pending change to one term's posting list for a single (key, field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermMutation {
    /// Record the occurrence, replacing earlier positions.
    Set(Vec<Position>),
    /// Drop the occurrence.
    Remove,
}

/// Term corpus shared by every text field of a schema.
///
/// Every term maps to exactly one [`Postings`] instance, referenced from the
/// prefix trie and, when enabled, from the suffix trie. A posting list is
/// created together with its trie entries when the first occurrence of the
/// term is added, and both entries are removed as soon as the list becomes
/// empty. Creation and destruction happen under the term's lock so that a
/// reader resolving the term through [`TextIndex::lookup`] never sees one trie
/// disagree with the other.
#[derive(Debug)]
pub struct TextIndex {
    prefix: PrefixTree<Arc<Postings>>,
    suffix: Option<SuffixTree<Arc<Postings>>>,
    term_locks: LockTable,
}

impl TextIndex {
    pub fn new(with_suffix_trie: bool, lock_shards: usize) -> Result<TextIndex> {
        Ok(TextIndex {
            prefix: PrefixTree::new(),
            suffix: with_suffix_trie.then(SuffixTree::new),
            term_locks: LockTable::new(lock_shards)?,
        })
    }

    pub fn has_suffix_trie(&self) -> bool {
        self.suffix.is_some()
    }

    /// Number of distinct terms in the corpus.
    pub fn term_count(&self) -> usize {
        self.prefix.len()
    }

    /// Adds (or replaces) the occurrence of `term` in `field` of `key`.
    pub fn add_term_occurrence(
        &self,
        term: &[u8],
        key: &Key,
        field: FieldId,
        positions: Vec<Position>,
    ) -> Result<()> {
        verify_arg!(term, !term.is_empty());
        let _guard = self.term_locks.lock(term);
        self.add_locked(term, key, field, positions)
    }

    /// Removes the occurrence of `term` in `field` of `key`, destroying the
    /// term if no occurrence remains. Returns `false` if there was nothing to
    /// remove.
    pub fn remove_term_occurrence(&self, term: &[u8], key: &Key, field: FieldId) -> bool {
        let _guard = self.term_locks.lock(term);
        self.remove_locked(term, key, field)
    }

    /// Applies several term mutations for one (key, field) pair.
    ///
    /// All term locks are acquired before the first mutation. Mutations are
    /// then applied in term byte order.
    pub fn apply(
        &self,
        key: &Key,
        field: FieldId,
        mutations: &BTreeMap<Term, TermMutation>,
    ) -> Result<()> {
        if mutations.is_empty() {
            return Ok(());
        }
        verify_arg!(term, mutations.keys().all(|term| !term.is_empty()));
        let _guard = self
            .term_locks
            .lock_many(mutations.keys().map(Vec::as_slice));
        for (term, mutation) in mutations {
            match mutation {
                TermMutation::Set(positions) => {
                    self.add_locked(term, key, field, positions.clone())?
                }
                TermMutation::Remove => {
                    self.remove_locked(term, key, field);
                }
            }
        }
        Ok(())
    }

    fn add_locked(
        &self,
        term: &[u8],
        key: &Key,
        field: FieldId,
        positions: Vec<Position>,
    ) -> Result<()> {
        let mut created = false;
        let postings = self.prefix.insert_with(term, || {
            created = true;
            Arc::new(Postings::new())
        })?;
        if let Some(suffix) = &self.suffix {
            suffix.insert_with(term, || postings.clone())?;
        }
        if created {
            log::trace!("created term {:?}", display_term(term));
        }
        postings.set(key, field, positions);
        Ok(())
    }

    fn remove_locked(&self, term: &[u8], key: &Key, field: FieldId) -> bool {
        let Some(postings) = self.prefix.get(term) else {
            return false;
        };
        let removed = postings.remove(key, field);
        if postings.is_empty() {
            self.prefix.remove(term);
            if let Some(suffix) = &self.suffix {
                suffix.remove(term);
            }
            log::trace!("destroyed term {:?}", display_term(term));
        }
        removed
    }

    /// Resolves a term to its posting list under the term lock.
    pub fn lookup(&self, term: &[u8]) -> Option<Arc<Postings>> {
        let _guard = self.term_locks.lock(term);
        self.prefix
            .get(term)
            .filter(|postings| !postings.is_empty())
    }

    /// Lazily enumerates the terms starting with `prefix`, in byte order.
    pub fn prefix_terms(&self, prefix: &[u8]) -> TermCursor<'_> {
        TermCursor {
            index: self,
            source: TermSource::Prefix(self.prefix.iter_matching(prefix)),
        }
    }

    /// Lazily enumerates the terms ending with `suffix`, in the byte order of
    /// the reversed terms.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error if the corpus has no suffix trie.
    pub fn suffix_terms(&self, suffix: &[u8]) -> Result<TermCursor<'_>> {
        let tree = self
            .suffix
            .as_ref()
            .ok_or_else(|| Error::invalid_operation("suffix search without a suffix trie"))?;
        Ok(TermCursor {
            index: self,
            source: TermSource::Suffix(tree.iter_matching(suffix)),
        })
    }

    pub fn all_terms(&self) -> TermCursor<'_> {
        self.prefix_terms(&[])
    }

    /// Verifies that every term has a non-empty posting list and, when the
    /// suffix trie is enabled, that both tries hold the same terms pointing to
    /// the same posting lists.
    pub fn check_consistency(&self) -> Result<()> {
        self.prefix.check_structure()?;
        for (term, _) in self.prefix.iter() {
            let _guard = self.term_locks.lock(&term);
            let Some(postings) = self.prefix.get(&term) else {
                continue;
            };
            if postings.is_empty() {
                return Err(Error::inconsistency(format!(
                    "term {:?} has an empty posting list",
                    display_term(&term)
                )));
            }
            if let Some(suffix) = &self.suffix {
                match suffix.get(&term) {
                    Some(shared) if Arc::ptr_eq(&shared, &postings) => {}
                    Some(_) => {
                        return Err(Error::inconsistency(format!(
                            "term {:?} maps to different posting lists in the two tries",
                            display_term(&term)
                        )));
                    }
                    None => {
                        return Err(Error::inconsistency(format!(
                            "term {:?} is missing from the suffix trie",
                            display_term(&term)
                        )));
                    }
                }
            }
        }
        if let Some(suffix) = &self.suffix {
            suffix.check_structure()?;
            for (term, _) in suffix.iter() {
                let _guard = self.term_locks.lock(&term);
                if suffix.contains(&term) && !self.prefix.contains(&term) {
                    return Err(Error::inconsistency(format!(
                        "term {:?} is missing from the prefix trie",
                        display_term(&term)
                    )));
                }
            }
        }
        Ok(())
    }
}

enum TermSource<'a> {
    Prefix(MatchingTerms<'a, Arc<Postings>, false>),
    Suffix(MatchingTerms<'a, Arc<Postings>, true>),
}

/// Lazy term enumeration over one of the tries.
///
/// Each term found by the walk is re-resolved through [`TextIndex::lookup`];
/// terms destroyed in the meantime are skipped.
pub struct TermCursor<'a> {
    index: &'a TextIndex,
    source: TermSource<'a>,
}

impl Iterator for TermCursor<'_> {
    type Item = (Term, Arc<Postings>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (term, _) = match &mut self.source {
                TermSource::Prefix(iter) => iter.next()?,
                TermSource::Suffix(iter) => iter.next()?,
            };
            if let Some(postings) = self.index.lookup(&term) {
                return Some((term, postings));
            }
        }
    }
}
