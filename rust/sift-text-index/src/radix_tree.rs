//! Compressed radix trie over byte-string keys.
//!
//! Edges carry byte-string labels and every node keeps its children sorted by
//! the first byte of their label, so an in-order walk visits keys in
//! lexicographic order. Nodes that neither hold a value nor branch are removed
//! or merged into their only child as soon as a removal makes them redundant.
//!
//! The same structure serves as the prefix trie and, with `SUFFIX = true`, as
//! the suffix trie: the latter stores every key reversed so that a suffix query
//! becomes a prefix walk. Callers always see keys in natural byte order.
//!
//! Each tree is guarded by its own `RwLock`. Iteration never holds the lock
//! between items: every step re-seeks the successor of the previously returned
//! key under a short read lock. Concurrent insertions and removals on other
//! paths therefore proceed while a long walk is in progress.

use std::{borrow::Cow, cmp::Ordering, sync::RwLock};

use sift_common::{Result, error::Error, verify_arg};

use crate::key::{Term, display_term};

/// Radix tree keyed by natural term bytes.
pub type PrefixTree<V> = RadixTree<V, false>;

/// Radix tree keyed by reversed term bytes.
pub type SuffixTree<V> = RadixTree<V, true>;

#[derive(Debug)]
struct Node<V> {
    label: Vec<u8>,
    value: Option<V>,
    children: Vec<Node<V>>,
}

impl<V> Node<V> {
    fn root() -> Node<V> {
        Node {
            label: Vec::new(),
            value: None,
            children: Vec::new(),
        }
    }

    fn child_index(&self, first: u8) -> std::result::Result<usize, usize> {
        self.children
            .binary_search_by_key(&first, |child| child.label[0])
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

#[derive(Debug)]
struct Inner<V> {
    root: Node<V>,
    len: usize,
}

#[derive(Debug)]
pub struct RadixTree<V, const SUFFIX: bool> {
    inner: RwLock<Inner<V>>,
}

impl<V: Clone, const SUFFIX: bool> Default for RadixTree<V, SUFFIX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone, const SUFFIX: bool> RadixTree<V, SUFFIX> {
    pub fn new() -> Self {
        RadixTree {
            inner: RwLock::new(Inner {
                root: Node::root(),
                len: 0,
            }),
        }
    }

    fn stored_key(term: &[u8]) -> Cow<'_, [u8]> {
        if SUFFIX {
            Cow::Owned(term.iter().rev().copied().collect())
        } else {
            Cow::Borrowed(term)
        }
    }

    fn natural_key(mut stored: Vec<u8>) -> Term {
        if SUFFIX {
            stored.reverse();
        }
        stored
    }

    /// Returns the value stored for `term`, inserting the one produced by
    /// `make` if the term is absent.
    ///
    /// # Errors
    ///
    /// Empty terms are rejected with an invalid-argument error.
    pub fn insert_with(&self, term: &[u8], make: impl FnOnce() -> V) -> Result<V> {
        verify_arg!(term, !term.is_empty());
        let key = Self::stored_key(term);
        let mut inner = self.inner.write().unwrap();
        let mut inserted = false;
        let value = insert(&mut inner.root, &key, || {
            inserted = true;
            make()
        });
        if inserted {
            inner.len += 1;
            log::trace!("radix tree: inserted {:?}", display_term(term));
        }
        Ok(value)
    }

    pub fn get(&self, term: &[u8]) -> Option<V> {
        let key = Self::stored_key(term);
        let inner = self.inner.read().unwrap();
        let mut node = &inner.root;
        let mut rest: &[u8] = &key;
        while !rest.is_empty() {
            let child = &node.children[node.child_index(rest[0]).ok()?];
            rest = rest.strip_prefix(child.label.as_slice())?;
            node = child;
        }
        node.value.clone()
    }

    pub fn contains(&self, term: &[u8]) -> bool {
        self.get(term).is_some()
    }

    /// Removes `term`, pruning nodes that no longer hold a value or branch.
    pub fn remove(&self, term: &[u8]) -> Option<V> {
        if term.is_empty() {
            return None;
        }
        let key = Self::stored_key(term);
        let mut inner = self.inner.write().unwrap();
        let removed = remove(&mut inner.root, &key)?;
        inner.len -= 1;
        log::trace!("radix tree: removed {:?}", display_term(term));
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.inner.read().unwrap().root.count()
    }

    /// Returns a lazy iterator over the entries whose term starts with `pattern`
    /// (for a prefix tree) or ends with `pattern` (for a suffix tree).
    ///
    /// Entries come out in lexicographic order of the stored bytes. The
    /// iterator observes a consistent tree at every step, but not a snapshot:
    /// keys inserted behind the cursor are not seen, keys inserted ahead of it
    /// are, and keys removed before they are reached are skipped.
    pub fn iter_matching(&self, pattern: &[u8]) -> MatchingTerms<'_, V, SUFFIX> {
        MatchingTerms {
            tree: self,
            pattern: Self::stored_key(pattern).into_owned(),
            last: None,
            done: false,
        }
    }

    pub fn iter(&self) -> MatchingTerms<'_, V, SUFFIX> {
        self.iter_matching(&[])
    }

    /// Verifies the structural invariants: sorted children with distinct first
    /// bytes, no empty labels below the root, and no redundant nodes.
    pub fn check_structure(&self) -> Result<()> {
        let inner = self.inner.read().unwrap();
        let mut values = 0;
        check_node(&inner.root, true, &mut values)?;
        if values != inner.len {
            return Err(Error::inconsistency(format!(
                "radix tree holds {values} values but counts {}",
                inner.len
            )));
        }
        Ok(())
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn insert<V: Clone>(node: &mut Node<V>, key: &[u8], make: impl FnOnce() -> V) -> V {
    if key.is_empty() {
        if let Some(existing) = &node.value {
            return existing.clone();
        }
        let value = make();
        node.value = Some(value.clone());
        return value;
    }
    match node.child_index(key[0]) {
        Ok(i) => {
            let child = &mut node.children[i];
            let common = common_prefix_len(&child.label, key);
            if common < child.label.len() {
                let tail = Node {
                    label: child.label.split_off(common),
                    value: child.value.take(),
                    children: std::mem::take(&mut child.children),
                };
                child.children.push(tail);
            }
            insert(child, &key[common..], make)
        }
        Err(i) => {
            let value = make();
            node.children.insert(
                i,
                Node {
                    label: key.to_vec(),
                    value: Some(value.clone()),
                    children: Vec::new(),
                },
            );
            value
        }
    }
}

fn remove<V>(node: &mut Node<V>, key: &[u8]) -> Option<V> {
    if key.is_empty() {
        return node.value.take();
    }
    let i = node.child_index(key[0]).ok()?;
    let child = &mut node.children[i];
    let rest = key.strip_prefix(child.label.as_slice())?;
    let removed = remove(child, rest)?;
    if child.value.is_none() {
        match child.children.len() {
            0 => {
                node.children.remove(i);
            }
            1 => {
                if let Some(only) = child.children.pop() {
                    child.label.extend_from_slice(&only.label);
                    child.value = only.value;
                    child.children = only.children;
                }
            }
            _ => {}
        }
    }
    Some(removed)
}

fn check_node<V>(node: &Node<V>, is_root: bool, values: &mut usize) -> Result<()> {
    if node.value.is_some() {
        *values += 1;
    }
    if !is_root {
        if node.label.is_empty() {
            return Err(Error::inconsistency("radix tree node with an empty label"));
        }
        if node.value.is_none() && node.children.len() < 2 {
            return Err(Error::inconsistency(format!(
                "redundant radix tree node at label {:?}",
                display_term(&node.label)
            )));
        }
    }
    for pair in node.children.windows(2) {
        if pair[0].label[0] >= pair[1].label[0] {
            return Err(Error::inconsistency("radix tree children out of order"));
        }
    }
    node.children
        .iter()
        .try_for_each(|child| check_node(child, false, values))
}

/// Finds the smallest key under `node` that starts with `pattern` and is
/// strictly greater than `after`.
fn seek<V: Clone>(
    node: &Node<V>,
    acc: &mut Vec<u8>,
    pattern: &[u8],
    after: Option<&[u8]>,
) -> Option<(Vec<u8>, V)> {
    let base = acc.len();
    acc.extend_from_slice(&node.label);
    let found = seek_within(node, acc, pattern, after);
    acc.truncate(base);
    found
}

fn seek_within<V: Clone>(
    node: &Node<V>,
    acc: &mut Vec<u8>,
    pattern: &[u8],
    mut after: Option<&[u8]>,
) -> Option<(Vec<u8>, V)> {
    let m = acc.len().min(pattern.len());
    if acc[..m] != pattern[..m] {
        return None;
    }
    if let Some(bound) = after {
        let m = acc.len().min(bound.len());
        match acc[..m].cmp(&bound[..m]) {
            Ordering::Less => return None,
            Ordering::Greater => after = None,
            Ordering::Equal if acc.len() > bound.len() => after = None,
            Ordering::Equal => {}
        }
    }
    if after.is_none() && acc.len() >= pattern.len() {
        if let Some(value) = &node.value {
            return Some((acc.clone(), value.clone()));
        }
    }
    node.children
        .iter()
        .find_map(|child| seek(child, acc, pattern, after))
}

/// Lazy iterator returned by [`RadixTree::iter_matching`].
pub struct MatchingTerms<'a, V, const SUFFIX: bool> {
    tree: &'a RadixTree<V, SUFFIX>,
    /// Pattern in stored byte order.
    pattern: Vec<u8>,
    /// Stored form of the last returned key.
    last: Option<Vec<u8>>,
    done: bool,
}

impl<V: Clone, const SUFFIX: bool> Iterator for MatchingTerms<'_, V, SUFFIX> {
    type Item = (Term, V);

    fn next(&mut self) -> Option<(Term, V)> {
        if self.done {
            return None;
        }
        let found = {
            let inner = self.tree.inner.read().unwrap();
            let mut acc = Vec::new();
            seek(&inner.root, &mut acc, &self.pattern, self.last.as_deref())
        };
        match found {
            Some((stored, value)) => {
                self.last = Some(stored.clone());
                Some((RadixTree::<V, SUFFIX>::natural_key(stored), value))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
