//! Fixed-size table of mutexes indexed by a hash of a byte string.
//!
//! Used to serialize mutations of the same term (and, in the field index, of
//! the same key) without allocating a lock per item. Distinct items may share a
//! shard. Multi-item acquisition therefore locks each distinct shard once, in
//! ascending shard order, which keeps every multi-lock holder deadlock free.

use std::{
    collections::BTreeSet,
    sync::{Mutex, MutexGuard},
};

use ahash::RandomState;
use sift_common::{Result, verify_arg};

// Fixed seeds keep shard assignment stable for the lifetime of the process.
const SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

#[derive(Debug)]
pub struct LockTable {
    shards: Box<[Mutex<()>]>,
    hasher: RandomState,
}

/// Holds every shard acquired by [`LockTable::lock_many`] until dropped.
#[must_use]
pub struct MultiLockGuard<'a> {
    _guards: Vec<MutexGuard<'a, ()>>,
}

impl LockTable {
    pub fn new(shards: usize) -> Result<LockTable> {
        verify_arg!(shards, shards > 0);
        Ok(LockTable {
            shards: (0..shards).map(|_| Mutex::new(())).collect(),
            hasher: RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3]),
        })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_of(&self, item: &[u8]) -> usize {
        (self.hasher.hash_one(item) % self.shards.len() as u64) as usize
    }

    /// Locks the shard of a single item.
    pub fn lock(&self, item: &[u8]) -> MutexGuard<'_, ()> {
        self.shards[self.shard_of(item)].lock().unwrap()
    }

    /// Locks the shards of all `items` before returning.
    pub fn lock_many<'i>(&self, items: impl IntoIterator<Item = &'i [u8]>) -> MultiLockGuard<'_> {
        let shards: BTreeSet<usize> = items.into_iter().map(|item| self.shard_of(item)).collect();
        MultiLockGuard {
            _guards: shards
                .into_iter()
                .map(|shard| self.shards[shard].lock().unwrap())
                .collect(),
        }
    }
}
