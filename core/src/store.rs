//! The versioned map: a fixed-size array of hash buckets, each holding an
//! independently locked list of (key, version chain) entries.
//!
//! Grounded on `store_test.c`'s expectations: `NUM_BUCKETS` is a compile-time
//! constant (no rehashing), a bucket holds a chain of entries linked by
//! collision, and each entry's version chain is kept newest-creator-first so
//! that garbage collection and "first committed version visible to
//! transaction t" are both a single linear scan.

use crate::blob::{Blob, Key};
use crate::transaction::{Status, Transaction};
use crate::version::Version;
use std::sync::{Arc, Mutex};

/// Bucket count. Fixed at compile time; the original's `the_map` is sized
/// the same way and never rehashes.
pub const NUM_BUCKETS: usize = 128;

struct Entry {
    key: Key,
    versions: Vec<Version>,
}

struct Bucket {
    entries: Mutex<Vec<Entry>>,
}

/// The store. Not a process-wide global (see the design note in `lib.rs`) —
/// construct one per server instance, or one per test, and share it via
/// `Arc` across connection threads.
pub struct Store {
    buckets: Vec<Bucket>,
}

impl Store {
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(NUM_BUCKETS);
        for _ in 0..NUM_BUCKETS {
            buckets.push(Bucket { entries: Mutex::new(Vec::new()) });
        }
        Store { buckets }
    }

    fn bucket_index(&self, key: &Key) -> usize {
        (key.hash() as usize) % NUM_BUCKETS
    }

    /// Writes `value` under `key` on behalf of `txn`.
    ///
    /// If a version committed by a transaction with a higher id is already
    /// present, `txn` has been working off a stale snapshot and is aborted.
    /// Otherwise, every still-pending version created by a higher-id
    /// transaction is made to depend on `txn`, so that it cannot commit
    /// ahead of this write.
    pub fn put(&self, txn: &Arc<Transaction>, key: Key, value: Blob) -> Status {
        let idx = self.bucket_index(&key);
        let mut entries = self.buckets[idx].entries.lock().unwrap();
        let pos = entries.iter().position(|e| e.key == key).unwrap_or_else(|| {
            entries.push(Entry { key, versions: Vec::new() });
            entries.len() - 1
        });
        let chain = &mut entries[pos].versions;
        gc(chain);

        let stale_snapshot = chain
            .iter()
            .any(|v| v.creator.id() > txn.id() && v.creator.status() == Status::Committed);
        if stale_snapshot {
            drop(entries);
            log::debug!("transaction {} put aborted: stale snapshot", txn.id());
            return txn.abort();
        }

        for v in chain.iter() {
            if v.creator.id() > txn.id() && v.creator.status() == Status::Pending {
                v.creator.add_dependency(txn);
            }
        }

        insert_sorted(chain, txn, Some(value));
        txn.status()
    }

    /// Reads the value visible to `txn`: its own uncommitted write if it has
    /// one, otherwise the newest version committed by a transaction with a
    /// lower id, otherwise no value. Registers `txn` as a dependency of any
    /// still-pending higher-id writer, and records the read in the chain so
    /// later writers can see it.
    pub fn get(&self, txn: &Arc<Transaction>, key: Key) -> (Status, Option<Blob>) {
        let idx = self.bucket_index(&key);
        let mut entries = self.buckets[idx].entries.lock().unwrap();
        let pos = match entries.iter().position(|e| e.key == key) {
            Some(p) => p,
            None => {
                entries.push(Entry {
                    key,
                    versions: vec![Version::new(Arc::clone(txn), None)],
                });
                return (txn.status(), None);
            }
        };
        let chain = &mut entries[pos].versions;
        gc(chain);

        if let Some(existing) = chain.iter().find(|v| v.creator.id() == txn.id()) {
            return (txn.status(), existing.value.clone());
        }

        for v in chain.iter() {
            if v.creator.id() > txn.id() && v.creator.status() == Status::Pending {
                v.creator.add_dependency(txn);
            }
        }

        let visible = chain
            .iter()
            .find(|v| v.creator.id() < txn.id() && v.creator.status() == Status::Committed)
            .and_then(|v| v.value.clone());

        insert_sorted(chain, txn, visible.clone());
        (txn.status(), visible)
    }

    #[cfg(test)]
    fn key_count(&self) -> usize {
        self.buckets.iter().map(|b| b.entries.lock().unwrap().len()).sum()
    }

    #[cfg(test)]
    fn version_count(&self, key: &Key) -> Option<usize> {
        for bucket in &self.buckets {
            let entries = bucket.entries.lock().unwrap();
            if let Some(e) = entries.iter().find(|e| &e.key == key) {
                return Some(e.versions.len());
            }
        }
        None
    }

    #[cfg(test)]
    fn assert_versions_are_sane(&self, key: &Key) {
        for bucket in &self.buckets {
            let entries = bucket.entries.lock().unwrap();
            if let Some(e) = entries.iter().find(|e| &e.key == key) {
                let mut committed = 0;
                for v in &e.versions {
                    match v.creator.status() {
                        Status::Pending => {}
                        Status::Committed => committed += 1,
                        Status::Aborted => panic!("aborted version survived GC"),
                    }
                }
                assert!(committed <= 2, "more than two committed versions survived GC");
            }
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Inserts or overwrites `txn`'s own version, keeping the chain sorted
/// newest-creator-first.
fn insert_sorted(chain: &mut Vec<Version>, txn: &Arc<Transaction>, value: Option<Blob>) {
    if let Some(existing) = chain.iter_mut().find(|v| v.creator.id() == txn.id()) {
        existing.value = value;
        return;
    }
    let pos = chain.iter().position(|v| v.creator.id() < txn.id()).unwrap_or(chain.len());
    chain.insert(pos, Version::new(Arc::clone(txn), value));
}

/// Drops every ABORTED version and all but the two newest COMMITTED
/// versions; PENDING versions are never collected. Assumes `chain` is
/// sorted newest-creator-first.
fn gc(chain: &mut Vec<Version>) {
    let mut committed_seen = 0;
    chain.retain(|v| match v.creator.status() {
        Status::Pending => true,
        Status::Committed => {
            committed_seen += 1;
            committed_seen <= 2
        }
        Status::Aborted => false,
    });
}
