//! A single version of a key's value, tagged with the transaction that
//! created it.
//!
//! The original links these as a hand-rolled doubly-linked list
//! (`VERSION.next`/`.prev`) threaded through `malloc`'d nodes. A chain for
//! one key never needs random insertion in the middle by pointer surgery —
//! every insert lands by transaction id order — so `Store` keeps each
//! chain as a plain `Vec<Version>` ordered newest-creator-first, which gives
//! better locality and makes the garbage-collection sweep a simple retain
//! pass instead of pointer patching.

use crate::blob::Blob;
use crate::transaction::Transaction;
use std::sync::Arc;

/// `value == None` is the "null sentinel" blob from the original: a version
/// recording that its creator looked up or deleted a key without ever
/// writing a value to it.
pub struct Version {
    pub creator: Arc<Transaction>,
    pub value: Option<Blob>,
}

impl Version {
    pub fn new(creator: Arc<Transaction>, value: Option<Blob>) -> Self {
        Version { creator, value }
    }
}
