//! Immutable byte buffers and the keys derived from them.
//!
//! The original store keeps `BLOB` as a manually refcounted struct guarded by
//! a mutex, with a hash function (`blob_hash`) that walks `bp->content` with
//! a bare pointer and mutates it as a side effect, and a comparison
//! (`blob_compare`) built on `strcmp`, which stops at the first NUL byte.
//! Both are bugs the original never noticed because its test content happens
//! to be NUL-free ASCII. `Blob` here is `Arc<[u8]>`: cloning and dropping are
//! the atomic ref/unref the original hand-rolled, content is compared and
//! hashed over the full byte slice, and the hash function never touches the
//! data it's hashing.

use std::fmt;
use std::sync::Arc;

/// An immutable, reference-counted byte buffer.
///
/// `Blob::clone` and drop are the atomic "ref"/"unref" of the original;
/// there is no explicit dispose call because `Arc`'s drop glue already frees
/// the backing storage the instant the last reference goes away.
#[derive(Clone)]
pub struct Blob(Arc<[u8]>);

impl Blob {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Blob(Arc::from(content.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of live references to this blob's storage, for tests that
    /// want to observe the ref/unref invariant directly.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

impl Eq for Blob {}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "Blob({s:?})"),
            Err(_) => write!(f, "Blob({:?})", self.0.as_ref()),
        }
    }
}

/// djb2, computed over the full byte slice with no hidden mutation of its
/// input — the original walks a `char *` with `*bp->content++`, which both
/// advances the blob's own content pointer as a side effect and stops at the
/// first NUL byte it meets.
pub fn djb2_hash(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 5381;
    for &b in bytes {
        hash = hash.wrapping_shl(5).wrapping_add(hash).wrapping_add(b as u32);
    }
    hash
}

/// A hashable, comparable handle to a `Blob`, used as a map key.
///
/// The hash is computed once at construction and cached, matching
/// `KEY.hash` in the original.
#[derive(Clone, Debug)]
pub struct Key {
    blob: Blob,
    hash: u32,
}

impl Key {
    pub fn new(blob: Blob) -> Self {
        let hash = djb2_hash(blob.as_bytes());
        Key { blob, hash }
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn blob(&self) -> &Blob {
        &self.blob
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.blob == other.blob
    }
}

impl Eq for Key {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn equal_content_compares_equal() {
        let a = Blob::new(*b"hello");
        let b = Blob::new(*b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn differing_content_compares_unequal() {
        let a = Blob::new(*b"hello");
        let b = Blob::new(*b"world");
        assert_ne!(a, b);
    }

    #[test]
    fn embedded_nul_bytes_are_significant() {
        let a = Blob::new(vec![b'a', 0, b'b']);
        let b = Blob::new(vec![b'a', 0, b'c']);
        assert_ne!(a, b, "content past an embedded NUL must still matter");
    }

    #[test]
    fn hash_does_not_consume_or_mutate_input() {
        let bytes = b"repeatable".to_vec();
        let h1 = djb2_hash(&bytes);
        let h2 = djb2_hash(&bytes);
        assert_eq!(h1, h2, "hashing must be idempotent, unlike the original's pointer walk");
    }

    #[test]
    fn equal_keys_have_equal_hash() {
        let k1 = Key::new(Blob::new(*b"same"));
        let k2 = Key::new(Blob::new(*b"same"));
        assert_eq!(k1, k2);
        assert_eq!(k1.hash(), k2.hash());
    }

    #[test]
    fn refcount_returns_to_baseline_after_balanced_clone_drop() {
        let blob = Blob::new(*b"refcounted");
        let baseline = blob.strong_count();
        let handles: Vec<_> = (0..8).map(|_| blob.clone()).collect();
        assert_eq!(blob.strong_count(), baseline + 8);
        drop(handles);
        assert_eq!(blob.strong_count(), baseline);
    }

    #[test]
    fn concurrent_ref_unref_is_balanced() {
        use std::thread;
        let blob = Blob::new(*b"shared");
        let baseline = blob.strong_count();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let blob = blob.clone();
                thread::spawn(move || {
                    let extra: Vec<_> = (0..32).map(|_| blob.clone()).collect();
                    drop(extra);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(blob.strong_count(), baseline);
    }
}
