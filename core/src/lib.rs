//! `mvkv` is a concurrent, in-memory, multi-version transactional
//! key-value store.
//!
//! A [`Store`](store::Store) holds values keyed by [`Key`](blob::Key), each
//! of which may have several [`Version`](version::Version)s — one per
//! transaction that has written or observed the key. Transactions are
//! managed by a [`TransactionManager`](transaction::TransactionManager),
//! which tracks PENDING/COMMITTED/ABORTED status and the dependency graph
//! between transactions that commit must wait on and cascade through.
//!
//! Neither the store nor the transaction manager is a process-wide
//! singleton: a caller constructs one of each and shares them (typically via
//! `Arc`) across the threads that serve client connections.
//!
//! ## Getting started
//!
//! ```rust
//! use mvkv::blob::{Blob, Key};
//! use mvkv::store::Store;
//! use mvkv::transaction::TransactionManager;
//!
//! let txns = TransactionManager::new();
//! let store = Store::new();
//!
//! let t1 = txns.begin();
//! store.put(&t1, Key::new(Blob::new(*b"name")), Blob::new(*b"alice"));
//! assert_eq!(t1.commit(), mvkv::transaction::Status::Committed);
//!
//! let t2 = txns.begin();
//! let (_, value) = store.get(&t2, Key::new(Blob::new(*b"name")));
//! assert_eq!(value, Some(Blob::new(*b"alice")));
//! ```

pub mod blob;
pub mod error;
pub mod store;
pub mod transaction;
pub mod version;

pub use blob::{Blob, Key};
pub use error::{CResult, Error};
pub use store::Store;
pub use transaction::{Status, Transaction, TransactionManager};
