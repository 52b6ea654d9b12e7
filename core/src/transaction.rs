//! Transaction lifecycle and the dependency graph between transactions.
//!
//! Grounded on the contract exercised by `transaction_test.c`: a transaction
//! is created `PENDING`, accumulates dependencies on other (usually older)
//! transactions as it runs, and settles into `COMMITTED` or `ABORTED`
//! exactly once. `trans_commit` blocks until every dependency has settled and
//! then cascades: if any dependency aborted, so does the caller.
//! `trans_abort` never blocks.
//!
//! The original models this with a manually incremented `refcnt`, a raw
//! "linked list of dependencies", and a `waitcnt` kept in sync by hand. Here
//! a `Transaction` is always handed out as `Arc<Transaction>` — ref/unref is
//! `Arc::clone`/drop — dependencies are held as a `Vec<Arc<Transaction>>` so
//! the referenced transactions can't be freed out from under a pending wait,
//! and `waitcnt` is still tracked explicitly because it drives the condvar
//! wait loop in `commit`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Pending,
    Committed,
    Aborted,
}

struct Inner {
    status: Status,
    /// Transactions this one depends on, retained by strong reference so
    /// their status can be inspected once this transaction's wait is over.
    depends: Vec<Arc<Transaction>>,
    depended_ids: HashSet<u64>,
    /// Number of entries in `depends` that were still PENDING the last time
    /// they were checked; decremented by `on_dependency_finalized` as each
    /// settles, and `commit` blocks while it's above zero.
    waitcnt: u32,
    /// Transactions that registered a dependency on this one while it was
    /// still PENDING, and so must be notified when it finalizes.
    watchers: Vec<Arc<Transaction>>,
}

pub struct Transaction {
    id: u64,
    inner: Mutex<Inner>,
    cond: Condvar,
}

impl Transaction {
    fn new(id: u64) -> Self {
        Transaction {
            id,
            inner: Mutex::new(Inner {
                status: Status::Pending,
                depends: Vec::new(),
                depended_ids: HashSet::new(),
                waitcnt: 0,
                watchers: Vec::new(),
            }),
            cond: Condvar::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> Status {
        self.inner.lock().unwrap().status
    }

    /// Record that `self` must not be considered committed until `other`
    /// has settled; if `other` has already aborted, `self` aborts too.
    ///
    /// Locks both transactions' mutexes when `other` is still pending, in
    /// ascending id order, so that two concurrent calls establishing
    /// dependencies between the same pair of transactions (in either
    /// direction) can never deadlock against each other.
    pub fn add_dependency(self: &Arc<Self>, other: &Arc<Transaction>) {
        if Arc::ptr_eq(self, other) {
            return;
        }
        let watchers_to_notify = if self.id < other.id {
            let mut mine = self.inner.lock().unwrap();
            let mut theirs = other.inner.lock().unwrap();
            Self::link_locked(self, &mut mine, other, &mut theirs)
        } else {
            let mut theirs = other.inner.lock().unwrap();
            let mut mine = self.inner.lock().unwrap();
            Self::link_locked(self, &mut mine, other, &mut theirs)
        };
        if let Some(watchers) = watchers_to_notify {
            self.cond.notify_all();
            for w in watchers {
                w.on_dependency_finalized();
            }
        }
    }

    /// Returns `Some(watchers)` drained from `self` if linking caused `self`
    /// to finalize (because `other` was already aborted), so the caller can
    /// notify them once both locks are released.
    fn link_locked(
        self_: &Arc<Transaction>,
        mine: &mut Inner,
        other: &Arc<Transaction>,
        theirs: &mut Inner,
    ) -> Option<Vec<Arc<Transaction>>> {
        if mine.status != Status::Pending {
            return None;
        }
        match theirs.status {
            Status::Committed => None,
            Status::Aborted => {
                mine.status = Status::Aborted;
                Some(std::mem::take(&mut mine.watchers))
            }
            Status::Pending => {
                if mine.depended_ids.insert(other.id) {
                    mine.depends.push(Arc::clone(other));
                    mine.waitcnt += 1;
                    theirs.watchers.push(Arc::clone(self_));
                }
                None
            }
        }
    }

    fn on_dependency_finalized(self: &Arc<Self>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.waitcnt > 0 {
            inner.waitcnt -= 1;
            if inner.waitcnt == 0 {
                self.cond.notify_all();
            }
        }
    }

    /// Blocks until every dependency has settled, then commits unless one
    /// of them aborted, in which case this transaction aborts too.
    /// Idempotent: calling commit on an already-settled transaction just
    /// returns its final status.
    pub fn commit(self: &Arc<Self>) -> Status {
        let mut inner = self.inner.lock().unwrap();
        while inner.status == Status::Pending && inner.waitcnt > 0 {
            inner = self.cond.wait(inner).unwrap();
        }
        if inner.status == Status::Pending {
            let depends = inner.depends.clone();
            drop(inner);
            let any_aborted = depends.iter().any(|d| d.status() == Status::Aborted);

            inner = self.inner.lock().unwrap();
            if inner.status == Status::Pending {
                inner.status = if any_aborted { Status::Aborted } else { Status::Committed };
                log::info!("transaction {} settled as {:?}", self.id, inner.status);
                self.cond.notify_all();
                let watchers = std::mem::take(&mut inner.watchers);
                drop(inner);
                for w in watchers {
                    w.on_dependency_finalized();
                }
                return self.status();
            }
        }
        inner.status
    }

    /// Aborts unconditionally; never blocks. A no-op if already settled.
    pub fn abort(self: &Arc<Self>) -> Status {
        let mut inner = self.inner.lock().unwrap();
        if inner.status != Status::Pending {
            return inner.status;
        }
        inner.status = Status::Aborted;
        log::info!("transaction {} aborted", self.id);
        self.cond.notify_all();
        let watchers = std::mem::take(&mut inner.watchers);
        drop(inner);
        for w in watchers {
            w.on_dependency_finalized();
        }
        Status::Aborted
    }
}

/// Issues monotonically increasing transaction ids and hands out fresh
/// transactions. Deliberately not a process-wide singleton (the original's
/// `next_trans_id` global) — a caller constructs one and shares it via
/// `Arc`, so tests can run fully isolated from one another.
pub struct TransactionManager {
    next_id: AtomicU64,
}

impl TransactionManager {
    pub fn new() -> Self {
        TransactionManager { next_id: AtomicU64::new(1) }
    }

    pub fn begin(&self) -> Arc<Transaction> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        log::trace!("transaction {id} created");
        Arc::new(Transaction::new(id))
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
