//! core::ops::lock
//!
//! Per-namespace exclusion tokens for structural operations.
//!
//! # Architecture
//!
//! At most one structural operation may be in flight per namespace.
//! Operations on distinct namespaces proceed concurrently. Operations
//! that touch every namespace (adding a language, closing the project)
//! take the exclusive token, which waits for all namespace tokens to be
//! released and blocks new ones until dropped.
//!
//! The tokens are in-process only. Several processes sharing one project
//! directory are not coordinated.
//!
//! # Invariants
//!
//! - Tokens are released on drop (RAII pattern)
//! - A multi-namespace acquisition takes all of its namespaces at once, so
//!   lock ordering cannot deadlock
//! - `try_*` variants never block
//!
//! # Example
//!
//! ```
//! use translatehub::core::ops::lock::NamespaceLocks;
//! use translatehub::core::types::NamespaceId;
//!
//! let locks = NamespaceLocks::new();
//! let common = NamespaceId::new("common").unwrap();
//!
//! let guard = locks.acquire([common.clone()]);
//! assert!(locks.try_acquire([common.clone()]).is_none());
//! drop(guard);
//! assert!(locks.try_acquire([common]).is_some());
//! ```

use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::core::types::NamespaceId;

#[derive(Debug, Default)]
struct LockState {
    held: BTreeSet<NamespaceId>,
    exclusive: bool,
}

/// Exclusion tokens keyed by namespace.
#[derive(Debug, Default)]
pub struct NamespaceLocks {
    state: Mutex<LockState>,
    released: Condvar,
}

/// Which tokens a guard holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Held {
    /// The listed namespaces.
    Namespaces(BTreeSet<NamespaceId>),
    /// Every namespace.
    Exclusive,
}

/// A held set of tokens, released on drop.
#[derive(Debug)]
pub struct NamespaceGuard<'a> {
    locks: &'a NamespaceLocks,
    held: Option<Held>,
}

impl NamespaceLocks {
    /// Create an empty token table.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, LockState> {
        // The state is a plain set; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until every namespace in `namespaces` is free, then take them.
    pub fn acquire(
        &self,
        namespaces: impl IntoIterator<Item = NamespaceId>,
    ) -> NamespaceGuard<'_> {
        let wanted: BTreeSet<_> = namespaces.into_iter().collect();
        let mut state = self.lock_state();
        while state.exclusive || wanted.iter().any(|ns| state.held.contains(ns)) {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.held.extend(wanted.iter().cloned());
        NamespaceGuard {
            locks: self,
            held: Some(Held::Namespaces(wanted)),
        }
    }

    /// Take the namespaces if all are free, otherwise return `None`.
    pub fn try_acquire(
        &self,
        namespaces: impl IntoIterator<Item = NamespaceId>,
    ) -> Option<NamespaceGuard<'_>> {
        let wanted: BTreeSet<_> = namespaces.into_iter().collect();
        let mut state = self.lock_state();
        if state.exclusive || wanted.iter().any(|ns| state.held.contains(ns)) {
            return None;
        }
        state.held.extend(wanted.iter().cloned());
        Some(NamespaceGuard {
            locks: self,
            held: Some(Held::Namespaces(wanted)),
        })
    }

    /// Block until no token is held, then exclude every namespace.
    pub fn acquire_exclusive(&self) -> NamespaceGuard<'_> {
        let mut state = self.lock_state();
        while state.exclusive || !state.held.is_empty() {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.exclusive = true;
        NamespaceGuard {
            locks: self,
            held: Some(Held::Exclusive),
        }
    }

    /// Whether a namespace currently has an operation in flight.
    pub fn is_busy(&self, ns: &NamespaceId) -> bool {
        let state = self.lock_state();
        state.exclusive || state.held.contains(ns)
    }

    fn release(&self, held: Held) {
        let mut state = self.lock_state();
        match held {
            Held::Exclusive => state.exclusive = false,
            Held::Namespaces(set) => {
                for ns in &set {
                    state.held.remove(ns);
                }
            }
        }
        drop(state);
        self.released.notify_all();
    }
}

impl NamespaceGuard<'_> {
    /// Check if the guard still holds its tokens.
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Whether this guard covers `ns`.
    pub fn covers(&self, ns: &NamespaceId) -> bool {
        match &self.held {
            Some(Held::Exclusive) => true,
            Some(Held::Namespaces(set)) => set.contains(ns),
            None => false,
        }
    }

    /// Release the tokens before the guard goes out of scope.
    pub fn release(&mut self) {
        if let Some(held) = self.held.take() {
            self.locks.release(held);
        }
    }
}

impl Drop for NamespaceGuard<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn ns(s: &str) -> NamespaceId {
        NamespaceId::new(s).unwrap()
    }

    #[test]
    fn acquire_blocks_second_try() {
        let locks = NamespaceLocks::new();
        let guard = locks.acquire([ns("a")]);
        assert!(guard.is_held());
        assert!(locks.is_busy(&ns("a")));
        assert!(locks.try_acquire([ns("a")]).is_none());
    }

    #[test]
    fn distinct_namespaces_do_not_conflict() {
        let locks = NamespaceLocks::new();
        let _a = locks.acquire([ns("a")]);
        let b = locks.try_acquire([ns("b")]);
        assert!(b.is_some());
    }

    #[test]
    fn released_on_drop() {
        let locks = NamespaceLocks::new();
        {
            let _guard = locks.acquire([ns("a"), ns("b")]);
        }
        assert!(!locks.is_busy(&ns("a")));
        assert!(!locks.is_busy(&ns("b")));
    }

    #[test]
    fn explicit_release_is_idempotent() {
        let locks = NamespaceLocks::new();
        let mut guard = locks.acquire([ns("a")]);
        guard.release();
        guard.release();
        assert!(!guard.is_held());
        assert!(locks.try_acquire([ns("a")]).is_some());
    }

    #[test]
    fn exclusive_blocks_everything() {
        let locks = NamespaceLocks::new();
        let guard = locks.acquire_exclusive();
        assert!(guard.covers(&ns("anything")));
        assert!(locks.is_busy(&ns("anything")));
        assert!(locks.try_acquire([ns("x")]).is_none());
    }

    #[test]
    fn partial_overlap_fails_try() {
        let locks = NamespaceLocks::new();
        let _a = locks.acquire([ns("a")]);
        assert!(locks.try_acquire([ns("b"), ns("a")]).is_none());
        // Nothing from the failed attempt stays held.
        assert!(!locks.is_busy(&ns("b")));
    }

    #[test]
    fn waiter_proceeds_after_release() {
        let locks = NamespaceLocks::new();
        let entered = AtomicBool::new(false);

        thread::scope(|s| {
            let guard = locks.acquire([ns("a")]);
            let handle = s.spawn(|| {
                let _g = locks.acquire([ns("a")]);
                entered.store(true, Ordering::SeqCst);
            });

            thread::sleep(Duration::from_millis(50));
            assert!(!entered.load(Ordering::SeqCst));
            drop(guard);
            handle.join().unwrap();
        });

        assert!(entered.load(Ordering::SeqCst));
    }

    #[test]
    fn exclusive_waits_for_namespace_tokens() {
        let locks = NamespaceLocks::new();
        let entered = AtomicBool::new(false);

        thread::scope(|s| {
            let guard = locks.acquire([ns("a")]);
            let handle = s.spawn(|| {
                let _g = locks.acquire_exclusive();
                entered.store(true, Ordering::SeqCst);
            });

            thread::sleep(Duration::from_millis(50));
            assert!(!entered.load(Ordering::SeqCst));
            drop(guard);
            handle.join().unwrap();
        });

        assert!(entered.load(Ordering::SeqCst));
    }
}
