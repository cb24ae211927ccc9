//! Committed State Store
//!
//! Holds the last committed [`RepositoryState`] behind an async read/write lock.
//! Readers clone the `Arc` and work on an immutable snapshot; writers take the
//! commit lock, derive a new state and swap it in. The state's `generation`
//! increases by one with every swap, which lets a transaction detect that
//! another commit landed after it started.

use crate::db::state::RepositoryState;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};

pub struct StateStore {
    committed: RwLock<Arc<RepositoryState>>,
}

impl StateStore {
    pub fn new(state: RepositoryState) -> Self {
        Self {
            committed: RwLock::new(Arc::new(state)),
        }
    }

    /// Immutable view of the last committed state
    pub async fn snapshot(&self) -> Arc<RepositoryState> {
        self.committed.read().await.clone()
    }

    /// Exclusive access for a commit
    ///
    /// Held for the whole commit, including search indexing, so index updates
    /// are applied in commit order.
    pub async fn lock(&self) -> CommitGuard<'_> {
        CommitGuard {
            guard: self.committed.write().await,
        }
    }
}

pub struct CommitGuard<'a> {
    guard: RwLockWriteGuard<'a, Arc<RepositoryState>>,
}

impl CommitGuard<'_> {
    pub fn current(&self) -> &RepositoryState {
        &self.guard
    }

    pub fn generation(&self) -> u64 {
        self.guard.generation
    }

    /// Working copy for the next generation
    pub fn fork(&self) -> RepositoryState {
        (**self.guard).clone()
    }

    /// Install a new state as the committed one
    pub fn replace(&mut self, state: RepositoryState) -> Arc<RepositoryState> {
        let state = Arc::new(state);
        *self.guard = state.clone();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::state::Sequence;

    #[tokio::test]
    async fn test_snapshots_are_isolated_from_later_commits() {
        let store = StateStore::new(RepositoryState::default());
        let before = store.snapshot().await;

        {
            let mut guard = store.lock().await;
            let mut next = guard.fork();
            next.next_id(Sequence::Section);
            next.generation += 1;
            guard.replace(next);
        }

        assert_eq!(before.generation, 0);
        assert_eq!(store.snapshot().await.generation, 1);
        assert!(before.sequences.is_empty());
    }

    #[test]
    fn test_generation_tracks_replacements() {
        let store = StateStore::new(RepositoryState::default());
        tokio_test::block_on(async {
            for expected in 1..=3 {
                let mut guard = store.lock().await;
                let mut next = guard.fork();
                next.generation = guard.generation() + 1;
                let installed = guard.replace(next);
                assert_eq!(installed.generation, expected);
                assert_eq!(guard.current().generation, expected);
            }
        });
        let snapshot = tokio_test::block_on(store.snapshot());
        assert_eq!(snapshot.generation, 3);
    }
}
