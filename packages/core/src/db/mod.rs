//! Storage Layer
//!
//! The repository keeps its data in memory:
//!
//! - [`RepositoryState`] - all tables plus tree helpers
//! - [`StateStore`] - the committed state behind a commit lock
//! - [`ContentCache`] - LRU pool of loaded content versions
//! - [`ChangeSet`] / [`DomainEvent`] - change tracking and notifications
//!
//! # Architecture
//!
//! Writes never mutate the committed state in place. A unit of work clones the
//! state, applies its changes together with a [`ChangeSet`], and the commit swaps
//! the new state in while holding the commit lock. Readers keep whatever
//! snapshot they started with.

pub mod cache;
pub mod events;
pub mod seed;
pub mod state;
pub mod store;

pub use cache::ContentCache;
pub use events::{ChangeSet, DomainEvent};
pub use state::{RepositoryState, Sequence, StoredVersion, TableGroup};
pub use store::{CommitGuard, StateStore};
