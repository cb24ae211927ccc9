//! Repository, Sessions and Transactions
//!
//! [`Repository`] owns the committed state, the search engine, the content
//! cache and the domain event channel. Callers act through a [`Session`], which
//! carries the current user, the open transaction and the sudo flag, so
//! concurrent callers never see each other's identity or uncommitted work.
//!
//! # Units of work
//!
//! Every service operation runs as one unit of work on a private copy of the
//! state and only takes effect if it succeeds:
//!
//! - outside a transaction the copy is committed right away
//! - inside a transaction it replaces the transaction's working state
//!
//! # Transactions
//!
//! `begin_transaction` copies the committed state into the session. Nested
//! `begin_transaction` calls push a savepoint; a nested `commit` merely drops
//! the savepoint and a nested `rollback` restores it. Only the outermost
//! `commit` publishes the working state. If other commits landed since the
//! transaction began, the working state is merged onto the committed one per
//! [`TableGroup`](crate::db::TableGroup); when both sides changed the same
//! group the commit fails with `TransactionFailed` and the transaction is
//! discarded.
//!
//! Publishing hands the index batch to the search engine, swaps the state in,
//! invalidates cached content and broadcasts [`DomainEvent`]s, all while holding
//! the commit lock.

use crate::behaviors::FieldTypeRegistry;
use crate::config::RepositoryConfig;
use crate::db::seed::seed_state;
use crate::db::{
    ChangeSet, CommitGuard, ContentCache, DomainEvent, RepositoryState, StateStore, TableGroup,
};
use crate::models::UserReference;
use crate::permissions::{PermissionResolver, PermissionTarget};
use crate::search::{InMemoryEngine, IndexSynchronizer, SearchEngine};
use crate::services::{
    ContentService, ContentTypeService, LanguageService, LocationService, NotificationService,
    RepositoryError, RoleService, SearchService, SectionService, TokenService, TrashService,
    UrlWildcardService,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, Mutex};

pub(crate) struct RepositoryInner {
    pub config: RepositoryConfig,
    pub store: StateStore,
    pub search: Arc<dyn SearchEngine>,
    pub cache: ContentCache,
    pub field_types: FieldTypeRegistry,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl RepositoryInner {
    /// Install `state` as the next committed generation
    async fn publish(
        &self,
        guard: &mut CommitGuard<'_>,
        mut state: RepositoryState,
        changes: ChangeSet,
    ) -> Result<(), RepositoryError> {
        state.generation = guard.generation() + 1;

        let batch = IndexSynchronizer::new(&state, &self.field_types).batch_for(&changes);
        self.search.index(batch).await?;

        let generation = state.generation;
        guard.replace(state);
        self.cache.invalidate(changes.touched_contents());

        for event in changes.events() {
            // No subscribers is fine
            let _ = self.event_tx.send(event);
        }
        tracing::debug!("Committed generation {}", generation);
        Ok(())
    }
}

/// Content repository facade
///
/// Cheap to clone; all clones share the same storage.
///
/// # Examples
///
/// ```no_run
/// # use folio_core::services::Repository;
/// # use folio_core::config::RepositoryConfig;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let repository = Repository::new(RepositoryConfig::default()).await?;
/// let session = repository.admin_session();
///
/// session.begin_transaction().await?;
/// let section = session
///     .section_service()
///     .create_section(folio_core::models::SectionCreateStruct::new("news", "News"))
///     .await?;
/// session.commit().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
}

impl Repository {
    /// Repository with the embedded search engine
    pub async fn new(config: RepositoryConfig) -> Result<Self, RepositoryError> {
        let engine = Arc::new(InMemoryEngine::new(config.search_refresh));
        Self::with_search_engine(config, engine).await
    }

    /// Repository backed by a custom search engine
    pub async fn with_search_engine(
        config: RepositoryConfig,
        engine: Arc<dyn SearchEngine>,
    ) -> Result<Self, RepositoryError> {
        config.validate().map_err(RepositoryError::initialization)?;
        let capacity = NonZeroUsize::new(config.content_cache_capacity)
            .ok_or_else(|| RepositoryError::initialization("content_cache_capacity must be > 0"))?;

        let field_types = FieldTypeRegistry::new();
        let state = seed_state(&config);
        let batch = IndexSynchronizer::new(&state, &field_types).full_batch();
        engine.index(batch).await?;
        engine.refresh().await?;

        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        tracing::info!(
            "Repository initialized (search engine: {}, refresh: {:?})",
            engine.name(),
            config.search_refresh
        );

        Ok(Self {
            inner: Arc::new(RepositoryInner {
                config,
                store: StateStore::new(state),
                search: engine,
                cache: ContentCache::new(capacity),
                field_types,
                event_tx,
            }),
        })
    }

    pub(crate) fn inner(&self) -> &RepositoryInner {
        &self.inner
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.inner.config
    }

    pub fn field_types(&self) -> &FieldTypeRegistry {
        &self.inner.field_types
    }

    /// New session acting as `user`
    pub fn session(&self, user: UserReference) -> Session {
        Session {
            repository: self.clone(),
            context: Arc::new(SessionContext {
                user: RwLock::new(user),
                transaction: Mutex::new(None),
            }),
            elevated: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn admin_session(&self) -> Session {
        self.session(UserReference::new(self.inner.config.admin_user_id))
    }

    pub fn anonymous_session(&self) -> Session {
        self.session(UserReference::new(self.inner.config.anonymous_user_id))
    }

    /// Make every commit so far visible to search queries
    pub async fn refresh_search_index(&self) -> Result<(), RepositoryError> {
        self.inner.search.refresh().await?;
        Ok(())
    }

    /// Rebuild the search index from the committed state
    pub async fn reindex(&self) -> Result<(), RepositoryError> {
        let guard = self.inner.store.lock().await;
        let batch = IndexSynchronizer::new(guard.current(), &self.inner.field_types).full_batch();
        tracing::info!("Reindexing {} documents", batch.upserts.len());
        self.inner.search.index(batch).await?;
        Ok(())
    }

    /// Subscribe to domain events of future commits
    ///
    /// ```no_run
    /// # use folio_core::services::Repository;
    /// # async fn example(repository: Repository) {
    /// let mut rx = repository.subscribe_to_events();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = rx.recv().await {
    ///         println!("{}", event.event_type());
    ///     }
    /// });
    /// # }
    /// ```
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Direct access to the storage tables, bypassing services and permissions
    pub fn raw_storage(&self) -> RawStorage<'_> {
        RawStorage { inner: &self.inner }
    }

    pub fn cache_pool(&self) -> &ContentCache {
        &self.inner.cache
    }

    /// Last committed state
    pub async fn snapshot(&self) -> Arc<RepositoryState> {
        self.inner.store.snapshot().await
    }
}

/// Storage escape hatch
///
/// Mutations are committed as one generation; afterwards the content cache is
/// cleared and the search index rebuilt, since no change set is recorded.
pub struct RawStorage<'a> {
    inner: &'a RepositoryInner,
}

impl RawStorage<'_> {
    pub async fn read<T>(&self, read: impl FnOnce(&RepositoryState) -> T) -> T {
        let snapshot = self.inner.store.snapshot().await;
        read(&snapshot)
    }

    pub async fn transaction<T>(
        &self,
        mutate: impl FnOnce(&mut RepositoryState) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.inner.store.lock().await;
        let mut state = guard.fork();
        let value = mutate(&mut state)?;
        state.generation = guard.generation() + 1;

        let batch = IndexSynchronizer::new(&state, &self.inner.field_types).full_batch();
        self.inner.search.index(batch).await?;
        guard.replace(state);
        self.inner.cache.clear();
        tracing::info!("Raw storage modified, content cache cleared");
        Ok(value)
    }
}

struct Transaction {
    /// Committed state the transaction started from
    base: Arc<RepositoryState>,
    state: RepositoryState,
    changes: ChangeSet,
    savepoints: Vec<(RepositoryState, ChangeSet)>,
}

struct SessionContext {
    user: RwLock<UserReference>,
    transaction: Mutex<Option<Transaction>>,
}

/// Per-caller context: current user, open transaction and sudo state
///
/// Clones share the same context.
#[derive(Clone)]
pub struct Session {
    repository: Repository,
    context: Arc<SessionContext>,
    elevated: Arc<AtomicBool>,
}

impl Session {
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn current_user_reference(&self) -> UserReference {
        *self.context.user.read().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set_current_user_reference(&self, user: UserReference) {
        *self.context.user.write().unwrap_or_else(|p| p.into_inner()) = user;
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated.load(Ordering::SeqCst)
    }

    /// Run `callback` with permission checks disabled
    ///
    /// The callback receives a session sharing this session's user and
    /// transaction; its elevation ends when the callback returns, even if the
    /// session value is kept.
    ///
    /// ```no_run
    /// # use folio_core::services::{RepositoryError, Session};
    /// # async fn example(session: Session) -> Result<(), RepositoryError> {
    /// let count = session
    ///     .sudo(|elevated| async move {
    ///         elevated.section_service().count_assigned_contents(1).await
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn sudo<F, Fut, T>(&self, callback: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        let flag = Arc::new(AtomicBool::new(true));
        let elevated = Session {
            repository: self.repository.clone(),
            context: self.context.clone(),
            elevated: flag.clone(),
        };
        let result = callback(elevated).await;
        flag.store(false, Ordering::SeqCst);
        result
    }

    /// Start a transaction, or a nested savepoint inside an open one
    pub async fn begin_transaction(&self) -> Result<(), RepositoryError> {
        let mut slot = self.context.transaction.lock().await;
        match slot.as_mut() {
            Some(transaction) => {
                transaction
                    .savepoints
                    .push((transaction.state.clone(), transaction.changes.clone()));
                tracing::debug!("Savepoint {}", transaction.savepoints.len());
            }
            None => {
                let snapshot = self.repository.inner.store.snapshot().await;
                tracing::debug!("Transaction started at generation {}", snapshot.generation);
                *slot = Some(Transaction {
                    state: (*snapshot).clone(),
                    base: snapshot,
                    changes: ChangeSet::default(),
                    savepoints: Vec::new(),
                });
            }
        }
        Ok(())
    }

    /// Commit the innermost level; only the outermost level publishes
    pub async fn commit(&self) -> Result<(), RepositoryError> {
        let mut slot = self.context.transaction.lock().await;
        match slot.as_mut() {
            None => return Err(RepositoryError::NoActiveTransaction),
            Some(transaction) if !transaction.savepoints.is_empty() => {
                transaction.savepoints.pop();
                return Ok(());
            }
            Some(_) => {}
        }
        let transaction = slot.take().ok_or(RepositoryError::NoActiveTransaction)?;

        let inner = self.repository.inner();
        let mut guard = inner.store.lock().await;
        if guard.generation() == transaction.base.generation {
            return inner
                .publish(&mut guard, transaction.state, transaction.changes)
                .await;
        }

        // Other commits landed meanwhile; only disjoint table groups merge
        let ours = transaction.state.changed_groups(&transaction.base);
        let theirs = guard.current().changed_groups(&transaction.base);
        let conflicts: Vec<TableGroup> = ours.intersection(&theirs).copied().collect();
        if !conflicts.is_empty() {
            tracing::warn!(
                "Commit rejected: started at generation {}, repository is at {}, conflicting {:?}",
                transaction.base.generation,
                guard.generation(),
                conflicts
            );
            return Err(RepositoryError::transaction_failed(
                "another transaction committed first",
            ));
        }
        tracing::debug!(
            "Merging {:?} onto generation {}",
            ours,
            guard.generation()
        );
        let mut merged = guard.fork();
        merged.adopt_groups(transaction.state, &ours);
        inner.publish(&mut guard, merged, transaction.changes).await
    }

    /// Discard the innermost level
    pub async fn rollback(&self) -> Result<(), RepositoryError> {
        let mut slot = self.context.transaction.lock().await;
        let transaction = slot.as_mut().ok_or(RepositoryError::NoActiveTransaction)?;
        match transaction.savepoints.pop() {
            Some((state, changes)) => {
                transaction.state = state;
                transaction.changes = changes;
            }
            None => {
                *slot = None;
                tracing::debug!("Transaction rolled back");
            }
        }
        Ok(())
    }

    /// Nesting level of the open transaction, 0 when none is open
    pub async fn transaction_depth(&self) -> usize {
        self.context
            .transaction
            .lock()
            .await
            .as_ref()
            .map(|transaction| transaction.savepoints.len() + 1)
            .unwrap_or(0)
    }

    /// Run a read against the transaction state or the last committed state
    pub(crate) async fn read<T>(
        &self,
        read: impl FnOnce(&ReadContext<'_>) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let user = self.current_user_reference();
        let elevated = self.is_elevated();
        let inner = self.repository.inner();

        let slot = self.context.transaction.lock().await;
        if let Some(transaction) = slot.as_ref() {
            return read(&ReadContext {
                state: &transaction.state,
                user,
                elevated,
                inner,
                committed: false,
            });
        }
        drop(slot);

        let snapshot = inner.store.snapshot().await;
        read(&ReadContext {
            state: &snapshot,
            user,
            elevated,
            inner,
            committed: true,
        })
    }

    /// Run a mutation as one unit of work
    pub(crate) async fn write<T>(
        &self,
        write: impl FnOnce(&mut UnitOfWork<'_>) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let user = self.current_user_reference();
        let elevated = self.is_elevated();
        let inner = self.repository.inner();

        let mut slot = self.context.transaction.lock().await;
        if let Some(transaction) = slot.as_mut() {
            let mut state = transaction.state.clone();
            let mut changes = ChangeSet::default();
            let value = write(&mut UnitOfWork::new(
                &mut state,
                &mut changes,
                user,
                elevated,
                inner,
            ))?;
            transaction.state = state;
            transaction.changes.merge(changes);
            return Ok(value);
        }

        let mut guard = inner.store.lock().await;
        let mut state = guard.fork();
        let mut changes = ChangeSet::default();
        let value = write(&mut UnitOfWork::new(
            &mut state,
            &mut changes,
            user,
            elevated,
            inner,
        ))?;
        inner.publish(&mut guard, state, changes).await?;
        Ok(value)
    }

    pub fn content_service(&self) -> ContentService<'_> {
        ContentService::new(self)
    }

    pub fn content_type_service(&self) -> ContentTypeService<'_> {
        ContentTypeService::new(self)
    }

    pub fn location_service(&self) -> LocationService<'_> {
        LocationService::new(self)
    }

    pub fn trash_service(&self) -> TrashService<'_> {
        TrashService::new(self)
    }

    pub fn section_service(&self) -> SectionService<'_> {
        SectionService::new(self)
    }

    pub fn language_service(&self) -> LanguageService<'_> {
        LanguageService::new(self)
    }

    pub fn url_wildcard_service(&self) -> UrlWildcardService<'_> {
        UrlWildcardService::new(self)
    }

    pub fn notification_service(&self) -> NotificationService<'_> {
        NotificationService::new(self)
    }

    pub fn token_service(&self) -> TokenService<'_> {
        TokenService::new(self)
    }

    pub fn role_service(&self) -> RoleService<'_> {
        RoleService::new(self)
    }

    pub fn search_service(&self) -> SearchService<'_> {
        SearchService::new(self)
    }

    /// Check a permission for the current user without performing anything
    pub async fn can_user(
        &self,
        module: &str,
        function: &str,
        target: &PermissionTarget,
    ) -> Result<bool, RepositoryError> {
        self.read(|ctx| Ok(ctx.permissions().can_user(module, function, target)))
            .await
    }
}

/// State view for read operations
pub(crate) struct ReadContext<'a> {
    pub state: &'a RepositoryState,
    pub user: UserReference,
    pub elevated: bool,
    pub inner: &'a RepositoryInner,
    /// Reading the committed state (cache may be used)
    pub committed: bool,
}

impl<'a> ReadContext<'a> {
    pub fn permissions(&self) -> PermissionResolver<'a> {
        PermissionResolver::new(self.state, self.user, self.elevated)
    }
}

/// Mutable state and change tracking of one operation
pub(crate) struct UnitOfWork<'a> {
    pub state: &'a mut RepositoryState,
    pub changes: &'a mut ChangeSet,
    pub user: UserReference,
    pub elevated: bool,
    pub now: DateTime<Utc>,
    pub inner: &'a RepositoryInner,
}

impl<'a> UnitOfWork<'a> {
    fn new(
        state: &'a mut RepositoryState,
        changes: &'a mut ChangeSet,
        user: UserReference,
        elevated: bool,
        inner: &'a RepositoryInner,
    ) -> Self {
        Self {
            state,
            changes,
            user,
            elevated,
            now: Utc::now(),
            inner,
        }
    }

    pub fn permissions(&self) -> PermissionResolver<'_> {
        PermissionResolver::new(self.state, self.user, self.elevated)
    }

    pub fn authorize(
        &self,
        module: &str,
        function: &str,
        target: &PermissionTarget,
    ) -> Result<(), RepositoryError> {
        self.permissions().authorize(module, function, target)
    }

    pub fn authorize_global(&self, module: &str, function: &str) -> Result<(), RepositoryError> {
        self.permissions().authorize_global(module, function)
    }
}
