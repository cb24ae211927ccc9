//! Trash Service
//!
//! Trashing a location detaches its subtree from the tree and keeps it as a
//! [`TrashItem`] keyed by the id of the trashed location. Content that lost its
//! last placement this way is marked trashed instead of being deleted, and
//! disappears from searches and listings until the item is recovered.
//!
//! Recovering restores the same location ids under the original parent (or a
//! new one). Deleting a trash item removes the trashed placements for good;
//! content referenced by nothing else is deleted with them.

use crate::db::RepositoryState;
use crate::models::{
    Location, TrashItem, TrashItemDeleteResult, TrashItemList, TrashQuery, TrashedLocation,
};
use crate::permissions::PermissionTarget;
use crate::services::content_service::{container_parent, content_info_of};
use crate::services::repository::UnitOfWork;
use crate::services::{RepositoryError, Session};
use std::collections::BTreeSet;

pub struct TrashService<'a> {
    session: &'a Session,
}

impl<'a> TrashService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Move a location with its subtree to the trash
    ///
    /// # Errors
    ///
    /// - `BadState` for the tree root
    /// - `Unauthorized` without `content/remove` on every location of the subtree
    pub async fn trash(&self, location: &Location) -> Result<TrashItem, RepositoryError> {
        let location_id = location.id;
        self.session
            .write(|uow| {
                let location = uow
                    .state
                    .location(location_id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Location", location_id))?;
                if location.is_root() {
                    return Err(RepositoryError::bad_state(
                        "location",
                        "the tree root cannot be trashed",
                    ));
                }
                let info = content_info_of(uow.state, location.content_id)?.clone();
                for id in uow.state.subtree_ids(location_id) {
                    let Some(descendant) = uow.state.location(id) else {
                        continue;
                    };
                    let owner = content_info_of(uow.state, descendant.content_id)?;
                    uow.authorize("content", "remove", &PermissionTarget::for_location(owner, descendant))?;
                }

                let removed = uow.state.remove_subtree(location_id, uow.changes);
                let content_ids: BTreeSet<u64> = removed.iter().map(|l| l.content_id).collect();
                let item = TrashItem {
                    id: location_id,
                    content_id: info.id,
                    content_type_id: info.content_type_id,
                    content_name: info.name.clone(),
                    original_parent_location_id: location.parent_location_id.unwrap_or_default(),
                    original_path_string: location.path_string.clone(),
                    trashed_at: uow.now,
                    trashed_by: uow.user.user_id,
                    locations: removed
                        .into_iter()
                        .map(|location| TrashedLocation {
                            location,
                            content_trashed: false,
                        })
                        .collect(),
                };
                uow.state.trash.insert(location_id, item);
                for content_id in content_ids {
                    uow.state.reconcile_content(content_id, uow.changes);
                }

                let item = refresh_trashed_flags(uow.state, location_id)?;
                tracing::info!(
                    "Trashed location {} ({} locations)",
                    location_id,
                    item.locations.len()
                );
                Ok(item)
            })
            .await
    }

    /// Restore a trash item below its original parent or `new_parent`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the item is gone, or the original parent is gone and no
    ///   new parent was given
    /// - `Unauthorized` without `content/restore`
    pub async fn recover(
        &self,
        trash_item: &TrashItem,
        new_parent: Option<&Location>,
    ) -> Result<Location, RepositoryError> {
        let item_id = trash_item.id;
        let new_parent_id = new_parent.map(|location| location.id);
        self.session
            .write(|uow| {
                let item = uow
                    .state
                    .trash
                    .get(&item_id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("TrashItem", item_id))?;
                let parent_id = new_parent_id.unwrap_or(item.original_parent_location_id);
                let parent = container_parent(uow.state, parent_id)?.clone();
                let info = content_info_of(uow.state, item.content_id)?;
                uow.authorize(
                    "content",
                    "restore",
                    &PermissionTarget::for_creation(
                        info.section_id,
                        info.owner_id,
                        info.content_type_id,
                        &[&parent],
                    ),
                )?;

                uow.state.trash.remove(&item_id);
                let mut content_ids = BTreeSet::new();
                for trashed in item.locations {
                    let mut location = trashed.location;
                    if location.id == item_id {
                        location.parent_location_id = Some(parent_id);
                    }
                    if uow
                        .state
                        .location_by_remote_id(&location.remote_id)
                        .is_some()
                    {
                        location.remote_id = uuid::Uuid::new_v4().simple().to_string();
                    }
                    content_ids.insert(location.content_id);
                    uow.state.attach_location(location);
                }
                uow.state.rebuild_subtree(item_id, uow.changes);
                for content_id in content_ids {
                    uow.state.reconcile_content(content_id, uow.changes);
                }

                tracing::info!("Recovered trash item {} below {}", item_id, parent_id);
                uow.state
                    .location(item_id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Location", item_id))
            })
            .await
    }

    pub async fn load_trash_item(&self, item_id: u64) -> Result<TrashItem, RepositoryError> {
        self.session
            .read(|ctx| {
                let item = ctx
                    .state
                    .trash
                    .get(&item_id)
                    .ok_or_else(|| RepositoryError::not_found("TrashItem", item_id))?;
                if !is_readable(ctx.state, &ctx.permissions(), item) {
                    return Err(RepositoryError::unauthorized("content", "read"));
                }
                Ok(item.clone())
            })
            .await
    }

    /// Readable trash items matching the query
    pub async fn find_trash_items(&self, query: TrashQuery) -> Result<TrashItemList, RepositoryError> {
        self.session
            .read(|ctx| {
                let permissions = ctx.permissions();
                let needle = query.name_contains.as_ref().map(|name| name.to_lowercase());
                let mut items: Vec<&TrashItem> = ctx
                    .state
                    .trash
                    .values()
                    .filter(|item| {
                        query.content_type_id.map_or(true, |id| item.content_type_id == id)
                            && query.trashed_by.map_or(true, |id| item.trashed_by == id)
                            && query.trashed_after.map_or(true, |at| item.trashed_at >= at)
                            && query.trashed_before.map_or(true, |at| item.trashed_at <= at)
                            && needle
                                .as_ref()
                                .map_or(true, |n| item.content_name.to_lowercase().contains(n))
                    })
                    .filter(|item| is_readable(ctx.state, &permissions, item))
                    .collect();
                items.sort_by(|a, b| a.trashed_at.cmp(&b.trashed_at).then(a.id.cmp(&b.id)));
                if query.newest_first {
                    items.reverse();
                }

                let total_count = items.len();
                let items = items
                    .into_iter()
                    .skip(query.offset)
                    .take(query.limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect();
                Ok(TrashItemList { total_count, items })
            })
            .await
    }

    /// Permanently delete a trash item
    pub async fn delete_trash_item(
        &self,
        trash_item: &TrashItem,
    ) -> Result<TrashItemDeleteResult, RepositoryError> {
        let item_id = trash_item.id;
        self.session
            .write(|uow| {
                uow.authorize_global("content", "cleantrash")?;
                let result = purge_item(uow, item_id)?;
                tracing::info!(
                    "Deleted trash item {} ({} content items removed)",
                    item_id,
                    result.removed_content_ids.len()
                );
                Ok(result)
            })
            .await
    }

    /// Permanently delete every trash item
    pub async fn empty_trash(&self) -> Result<Vec<TrashItemDeleteResult>, RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("content", "cleantrash")?;
                let item_ids: Vec<u64> = uow.state.trash.keys().copied().collect();
                let mut results = Vec::with_capacity(item_ids.len());
                for item_id in item_ids {
                    // an earlier purge may have cascaded into this item
                    if uow.state.trash.contains_key(&item_id) {
                        results.push(purge_item(uow, item_id)?);
                    }
                }
                tracing::info!("Emptied trash ({} items)", results.len());
                Ok(results)
            })
            .await
    }
}

fn purge_item(uow: &mut UnitOfWork<'_>, item_id: u64) -> Result<TrashItemDeleteResult, RepositoryError> {
    let item = uow
        .state
        .trash
        .remove(&item_id)
        .ok_or_else(|| RepositoryError::not_found("TrashItem", item_id))?;
    let before: BTreeSet<u64> = uow.state.contents.keys().copied().collect();
    let content_ids: BTreeSet<u64> = item
        .locations
        .iter()
        .map(|trashed| trashed.location.content_id)
        .collect();
    for content_id in content_ids {
        uow.state.reconcile_content(content_id, uow.changes);
    }
    let removed_content_ids = before
        .into_iter()
        .filter(|id| !uow.state.contents.contains_key(id))
        .collect();
    Ok(TrashItemDeleteResult {
        trash_item_id: item_id,
        content_id: item.content_id,
        removed_content_ids,
    })
}

/// Recompute which trashed placements left their content without a location
fn refresh_trashed_flags(state: &mut RepositoryState, item_id: u64) -> Result<TrashItem, RepositoryError> {
    let active: BTreeSet<u64> = state
        .locations
        .values()
        .filter(|location| !location.is_root())
        .map(|location| location.content_id)
        .collect();
    let item = state
        .trash
        .get_mut(&item_id)
        .ok_or_else(|| RepositoryError::not_found("TrashItem", item_id))?;
    for trashed in &mut item.locations {
        trashed.content_trashed = !active.contains(&trashed.location.content_id);
    }
    Ok(item.clone())
}

fn is_readable(
    state: &RepositoryState,
    permissions: &crate::permissions::PermissionResolver<'_>,
    item: &TrashItem,
) -> bool {
    match (state.content_info(item.content_id), item.root()) {
        (Some(info), Some(root)) => {
            permissions.can_user("content", "read", &PermissionTarget::for_location(info, root))
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "trash_service_test.rs"]
mod trash_service_test;
