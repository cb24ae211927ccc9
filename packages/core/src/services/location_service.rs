//! Location Service - Tree Placement
//!
//! Locations place published content in the tree. Every operation keeps the
//! materialized paths consistent with the parent links and recomputes derived
//! invisibility for the affected subtree, so the tree never holds orphans.
//!
//! Deleting a location removes its subtree; content whose last placement was
//! removed is deleted with it, while content placed elsewhere survives. The
//! tree root (location 1) cannot be changed.

use crate::db::RepositoryState;
use crate::models::{
    ContentInfo, Location, LocationCreateStruct, LocationList, LocationUpdateStruct, SortField,
    SortOrder,
};
use crate::permissions::{PermissionResolver, PermissionTarget};
use crate::services::content_service::{
    check_location_remote_id, container_parent, content_info_of, copy_content_item,
    current_version_no,
};
use crate::services::{RepositoryError, Session};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

pub struct LocationService<'a> {
    session: &'a Session,
}

impl<'a> LocationService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn load_location(&self, location_id: u64) -> Result<Location, RepositoryError> {
        self.session
            .read(|ctx| {
                let location = ctx
                    .state
                    .location(location_id)
                    .ok_or_else(|| RepositoryError::not_found("Location", location_id))?;
                authorize_read(&ctx.permissions(), ctx.state, location)?;
                Ok(location.clone())
            })
            .await
    }

    pub async fn load_location_by_remote_id(
        &self,
        remote_id: &str,
    ) -> Result<Location, RepositoryError> {
        self.session
            .read(|ctx| {
                let location = ctx
                    .state
                    .location_by_remote_id(remote_id)
                    .ok_or_else(|| RepositoryError::not_found("Location", remote_id))?;
                authorize_read(&ctx.permissions(), ctx.state, location)?;
                Ok(location.clone())
            })
            .await
    }

    /// Readable locations of a content item
    pub async fn load_locations(
        &self,
        content_info: &ContentInfo,
    ) -> Result<Vec<Location>, RepositoryError> {
        let content_id = content_info.id;
        self.session
            .read(|ctx| {
                content_info_of(ctx.state, content_id)?;
                let permissions = ctx.permissions();
                Ok(ctx
                    .state
                    .locations_of(content_id)
                    .into_iter()
                    .filter(|location| is_readable(&permissions, ctx.state, location))
                    .cloned()
                    .collect())
            })
            .await
    }

    /// Readable children ordered by the parent's sort field and order
    pub async fn load_location_children(
        &self,
        location: &Location,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<LocationList, RepositoryError> {
        let parent_id = location.id;
        self.session
            .read(|ctx| {
                let parent = ctx
                    .state
                    .location(parent_id)
                    .ok_or_else(|| RepositoryError::not_found("Location", parent_id))?;
                let permissions = ctx.permissions();
                let mut children: Vec<&Location> = ctx
                    .state
                    .child_ids(parent_id)
                    .into_iter()
                    .filter_map(|id| ctx.state.location(id))
                    .filter(|child| is_readable(&permissions, ctx.state, child))
                    .collect();
                children.sort_by(|a, b| {
                    compare_children(ctx.state, parent.sort_field, parent.sort_order, a, b)
                });

                let total_count = children.len();
                let locations = children
                    .into_iter()
                    .skip(offset)
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect();
                Ok(LocationList {
                    total_count,
                    locations,
                })
            })
            .await
    }

    pub async fn get_location_child_count(&self, location: &Location) -> Result<usize, RepositoryError> {
        let parent_id = location.id;
        self.session
            .read(|ctx| {
                if ctx.state.location(parent_id).is_none() {
                    return Err(RepositoryError::not_found("Location", parent_id));
                }
                let permissions = ctx.permissions();
                Ok(ctx
                    .state
                    .child_ids(parent_id)
                    .into_iter()
                    .filter_map(|id| ctx.state.location(id))
                    .filter(|child| is_readable(&permissions, ctx.state, child))
                    .count())
            })
            .await
    }

    /// Place published content below another location
    ///
    /// # Errors
    ///
    /// - `BadState` if the content has no published version
    /// - `InvalidArgument` if the content is already placed below the parent,
    ///   the parent lies inside a subtree of the content or is not a container
    pub async fn create_location(
        &self,
        content_info: &ContentInfo,
        create: LocationCreateStruct,
    ) -> Result<Location, RepositoryError> {
        let content_id = content_info.id;
        self.session
            .write(|uow| {
                let info = content_info_of(uow.state, content_id)?.clone();
                if uow.state.published_version(content_id).is_none() {
                    return Err(RepositoryError::bad_state(
                        "contentInfo",
                        format!("content {} is not published", content_id),
                    ));
                }
                let parent = container_parent(uow.state, create.parent_location_id)?.clone();
                for existing in uow.state.locations_of(content_id) {
                    if existing.parent_location_id == Some(parent.id) {
                        return Err(RepositoryError::invalid_argument(
                            "parentLocationId",
                            format!("content {} is already placed below {}", content_id, parent.id),
                        ));
                    }
                    if existing.contains(&parent) {
                        return Err(RepositoryError::invalid_argument(
                            "parentLocationId",
                            format!("location {} lies inside a subtree of content {}", parent.id, content_id),
                        ));
                    }
                }
                check_location_remote_id(uow.state, create.remote_id.as_deref())?;

                uow.authorize(
                    "content",
                    "manage_locations",
                    &PermissionTarget::for_content(uow.state, &info),
                )?;
                uow.authorize(
                    "content",
                    "create",
                    &PermissionTarget::for_creation(
                        info.section_id,
                        info.owner_id,
                        info.content_type_id,
                        &[&parent],
                    ),
                )?;

                let location = uow.state.create_location(content_id, &create, uow.changes);
                uow.state.reconcile_content(content_id, uow.changes);
                tracing::debug!("Placed content {} at location {}", content_id, location.id);
                Ok(location)
            })
            .await
    }

    /// Update priority, remote id and child sorting
    pub async fn update_location(
        &self,
        location: &Location,
        update: LocationUpdateStruct,
    ) -> Result<Location, RepositoryError> {
        let location_id = location.id;
        self.session
            .write(|uow| {
                let (info, location) = mutable_location(uow.state, location_id)?;
                if let Some(remote_id) = &update.remote_id {
                    if uow
                        .state
                        .location_by_remote_id(remote_id)
                        .is_some_and(|other| other.id != location_id)
                    {
                        return Err(RepositoryError::invalid_argument(
                            "remoteId",
                            format!("location remote id '{}' is already in use", remote_id),
                        ));
                    }
                }
                uow.authorize("content", "edit", &PermissionTarget::for_location(&info, &location))?;

                let stored = uow
                    .state
                    .locations
                    .get_mut(&location_id)
                    .ok_or_else(|| RepositoryError::not_found("Location", location_id))?;
                if let Some(priority) = update.priority {
                    stored.priority = priority;
                }
                if let Some(remote_id) = update.remote_id {
                    stored.remote_id = remote_id;
                }
                if let Some(sort_field) = update.sort_field {
                    stored.sort_field = sort_field;
                }
                if let Some(sort_order) = update.sort_order {
                    stored.sort_order = sort_order;
                }
                let updated = stored.clone();
                uow.changes.location_changed(location_id);
                Ok(updated)
            })
            .await
    }

    /// Exchange the content placed at two locations
    ///
    /// Location ids, paths, visibility and children stay where they are.
    pub async fn swap_location(&self, first: &Location, second: &Location) -> Result<(), RepositoryError> {
        let (first_id, second_id) = (first.id, second.id);
        self.session
            .write(|uow| {
                let (first_info, first) = mutable_location(uow.state, first_id)?;
                let (second_info, second) = mutable_location(uow.state, second_id)?;
                uow.authorize("content", "edit", &PermissionTarget::for_location(&first_info, &first))?;
                uow.authorize("content", "edit", &PermissionTarget::for_location(&second_info, &second))?;
                if first_info.id == second_info.id {
                    return Ok(());
                }

                if let Some(location) = uow.state.locations.get_mut(&first_id) {
                    location.content_id = second_info.id;
                }
                if let Some(location) = uow.state.locations.get_mut(&second_id) {
                    location.content_id = first_info.id;
                }
                for (content_id, from, to) in [
                    (first_info.id, first_id, second_id),
                    (second_info.id, second_id, first_id),
                ] {
                    if let Some(info) = uow.state.contents.get_mut(&content_id) {
                        if info.main_location_id == Some(from) {
                            info.main_location_id = Some(to);
                        }
                    }
                    uow.state.touch_content(content_id, uow.changes);
                }
                uow.changes.location_changed(first_id);
                uow.changes.location_changed(second_id);
                tracing::info!("Swapped content of locations {} and {}", first_id, second_id);
                Ok(())
            })
            .await
    }

    /// Hide a location; its whole subtree becomes invisible
    pub async fn hide_location(&self, location: &Location) -> Result<Location, RepositoryError> {
        self.set_hidden(location.id, true).await
    }

    /// Unhide a location; descendants stay invisible below other hidden locations
    pub async fn unhide_location(&self, location: &Location) -> Result<Location, RepositoryError> {
        self.set_hidden(location.id, false).await
    }

    /// Move a subtree below a new parent
    pub async fn move_subtree(
        &self,
        location: &Location,
        new_parent: &Location,
    ) -> Result<Location, RepositoryError> {
        let (location_id, parent_id) = (location.id, new_parent.id);
        self.session
            .write(|uow| {
                let (info, location) = mutable_location(uow.state, location_id)?;
                let parent = container_parent(uow.state, parent_id)?.clone();
                if location.contains(&parent) {
                    return Err(RepositoryError::invalid_argument(
                        "newParentLocation",
                        "cannot move a subtree below itself",
                    ));
                }
                uow.authorize("content", "read", &PermissionTarget::for_location(&info, &location))?;
                uow.authorize(
                    "content",
                    "create",
                    &PermissionTarget::for_creation(
                        info.section_id,
                        info.owner_id,
                        info.content_type_id,
                        &[&parent],
                    ),
                )?;

                if let Some(old_parent) = location.parent_location_id {
                    if let Some(siblings) = uow.state.children.get_mut(&old_parent) {
                        siblings.remove(&location_id);
                    }
                }
                if let Some(stored) = uow.state.locations.get_mut(&location_id) {
                    stored.parent_location_id = Some(parent_id);
                }
                uow.state.children.entry(parent_id).or_default().insert(location_id);
                uow.state.rebuild_subtree(location_id, uow.changes);

                tracing::info!("Moved subtree {} below {}", location_id, parent_id);
                uow.state
                    .location(location_id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Location", location_id))
            })
            .await
    }

    /// Copy a subtree with its content below a new parent
    ///
    /// Every content item is copied once (published version only); content
    /// placed several times inside the subtree keeps that shape in the copy.
    pub async fn copy_subtree(
        &self,
        subtree: &Location,
        target_parent: &Location,
    ) -> Result<Location, RepositoryError> {
        let (source_id, target_id) = (subtree.id, target_parent.id);
        self.session
            .write(|uow| {
                let (info, source) = mutable_location(uow.state, source_id)?;
                let target = container_parent(uow.state, target_id)?.clone();
                if source.contains(&target) {
                    return Err(RepositoryError::invalid_argument(
                        "targetParentLocation",
                        "cannot copy a subtree into itself",
                    ));
                }
                uow.authorize(
                    "content",
                    "create",
                    &PermissionTarget::for_creation(
                        info.section_id,
                        info.owner_id,
                        info.content_type_id,
                        &[&target],
                    ),
                )?;

                let subtree: Vec<Location> = uow
                    .state
                    .subtree_ids(source_id)
                    .into_iter()
                    .filter_map(|id| uow.state.location(id).cloned())
                    .collect();
                for location in &subtree {
                    let content = content_info_of(uow.state, location.content_id)?;
                    uow.authorize("content", "read", &PermissionTarget::for_location(content, location))?;
                }

                let mut location_map: HashMap<u64, u64> = HashMap::new();
                let mut content_map: HashMap<u64, u64> = HashMap::new();
                for location in &subtree {
                    let parent_location_id = if location.id == source_id {
                        target_id
                    } else {
                        location
                            .parent_location_id
                            .and_then(|parent| location_map.get(&parent).copied())
                            .ok_or_else(|| RepositoryError::not_found("Location", location.id))?
                    };
                    let copy_id = match content_map.get(&location.content_id) {
                        Some(copy_id) => *copy_id,
                        None => {
                            let version_no = current_version_no(uow.state, location.content_id);
                            let copy_id = copy_content_item(uow, location.content_id, version_no)?;
                            content_map.insert(location.content_id, copy_id);
                            copy_id
                        }
                    };
                    let create = LocationCreateStruct::new(parent_location_id)
                        .with_priority(location.priority)
                        .hidden(location.hidden)
                        .with_sort(location.sort_field, location.sort_order);
                    let copy = uow.state.create_location(copy_id, &create, uow.changes);
                    location_map.insert(location.id, copy.id);
                }

                let root_copy = location_map
                    .get(&source_id)
                    .copied()
                    .ok_or_else(|| RepositoryError::not_found("Location", source_id))?;
                tracing::info!(
                    "Copied subtree {} ({} locations) to {}",
                    source_id,
                    subtree.len(),
                    root_copy
                );
                uow.state
                    .location(root_copy)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Location", root_copy))
            })
            .await
    }

    /// Delete a location with its subtree
    ///
    /// Content that is no longer placed anywhere (and not held in the trash)
    /// is deleted as well.
    pub async fn delete_location(&self, location: &Location) -> Result<(), RepositoryError> {
        let location_id = location.id;
        self.session
            .write(|uow| {
                mutable_location(uow.state, location_id)?;
                for id in uow.state.subtree_ids(location_id) {
                    let Some(location) = uow.state.location(id) else {
                        continue;
                    };
                    let info = content_info_of(uow.state, location.content_id)?;
                    uow.authorize("content", "remove", &PermissionTarget::for_location(info, location))?;
                }

                let removed = uow.state.remove_subtree(location_id, uow.changes);
                let content_ids: BTreeSet<u64> = removed.iter().map(|l| l.content_id).collect();
                for content_id in content_ids {
                    uow.state.reconcile_content(content_id, uow.changes);
                }
                tracing::info!(
                    "Deleted location {} ({} locations removed)",
                    location_id,
                    removed.len()
                );
                Ok(())
            })
            .await
    }

    async fn set_hidden(&self, location_id: u64, hidden: bool) -> Result<Location, RepositoryError> {
        self.session
            .write(|uow| {
                let (info, location) = mutable_location(uow.state, location_id)?;
                uow.authorize("content", "hide", &PermissionTarget::for_location(&info, &location))?;

                if let Some(stored) = uow.state.locations.get_mut(&location_id) {
                    stored.hidden = hidden;
                }
                uow.state.rebuild_subtree(location_id, uow.changes);
                tracing::debug!("Location {} hidden={}", location_id, hidden);
                uow.state
                    .location(location_id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Location", location_id))
            })
            .await
    }
}

/// A non-root location with its content
fn mutable_location(
    state: &RepositoryState,
    location_id: u64,
) -> Result<(ContentInfo, Location), RepositoryError> {
    let location = state
        .location(location_id)
        .ok_or_else(|| RepositoryError::not_found("Location", location_id))?;
    if location.is_root() {
        return Err(RepositoryError::bad_state(
            "location",
            "the tree root cannot be changed",
        ));
    }
    let info = content_info_of(state, location.content_id)?;
    Ok((info.clone(), location.clone()))
}

fn is_readable(permissions: &PermissionResolver<'_>, state: &RepositoryState, location: &Location) -> bool {
    if location.is_root() {
        return true;
    }
    state.content_info(location.content_id).is_some_and(|info| {
        permissions.can_user("content", "read", &PermissionTarget::for_location(info, location))
    })
}

fn authorize_read(
    permissions: &PermissionResolver<'_>,
    state: &RepositoryState,
    location: &Location,
) -> Result<(), RepositoryError> {
    if is_readable(permissions, state, location) {
        Ok(())
    } else {
        Err(RepositoryError::unauthorized("content", "read"))
    }
}

fn compare_children(
    state: &RepositoryState,
    sort_field: SortField,
    sort_order: SortOrder,
    a: &Location,
    b: &Location,
) -> Ordering {
    let info_a = state.content_info(a.content_id);
    let info_b = state.content_info(b.content_id);
    let ordering = match sort_field {
        SortField::Path => a.path().cmp(&b.path()),
        SortField::Published => info_a
            .and_then(|i| i.published_at)
            .cmp(&info_b.and_then(|i| i.published_at)),
        SortField::Modified => info_a
            .map(|i| i.modified_at)
            .cmp(&info_b.map(|i| i.modified_at)),
        SortField::Priority => a.priority.cmp(&b.priority),
        SortField::Name => info_a
            .map(|i| i.name.to_lowercase())
            .cmp(&info_b.map(|i| i.name.to_lowercase())),
        SortField::ContentId => a.content_id.cmp(&b.content_id),
        SortField::Depth => a.depth.cmp(&b.depth),
    };
    let ordering = match sort_order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    };
    ordering.then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
#[path = "location_service_test.rs"]
mod location_service_test;
