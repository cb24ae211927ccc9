//! Section Service
//!
//! Sections partition content for permission purposes. Identifiers are unique;
//! a section cannot be deleted while content is assigned to it or a role
//! limitation references it.

use crate::db::Sequence;
use crate::models::{Limitation, RoleLimitation, Section, SectionCreateStruct, SectionUpdateStruct};
use crate::permissions::PermissionTarget;
use crate::services::{RepositoryError, Session};

pub struct SectionService<'a> {
    session: &'a Session,
}

impl<'a> SectionService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn create_section(
        &self,
        create: SectionCreateStruct,
    ) -> Result<Section, RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("section", "edit")?;
                if create.identifier.trim().is_empty() {
                    return Err(RepositoryError::invalid_argument(
                        "identifier",
                        "identifier must not be empty",
                    ));
                }
                if uow.state.section_by_identifier(&create.identifier).is_some() {
                    return Err(RepositoryError::invalid_argument(
                        "identifier",
                        format!("section '{}' already exists", create.identifier),
                    ));
                }
                let id = uow.state.next_id(Sequence::Section);
                let section = Section {
                    id,
                    identifier: create.identifier,
                    name: create.name,
                };
                uow.state.sections.insert(id, section.clone());
                Ok(section)
            })
            .await
    }

    pub async fn update_section(
        &self,
        id: u64,
        update: SectionUpdateStruct,
    ) -> Result<Section, RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("section", "edit")?;
                if let Some(identifier) = &update.identifier {
                    if uow
                        .state
                        .section_by_identifier(identifier)
                        .is_some_and(|other| other.id != id)
                    {
                        return Err(RepositoryError::invalid_argument(
                            "identifier",
                            format!("section '{}' already exists", identifier),
                        ));
                    }
                }
                let section = uow
                    .state
                    .sections
                    .get_mut(&id)
                    .ok_or_else(|| RepositoryError::not_found("Section", id))?;
                if let Some(identifier) = update.identifier {
                    section.identifier = identifier;
                }
                if let Some(name) = update.name {
                    section.name = name;
                }
                Ok(section.clone())
            })
            .await
    }

    pub async fn load_section(&self, id: u64) -> Result<Section, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.permissions().authorize_global("section", "view")?;
                ctx.state
                    .sections
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Section", id))
            })
            .await
    }

    pub async fn load_section_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Section, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.permissions().authorize_global("section", "view")?;
                ctx.state
                    .section_by_identifier(identifier)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Section", identifier))
            })
            .await
    }

    pub async fn load_sections(&self) -> Result<Vec<Section>, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.permissions().authorize_global("section", "view")?;
                Ok(ctx.state.sections.values().cloned().collect())
            })
            .await
    }

    /// Number of content items assigned to the section
    pub async fn count_assigned_contents(&self, id: u64) -> Result<usize, RepositoryError> {
        self.session
            .read(|ctx| {
                if !ctx.state.sections.contains_key(&id) {
                    return Err(RepositoryError::not_found("Section", id));
                }
                Ok(ctx.state.count_section_contents(id))
            })
            .await
    }

    /// Whether content or a role limitation references the section
    pub async fn is_section_used(&self, id: u64) -> Result<bool, RepositoryError> {
        self.session
            .read(|ctx| {
                if !ctx.state.sections.contains_key(&id) {
                    return Err(RepositoryError::not_found("Section", id));
                }
                Ok(is_used(ctx.state, id))
            })
            .await
    }

    /// Move a single content item to another section
    pub async fn assign_section(&self, content_id: u64, section_id: u64) -> Result<(), RepositoryError> {
        self.session
            .write(|uow| {
                if !uow.state.sections.contains_key(&section_id) {
                    return Err(RepositoryError::not_found("Section", section_id));
                }
                let info = uow
                    .state
                    .content_info(content_id)
                    .ok_or_else(|| RepositoryError::not_found("Content", content_id))?;
                let target = PermissionTarget::for_content(uow.state, info);
                uow.authorize("content", "read", &target)?;
                uow.authorize("section", "assign", &target.with_section(section_id))?;

                if let Some(info) = uow.state.contents.get_mut(&content_id) {
                    info.section_id = section_id;
                }
                uow.state.touch_content(content_id, uow.changes);
                Ok(())
            })
            .await
    }

    /// Assign every content item placed in a subtree to the section
    pub async fn assign_section_to_subtree(
        &self,
        location_id: u64,
        section_id: u64,
    ) -> Result<(), RepositoryError> {
        self.session
            .write(|uow| {
                if !uow.state.sections.contains_key(&section_id) {
                    return Err(RepositoryError::not_found("Section", section_id));
                }
                let root = uow
                    .state
                    .location(location_id)
                    .ok_or_else(|| RepositoryError::not_found("Location", location_id))?;
                if root.is_root() {
                    return Err(RepositoryError::invalid_argument(
                        "location",
                        "the tree root has no content",
                    ));
                }

                let mut content_ids = Vec::new();
                for id in uow.state.subtree_ids(location_id) {
                    let Some(location) = uow.state.location(id) else {
                        continue;
                    };
                    if content_ids.contains(&location.content_id) {
                        continue;
                    }
                    let info = uow
                        .state
                        .content_info(location.content_id)
                        .ok_or_else(|| RepositoryError::not_found("Content", location.content_id))?;
                    let target = PermissionTarget::for_location(info, location);
                    uow.authorize("section", "assign", &target.with_section(section_id))?;
                    content_ids.push(location.content_id);
                }

                for content_id in &content_ids {
                    if let Some(info) = uow.state.contents.get_mut(content_id) {
                        info.section_id = section_id;
                    }
                    uow.state.touch_content(*content_id, uow.changes);
                }
                tracing::info!(
                    "Assigned {} content items below location {} to section {}",
                    content_ids.len(),
                    location_id,
                    section_id
                );
                Ok(())
            })
            .await
    }

    /// Delete an unused section
    ///
    /// # Errors
    ///
    /// - `BadState` while content is assigned or a role limitation references it
    /// - `Unauthorized` without `section/edit`
    pub async fn delete_section(&self, id: u64) -> Result<(), RepositoryError> {
        self.session
            .write(|uow| {
                if !uow.state.sections.contains_key(&id) {
                    return Err(RepositoryError::not_found("Section", id));
                }
                uow.authorize_global("section", "edit")?;
                if is_used(uow.state, id) {
                    return Err(RepositoryError::bad_state(
                        "section",
                        format!(
                            "section {} is still assigned to {} content items or referenced by a role",
                            id,
                            uow.state.count_section_contents(id)
                        ),
                    ));
                }
                uow.state.sections.remove(&id);
                Ok(())
            })
            .await
    }
}

fn is_used(state: &crate::db::RepositoryState, id: u64) -> bool {
    if state.count_section_contents(id) > 0 {
        return true;
    }
    let in_policies = state.roles.values().any(|role| {
        role.policies.iter().any(|policy| {
            policy
                .limitations
                .iter()
                .any(|limitation| matches!(limitation, Limitation::Section(ids) if ids.contains(&id)))
        })
    });
    let in_assignments = state.role_assignments.values().any(|assignment| {
        matches!(&assignment.limitation, Some(RoleLimitation::Section(ids)) if ids.contains(&id))
    });
    in_policies || in_assignments
}

#[cfg(test)]
#[path = "section_service_test.rs"]
mod section_service_test;
