//! Role Service
//!
//! Roles bundle policies; assigning a role to a user (optionally limited to a
//! subtree or a set of sections) grants those policies. User management
//! itself is out of scope, users are referenced by id only.

use crate::db::Sequence;
use crate::models::{Role, RoleAssignment, RoleCreateStruct, RoleLimitation, UserReference};
use crate::services::{RepositoryError, Session};

pub struct RoleService<'a> {
    session: &'a Session,
}

impl<'a> RoleService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn create_role(&self, create: RoleCreateStruct) -> Result<Role, RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("role", "create")?;
                if create.identifier.trim().is_empty() {
                    return Err(RepositoryError::invalid_argument(
                        "identifier",
                        "role identifier must not be empty",
                    ));
                }
                if uow.state.role_by_identifier(&create.identifier).is_some() {
                    return Err(RepositoryError::invalid_argument(
                        "identifier",
                        format!("role '{}' already exists", create.identifier),
                    ));
                }
                if let Some(policy) = create
                    .policies
                    .iter()
                    .find(|p| p.module.is_empty() || p.function.is_empty())
                {
                    return Err(RepositoryError::invalid_argument(
                        "policies",
                        format!("incomplete policy '{}/{}'", policy.module, policy.function),
                    ));
                }

                let id = uow.state.next_id(Sequence::Role);
                let role = Role {
                    id,
                    identifier: create.identifier,
                    policies: create.policies,
                };
                uow.state.roles.insert(id, role.clone());
                tracing::info!("Created role '{}' ({})", role.identifier, id);
                Ok(role)
            })
            .await
    }

    pub async fn load_role(&self, id: u64) -> Result<Role, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.permissions().authorize_global("role", "read")?;
                ctx.state
                    .roles
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Role", id))
            })
            .await
    }

    pub async fn load_role_by_identifier(&self, identifier: &str) -> Result<Role, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.permissions().authorize_global("role", "read")?;
                ctx.state
                    .role_by_identifier(identifier)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Role", identifier))
            })
            .await
    }

    pub async fn load_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.permissions().authorize_global("role", "read")?;
                Ok(ctx.state.roles.values().cloned().collect())
            })
            .await
    }

    /// Delete a role together with all of its assignments
    pub async fn delete_role(&self, role: &Role) -> Result<(), RepositoryError> {
        let role_id = role.id;
        self.session
            .write(|uow| {
                uow.authorize_global("role", "delete")?;
                let role = uow
                    .state
                    .roles
                    .remove(&role_id)
                    .ok_or_else(|| RepositoryError::not_found("Role", role_id))?;
                uow.state
                    .role_assignments
                    .retain(|_, assignment| assignment.role_id != role_id);
                tracing::info!("Deleted role '{}'", role.identifier);
                Ok(())
            })
            .await
    }

    pub async fn assign_role_to_user(
        &self,
        role: &Role,
        user: UserReference,
        limitation: Option<RoleLimitation>,
    ) -> Result<RoleAssignment, RepositoryError> {
        let role_id = role.id;
        self.session
            .write(|uow| {
                uow.authorize_global("role", "assign")?;
                if !uow.state.roles.contains_key(&role_id) {
                    return Err(RepositoryError::not_found("Role", role_id));
                }
                if let Some(RoleLimitation::Section(ids)) = &limitation {
                    if let Some(missing) = ids.iter().find(|id| !uow.state.sections.contains_key(id)) {
                        return Err(RepositoryError::not_found("Section", missing));
                    }
                }
                let duplicate = uow.state.assignments_for_user(user.user_id).any(|assignment| {
                    assignment.role_id == role_id && assignment.limitation == limitation
                });
                if duplicate {
                    return Err(RepositoryError::invalid_argument(
                        "role",
                        format!("role {} is already assigned to user {}", role_id, user.user_id),
                    ));
                }

                let id = uow.state.next_id(Sequence::RoleAssignment);
                let assignment = RoleAssignment {
                    id,
                    role_id,
                    user_id: user.user_id,
                    limitation,
                };
                uow.state.role_assignments.insert(id, assignment.clone());
                tracing::debug!("Assigned role {} to user {}", role_id, user.user_id);
                Ok(assignment)
            })
            .await
    }

    pub async fn unassign_role(&self, assignment: &RoleAssignment) -> Result<(), RepositoryError> {
        let assignment_id = assignment.id;
        self.session
            .write(|uow| {
                uow.authorize_global("role", "assign")?;
                uow.state
                    .role_assignments
                    .remove(&assignment_id)
                    .map(|_| ())
                    .ok_or_else(|| RepositoryError::not_found("RoleAssignment", assignment_id))
            })
            .await
    }

    pub async fn get_role_assignments_for_user(
        &self,
        user: UserReference,
    ) -> Result<Vec<RoleAssignment>, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.permissions().authorize_global("role", "read")?;
                Ok(ctx.state.assignments_for_user(user.user_id).cloned().collect())
            })
            .await
    }
}
