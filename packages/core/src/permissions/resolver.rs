//! Permission Resolver
//!
//! Resolves module/function grants for one user against one state snapshot.
//! A grant comes from any policy of any role assigned to the user; the policy's
//! limitations and the assignment's role limitation must all pass for the
//! target.

use crate::db::RepositoryState;
use crate::models::{Limitation, UserReference};
use crate::permissions::{LimitationEvaluator, PermissionTarget};
use crate::services::RepositoryError;

/// Result of checking a module/function pair without a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Unrestricted grant
    Granted,
    Denied,
    /// Granted if any of the limitation sets passes for the target
    Limited(Vec<Vec<Limitation>>),
}

pub struct PermissionResolver<'a> {
    state: &'a RepositoryState,
    user: UserReference,
    elevated: bool,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(state: &'a RepositoryState, user: UserReference, elevated: bool) -> Self {
        Self {
            state,
            user,
            elevated,
        }
    }

    pub fn current_user(&self) -> UserReference {
        self.user
    }

    /// Limitation sets under which the user holds `module/function`
    pub fn has_access(&self, module: &str, function: &str) -> AccessDecision {
        if self.elevated {
            return AccessDecision::Granted;
        }

        let mut limited = Vec::new();
        for assignment in self.state.assignments_for_user(self.user.user_id) {
            let Some(role) = self.state.roles.get(&assignment.role_id) else {
                continue;
            };
            for policy in role.policies.iter().filter(|p| p.matches(module, function)) {
                let mut limitations = policy.limitations.clone();
                if let Some(role_limitation) = &assignment.limitation {
                    limitations.push(role_limitation.clone().into());
                }
                if limitations.is_empty() {
                    return AccessDecision::Granted;
                }
                limited.push(limitations);
            }
        }

        if limited.is_empty() {
            AccessDecision::Denied
        } else {
            AccessDecision::Limited(limited)
        }
    }

    pub fn can_user(&self, module: &str, function: &str, target: &PermissionTarget) -> bool {
        match self.has_access(module, function) {
            AccessDecision::Granted => true,
            AccessDecision::Denied => false,
            AccessDecision::Limited(sets) => sets
                .iter()
                .any(|limitations| LimitationEvaluator::evaluate_all(limitations, target, self.user)),
        }
    }

    /// Fail with `Unauthorized` unless the user can act on the target
    pub fn authorize(
        &self,
        module: &str,
        function: &str,
        target: &PermissionTarget,
    ) -> Result<(), RepositoryError> {
        if self.can_user(module, function, target) {
            Ok(())
        } else {
            tracing::debug!(
                "Denied {}/{} for user {}",
                module,
                function,
                self.user.user_id
            );
            Err(RepositoryError::unauthorized(module, function))
        }
    }

    /// Fail with `Unauthorized` unless the user holds an unrestricted grant
    pub fn authorize_global(&self, module: &str, function: &str) -> Result<(), RepositoryError> {
        match self.has_access(module, function) {
            AccessDecision::Granted => Ok(()),
            _ => Err(RepositoryError::unauthorized(module, function)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryConfig;
    use crate::db::seed::{seed_state, HOME_CONTENT_ID};
    use crate::db::Sequence;
    use crate::models::{Policy, Role, RoleAssignment, RoleLimitation};

    fn state_with_editor() -> RepositoryState {
        let mut state = seed_state(&RepositoryConfig::default());
        let role_id = state.next_id(Sequence::Role);
        state.roles.insert(
            role_id,
            Role {
                id: role_id,
                identifier: "editor".to_string(),
                policies: vec![
                    Policy::new("content", "read"),
                    Policy::new("content", "edit")
                        .with_limitation(Limitation::Language(vec!["eng-GB".to_string()])),
                ],
            },
        );
        let assignment_id = state.next_id(Sequence::RoleAssignment);
        state.role_assignments.insert(
            assignment_id,
            RoleAssignment {
                id: assignment_id,
                role_id,
                user_id: 50,
                limitation: Some(RoleLimitation::Subtree(vec!["/1/2/".to_string()])),
            },
        );
        state
    }

    #[test]
    fn test_administrator_has_unrestricted_access() {
        let state = seed_state(&RepositoryConfig::default());
        let resolver = PermissionResolver::new(&state, UserReference::new(14), false);
        assert_eq!(resolver.has_access("content", "remove"), AccessDecision::Granted);
    }

    #[test]
    fn test_anonymous_reads_standard_section_only() {
        let state = seed_state(&RepositoryConfig::default());
        let resolver = PermissionResolver::new(&state, UserReference::new(10), false);
        let home = state.content_info(HOME_CONTENT_ID).unwrap();
        let target = PermissionTarget::for_content(&state, home);

        assert!(resolver.can_user("content", "read", &target));
        assert!(!resolver.can_user("content", "read", &target.clone().with_section(2)));
        assert!(resolver.authorize("content", "edit", &target).is_err());
    }

    #[test]
    fn test_role_limitation_applies_to_every_policy() {
        let state = state_with_editor();
        let resolver = PermissionResolver::new(&state, UserReference::new(50), false);
        let home = state.content_info(HOME_CONTENT_ID).unwrap();
        let inside = PermissionTarget::for_content(&state, home);
        let outside = PermissionTarget {
            location_paths: vec!["/1/7/".to_string()],
            ..inside.clone()
        };

        assert!(resolver.can_user("content", "read", &inside));
        assert!(!resolver.can_user("content", "read", &outside));
        assert!(resolver.can_user(
            "content",
            "edit",
            &inside.clone().with_languages(["eng-GB".to_string()])
        ));
        assert!(!resolver.can_user(
            "content",
            "edit",
            &inside.with_languages(["ger-DE".to_string()])
        ));
    }

    #[test]
    fn test_elevated_resolver_bypasses_policies() {
        let state = seed_state(&RepositoryConfig::default());
        let resolver = PermissionResolver::new(&state, UserReference::new(10), true);
        assert!(resolver.authorize_global("section", "edit").is_ok());
    }

    #[test]
    fn test_unassigned_user_is_denied() {
        let state = seed_state(&RepositoryConfig::default());
        let resolver = PermissionResolver::new(&state, UserReference::new(999), false);
        let err = resolver
            .authorize("content", "read", &PermissionTarget::default())
            .unwrap_err();
        assert_eq!(err, RepositoryError::unauthorized("content", "read"));
    }
}
