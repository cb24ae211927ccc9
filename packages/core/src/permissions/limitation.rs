//! Limitation Evaluation
//!
//! A [`PermissionTarget`] describes the object an operation acts on; every
//! [`Limitation`] kind is checked against it by [`LimitationEvaluator`].
//!
//! A limitation whose attribute is absent from the target does not pass, with
//! one exception: a target that names no languages passes `Language`
//! limitations, since the operation is not language specific.

use crate::db::RepositoryState;
use crate::models::{ContentInfo, Limitation, Location, UserReference};

/// Attributes of the object an operation acts on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTarget {
    pub section_id: Option<u64>,
    pub owner_id: Option<u64>,
    pub content_type_id: Option<u64>,
    /// Paths of the locations involved, e.g. `/1/2/42/`
    pub location_paths: Vec<String>,
    pub location_ids: Vec<u64>,
    /// Languages touched; `None` when the operation is not language specific
    pub language_codes: Option<Vec<String>>,
}

impl PermissionTarget {
    /// Target for a content item in all of its active locations
    ///
    /// Unplaced content falls back to the locations requested at creation.
    pub fn for_content(state: &RepositoryState, info: &ContentInfo) -> Self {
        let mut target = Self {
            section_id: Some(info.section_id),
            owner_id: Some(info.owner_id),
            content_type_id: Some(info.content_type_id),
            ..Default::default()
        };
        for location in state.locations_of(info.id) {
            target.location_paths.push(location.path_string.clone());
            target.location_ids.push(location.id);
        }
        if target.location_paths.is_empty() {
            if let Some(pending) = state.pending_locations.get(&info.id) {
                for create in pending {
                    if let Some(parent) = state.location(create.parent_location_id) {
                        target.location_paths.push(parent.path_string.clone());
                    }
                }
            }
        }
        target
    }

    /// Target for a content item at one specific location
    pub fn for_location(info: &ContentInfo, location: &Location) -> Self {
        Self {
            section_id: Some(info.section_id),
            owner_id: Some(info.owner_id),
            content_type_id: Some(info.content_type_id),
            location_paths: vec![location.path_string.clone()],
            location_ids: vec![location.id],
            language_codes: None,
        }
    }

    /// Target for new content placed below `parents`
    pub fn for_creation(
        section_id: u64,
        owner_id: u64,
        content_type_id: u64,
        parents: &[&Location],
    ) -> Self {
        Self {
            section_id: Some(section_id),
            owner_id: Some(owner_id),
            content_type_id: Some(content_type_id),
            location_paths: parents.iter().map(|l| l.path_string.clone()).collect(),
            location_ids: parents.iter().map(|l| l.id).collect(),
            language_codes: None,
        }
    }

    pub fn with_languages(mut self, language_codes: impl IntoIterator<Item = String>) -> Self {
        self.language_codes = Some(language_codes.into_iter().collect());
        self
    }

    pub fn with_section(mut self, section_id: u64) -> Self {
        self.section_id = Some(section_id);
        self
    }
}

/// Evaluates the closed set of limitation kinds
pub struct LimitationEvaluator;

impl LimitationEvaluator {
    pub fn evaluate(
        limitation: &Limitation,
        target: &PermissionTarget,
        user: UserReference,
    ) -> bool {
        match limitation {
            Limitation::Subtree(paths) => target
                .location_paths
                .iter()
                .any(|path| paths.iter().any(|prefix| path.starts_with(prefix.as_str()))),
            Limitation::Location(ids) => target.location_ids.iter().any(|id| ids.contains(id)),
            Limitation::Section(ids) => target
                .section_id
                .map(|section_id| ids.contains(&section_id))
                .unwrap_or(false),
            Limitation::ContentType(ids) => target
                .content_type_id
                .map(|type_id| ids.contains(&type_id))
                .unwrap_or(false),
            Limitation::Owner => target.owner_id == Some(user.user_id),
            Limitation::Language(codes) => match &target.language_codes {
                None => true,
                Some(languages) => languages.iter().all(|language| codes.contains(language)),
            },
        }
    }

    /// Whether every limitation passes
    pub fn evaluate_all(
        limitations: &[Limitation],
        target: &PermissionTarget,
        user: UserReference,
    ) -> bool {
        limitations
            .iter()
            .all(|limitation| Self::evaluate(limitation, target, user))
    }
}
