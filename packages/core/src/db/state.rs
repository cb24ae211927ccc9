//! Repository State
//!
//! In-memory tables of the repository plus the tree helpers every service builds
//! on. The state is a plain value: a unit of work mutates a private copy and the
//! store swaps it in on commit, so helpers here never need to undo anything.
//!
//! # Location arena
//!
//! Locations are kept in an arena keyed by id with a `children` index
//! (`parent id → child ids`). Each location carries its materialized path and
//! derived `invisible` flag; [`RepositoryState::rebuild_subtree`] recomputes both
//! for a subtree after any placement or visibility change.

use crate::db::events::ChangeSet;
use crate::models::{
    language_mask, Content, ContentInfo, ContentStatus, ContentType, Field, Language, Location,
    LocationCreateStruct, Notification, Relation, Role, RoleAssignment, Section, Token,
    TrashItem, UrlWildcard, VersionInfo, VersionStatus, ROOT_LOCATION_ID,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Id sequences of the repository tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sequence {
    Content,
    ContentType,
    FieldDefinition,
    Location,
    Relation,
    Section,
    Role,
    RoleAssignment,
    UrlWildcard,
    Notification,
    Token,
}

/// Independently mergeable parts of the state
///
/// Everything the content tree depends on (types, sections, languages and
/// roles included) is one group; the auxiliary tables nothing else reads are
/// groups of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableGroup {
    Core,
    UrlWildcards,
    Notifications,
    Tokens,
}

impl Sequence {
    pub fn group(self) -> TableGroup {
        match self {
            Sequence::UrlWildcard => TableGroup::UrlWildcards,
            Sequence::Notification => TableGroup::Notifications,
            Sequence::Token => TableGroup::Tokens,
            _ => TableGroup::Core,
        }
    }
}

/// A stored version with its fields
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVersion {
    pub info: VersionInfo,
    pub fields: Vec<Field>,
}

/// All repository tables
///
/// Fields are public for the raw storage escape hatch; services go through the
/// helper methods so the indexes stay consistent.
#[derive(Debug, Clone, Default)]
pub struct RepositoryState {
    /// Commit counter of the state this value was derived from
    pub generation: u64,
    pub sequences: BTreeMap<Sequence, u64>,
    pub content_types: BTreeMap<u64, ContentType>,
    pub contents: BTreeMap<u64, ContentInfo>,
    pub versions: BTreeMap<(u64, u32), StoredVersion>,
    pub relations: BTreeMap<u64, Relation>,
    pub locations: BTreeMap<u64, Location>,
    pub children: HashMap<u64, BTreeSet<u64>>,
    /// Placements requested at creation, applied on first publish
    pub pending_locations: BTreeMap<u64, Vec<LocationCreateStruct>>,
    /// Keyed by the id of the trashed subtree root
    pub trash: BTreeMap<u64, TrashItem>,
    pub sections: BTreeMap<u64, Section>,
    /// Keyed by language code
    pub languages: BTreeMap<String, Language>,
    pub roles: BTreeMap<u64, Role>,
    pub role_assignments: BTreeMap<u64, RoleAssignment>,
    pub url_wildcards: BTreeMap<u64, UrlWildcard>,
    pub notifications: BTreeMap<u64, Notification>,
    pub tokens: BTreeMap<u64, Token>,
    /// Generation in which each content item last changed (cache validation)
    pub content_revisions: HashMap<u64, u64>,
}

impl RepositoryState {
    /// Allocate the next id of a sequence (ids start at 1)
    pub fn next_id(&mut self, sequence: Sequence) -> u64 {
        let counter = self.sequences.entry(sequence).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Make sure the next id of a sequence is greater than `id`
    pub fn reserve_id(&mut self, sequence: Sequence, id: u64) {
        let counter = self.sequences.entry(sequence).or_insert(0);
        if *counter < id {
            *counter = id;
        }
    }

    //
    // CONTENT
    //

    pub fn content_type(&self, id: u64) -> Option<&ContentType> {
        self.content_types.get(&id)
    }

    pub fn content_type_by_identifier(&self, identifier: &str) -> Option<&ContentType> {
        self.content_types
            .values()
            .find(|content_type| content_type.identifier == identifier)
    }

    pub fn content_info(&self, id: u64) -> Option<&ContentInfo> {
        self.contents.get(&id)
    }

    pub fn content_by_remote_id(&self, remote_id: &str) -> Option<&ContentInfo> {
        self.contents.values().find(|info| info.remote_id == remote_id)
    }

    pub fn version(&self, content_id: u64, version_no: u32) -> Option<&StoredVersion> {
        self.versions.get(&(content_id, version_no))
    }

    pub fn versions_of(&self, content_id: u64) -> impl Iterator<Item = &StoredVersion> {
        self.versions
            .range((content_id, 0)..=(content_id, u32::MAX))
            .map(|(_, version)| version)
    }

    pub fn published_version(&self, content_id: u64) -> Option<&StoredVersion> {
        self.versions_of(content_id)
            .find(|version| version.info.status == VersionStatus::Published)
    }

    pub fn latest_version_no(&self, content_id: u64) -> u32 {
        self.versions_of(content_id)
            .map(|version| version.info.version_no)
            .max()
            .unwrap_or(0)
    }

    /// Languages present in any version of the content
    pub fn content_languages(&self, content_id: u64) -> BTreeSet<String> {
        self.versions_of(content_id)
            .flat_map(|version| version.info.language_codes.iter().cloned())
            .collect()
    }

    /// Language bits of every version of a content item, plus the
    /// always-available bit
    pub fn content_language_mask(&self, content_id: u64) -> i64 {
        let always_available = self
            .contents
            .get(&content_id)
            .is_some_and(|info| info.always_available);
        let ids = self
            .content_languages(content_id)
            .iter()
            .filter_map(|code| self.languages.get(code))
            .map(|language| language.id)
            .collect::<Vec<_>>();
        language_mask(ids, always_available)
    }

    /// Assemble a content value object for one version
    pub fn load_content(&self, content_id: u64, version_no: u32) -> Option<Content> {
        let content_info = self.contents.get(&content_id)?.clone();
        let version = self.version(content_id, version_no)?;
        Some(Content {
            content_info,
            version_info: version.info.clone(),
            fields: version.fields.clone(),
        })
    }

    /// Whether a content item is still placed in the tree or held in the trash
    pub fn is_content_referenced(&self, content_id: u64) -> bool {
        !self.locations_of(content_id).is_empty() || self.is_content_in_trash(content_id)
    }

    pub fn is_content_in_trash(&self, content_id: u64) -> bool {
        self.trash.values().any(|item| {
            item.locations
                .iter()
                .any(|trashed| trashed.location.content_id == content_id)
        })
    }

    pub fn touch_content(&mut self, content_id: u64, changes: &mut ChangeSet) {
        self.content_revisions.insert(content_id, self.generation + 1);
        changes.content_changed(content_id);
    }

    //
    // LOCATIONS
    //

    pub fn location(&self, id: u64) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn location_by_remote_id(&self, remote_id: &str) -> Option<&Location> {
        self.locations
            .values()
            .find(|location| location.remote_id == remote_id)
    }

    /// Active locations of a content item, ordered by id
    pub fn locations_of(&self, content_id: u64) -> Vec<&Location> {
        self.locations
            .values()
            .filter(|location| location.content_id == content_id && !location.is_root())
            .collect()
    }

    pub fn child_ids(&self, parent_id: u64) -> Vec<u64> {
        self.children
            .get(&parent_id)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The location and all of its descendants, parents before children
    pub fn subtree_ids(&self, root_id: u64) -> Vec<u64> {
        let mut ids = Vec::new();
        if !self.locations.contains_key(&root_id) {
            return ids;
        }
        let mut stack = vec![root_id];
        while let Some(id) = stack.pop() {
            ids.push(id);
            if let Some(children) = self.children.get(&id) {
                stack.extend(children.iter().rev().copied());
            }
        }
        ids
    }

    /// Whether `candidate` lies in the subtree of `root_id`
    pub fn is_in_subtree(&self, root_id: u64, candidate: u64) -> bool {
        match (self.locations.get(&root_id), self.locations.get(&candidate)) {
            (Some(root), Some(candidate)) => root.contains(candidate),
            _ => false,
        }
    }

    /// Insert a location and register it with its parent
    pub fn attach_location(&mut self, location: Location) {
        if let Some(parent_id) = location.parent_location_id {
            self.children.entry(parent_id).or_default().insert(location.id);
        }
        self.locations.insert(location.id, location);
    }

    /// Remove a single location from the arena and its parent's child list
    pub fn detach_location(&mut self, id: u64) -> Option<Location> {
        let location = self.locations.remove(&id)?;
        if let Some(parent_id) = location.parent_location_id {
            if let Some(siblings) = self.children.get_mut(&parent_id) {
                siblings.remove(&id);
            }
        }
        self.children.remove(&id);
        Some(location)
    }

    /// Recompute path, depth and invisibility of a subtree from its parent
    pub fn rebuild_subtree(&mut self, root_id: u64, changes: &mut ChangeSet) {
        for id in self.subtree_ids(root_id) {
            let parent = self
                .locations
                .get(&id)
                .and_then(|location| location.parent_location_id)
                .and_then(|parent_id| self.locations.get(&parent_id))
                .map(|parent| (parent.path_string.clone(), parent.depth, parent.invisible));

            if let Some(location) = self.locations.get_mut(&id) {
                match parent {
                    Some((path, depth, invisible)) => {
                        location.path_string = format!("{}{}/", path, id);
                        location.depth = depth + 1;
                        location.invisible = location.hidden || invisible;
                    }
                    None => {
                        location.path_string = format!("/{}/", id);
                        location.depth = 0;
                        location.invisible = location.hidden;
                    }
                }
                changes.location_changed(id);
            }
        }
    }

    /// Place content under a parent location
    ///
    /// The caller validates the parent and permissions; the new location becomes
    /// the main location when the content has none.
    pub fn create_location(
        &mut self,
        content_id: u64,
        create: &LocationCreateStruct,
        changes: &mut ChangeSet,
    ) -> Location {
        let id = self.next_id(Sequence::Location);
        let location = Location {
            id,
            content_id,
            parent_location_id: Some(create.parent_location_id),
            path_string: String::new(),
            depth: 0,
            priority: create.priority,
            hidden: create.hidden,
            invisible: create.hidden,
            remote_id: create
                .remote_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
            sort_field: create.sort_field,
            sort_order: create.sort_order,
        };
        self.attach_location(location);
        self.rebuild_subtree(id, changes);

        if let Some(info) = self.contents.get_mut(&content_id) {
            if info.main_location_id.is_none() {
                info.main_location_id = Some(id);
            }
        }
        self.touch_content(content_id, changes);

        self.locations.get(&id).cloned().unwrap_or_else(|| unreachable_location(id))
    }

    /// Detach a whole subtree, returning its locations parents-first
    pub fn remove_subtree(&mut self, root_id: u64, changes: &mut ChangeSet) -> Vec<Location> {
        let ids = self.subtree_ids(root_id);
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(location) = self.detach_location(id) {
                changes.location_deleted(id);
                removed.push(location);
            }
        }
        removed
    }

    /// Bring a content item in line with its remaining placements
    ///
    /// Called for every content item that lost a location. Content still placed
    /// somewhere gets a valid main location; content only held in the trash is
    /// marked trashed; content referenced by nothing is removed.
    pub fn reconcile_content(&mut self, content_id: u64, changes: &mut ChangeSet) -> Vec<u64> {
        if !self.contents.contains_key(&content_id) {
            return Vec::new();
        }

        let active: Vec<u64> = self.locations_of(content_id).iter().map(|l| l.id).collect();
        if active.is_empty() && !self.is_content_in_trash(content_id) {
            return self.purge_content(content_id, changes);
        }

        let has_published = self.published_version(content_id).is_some();
        let trashed = active.is_empty();
        if let Some(info) = self.contents.get_mut(&content_id) {
            if trashed {
                info.status = ContentStatus::Trashed;
            } else {
                if has_published {
                    info.status = ContentStatus::Published;
                }
                let main_is_active = info
                    .main_location_id
                    .map(|id| active.contains(&id))
                    .unwrap_or(false);
                if !main_is_active {
                    info.main_location_id = active.first().copied();
                }
            }
        }
        self.touch_content(content_id, changes);
        Vec::new()
    }

    /// Remove a content item with every version, relation and placement
    ///
    /// Active locations are removed with their subtrees; other content that loses
    /// its last placement this way is removed as well. Returns the removed
    /// location ids.
    pub fn purge_content(&mut self, content_id: u64, changes: &mut ChangeSet) -> Vec<u64> {
        let mut removed_locations = Vec::new();
        let mut affected = BTreeSet::new();

        let location_ids: Vec<u64> = self.locations_of(content_id).iter().map(|l| l.id).collect();
        for location_id in location_ids {
            for location in self.remove_subtree(location_id, changes) {
                removed_locations.push(location.id);
                if location.content_id != content_id {
                    affected.insert(location.content_id);
                }
            }
        }

        for other in self.remove_from_trash(content_id) {
            if other != content_id {
                affected.insert(other);
            }
        }

        let version_keys: Vec<(u64, u32)> = self
            .versions_of(content_id)
            .map(|version| (content_id, version.info.version_no))
            .collect();
        for key in version_keys {
            self.versions.remove(&key);
        }
        self.relations.retain(|_, relation| {
            relation.source_content_id != content_id
                && relation.destination_content_id != content_id
        });
        self.pending_locations.remove(&content_id);
        self.contents.remove(&content_id);
        self.content_revisions.insert(content_id, self.generation + 1);
        changes.content_deleted(content_id);

        for other in affected {
            removed_locations.extend(self.reconcile_content(other, changes));
        }
        removed_locations
    }

    /// Drop trashed locations of a content item, with their trashed descendants
    ///
    /// Returns every content id that had a trashed location removed.
    fn remove_from_trash(&mut self, content_id: u64) -> BTreeSet<u64> {
        let mut touched = BTreeSet::new();
        let item_ids: Vec<u64> = self.trash.keys().copied().collect();
        for item_id in item_ids {
            let Some(item) = self.trash.get_mut(&item_id) else {
                continue;
            };
            let prefixes: Vec<String> = item
                .locations
                .iter()
                .filter(|trashed| trashed.location.content_id == content_id)
                .map(|trashed| trashed.location.path_string.clone())
                .collect();
            if prefixes.is_empty() {
                continue;
            }
            item.locations.retain(|trashed| {
                let doomed = prefixes
                    .iter()
                    .any(|prefix| trashed.location.path_string.starts_with(prefix));
                if doomed {
                    touched.insert(trashed.location.content_id);
                }
                !doomed
            });
            let root_gone = item
                .locations
                .first()
                .map(|trashed| trashed.location.id != item_id)
                .unwrap_or(true);
            if root_gone {
                if let Some(item) = self.trash.remove(&item_id) {
                    touched.extend(item.locations.iter().map(|t| t.location.content_id));
                }
            }
        }
        touched
    }

    //
    // REGISTRIES
    //

    pub fn section_by_identifier(&self, identifier: &str) -> Option<&Section> {
        self.sections
            .values()
            .find(|section| section.identifier == identifier)
    }

    pub fn count_section_contents(&self, section_id: u64) -> usize {
        self.contents
            .values()
            .filter(|info| info.section_id == section_id)
            .count()
    }

    pub fn language_by_id(&self, id: i64) -> Option<&Language> {
        self.languages.values().find(|language| language.id == id)
    }

    pub fn role_by_identifier(&self, identifier: &str) -> Option<&Role> {
        self.roles.values().find(|role| role.identifier == identifier)
    }

    pub fn assignments_for_user(&self, user_id: u64) -> impl Iterator<Item = &RoleAssignment> {
        self.role_assignments
            .values()
            .filter(move |assignment| assignment.user_id == user_id)
    }

    /// Root location of the tree
    pub fn root_location(&self) -> Option<&Location> {
        self.locations.get(&ROOT_LOCATION_ID)
    }

    //
    // MERGING
    //

    /// Groups in which this state differs from `base`
    pub fn changed_groups(&self, base: &RepositoryState) -> BTreeSet<TableGroup> {
        let mut groups = BTreeSet::new();
        if !self.same_core(base) {
            groups.insert(TableGroup::Core);
        }
        if self.url_wildcards != base.url_wildcards {
            groups.insert(TableGroup::UrlWildcards);
        }
        if self.notifications != base.notifications {
            groups.insert(TableGroup::Notifications);
        }
        if self.tokens != base.tokens {
            groups.insert(TableGroup::Tokens);
        }
        for (sequence, value) in &self.sequences {
            if base.sequences.get(sequence) != Some(value) {
                groups.insert(sequence.group());
            }
        }
        groups
    }

    /// Take the tables of `groups` (and their sequences) from `other`
    pub fn adopt_groups(&mut self, other: RepositoryState, groups: &BTreeSet<TableGroup>) {
        for (sequence, value) in &other.sequences {
            if groups.contains(&sequence.group()) {
                self.sequences.insert(*sequence, *value);
            }
        }
        if groups.contains(&TableGroup::Core) {
            self.content_types = other.content_types;
            self.contents = other.contents;
            self.versions = other.versions;
            self.relations = other.relations;
            self.locations = other.locations;
            self.children = other.children;
            self.pending_locations = other.pending_locations;
            self.trash = other.trash;
            self.sections = other.sections;
            self.languages = other.languages;
            self.roles = other.roles;
            self.role_assignments = other.role_assignments;
            self.content_revisions = other.content_revisions;
        }
        if groups.contains(&TableGroup::UrlWildcards) {
            self.url_wildcards = other.url_wildcards;
        }
        if groups.contains(&TableGroup::Notifications) {
            self.notifications = other.notifications;
        }
        if groups.contains(&TableGroup::Tokens) {
            self.tokens = other.tokens;
        }
    }

    fn same_core(&self, base: &RepositoryState) -> bool {
        self.content_types == base.content_types
            && self.contents == base.contents
            && self.versions == base.versions
            && self.relations == base.relations
            && self.locations == base.locations
            && self.children == base.children
            && self.pending_locations == base.pending_locations
            && self.trash == base.trash
            && self.sections == base.sections
            && self.languages == base.languages
            && self.roles == base.roles
            && self.role_assignments == base.role_assignments
            && self.content_revisions == base.content_revisions
    }
}

// Only reachable if `attach_location` lost the entry it just inserted.
fn unreachable_location(id: u64) -> Location {
    tracing::error!("Location {} vanished right after creation", id);
    Location {
        id,
        content_id: 0,
        parent_location_id: None,
        path_string: format!("/{}/", id),
        depth: 0,
        priority: 0,
        hidden: false,
        invisible: false,
        remote_id: String::new(),
        sort_field: crate::models::SortField::Name,
        sort_order: crate::models::SortOrder::Asc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortField, SortOrder, TrashedLocation, ROOT_CONTENT_ID};
    use chrono::Utc;

    fn root() -> Location {
        Location {
            id: ROOT_LOCATION_ID,
            content_id: ROOT_CONTENT_ID,
            parent_location_id: None,
            path_string: "/1/".to_string(),
            depth: 0,
            priority: 0,
            hidden: false,
            invisible: false,
            remote_id: "root".to_string(),
            sort_field: SortField::Path,
            sort_order: SortOrder::Asc,
        }
    }

    fn content(state: &mut RepositoryState, id: u64) {
        let now = Utc::now();
        state.contents.insert(
            id,
            ContentInfo {
                id,
                content_type_id: 1,
                remote_id: format!("content-{id}"),
                name: format!("Content {id}"),
                section_id: 1,
                current_version_no: 1,
                status: ContentStatus::Published,
                owner_id: 14,
                main_language_code: "eng-GB".to_string(),
                main_location_id: None,
                always_available: true,
                published_at: Some(now),
                modified_at: now,
            },
        );
        state.versions.insert(
            (id, 1),
            StoredVersion {
                info: VersionInfo {
                    content_id: id,
                    version_no: 1,
                    status: VersionStatus::Published,
                    language_codes: vec!["eng-GB".to_string()],
                    initial_language_code: "eng-GB".to_string(),
                    creator_id: 14,
                    names: BTreeMap::new(),
                    created_at: now,
                    modified_at: now,
                },
                fields: Vec::new(),
            },
        );
    }

    fn tree() -> (RepositoryState, ChangeSet) {
        let mut state = RepositoryState::default();
        state.reserve_id(Sequence::Location, ROOT_LOCATION_ID);
        state.attach_location(root());
        let mut changes = ChangeSet::default();
        for id in 1..=4 {
            content(&mut state, id);
        }
        // 2: /1/2/, 3: /1/2/3/, 4: /1/2/3/4/, content 4 also at /1/5/
        state.create_location(1, &LocationCreateStruct::new(1), &mut changes);
        state.create_location(2, &LocationCreateStruct::new(2), &mut changes);
        state.create_location(3, &LocationCreateStruct::new(3), &mut changes);
        state.create_location(4, &LocationCreateStruct::new(1), &mut changes);
        (state, changes)
    }

    #[test]
    fn test_paths_follow_parents() {
        let (state, _) = tree();
        assert_eq!(state.location(4).unwrap().path_string, "/1/2/3/4/");
        assert_eq!(state.location(4).unwrap().depth, 3);
        assert_eq!(state.subtree_ids(2), vec![2, 3, 4]);
        assert!(state.is_in_subtree(2, 4));
        assert!(!state.is_in_subtree(3, 5));
    }

    #[test]
    fn test_hidden_parent_makes_subtree_invisible() {
        let (mut state, mut changes) = tree();
        state.locations.get_mut(&3).unwrap().hidden = true;
        state.rebuild_subtree(3, &mut changes);

        assert!(!state.location(2).unwrap().invisible);
        assert!(state.location(3).unwrap().invisible);
        assert!(state.location(4).unwrap().invisible);
        assert!(!state.location(4).unwrap().hidden);
    }

    #[test]
    fn test_purge_cascades_to_unreferenced_descendants() {
        let (mut state, mut changes) = tree();
        let removed = state.purge_content(2, &mut changes);

        assert_eq!(removed, vec![3, 4]);
        assert!(state.content_info(2).is_none());
        assert!(state.content_info(3).is_none());
        // content 4 keeps its second location
        assert_eq!(state.content_info(4).unwrap().main_location_id, Some(5));
        assert!(state.location(5).is_some());
    }

    #[test]
    fn test_reconcile_marks_trashed_content() {
        let (mut state, mut changes) = tree();
        let removed = state.remove_subtree(4, &mut changes);
        state.trash.insert(
            4,
            TrashItem {
                id: 4,
                content_id: 3,
                content_type_id: 1,
                content_name: "Content 3".to_string(),
                original_parent_location_id: 3,
                original_path_string: "/1/2/3/4/".to_string(),
                trashed_at: Utc::now(),
                trashed_by: 14,
                locations: removed
                    .into_iter()
                    .map(|location| TrashedLocation {
                        location,
                        content_trashed: true,
                    })
                    .collect(),
            },
        );
        state.reconcile_content(3, &mut changes);

        assert_eq!(state.content_info(3).unwrap().status, ContentStatus::Trashed);
    }

    #[test]
    fn test_sequences_skip_reserved_ids() {
        let mut state = RepositoryState::default();
        state.reserve_id(Sequence::Section, 5);
        assert_eq!(state.next_id(Sequence::Section), 6);
        assert_eq!(state.next_id(Sequence::Content), 1);
    }

    #[test]
    fn test_disjoint_groups_merge() {
        let base = RepositoryState::default();

        let mut ours = base.clone();
        let id = ours.next_id(Sequence::Section);
        ours.sections.insert(
            id,
            Section {
                id,
                identifier: "news".to_string(),
                name: "News".to_string(),
            },
        );

        let mut theirs = base.clone();
        let token_id = theirs.next_id(Sequence::Token);
        let now = Utc::now();
        theirs.tokens.insert(
            token_id,
            Token {
                id: token_id,
                token_type: "reset".to_string(),
                value: "abc".to_string(),
                identifier: None,
                created_at: now,
                expires_at: now,
            },
        );

        let our_groups = ours.changed_groups(&base);
        assert_eq!(our_groups, BTreeSet::from([TableGroup::Core]));
        assert_eq!(theirs.changed_groups(&base), BTreeSet::from([TableGroup::Tokens]));

        let mut merged = theirs.clone();
        merged.adopt_groups(ours, &our_groups);
        assert_eq!(merged.sections.len(), 1);
        assert_eq!(merged.tokens.len(), 1);
        assert_eq!(merged.sequences.get(&Sequence::Section), Some(&1));
        assert_eq!(merged.sequences.get(&Sequence::Token), Some(&1));
        assert!(merged.changed_groups(&theirs).contains(&TableGroup::Core));
    }
}
