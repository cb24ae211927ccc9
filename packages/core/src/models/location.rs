//! Location Tree and Trash Types
//!
//! A [`Location`] places published content in the tree. `path_string` is the
//! materialized path of ancestor ids including the location itself
//! (`/1/2/42/`), so a subtree is every location whose path starts with the
//! subtree root's path.
//!
//! `hidden` is set explicitly; `invisible` is derived: a location is invisible
//! when it or any ancestor is hidden.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Id of the tree root; it carries no content and cannot be changed
pub const ROOT_LOCATION_ID: u64 = 1;

/// Placeholder content id of the tree root
pub const ROOT_CONTENT_ID: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Path,
    Published,
    Modified,
    Priority,
    Name,
    ContentId,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Placement of a content item in the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: u64,
    pub content_id: u64,
    pub parent_location_id: Option<u64>,
    pub path_string: String,
    pub depth: u32,
    pub priority: i32,
    pub hidden: bool,
    pub invisible: bool,
    pub remote_id: String,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

impl Location {
    /// Ancestor ids from the root down to this location
    pub fn path(&self) -> Vec<u64> {
        self.path_string
            .split('/')
            .filter(|segment| !segment.is_empty())
            .filter_map(|segment| segment.parse().ok())
            .collect()
    }

    /// Whether `other` is this location or one of its descendants
    pub fn contains(&self, other: &Location) -> bool {
        other.path_string.starts_with(&self.path_string)
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_LOCATION_ID
    }
}

/// Input for a new location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCreateStruct {
    pub parent_location_id: u64,
    pub priority: i32,
    pub hidden: bool,
    pub remote_id: Option<String>,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

impl LocationCreateStruct {
    pub fn new(parent_location_id: u64) -> Self {
        Self {
            parent_location_id,
            priority: 0,
            hidden: false,
            remote_id: None,
            sort_field: SortField::Name,
            sort_order: SortOrder::Asc,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    pub fn with_sort(mut self, sort_field: SortField, sort_order: SortOrder) -> Self {
        self.sort_field = sort_field;
        self.sort_order = sort_order;
        self
    }
}

/// Sparse update of location properties that do not affect placement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdateStruct {
    pub priority: Option<i32>,
    pub remote_id: Option<String>,
    pub sort_field: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

/// A page of child locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationList {
    pub total_count: usize,
    pub locations: Vec<Location>,
}

/// A location inside a trashed subtree, as it was when trashed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashedLocation {
    pub location: Location,
    /// Whether the content had no placement outside the trashed subtree
    pub content_trashed: bool,
}

/// A suspended subtree awaiting recovery or permanent deletion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashItem {
    /// Id of the trashed subtree root location
    pub id: u64,
    pub content_id: u64,
    pub content_type_id: u64,
    pub content_name: String,
    pub original_parent_location_id: u64,
    pub original_path_string: String,
    pub trashed_at: DateTime<Utc>,
    pub trashed_by: u64,
    /// Root location first, then descendants in path order
    pub locations: Vec<TrashedLocation>,
}

impl TrashItem {
    pub fn root(&self) -> Option<&Location> {
        self.locations.first().map(|trashed| &trashed.location)
    }
}

/// Filter for [`find_trash_items`](crate::services::TrashService::find_trash_items)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashQuery {
    pub content_type_id: Option<u64>,
    pub trashed_by: Option<u64>,
    pub trashed_after: Option<DateTime<Utc>>,
    pub trashed_before: Option<DateTime<Utc>>,
    pub name_contains: Option<String>,
    /// Newest first when true
    pub newest_first: bool,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Default for TrashQuery {
    fn default() -> Self {
        Self {
            content_type_id: None,
            trashed_by: None,
            trashed_after: None,
            trashed_before: None,
            name_contains: None,
            newest_first: true,
            offset: 0,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashItemList {
    pub total_count: usize,
    pub items: Vec<TrashItem>,
}

/// Outcome of permanently deleting one trash item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashItemDeleteResult {
    pub trash_item_id: u64,
    pub content_id: u64,
    /// Content ids removed from storage because nothing referenced them anymore
    pub removed_content_ids: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(id: u64, path: &str) -> Location {
        Location {
            id,
            content_id: id * 10,
            parent_location_id: None,
            path_string: path.to_string(),
            depth: 0,
            priority: 0,
            hidden: false,
            invisible: false,
            remote_id: format!("loc-{id}"),
            sort_field: SortField::Name,
            sort_order: SortOrder::Asc,
        }
    }

    #[test]
    fn test_path_parsing() {
        assert_eq!(location(42, "/1/2/42/").path(), vec![1, 2, 42]);
    }

    #[test]
    fn test_contains_uses_full_segments() {
        let parent = location(4, "/1/4/");
        assert!(parent.contains(&location(9, "/1/4/9/")));
        assert!(parent.contains(&parent));
        assert!(!parent.contains(&location(44, "/1/44/")));
    }
}
