//! Data Models
//!
//! This module contains the value objects exchanged with the repository services:
//!
//! - `ContentInfo`, `VersionInfo`, `Content`, `Field` - versioned content aggregates
//! - `ContentType`, `FieldDefinition` - content type definitions
//! - `Location`, `TrashItem` - tree placement and trash
//! - `Section`, `Language` - reference data
//! - `Role`, `Policy`, `Limitation` - permission data
//! - `UrlWildcard`, `Notification`, `Token` - auxiliary services
//!
//! Create/update structs are plain data with builder-style setters; services
//! validate them against the current repository state.

mod content;
mod content_type;
mod field;
mod location;
mod messaging;
mod registry;
mod user;

pub use content::{
    Content, ContentCreateStruct, ContentInfo, ContentMetadataUpdateStruct, ContentStatus,
    ContentUpdateStruct, FieldInput, Relation, RelationKind, VersionInfo, VersionStatus,
};
pub use content_type::{
    ContentType, ContentTypeCreateStruct, ContentTypeUpdateStruct, FieldDefinition,
    FieldDefinitionCreateStruct,
};
pub use field::{ComparableValue, Field, FieldValue, GeoPoint, ImageValue, UrlValue, ValidationError};
pub use location::{
    Location, LocationCreateStruct, LocationList, LocationUpdateStruct, SortField, SortOrder,
    TrashItem, TrashItemDeleteResult, TrashItemList, TrashQuery, TrashedLocation,
    ROOT_CONTENT_ID, ROOT_LOCATION_ID,
};
pub use messaging::{
    CreateNotificationStruct, Notification, NotificationList, Token, UrlWildcard,
    UrlWildcardTranslationResult,
};
pub use registry::{
    language_mask, Language, LanguageCreateStruct, Section, SectionCreateStruct,
    SectionUpdateStruct, ALWAYS_AVAILABLE_BIT, MAX_LANGUAGES,
};
pub use user::{
    Limitation, Policy, Role, RoleAssignment, RoleCreateStruct, RoleLimitation, UserReference,
};
