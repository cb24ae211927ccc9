//! Business Services
//!
//! This module contains the repository facade and the services operating on it:
//!
//! - `Repository` / `Session` - shared storage, per-caller context and transactions
//! - `ContentService` - versioned content, translations, relations and copies
//! - `ContentTypeService` - content type and field definition management
//! - `LocationService` - tree placement, visibility, moves and copies
//! - `TrashService` - trashing and recovering subtrees
//! - `SectionService` / `LanguageService` - reference data registries
//! - `RoleService` - roles, policies and assignments
//! - `SearchService` - criteria queries over the search index
//! - `UrlWildcardService`, `NotificationService`, `TokenService` - auxiliary services
//!
//! Services are borrowed views of a [`Session`]; every operation runs as one
//! unit of work and either applies completely or not at all.

mod content_fields;
pub mod content_service;
pub mod content_type_service;
pub mod error;
pub mod language_service;
pub mod location_service;
pub mod notification_service;
pub mod repository;
pub mod role_service;
pub mod search_service;
pub mod section_service;
pub mod token_service;
pub mod trash_service;
pub mod url_wildcard_service;

pub use content_service::ContentService;
pub use content_type_service::ContentTypeService;
pub use error::RepositoryError;
pub use language_service::LanguageService;
pub use location_service::LocationService;
pub use notification_service::NotificationService;
pub use repository::{RawStorage, Repository, Session};
pub use role_service::RoleService;
pub use search_service::SearchService;
pub use section_service::SectionService;
pub use token_service::TokenService;
pub use trash_service::TrashService;
pub use url_wildcard_service::UrlWildcardService;
