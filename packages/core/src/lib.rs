//! Folio Core Content Repository
//!
//! This crate provides the versioned content store, the location tree, the
//! trash, the permission context and the search index of the Folio content
//! repository.
//!
//! # Architecture
//!
//! - **Versioned content**: every content item has draft, published and archived
//!   versions with per-language fields
//! - **Location arena**: placements form a tree with materialized paths
//! - **Copy-on-write units of work**: operations run against a private copy of
//!   the state that is swapped in on commit
//! - **Pluggable search**: committed changes are pushed to a search engine
//!
//! # Modules
//!
//! - [`models`] - Value objects and create/update structs
//! - [`behaviors`] - Field type behaviors
//! - [`db`] - In-memory state, commit lock, content cache and events
//! - [`permissions`] - Policy and limitation evaluation
//! - [`search`] - Query model, index documents and search engines
//! - [`services`] - Repository facade and services
//! - [`config`] - Repository configuration

pub mod behaviors;
pub mod config;
pub mod db;
pub mod models;
pub mod permissions;
pub mod search;
pub mod services;

// Re-export commonly used types
pub use config::RepositoryConfig;
pub use models::*;
pub use services::{Repository, RepositoryError, Session};
