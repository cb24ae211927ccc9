//! Permission Context
//!
//! Every service call is checked against the roles of the session's current
//! user. Policies grant module/function pairs (`content/read`,
//! `section/assign`, `*/*`), narrowed by [`Limitation`](crate::models::Limitation)s
//! that are evaluated against a [`PermissionTarget`].
//!
//! Elevated sessions (inside `Session::sudo`) skip all checks.

mod limitation;
mod resolver;

pub use limitation::{LimitationEvaluator, PermissionTarget};
pub use resolver::{AccessDecision, PermissionResolver};
