//! Users, Roles and Policies
//!
//! User management itself lives outside the repository; here a user is only a
//! [`UserReference`]. Access is granted through roles assigned to users, each
//! role holding [`Policy`] entries (module/function pairs, `*` matches any)
//! restricted by [`Limitation`]s.

use serde::{Deserialize, Serialize};

/// Identity acting on the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReference {
    pub user_id: u64,
}

impl UserReference {
    pub fn new(user_id: u64) -> Self {
        Self { user_id }
    }
}

/// Scope restriction of a policy
///
/// Closed set of limitation kinds; every kind is evaluated by
/// [`LimitationEvaluator`](crate::permissions::LimitationEvaluator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "camelCase")]
pub enum Limitation {
    /// Path prefixes, e.g. `/1/2/`
    Subtree(Vec<String>),
    /// Section ids
    Section(Vec<u64>),
    /// Language codes; every affected language must be listed
    Language(Vec<String>),
    /// Location ids
    Location(Vec<u64>),
    /// Content type ids
    ContentType(Vec<u64>),
    /// Content owned by the acting user
    Owner,
}

impl Limitation {
    pub fn identifier(&self) -> &'static str {
        match self {
            Limitation::Subtree(_) => "Subtree",
            Limitation::Section(_) => "Section",
            Limitation::Language(_) => "Language",
            Limitation::Location(_) => "Location",
            Limitation::ContentType(_) => "ContentType",
            Limitation::Owner => "Owner",
        }
    }
}

/// Module/function grant with optional limitations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub module: String,
    pub function: String,
    #[serde(default)]
    pub limitations: Vec<Limitation>,
}

impl Policy {
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            limitations: Vec::new(),
        }
    }

    pub fn with_limitation(mut self, limitation: Limitation) -> Self {
        self.limitations.push(limitation);
        self
    }

    pub fn matches(&self, module: &str, function: &str) -> bool {
        (self.module == "*" || self.module == module)
            && (self.function == "*" || self.function == function)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: u64,
    pub identifier: String,
    pub policies: Vec<Policy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCreateStruct {
    pub identifier: String,
    pub policies: Vec<Policy>,
}

impl RoleCreateStruct {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            policies: Vec::new(),
        }
    }

    pub fn add_policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }
}

/// Restriction applied to a whole role assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "camelCase")]
pub enum RoleLimitation {
    Subtree(Vec<String>),
    Section(Vec<u64>),
}

impl From<RoleLimitation> for Limitation {
    fn from(limitation: RoleLimitation) -> Self {
        match limitation {
            RoleLimitation::Subtree(paths) => Limitation::Subtree(paths),
            RoleLimitation::Section(ids) => Limitation::Section(ids),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub id: u64,
    pub role_id: u64,
    pub user_id: u64,
    #[serde(default)]
    pub limitation: Option<RoleLimitation>,
}
