//! URL Wildcards, Notifications and Tokens

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pattern redirect, e.g. `/articles/*` → `/content/{1}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlWildcard {
    pub id: u64,
    pub source_url: String,
    pub destination_url: String,
    /// Whether clients should be redirected instead of served in place
    pub forward: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlWildcardTranslationResult {
    pub uri: String,
    pub forward: bool,
}

/// Owner-scoped message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub owner_id: u64,
    /// Unread when true
    pub is_pending: bool,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationStruct {
    pub owner_id: u64,
    #[serde(rename = "type")]
    pub notification_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl CreateNotificationStruct {
    pub fn new(owner_id: u64, notification_type: impl Into<String>) -> Self {
        Self {
            owner_id,
            notification_type: notification_type.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub total_count: usize,
    pub items: Vec<Notification>,
}

/// Opaque credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: u64,
    #[serde(rename = "type")]
    pub token_type: String,
    pub value: String,
    /// Optional secondary key, e.g. the user id a reset token belongs to
    pub identifier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_expiry_boundary() {
        let now = Utc::now();
        let token = Token {
            id: 1,
            token_type: "reset".to_string(),
            value: "abc".to_string(),
            identifier: None,
            created_at: now,
            expires_at: now + Duration::seconds(10),
        };

        assert!(!token.is_expired(now));
        assert!(token.is_expired(now + Duration::seconds(10)));
    }

    #[test]
    fn test_notification_type_is_serialized_as_type() {
        let create = CreateNotificationStruct::new(14, "Workflow:Review");
        let json = serde_json::to_value(&create).unwrap();
        assert_eq!(json["type"], "Workflow:Review");
    }
}
