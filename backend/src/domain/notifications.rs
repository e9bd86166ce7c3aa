//! In-app notifications addressed to a single user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit_log::resource_types;
use super::ports::{Record, RepositoryError, Validate, require_id, require_text};
use super::text_enum::text_enum;

text_enum! {
    pub enum UserNotificationStatus {
        Unread => "unread",
        Read => "read",
        Dismissed => "dismissed",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotification {
    pub id: String,
    pub content: String,
    pub status: UserNotificationStatus,
    pub belongs_to_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotificationCreationInput {
    pub content: String,
    pub belongs_to_user: String,
}

impl Validate for UserNotification {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "user notification id")?;
        require_id(&self.belongs_to_user, "user id")
    }
}

impl Validate for UserNotificationCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.belongs_to_user, "user id")?;
        require_text(&self.content, "notification content")
    }
}

impl Record for UserNotification {
    type Scope = str;
    type Creation = UserNotificationCreationInput;

    const RESOURCE_TYPE: &'static str = resource_types::USER_NOTIFICATIONS;
    const SCOPE_NAME: &'static str = "user id";

    fn id(&self) -> &str {
        &self.id
    }
}
