//! Outbound webhooks registered by a household and the events that fire
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ports::{RepositoryError, Validate, require_id, require_text};
use super::text_enum::text_enum;

text_enum! {
    /// Event kinds a webhook can subscribe to.
    pub enum WebhookEvent {
        WebhookCreated => "webhook_created",
        WebhookArchived => "webhook_archived",
        HouseholdInvitationCreated => "household_invitation_created",
        HouseholdInvitationAccepted => "household_invitation_accepted",
        HouseholdMemberRemoved => "household_member_removed",
        MealPlanCreated => "meal_plan_created",
        MealPlanFinalized => "meal_plan_finalized",
        MealPlanOptionFinalized => "meal_plan_option_finalized",
        MealPlanOptionVoteCreated => "meal_plan_option_vote_created",
        RecipeCreated => "recipe_created",
    }
}

/// A webhook aggregate: the endpoint plus its non-archived trigger events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub url: String,
    pub method: String,
    pub belongs_to_household: String,
    pub events: Vec<WebhookTriggerEvent>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Webhook {
    /// Whether any live trigger event matches `event`.
    pub fn listens_for(&self, event: WebhookEvent) -> bool {
        self.events
            .iter()
            .any(|e| e.trigger_event == event && e.archived_at.is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookTriggerEvent {
    pub id: String,
    pub trigger_event: WebhookEvent,
    pub belongs_to_webhook: String,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookCreationInput {
    pub name: String,
    pub content_type: String,
    pub url: String,
    pub method: String,
    pub belongs_to_household: String,
    pub events: Vec<WebhookEvent>,
}

impl Validate for WebhookCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.belongs_to_household, "household id")?;
        require_text(&self.name, "webhook name")?;
        require_text(&self.url, "webhook url")?;
        require_text(&self.method, "webhook method")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookTriggerEventCreationInput {
    pub belongs_to_webhook: String,
    pub trigger_event: WebhookEvent,
}

impl Validate for WebhookTriggerEventCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.belongs_to_webhook, "webhook id")
    }
}
