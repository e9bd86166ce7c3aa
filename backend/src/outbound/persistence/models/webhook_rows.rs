//! Diesel rows for webhooks and their trigger events.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::ports::RepositoryError;
use crate::domain::{Webhook, WebhookTriggerEvent};
use crate::outbound::persistence::null_values::parse_text;
use crate::outbound::persistence::schema::{webhook_trigger_events, webhooks};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = webhooks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct WebhookRow {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub url: String,
    pub method: String,
    pub belongs_to_household: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl WebhookRow {
    /// Attach already-converted trigger events.
    pub(crate) fn into_webhook(self, events: Vec<WebhookTriggerEvent>) -> Webhook {
        Webhook {
            id: self.id,
            name: self.name,
            content_type: self.content_type,
            url: self.url,
            method: self.method,
            belongs_to_household: self.belongs_to_household,
            events,
            created_at: self.created_at,
            last_updated_at: self.last_updated_at,
            archived_at: self.archived_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = webhooks)]
pub(crate) struct NewWebhookRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub content_type: &'a str,
    pub url: &'a str,
    pub method: &'a str,
    pub belongs_to_household: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = webhook_trigger_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct WebhookTriggerEventRow {
    pub id: String,
    pub trigger_event: String,
    pub belongs_to_webhook: String,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<WebhookTriggerEventRow> for WebhookTriggerEvent {
    type Error = RepositoryError;

    fn try_from(row: WebhookTriggerEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            trigger_event: parse_text(&row.trigger_event)?,
            id: row.id,
            belongs_to_webhook: row.belongs_to_webhook,
            created_at: row.created_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = webhook_trigger_events)]
pub(crate) struct NewWebhookTriggerEventRow<'a> {
    pub id: &'a str,
    pub trigger_event: &'a str,
    pub belongs_to_webhook: &'a str,
    pub created_at: DateTime<Utc>,
}
