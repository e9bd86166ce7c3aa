//! Port for webhooks and their trigger events.
//!
//! A webhook and its trigger events form one aggregate: they are created
//! together and read together.

use async_trait::async_trait;
use pagination::{QueryFilter, QueryFilteredResult};

use crate::domain::{
    Webhook, WebhookCreationInput, WebhookEvent, WebhookTriggerEvent,
    WebhookTriggerEventCreationInput,
};

use super::RepositoryError;

#[async_trait]
pub trait WebhookRepository: Send + Sync {
    async fn webhook_exists(
        &self,
        webhook_id: &str,
        household_id: &str,
    ) -> Result<bool, RepositoryError>;

    /// Fetch a webhook with its live trigger events.
    async fn get_webhook(
        &self,
        webhook_id: &str,
        household_id: &str,
    ) -> Result<Webhook, RepositoryError>;

    async fn get_webhooks(
        &self,
        household_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<Webhook>, RepositoryError>;

    /// Webhooks of the household subscribed to `event`.
    async fn get_webhooks_for_household_and_event(
        &self,
        household_id: &str,
        event: WebhookEvent,
    ) -> Result<Vec<Webhook>, RepositoryError>;

    async fn create_webhook(&self, input: &WebhookCreationInput)
    -> Result<Webhook, RepositoryError>;

    async fn add_webhook_trigger_event(
        &self,
        household_id: &str,
        input: &WebhookTriggerEventCreationInput,
    ) -> Result<WebhookTriggerEvent, RepositoryError>;

    async fn archive_webhook(
        &self,
        webhook_id: &str,
        household_id: &str,
    ) -> Result<(), RepositoryError>;

    async fn archive_webhook_trigger_event(
        &self,
        webhook_id: &str,
        trigger_event_id: &str,
    ) -> Result<(), RepositoryError>;
}
