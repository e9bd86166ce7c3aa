//! PostgreSQL-backed `WebhookRepository` implementation.
//!
//! A webhook is read and written as an aggregate with its trigger events.
//! Reads load the webhook rows first and then every live trigger event for
//! those rows in a single query.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use pagination::{QueryFilter, QueryFilteredResult};
use tracing::{debug, info};

use super::audit_log_writer::write_audit_log_entry;
use super::diesel_helpers::{QueryExecutor, apply_time_bounds, load_page};
use super::models::{NewWebhookRow, NewWebhookTriggerEventRow, WebhookRow, WebhookTriggerEventRow};
use super::null_values::count_from_db;
use super::querier::Querier;
use super::schema::{webhook_trigger_events, webhooks};
use crate::domain::ports::{RepositoryError, Validate, WebhookRepository, require_id};
use crate::domain::{
    AuditLogEntryCreationInput, AuditOwner, IdGenerator, Webhook, WebhookCreationInput,
    WebhookEvent, WebhookTriggerEvent, WebhookTriggerEventCreationInput, resource_types,
};

fn live_webhooks<'a>(household_id: &'a str) -> webhooks::BoxedQuery<'a, Pg> {
    webhooks::table
        .filter(webhooks::belongs_to_household.eq(household_id))
        .filter(webhooks::archived_at.is_null())
        .into_boxed()
}

/// Load the live trigger events of `rows` and assemble the aggregates,
/// keeping the order of `rows`.
async fn assemble_webhooks<C: QueryExecutor>(
    conn: &mut C,
    rows: Vec<WebhookRow>,
) -> Result<Vec<Webhook>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let webhook_ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();
    let event_rows = webhook_trigger_events::table
        .filter(webhook_trigger_events::belongs_to_webhook.eq_any(&webhook_ids))
        .filter(webhook_trigger_events::archived_at.is_null())
        .order((
            webhook_trigger_events::created_at.asc(),
            webhook_trigger_events::id.asc(),
        ))
        .select(WebhookTriggerEventRow::as_select())
        .load::<WebhookTriggerEventRow>(conn)
        .await?;

    let mut events: HashMap<String, Vec<WebhookTriggerEvent>> = HashMap::new();
    for row in event_rows {
        let event = WebhookTriggerEvent::try_from(row)?;
        events
            .entry(event.belongs_to_webhook.clone())
            .or_default()
            .push(event);
    }
    Ok(rows
        .into_iter()
        .map(|row| {
            let own = events.remove(&row.id).unwrap_or_default();
            row.into_webhook(own)
        })
        .collect())
}

/// Insert one trigger event and its audit entry.
async fn insert_trigger_event<C: QueryExecutor>(
    conn: &mut C,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
    webhook_id: &str,
    household_id: &str,
    event: WebhookEvent,
) -> Result<WebhookTriggerEvent, RepositoryError> {
    let id = ids.new_id();
    let row: WebhookTriggerEventRow = diesel::insert_into(webhook_trigger_events::table)
        .values(NewWebhookTriggerEventRow {
            id: &id,
            trigger_event: event.as_str(),
            belongs_to_webhook: webhook_id,
            created_at: now,
        })
        .returning(WebhookTriggerEventRow::as_returning())
        .get_result(conn)
        .await?;
    let trigger_event = WebhookTriggerEvent::try_from(row)?;
    write_audit_log_entry(
        conn,
        ids,
        now,
        AuditLogEntryCreationInput::created(
            resource_types::WEBHOOK_TRIGGER_EVENTS,
            &trigger_event.id,
        )
        .with_owner(AuditOwner::household(household_id)),
    )
    .await?;
    Ok(trigger_event)
}

#[async_trait]
impl WebhookRepository for Querier {
    #[tracing::instrument(skip(self), err)]
    async fn webhook_exists(
        &self,
        webhook_id: &str,
        household_id: &str,
    ) -> Result<bool, RepositoryError> {
        require_id(webhook_id, "webhook id")?;
        require_id(household_id, "household id")?;

        let mut conn = self.pool.get().await?;
        let found = live_webhooks(household_id)
            .filter(webhooks::id.eq(webhook_id))
            .select(webhooks::id)
            .first::<String>(&mut conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_webhook(
        &self,
        webhook_id: &str,
        household_id: &str,
    ) -> Result<Webhook, RepositoryError> {
        require_id(webhook_id, "webhook id")?;
        require_id(household_id, "household id")?;

        let mut conn = self.pool.get().await?;
        let row = live_webhooks(household_id)
            .filter(webhooks::id.eq(webhook_id))
            .select(WebhookRow::as_select())
            .first::<WebhookRow>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("webhook"))?;
        let mut assembled = assemble_webhooks(&mut *conn, vec![row]).await?;
        assembled
            .pop()
            .ok_or_else(|| RepositoryError::not_found("webhook"))
    }

    #[tracing::instrument(skip(self, filter), err)]
    async fn get_webhooks(
        &self,
        household_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<Webhook>, RepositoryError> {
        require_id(household_id, "household id")?;
        let filter = self.effective_filter(filter);

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let total: i64 = live_webhooks(household_id).count().get_result(conn).await?;
                let filtered: i64 = apply_time_bounds!(live_webhooks(household_id), webhooks, filter)
                    .count()
                    .get_result(conn)
                    .await?;
                let rows = load_page!(
                    apply_time_bounds!(live_webhooks(household_id), webhooks, filter),
                    webhooks,
                    WebhookRow,
                    filter,
                    conn
                )?;
                let data = assemble_webhooks(conn, rows).await?;
                Ok(QueryFilteredResult::new(
                    data,
                    &filter,
                    count_from_db(filtered),
                    count_from_db(total),
                ))
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self, event), fields(event = %event), err)]
    async fn get_webhooks_for_household_and_event(
        &self,
        household_id: &str,
        event: WebhookEvent,
    ) -> Result<Vec<Webhook>, RepositoryError> {
        require_id(household_id, "household id")?;

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let rows = live_webhooks(household_id)
                    .filter(
                        webhooks::id.eq_any(
                            webhook_trigger_events::table
                                .filter(webhook_trigger_events::trigger_event.eq(event.as_str()))
                                .filter(webhook_trigger_events::archived_at.is_null())
                                .select(webhook_trigger_events::belongs_to_webhook),
                        ),
                    )
                    .order((webhooks::created_at.asc(), webhooks::id.asc()))
                    .select(WebhookRow::as_select())
                    .load::<WebhookRow>(conn)
                    .await?;
                assemble_webhooks(conn, rows).await
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(
        skip(self, input),
        fields(household_id = %input.belongs_to_household, events = input.events.len()),
        err
    )]
    async fn create_webhook(
        &self,
        input: &WebhookCreationInput,
    ) -> Result<Webhook, RepositoryError> {
        input.validate()?;
        let id = self.ids.new_id();
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let row: WebhookRow = diesel::insert_into(webhooks::table)
                    .values(NewWebhookRow {
                        id: &id,
                        name: &input.name,
                        content_type: &input.content_type,
                        url: &input.url,
                        method: &input.method,
                        belongs_to_household: &input.belongs_to_household,
                        created_at: now,
                    })
                    .returning(WebhookRow::as_returning())
                    .get_result(conn)
                    .await?;
                write_audit_log_entry(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::created(resource_types::WEBHOOKS, &row.id)
                        .with_owner(AuditOwner::household(&input.belongs_to_household)),
                )
                .await?;

                let mut events = Vec::with_capacity(input.events.len());
                for event in &input.events {
                    events.push(
                        insert_trigger_event(
                            conn,
                            self.ids.as_ref(),
                            now,
                            &row.id,
                            &input.belongs_to_household,
                            *event,
                        )
                        .await?,
                    );
                }
                info!(webhook_id = %row.id, "webhook created");
                Ok(row.into_webhook(events))
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self, input), fields(webhook_id = %input.belongs_to_webhook), err)]
    async fn add_webhook_trigger_event(
        &self,
        household_id: &str,
        input: &WebhookTriggerEventCreationInput,
    ) -> Result<WebhookTriggerEvent, RepositoryError> {
        require_id(household_id, "household id")?;
        input.validate()?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let owned = live_webhooks(household_id)
                    .filter(webhooks::id.eq(&input.belongs_to_webhook))
                    .select(webhooks::id)
                    .first::<String>(conn)
                    .await
                    .optional()?;
                if owned.is_none() {
                    return Err(RepositoryError::not_found("webhook"));
                }
                insert_trigger_event(
                    conn,
                    self.ids.as_ref(),
                    now,
                    &input.belongs_to_webhook,
                    household_id,
                    input.trigger_event,
                )
                .await
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn archive_webhook(
        &self,
        webhook_id: &str,
        household_id: &str,
    ) -> Result<(), RepositoryError> {
        require_id(webhook_id, "webhook id")?;
        require_id(household_id, "household id")?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let archived: Option<String> = diesel::update(
                    webhooks::table
                        .filter(webhooks::id.eq(webhook_id))
                        .filter(webhooks::belongs_to_household.eq(household_id))
                        .filter(webhooks::archived_at.is_null()),
                )
                .set((webhooks::archived_at.eq(now), webhooks::last_updated_at.eq(now)))
                .returning(webhooks::id)
                .get_result(conn)
                .await
                .optional()?;
                if archived.is_none() {
                    debug!(webhook_id, "webhook already archived or absent");
                    return Ok(());
                }
                write_audit_log_entry(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::archived(resource_types::WEBHOOKS, webhook_id)
                        .with_owner(AuditOwner::household(household_id)),
                )
                .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn archive_webhook_trigger_event(
        &self,
        webhook_id: &str,
        trigger_event_id: &str,
    ) -> Result<(), RepositoryError> {
        require_id(webhook_id, "webhook id")?;
        require_id(trigger_event_id, "webhook trigger event id")?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let archived: Option<String> = diesel::update(
                    webhook_trigger_events::table
                        .filter(webhook_trigger_events::id.eq(trigger_event_id))
                        .filter(webhook_trigger_events::belongs_to_webhook.eq(webhook_id))
                        .filter(webhook_trigger_events::archived_at.is_null()),
                )
                .set(webhook_trigger_events::archived_at.eq(now))
                .returning(webhook_trigger_events::id)
                .get_result(conn)
                .await
                .optional()?;
                if archived.is_none() {
                    return Ok(());
                }
                let household_id = webhooks::table
                    .find(webhook_id)
                    .select(webhooks::belongs_to_household)
                    .first::<String>(conn)
                    .await
                    .optional()?;
                let owner = household_id
                    .as_deref()
                    .map_or_else(AuditOwner::nobody, AuditOwner::household);
                write_audit_log_entry(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::archived(
                        resource_types::WEBHOOK_TRIGGER_EVENTS,
                        trigger_event_id,
                    )
                    .with_owner(owner),
                )
                .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::persistence::querier::test_support::unreachable_querier;
    use rstest::rstest;

    #[rstest]
    #[case("", "h-1", "webhook id")]
    #[case("w-1", "", "household id")]
    #[tokio::test]
    async fn reads_validate_both_ids(
        #[case] webhook_id: &str,
        #[case] household_id: &str,
        #[case] name: &str,
    ) {
        let querier = unreachable_querier();

        let result = querier.get_webhook(webhook_id, household_id).await;

        assert_eq!(result, Err(RepositoryError::invalid_identifier(name)));
    }

    #[tokio::test]
    async fn creation_validates_before_checkout() {
        let querier = unreachable_querier();
        let input = WebhookCreationInput {
            name: "notify".to_owned(),
            content_type: "application/json".to_owned(),
            url: "https://example.com/hook".to_owned(),
            method: " ".to_owned(),
            belongs_to_household: "h-1".to_owned(),
            events: vec![WebhookEvent::MealPlanCreated],
        };

        let result = querier.create_webhook(&input).await;

        assert_eq!(result, Err(RepositoryError::empty_input("webhook method")));
    }

    #[tokio::test]
    async fn trigger_event_archival_names_the_event_id() {
        let querier = unreachable_querier();

        let result = querier.archive_webhook_trigger_event("w-1", "").await;

        assert_eq!(
            result,
            Err(RepositoryError::invalid_identifier("webhook trigger event id"))
        );
    }
}
