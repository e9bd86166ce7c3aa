//! Webhook aggregates and audit log reads against embedded PostgreSQL.

use std::sync::Arc;

use backend::domain::ports::{AuditLogRepository, RepositoryError, WebhookRepository};
use backend::domain::{
    AuditLogEventType, IdGenerator, Webhook, WebhookCreationInput, WebhookEvent,
    WebhookTriggerEventCreationInput, resource_types,
};
use pagination::QueryFilter;
use rstest::rstest;

mod support;

use support::QuerierWorld;
use support::world::querier_world;

fn webhook_input(household_id: &str, events: Vec<WebhookEvent>) -> WebhookCreationInput {
    WebhookCreationInput {
        name: "kitchen display".to_owned(),
        content_type: "application/json".to_owned(),
        url: "https://example.com/hooks/kitchen".to_owned(),
        method: "POST".to_owned(),
        belongs_to_household: household_id.to_owned(),
        events,
    }
}

fn create_webhook(world: &QuerierWorld, household_id: &str, events: Vec<WebhookEvent>) -> Webhook {
    world
        .run(world.querier.create_webhook(&webhook_input(household_id, events)))
        .expect("webhook created")
}

/// Hands out one identifier forever, so the second audit entry written in a
/// transaction collides with the first.
struct RepeatingIds;

impl IdGenerator for RepeatingIds {
    fn new_id(&self) -> String {
        "repeated-id".to_owned()
    }
}

/// Events written in one transaction share a timestamp, so compare them in
/// id order.
fn by_event_id(mut webhook: Webhook) -> Webhook {
    webhook.events.sort_by(|a, b| a.id.cmp(&b.id));
    webhook
}

#[rstest]
fn webhook_and_events_are_written_together(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let owner = world.register("hooker");
    let household = world.default_household(&owner.id);
    let audit_before = world.audit_entry_count();

    let created = create_webhook(
        &world,
        &household,
        vec![WebhookEvent::MealPlanCreated, WebhookEvent::MealPlanFinalized],
    );

    assert_eq!(created.events.len(), 2);
    assert_eq!(world.audit_entry_count(), audit_before + 3);
    let fetched = world
        .run(world.querier.get_webhook(&created.id, &household))
        .expect("webhook readable");
    assert_eq!(by_event_id(fetched), by_event_id(created.clone()));

    let listed = world
        .run(world.querier.get_webhooks(&household, None))
        .expect("webhooks listed");
    assert_eq!(
        listed.data.into_iter().map(by_event_id).collect::<Vec<_>>(),
        vec![by_event_id(created)]
    );
    assert_eq!(listed.pagination.total_count, 1);
}

#[rstest]
fn webhooks_are_selected_by_live_trigger_event(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let owner = world.register("listener");
    let household = world.default_household(&owner.id);
    let planner = create_webhook(&world, &household, vec![WebhookEvent::MealPlanCreated]);
    create_webhook(&world, &household, vec![WebhookEvent::RecipeCreated]);

    let matching = world
        .run(
            world
                .querier
                .get_webhooks_for_household_and_event(&household, WebhookEvent::MealPlanCreated),
        )
        .expect("lookup succeeds");
    assert_eq!(
        matching.iter().map(|w| w.id.as_str()).collect::<Vec<_>>(),
        vec![planner.id.as_str()]
    );

    let event_id = planner.events[0].id.clone();
    world
        .run(world.querier.archive_webhook_trigger_event(&planner.id, &event_id))
        .expect("event archived");
    let after = world
        .run(
            world
                .querier
                .get_webhooks_for_household_and_event(&household, WebhookEvent::MealPlanCreated),
        )
        .expect("lookup succeeds");
    assert!(after.is_empty());
}

#[rstest]
fn trigger_events_only_attach_within_the_owning_household(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let owner = world.register("owner");
    let household = world.default_household(&owner.id);
    let stranger = world.register("stranger");
    let other_household = world.default_household(&stranger.id);
    let webhook = create_webhook(&world, &household, vec![WebhookEvent::WebhookCreated]);
    let input = WebhookTriggerEventCreationInput {
        belongs_to_webhook: webhook.id.clone(),
        trigger_event: WebhookEvent::HouseholdMemberRemoved,
    };

    let foreign = world.run(world.querier.add_webhook_trigger_event(&other_household, &input));
    assert_eq!(foreign, Err(RepositoryError::not_found("webhook")));

    let added = world
        .run(world.querier.add_webhook_trigger_event(&household, &input))
        .expect("event added");
    let fetched = world
        .run(world.querier.get_webhook(&webhook.id, &household))
        .expect("webhook readable");
    assert_eq!(fetched.events.len(), 2);
    assert!(fetched.events.contains(&added));
}

#[rstest]
fn archiving_a_webhook_is_idempotent(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let owner = world.register("tidy");
    let household = world.default_household(&owner.id);
    let webhook = create_webhook(&world, &household, vec![WebhookEvent::WebhookArchived]);
    let audit_before = world.audit_entry_count();

    world
        .run(world.querier.archive_webhook(&webhook.id, &household))
        .expect("first archive");
    world
        .run(world.querier.archive_webhook(&webhook.id, &household))
        .expect("second archive");

    assert_eq!(world.audit_entry_count(), audit_before + 1);
    assert!(
        !world
            .run(world.querier.webhook_exists(&webhook.id, &household))
            .expect("existence check")
    );
    let missing = world.run(world.querier.get_webhook(&webhook.id, &household));
    assert!(missing.is_err_and(|err| err.is_not_found()));
}

#[rstest]
fn audit_log_reads_filter_by_owner_and_resource_type(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let owner = world.register("auditor");
    let household = world.default_household(&owner.id);
    let webhook = create_webhook(&world, &household, vec![WebhookEvent::RecipeCreated]);

    let webhooks_only = world
        .run(world.querier.get_audit_log_entries_for_household_and_resource_type(
            &household,
            &[resource_types::WEBHOOKS.to_owned()],
            None,
        ))
        .expect("entries listed");
    assert_eq!(webhooks_only.data.len(), 1);
    let entry = &webhooks_only.data[0];
    assert_eq!(entry.relevant_id, webhook.id);
    assert_eq!(entry.event_type, AuditLogEventType::Created);
    let single = world
        .run(world.querier.get_audit_log_entry(&entry.id))
        .expect("entry readable");
    assert_eq!(&single, entry);

    let for_user = world
        .run(world.querier.get_audit_log_entries_for_user(&owner.id, None))
        .expect("entries listed");
    let kinds: Vec<&str> = for_user
        .data
        .iter()
        .map(|entry| entry.resource_type.as_str())
        .collect();
    assert!(kinds.contains(&resource_types::USERS));
    assert!(kinds.contains(&resource_types::HOUSEHOLDS));

    let nothing = world
        .run(world.querier.get_audit_log_entries_for_user_and_resource_type(
            &owner.id,
            &[],
            None,
        ))
        .expect("entries listed");
    assert!(nothing.data.is_empty());
}

#[rstest]
fn audit_log_pages_respect_the_limit(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let owner = world.register("pager");
    let household = world.default_household(&owner.id);
    for _ in 0..3 {
        create_webhook(&world, &household, vec![]);
    }
    let filter = QueryFilter {
        limit: Some(2),
        ..QueryFilter::default()
    };

    let page = world
        .run(world.querier.get_audit_log_entries_for_household_and_resource_type(
            &household,
            &[resource_types::WEBHOOKS.to_owned()],
            Some(filter),
        ))
        .expect("entries listed");

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.pagination.filtered_count, 3);
    assert_eq!(page.pagination.total_count, 3);
}

#[rstest]
fn failed_event_write_discards_the_webhook(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let owner = world.register("rollback");
    let household = world.default_household(&owner.id);
    let audit_before = world.audit_entry_count();
    let querier = world.querier.clone().with_ids(Arc::new(RepeatingIds));

    let result = world.run(querier.create_webhook(&webhook_input(
        &household,
        vec![WebhookEvent::MealPlanCreated],
    )));

    assert!(result.is_err());
    assert_eq!(world.count("SELECT count(*) FROM webhooks", &[]), 0);
    assert_eq!(
        world.count("SELECT count(*) FROM webhook_trigger_events", &[]),
        0
    );
    assert_eq!(world.audit_entry_count(), audit_before);
}
