//! Standard repository surface against embedded PostgreSQL: round trips,
//! scoping, updates and archive idempotence.

use backend::domain::ports::{Repository, RepositoryError};
use backend::domain::{
    Recipe, RecipeCreationInput, RecipeStep, RecipeStepCreationInput, User, UserNotification,
    UserNotificationCreationInput, UserNotificationStatus, ValidInstrument,
    ValidInstrumentCreationInput,
};
use backend::outbound::persistence::Querier;
use pagination::QueryFilter;
use rstest::rstest;

mod support;

use support::QuerierWorld;
use support::world::querier_world;

fn soup(author: &User) -> RecipeCreationInput {
    RecipeCreationInput {
        name: "Leek soup".to_owned(),
        slug: "leek-soup".to_owned(),
        source: String::new(),
        description: "A winter staple".to_owned(),
        min_estimated_portions: 4.0,
        max_estimated_portions: Some(6.0),
        eligible_for_meals: true,
        created_by_user: author.id.clone(),
    }
}

fn instrument(slug: &str) -> ValidInstrumentCreationInput {
    ValidInstrumentCreationInput {
        name: slug.to_owned(),
        plural_name: format!("{slug}s"),
        description: String::new(),
        icon_path: String::new(),
        slug: slug.to_owned(),
        usable_for_storage: false,
        display_in_summary_lists: true,
    }
}

#[rstest]
fn created_records_read_back_unchanged(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let author = world.register("chef");
    let querier: &Querier = &world.querier;

    let recipe = world
        .run(Repository::<Recipe>::create(querier, &soup(&author)))
        .expect("recipe created");
    let fetched = world
        .run(Repository::<Recipe>::get(querier, &(), &recipe.id))
        .expect("recipe readable");
    assert_eq!(fetched, recipe);

    let timed = world
        .run(Repository::<RecipeStep>::create(
            querier,
            &RecipeStepCreationInput {
                index: 0,
                notes: String::new(),
                explicit_instructions: "Sweat the leeks".to_owned(),
                minimum_estimated_time_in_seconds: Some(300),
                maximum_estimated_time_in_seconds: None,
                optional: false,
                belongs_to_recipe: recipe.id.clone(),
            },
        ))
        .expect("step created");
    let fetched_step = world
        .run(Repository::<RecipeStep>::get(querier, &recipe.id, &timed.id))
        .expect("step readable");
    assert_eq!(fetched_step, timed);
    assert_eq!(fetched_step.minimum_estimated_time_in_seconds, Some(300));
    assert_eq!(fetched_step.maximum_estimated_time_in_seconds, None);
}

#[rstest]
fn scoped_reads_do_not_cross_owners(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let reader = world.register("reader");
    let other = world.register("other");
    let querier: &Querier = &world.querier;
    let notification = world
        .run(Repository::<UserNotification>::create(
            querier,
            &UserNotificationCreationInput {
                content: "Dinner is decided".to_owned(),
                belongs_to_user: reader.id.clone(),
            },
        ))
        .expect("notification created");
    assert_eq!(notification.status, UserNotificationStatus::Unread);

    let foreign = world.run(Repository::<UserNotification>::get(
        querier,
        &other.id,
        &notification.id,
    ));
    assert_eq!(foreign, Err(RepositoryError::not_found("user notification")));
    assert!(
        world
            .run(Repository::<UserNotification>::exists(
                querier,
                &reader.id,
                &notification.id
            ))
            .expect("existence check")
    );
}

#[rstest]
fn updates_overwrite_mutable_fields(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let author = world.register("editor");
    let querier: &Querier = &world.querier;
    let recipe = world
        .run(Repository::<Recipe>::create(querier, &soup(&author)))
        .expect("recipe created");
    let audit_before = world.audit_entry_count();

    let renamed = Recipe {
        name: "Leek and potato soup".to_owned(),
        max_estimated_portions: None,
        ..recipe.clone()
    };
    world
        .run(Repository::<Recipe>::update(querier, &renamed))
        .expect("update succeeds");

    let fetched = world
        .run(Repository::<Recipe>::get(querier, &(), &recipe.id))
        .expect("recipe readable");
    assert_eq!(fetched.name, "Leek and potato soup");
    assert_eq!(fetched.max_estimated_portions, None);
    assert!(fetched.last_updated_at.is_some());
    assert_eq!(world.audit_entry_count(), audit_before + 1);
}

#[rstest]
fn archive_twice_is_a_no_op_the_second_time(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let querier: &Querier = &world.querier;
    let whisk = world
        .run(Repository::<ValidInstrument>::create(querier, &instrument("whisk")))
        .expect("instrument created");

    world
        .run(Repository::<ValidInstrument>::archive(querier, &(), &whisk.id))
        .expect("first archive");
    let audit_after_first = world.audit_entry_count();
    world
        .run(Repository::<ValidInstrument>::archive(querier, &(), &whisk.id))
        .expect("second archive");

    assert_eq!(world.audit_entry_count(), audit_after_first);
    let missing = world.run(Repository::<ValidInstrument>::get(querier, &(), &whisk.id));
    assert!(missing.is_err_and(|err| err.is_not_found()));
    let update = world.run(Repository::<ValidInstrument>::update(querier, &whisk));
    assert!(update.is_err_and(|err| err.is_not_found()));
}

#[rstest]
fn listings_page_oldest_first(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let querier: &Querier = &world.querier;
    let mut created = Vec::new();
    for slug in ["ladle", "sieve", "grater"] {
        created.push(
            world
                .run(Repository::<ValidInstrument>::create(querier, &instrument(slug)))
                .expect("instrument created"),
        );
    }
    let filter = QueryFilter {
        page: Some(2),
        limit: Some(2),
        ..QueryFilter::default()
    };

    let page = world
        .run(Repository::<ValidInstrument>::list(querier, &(), Some(filter)))
        .expect("instruments listed");

    assert_eq!(page.pagination.total_count, 3);
    assert_eq!(page.pagination.filtered_count, 3);
    assert_eq!(page.data.len(), 1);
}
