//! Meal plan voting and finalization against embedded PostgreSQL.

use backend::domain::ports::{MealPlanVotingRepository, Repository};
use backend::domain::{
    Meal, MealCreationInput, MealName, MealPlan, MealPlanCreationInput, MealPlanEvent,
    MealPlanEventCreationInput, MealPlanOption, MealPlanOptionCreationInput,
    MealPlanOptionVoteCreationInput, MealPlanOptionVotesCreationInput, User,
};
use chrono::{Duration, Utc};
use rstest::rstest;

mod support;

use support::QuerierWorld;
use support::world::querier_world;

/// A household of `size` members, the first of whom owns it.
fn household_of(world: &QuerierWorld, size: usize) -> (Vec<User>, String) {
    let owner = world.register("member0");
    let household = world.default_household(&owner.id);
    let mut members = vec![owner];
    for index in 1..size {
        let member = world.register_invited(&members[0], &household, &format!("member{index}"));
        members.push(member);
    }
    (members, household)
}

/// A plan with one dinner event offering one option per label.
fn ballot(
    world: &QuerierWorld,
    household: &str,
    creator: &User,
    labels: &[&str],
) -> (MealPlan, MealPlanEvent, Vec<MealPlanOption>) {
    let querier = &world.querier;
    let now = Utc::now();
    let plan = world
        .run(Repository::<MealPlan>::create(
            querier,
            &MealPlanCreationInput {
                notes: "this week".to_owned(),
                voting_deadline: now + Duration::days(1),
                belongs_to_household: household.to_owned(),
                created_by_user: creator.id.clone(),
            },
        ))
        .expect("plan created");
    let event = world
        .run(Repository::<MealPlanEvent>::create(
            querier,
            &MealPlanEventCreationInput {
                notes: String::new(),
                starts_at: now + Duration::days(2),
                ends_at: now + Duration::days(2) + Duration::hours(1),
                meal_name: MealName::Dinner,
                belongs_to_meal_plan: plan.id.clone(),
            },
        ))
        .expect("event created");
    let options = labels
        .iter()
        .map(|label| {
            let meal = world
                .run(Repository::<Meal>::create(
                    querier,
                    &MealCreationInput {
                        name: (*label).to_owned(),
                        description: String::new(),
                        min_estimated_portions: 2.0,
                        max_estimated_portions: None,
                        eligible_for_meal_plans: true,
                        created_by_user: creator.id.clone(),
                    },
                ))
                .expect("meal created");
            world
                .run(Repository::<MealPlanOption>::create(
                    querier,
                    &MealPlanOptionCreationInput {
                        meal_id: meal.id,
                        assigned_cook: None,
                        assigned_dishwasher: None,
                        meal_scale: 1.0,
                        notes: (*label).to_owned(),
                        belongs_to_meal_plan_event: event.id.clone(),
                    },
                ))
                .expect("option created")
        })
        .collect();
    (plan, event, options)
}

/// Cast `voter`'s ranking, most preferred first.
fn rank(world: &QuerierWorld, voter: &User, preference: &[&MealPlanOption]) {
    let input = MealPlanOptionVotesCreationInput {
        by_user: voter.id.clone(),
        votes: preference
            .iter()
            .zip(0u16..)
            .map(|(option, rank)| MealPlanOptionVoteCreationInput {
                rank,
                abstain: false,
                notes: String::new(),
                by_user: voter.id.clone(),
                belongs_to_meal_plan_option: option.id.clone(),
            })
            .collect(),
    };
    let stored = world
        .run(world.querier.create_meal_plan_option_votes(&input))
        .expect("votes stored");
    assert_eq!(stored.len(), preference.len());
}

fn chosen_count(world: &QuerierWorld, event: &MealPlanEvent) -> i64 {
    world.count(
        "SELECT count(*) FROM meal_plan_options \
         WHERE belongs_to_meal_plan_event = $1 AND chosen",
        &[&event.id],
    )
}

#[rstest]
fn clear_winner_is_finalized_once(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let (members, household) = household_of(&world, 4);
    let (plan, event, options) = ballot(&world, &household, &members[0], &["A", "B", "C"]);
    let [a, b, c] = [&options[0], &options[1], &options[2]];
    rank(&world, &members[0], &[a, b, c]);
    rank(&world, &members[1], &[a, b, c]);
    rank(&world, &members[2], &[b, a, c]);
    rank(&world, &members[3], &[a, c, b]);
    assert!(
        world
            .run(world.querier.meal_plan_event_is_eligible_for_voting(&plan.id, &event.id))
            .expect("eligibility check")
    );

    let resolution = world
        .run(world.querier.finalize_meal_plan_option(&plan.id, &event.id, &household))
        .expect("finalization runs");

    assert!(resolution.chosen);
    assert!(!resolution.tiebroken);
    assert_eq!(resolution.winner.as_deref(), Some(a.id.as_str()));
    let stored = world
        .run(Repository::<MealPlanOption>::get(&world.querier, &event.id, &a.id))
        .expect("option readable");
    assert!(stored.chosen);
    assert!(!stored.tiebroken);
    assert_eq!(
        world.count(
            "SELECT count(*) FROM audit_log_entries \
             WHERE relevant_id = $1 AND event_type = 'updated'",
            &[&a.id],
        ),
        1
    );

    let again = world
        .run(world.querier.finalize_meal_plan_option(&plan.id, &event.id, &household))
        .expect("second finalization runs");
    assert!(!again.chosen);
    assert_eq!(chosen_count(&world, &event), 1);
    assert!(
        !world
            .run(world.querier.meal_plan_event_is_eligible_for_voting(&plan.id, &event.id))
            .expect("eligibility check")
    );
}

#[rstest]
fn split_vote_is_tiebroken(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let (members, household) = household_of(&world, 2);
    let (plan, event, options) = ballot(&world, &household, &members[0], &["A", "B"]);
    rank(&world, &members[0], &[&options[0]]);
    rank(&world, &members[1], &[&options[1]]);

    let resolution = world
        .run(world.querier.finalize_meal_plan_option(&plan.id, &event.id, &household))
        .expect("finalization runs");

    assert!(resolution.chosen);
    assert!(resolution.tiebroken);
    let winner = resolution.winner.expect("a winner is picked");
    assert!(options.iter().any(|option| option.id == winner));
    assert_eq!(chosen_count(&world, &event), 1);
}

#[rstest]
fn missing_voter_blocks_finalization(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let (members, household) = household_of(&world, 3);
    let (plan, event, options) = ballot(&world, &household, &members[0], &["A", "B"]);
    rank(&world, &members[0], &[&options[0], &options[1]]);
    rank(&world, &members[1], &[&options[1], &options[0]]);
    let audit_before = world.audit_entry_count();

    let resolution = world
        .run(world.querier.finalize_meal_plan_option(&plan.id, &event.id, &household))
        .expect("finalization runs");

    assert!(!resolution.chosen);
    assert_eq!(resolution.winner, None);
    assert_eq!(chosen_count(&world, &event), 0);
    assert_eq!(world.audit_entry_count(), audit_before);
}

#[rstest]
fn batch_votes_write_one_audit_entry_each(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let (members, household) = household_of(&world, 1);
    let (_, _, options) = ballot(&world, &household, &members[0], &["A", "B", "C"]);
    let audit_before = world.audit_entry_count();

    rank(&world, &members[0], &[&options[2], &options[0], &options[1]]);

    assert_eq!(world.audit_entry_count(), audit_before + 3);
}

#[rstest]
fn duplicate_vote_rolls_the_batch_back(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let (members, household) = household_of(&world, 1);
    let (_, _, options) = ballot(&world, &household, &members[0], &["A", "B"]);
    let vote = |option: &MealPlanOption, rank| MealPlanOptionVoteCreationInput {
        rank,
        abstain: false,
        notes: String::new(),
        by_user: members[0].id.clone(),
        belongs_to_meal_plan_option: option.id.clone(),
    };
    let input = MealPlanOptionVotesCreationInput {
        by_user: members[0].id.clone(),
        votes: vec![vote(&options[0], 0), vote(&options[1], 1), vote(&options[0], 2)],
    };

    let result = world.run(world.querier.create_meal_plan_option_votes(&input));

    assert!(result.is_err());
    assert_eq!(
        world.count("SELECT count(*) FROM meal_plan_option_votes", &[]),
        0
    );
}

#[rstest]
fn concurrent_finalizations_choose_exactly_once(querier_world: Option<QuerierWorld>) {
    let Some(world) = querier_world else {
        return;
    };
    let (members, household) = household_of(&world, 1);
    for _ in 0..5 {
        let (plan, event, options) = ballot(&world, &household, &members[0], &["A"]);
        rank(&world, &members[0], &[&options[0]]);

        let (first, second) = world.run(async {
            tokio::join!(
                world
                    .querier
                    .finalize_meal_plan_option(&plan.id, &event.id, &household),
                world
                    .querier
                    .finalize_meal_plan_option(&plan.id, &event.id, &household),
            )
        });

        let chosen = [first, second]
            .into_iter()
            .map(|result| result.expect("finalization runs"))
            .filter(|resolution| resolution.chosen)
            .count();
        assert_eq!(chosen, 1);
        assert_eq!(chosen_count(&world, &event), 1);
        assert_eq!(
            world.count(
                "SELECT count(*) FROM audit_log_entries \
                 WHERE relevant_id = $1 AND event_type = 'updated'",
                &[&options[0].id],
            ),
            1
        );
    }
}
