//! Meal plans, events, options and votes: the standard surface for each plus
//! the voting port.
//!
//! Finalization reads the household roster and the event's votes, runs the
//! Schulze tabulation and flags the winner, all inside one transaction. The
//! partial unique index on chosen options settles races between concurrent
//! finalizations: the loser's update fails inside a savepoint and it reports
//! an undecided outcome.

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::{debug, info};

use super::audit_log_writer::write_audit_log_entry;
use super::diesel_helpers::{QueryExecutor, rename_conflict};
use super::models::{
    MealPlanChanges, MealPlanEventChanges, MealPlanEventRow, MealPlanOptionChanges,
    MealPlanOptionRow, MealPlanOptionVoteChanges, MealPlanOptionVoteRow, MealPlanRow,
    NewMealPlanEventRow, NewMealPlanOptionRow, NewMealPlanOptionVoteRow, NewMealPlanRow,
};
use super::querier::Querier;
use super::schema::{
    household_user_memberships, meal_plan_events, meal_plan_option_votes, meal_plan_options,
    meal_plans,
};
use super::standard_repository::standard_repository;
use crate::domain::ports::{MealPlanVotingRepository, RepositoryError, Validate, require_id};
use crate::domain::{
    AuditLogEntryCreationInput, AuditOwner, MealPlan, MealPlanEvent, MealPlanOption,
    MealPlanOptionVote, MealPlanOptionVotesCreationInput, MealPlanStatus, OptionResolution,
    resolve_options, resource_types,
};

standard_repository! {
    record: MealPlan,
    row: MealPlanRow,
    table: meal_plans,
    scope: belongs_to_household,
    noun: "meal plan",
    new_row: NewMealPlanRow::new,
    changes: MealPlanChanges::new,
    owner: |plan| AuditOwner {
        user: Some(plan.created_by_user.clone()),
        household: Some(plan.belongs_to_household.clone()),
    },
}

standard_repository! {
    record: MealPlanEvent,
    row: MealPlanEventRow,
    table: meal_plan_events,
    scope: belongs_to_meal_plan,
    noun: "meal plan event",
    new_row: NewMealPlanEventRow::new,
    changes: MealPlanEventChanges::new,
    owner: |_event| AuditOwner::nobody(),
}

standard_repository! {
    record: MealPlanOption,
    row: MealPlanOptionRow,
    table: meal_plan_options,
    scope: belongs_to_meal_plan_event,
    noun: "meal plan option",
    new_row: NewMealPlanOptionRow::new,
    changes: MealPlanOptionChanges::new,
    owner: |_option| AuditOwner::nobody(),
}

standard_repository! {
    record: MealPlanOptionVote,
    row: MealPlanOptionVoteRow,
    table: meal_plan_option_votes,
    scope: belongs_to_meal_plan_option,
    noun: "meal plan option vote",
    new_row: NewMealPlanOptionVoteRow::new,
    changes: MealPlanOptionVoteChanges::new,
    owner: |vote| AuditOwner::user(&vote.by_user),
}

/// User ids of the household's current members.
async fn current_member_ids<C: QueryExecutor>(
    conn: &mut C,
    household_id: &str,
) -> Result<Vec<String>, RepositoryError> {
    let members = household_user_memberships::table
        .filter(household_user_memberships::belongs_to_household.eq(household_id))
        .filter(household_user_memberships::archived_at.is_null())
        .select(household_user_memberships::belongs_to_user)
        .load::<String>(conn)
        .await?;
    Ok(members)
}

/// Live votes cast on the live options of one event.
async fn votes_for_event<C: QueryExecutor>(
    conn: &mut C,
    meal_plan_event_id: &str,
) -> Result<Vec<MealPlanOptionVote>, RepositoryError> {
    let rows = meal_plan_option_votes::table
        .inner_join(meal_plan_options::table)
        .filter(meal_plan_options::belongs_to_meal_plan_event.eq(meal_plan_event_id))
        .filter(meal_plan_options::archived_at.is_null())
        .filter(meal_plan_option_votes::archived_at.is_null())
        .select(MealPlanOptionVoteRow::as_select())
        .load::<MealPlanOptionVoteRow>(conn)
        .await?;
    rows.into_iter().map(MealPlanOptionVote::try_from).collect()
}

async fn event_has_chosen_option<C: QueryExecutor>(
    conn: &mut C,
    meal_plan_event_id: &str,
) -> Result<bool, RepositoryError> {
    let decided = diesel::select(exists(
        meal_plan_options::table
            .filter(meal_plan_options::belongs_to_meal_plan_event.eq(meal_plan_event_id))
            .filter(meal_plan_options::chosen.eq(true))
            .filter(meal_plan_options::archived_at.is_null()),
    ))
    .get_result::<bool>(conn)
    .await?;
    Ok(decided)
}

/// Flag `winner` as the event's chosen option inside a savepoint.
///
/// Only an unchosen row is updated. A concurrent finalization that chose the
/// same winner holds the row lock until it commits, after which this update
/// matches nothing. One that chose a different option trips the one-chosen
/// index instead. Either way this returns `false`.
async fn mark_option_chosen<C: QueryExecutor>(
    conn: &mut C,
    meal_plan_event_id: &str,
    winner: &str,
    tiebroken: bool,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<bool, RepositoryError> {
    let outcome = conn
        .transaction::<_, DieselError, _>(|conn| {
            async move {
                diesel::update(
                    meal_plan_options::table
                        .filter(meal_plan_options::id.eq(winner))
                        .filter(meal_plan_options::belongs_to_meal_plan_event.eq(meal_plan_event_id))
                        .filter(meal_plan_options::chosen.eq(false))
                        .filter(meal_plan_options::archived_at.is_null()),
                )
                .set((
                    meal_plan_options::chosen.eq(true),
                    meal_plan_options::tiebroken.eq(tiebroken),
                    meal_plan_options::last_updated_at.eq(now),
                ))
                .execute(conn)
                .await
            }
            .scope_boxed()
        })
        .await;

    match outcome {
        Ok(affected) => Ok(affected > 0),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            debug!(meal_plan_event_id, "another finalization chose an option first");
            Ok(false)
        }
        Err(other) => Err(other.into()),
    }
}

#[async_trait]
impl MealPlanVotingRepository for Querier {
    #[tracing::instrument(skip(self), err)]
    async fn meal_plan_event_is_eligible_for_voting(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
    ) -> Result<bool, RepositoryError> {
        require_id(meal_plan_id, "meal plan id")?;
        require_id(meal_plan_event_id, "meal plan event id")?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        let open = meal_plan_events::table
            .inner_join(meal_plans::table)
            .filter(meal_plan_events::id.eq(meal_plan_event_id))
            .filter(meal_plan_events::belongs_to_meal_plan.eq(meal_plan_id))
            .filter(meal_plan_events::archived_at.is_null())
            .filter(meal_plans::archived_at.is_null())
            .filter(meal_plans::status.eq(MealPlanStatus::AwaitingVotes.as_str()))
            .filter(meal_plans::voting_deadline.gt(now))
            .select(meal_plan_events::id)
            .first::<String>(&mut conn)
            .await
            .optional()?
            .is_some();
        if !open {
            return Ok(false);
        }
        Ok(!event_has_chosen_option(&mut *conn, meal_plan_event_id).await?)
    }

    #[tracing::instrument(skip(self), err)]
    async fn finalize_meal_plan_option(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        household_id: &str,
    ) -> Result<OptionResolution, RepositoryError> {
        require_id(meal_plan_id, "meal plan id")?;
        require_id(meal_plan_event_id, "meal plan event id")?;
        require_id(household_id, "household id")?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let event_found = meal_plan_events::table
                    .inner_join(meal_plans::table)
                    .filter(meal_plan_events::id.eq(meal_plan_event_id))
                    .filter(meal_plan_events::archived_at.is_null())
                    .filter(meal_plans::id.eq(meal_plan_id))
                    .filter(meal_plans::belongs_to_household.eq(household_id))
                    .filter(meal_plans::archived_at.is_null())
                    .select(meal_plan_events::id)
                    .first::<String>(conn)
                    .await
                    .optional()?
                    .is_some();
                if !event_found {
                    return Err(RepositoryError::not_found("meal plan event"));
                }
                if event_has_chosen_option(conn, meal_plan_event_id).await? {
                    debug!(meal_plan_event_id, "event already decided");
                    return Ok(OptionResolution::undecided());
                }

                let members = current_member_ids(conn, household_id).await?;
                let votes = votes_for_event(conn, meal_plan_event_id).await?;
                let resolution = resolve_options(&votes, &members, &self.tie_breaker);
                let Some(winner) = resolution.winner.as_deref() else {
                    debug!(
                        meal_plan_event_id,
                        members = members.len(),
                        votes = votes.len(),
                        "event cannot be decided yet"
                    );
                    return Ok(resolution);
                };

                if !mark_option_chosen(conn, meal_plan_event_id, winner, resolution.tiebroken, now)
                    .await?
                {
                    return Ok(OptionResolution::undecided());
                }
                write_audit_log_entry(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::updated(resource_types::MEAL_PLAN_OPTIONS, winner)
                        .with_owner(AuditOwner::household(household_id))
                        .with_change("chosen", false, true)
                        .with_change("tiebroken", false, resolution.tiebroken),
                )
                .await?;
                info!(
                    meal_plan_event_id,
                    winner,
                    tiebroken = resolution.tiebroken,
                    "meal plan option chosen"
                );
                Ok(resolution)
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self, input), fields(user_id = %input.by_user), err)]
    async fn create_meal_plan_option_votes(
        &self,
        input: &MealPlanOptionVotesCreationInput,
    ) -> Result<Vec<MealPlanOptionVote>, RepositoryError> {
        input.validate()?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let mut created = Vec::with_capacity(input.votes.len());
                for vote in &input.votes {
                    let id = self.ids.new_id();
                    let row: MealPlanOptionVoteRow =
                        diesel::insert_into(meal_plan_option_votes::table)
                            .values(NewMealPlanOptionVoteRow::new(&id, now, vote))
                            .returning(MealPlanOptionVoteRow::as_returning())
                            .get_result(conn)
                            .await
                            .map_err(RepositoryError::from)
                            .map_err(rename_conflict("meal plan option vote"))?;
                    let stored = MealPlanOptionVote::try_from(row)?;
                    write_audit_log_entry(
                        conn,
                        self.ids.as_ref(),
                        now,
                        AuditLogEntryCreationInput::created(
                            resource_types::MEAL_PLAN_OPTION_VOTES,
                            &stored.id,
                        )
                        .with_owner(AuditOwner::user(&stored.by_user)),
                    )
                    .await?;
                    created.push(stored);
                }
                Ok(created)
            }
            .scope_boxed()
        })
        .await
    }
}
