//! Diesel rows for meal plans, events, options and votes.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::ports::RepositoryError;
use crate::domain::{
    MealPlan, MealPlanCreationInput, MealPlanEvent, MealPlanEventCreationInput, MealPlanOption,
    MealPlanOptionCreationInput, MealPlanOptionVote, MealPlanOptionVoteCreationInput,
    MealPlanStatus,
};
use crate::outbound::persistence::null_values::{
    non_empty, parse_text, small_from_db, small_to_db,
};
use crate::outbound::persistence::schema::{
    meal_plan_events, meal_plan_option_votes, meal_plan_options, meal_plans,
};

// ---------------------------------------------------------------------------
// Meal plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = meal_plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MealPlanRow {
    pub id: String,
    pub notes: String,
    pub status: String,
    pub voting_deadline: DateTime<Utc>,
    pub belongs_to_household: String,
    pub created_by_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<MealPlanRow> for MealPlan {
    type Error = RepositoryError;

    fn try_from(row: MealPlanRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: parse_text(&row.status)?,
            id: row.id,
            notes: row.notes,
            voting_deadline: row.voting_deadline,
            belongs_to_household: row.belongs_to_household,
            created_by_user: row.created_by_user,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = meal_plans)]
pub(crate) struct NewMealPlanRow<'a> {
    pub id: &'a str,
    pub notes: &'a str,
    pub status: &'a str,
    pub voting_deadline: DateTime<Utc>,
    pub belongs_to_household: &'a str,
    pub created_by_user: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewMealPlanRow<'a> {
    pub(crate) fn new(id: &'a str, now: DateTime<Utc>, input: &'a MealPlanCreationInput) -> Self {
        Self {
            id,
            notes: &input.notes,
            status: MealPlanStatus::AwaitingVotes.as_str(),
            voting_deadline: input.voting_deadline,
            belongs_to_household: &input.belongs_to_household,
            created_by_user: &input.created_by_user,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = meal_plans)]
pub(crate) struct MealPlanChanges<'a> {
    pub notes: &'a str,
    pub status: &'a str,
    pub voting_deadline: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl<'a> MealPlanChanges<'a> {
    pub(crate) fn new(plan: &'a MealPlan, now: DateTime<Utc>) -> Self {
        Self {
            notes: &plan.notes,
            status: plan.status.as_str(),
            voting_deadline: plan.voting_deadline,
            last_updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = meal_plan_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MealPlanEventRow {
    pub id: String,
    pub notes: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub meal_name: String,
    pub belongs_to_meal_plan: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<MealPlanEventRow> for MealPlanEvent {
    type Error = RepositoryError;

    fn try_from(row: MealPlanEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            meal_name: parse_text(&row.meal_name)?,
            id: row.id,
            notes: row.notes,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            belongs_to_meal_plan: row.belongs_to_meal_plan,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = meal_plan_events)]
pub(crate) struct NewMealPlanEventRow<'a> {
    pub id: &'a str,
    pub notes: &'a str,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub meal_name: &'a str,
    pub belongs_to_meal_plan: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewMealPlanEventRow<'a> {
    pub(crate) fn new(
        id: &'a str,
        now: DateTime<Utc>,
        input: &'a MealPlanEventCreationInput,
    ) -> Self {
        Self {
            id,
            notes: &input.notes,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            meal_name: input.meal_name.as_str(),
            belongs_to_meal_plan: &input.belongs_to_meal_plan,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = meal_plan_events)]
pub(crate) struct MealPlanEventChanges<'a> {
    pub notes: &'a str,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub meal_name: &'a str,
    pub last_updated_at: DateTime<Utc>,
}

impl<'a> MealPlanEventChanges<'a> {
    pub(crate) fn new(event: &'a MealPlanEvent, now: DateTime<Utc>) -> Self {
        Self {
            notes: &event.notes,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            meal_name: event.meal_name.as_str(),
            last_updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = meal_plan_options)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MealPlanOptionRow {
    pub id: String,
    pub assigned_cook: Option<String>,
    pub assigned_dishwasher: Option<String>,
    pub chosen: bool,
    pub tiebroken: bool,
    pub meal_scale: f64,
    pub meal_id: String,
    pub notes: String,
    pub belongs_to_meal_plan_event: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<MealPlanOptionRow> for MealPlanOption {
    type Error = RepositoryError;

    fn try_from(row: MealPlanOptionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            meal_id: row.meal_id,
            assigned_cook: row.assigned_cook,
            assigned_dishwasher: row.assigned_dishwasher,
            chosen: row.chosen,
            tiebroken: row.tiebroken,
            meal_scale: row.meal_scale,
            notes: row.notes,
            belongs_to_meal_plan_event: row.belongs_to_meal_plan_event,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = meal_plan_options)]
pub(crate) struct NewMealPlanOptionRow<'a> {
    pub id: &'a str,
    pub assigned_cook: Option<&'a str>,
    pub assigned_dishwasher: Option<&'a str>,
    pub meal_scale: f64,
    pub meal_id: &'a str,
    pub notes: &'a str,
    pub belongs_to_meal_plan_event: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewMealPlanOptionRow<'a> {
    /// Blank cook or dishwasher ids are stored as NULL.
    pub(crate) fn new(
        id: &'a str,
        now: DateTime<Utc>,
        input: &'a MealPlanOptionCreationInput,
    ) -> Self {
        Self {
            id,
            assigned_cook: non_empty(input.assigned_cook.as_deref()),
            assigned_dishwasher: non_empty(input.assigned_dishwasher.as_deref()),
            meal_scale: input.meal_scale,
            meal_id: &input.meal_id,
            notes: &input.notes,
            belongs_to_meal_plan_event: &input.belongs_to_meal_plan_event,
            created_at: now,
        }
    }
}

/// Editable option fields. `chosen` and `tiebroken` belong to finalization
/// and are never written through an update.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = meal_plan_options)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct MealPlanOptionChanges<'a> {
    pub assigned_cook: Option<&'a str>,
    pub assigned_dishwasher: Option<&'a str>,
    pub meal_scale: f64,
    pub meal_id: &'a str,
    pub notes: &'a str,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl<'a> MealPlanOptionChanges<'a> {
    pub(crate) fn new(option: &'a MealPlanOption, now: DateTime<Utc>) -> Self {
        Self {
            assigned_cook: non_empty(option.assigned_cook.as_deref()),
            assigned_dishwasher: non_empty(option.assigned_dishwasher.as_deref()),
            meal_scale: option.meal_scale,
            meal_id: &option.meal_id,
            notes: &option.notes,
            last_updated_at: Some(now),
        }
    }
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = meal_plan_option_votes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MealPlanOptionVoteRow {
    pub id: String,
    pub rank: i32,
    pub abstain: bool,
    pub notes: String,
    pub by_user: String,
    pub belongs_to_meal_plan_option: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<MealPlanOptionVoteRow> for MealPlanOptionVote {
    type Error = RepositoryError;

    fn try_from(row: MealPlanOptionVoteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            rank: small_from_db(row.rank, "meal_plan_option_votes.rank")?,
            id: row.id,
            abstain: row.abstain,
            notes: row.notes,
            by_user: row.by_user,
            belongs_to_meal_plan_option: row.belongs_to_meal_plan_option,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = meal_plan_option_votes)]
pub(crate) struct NewMealPlanOptionVoteRow<'a> {
    pub id: &'a str,
    pub rank: i32,
    pub abstain: bool,
    pub notes: &'a str,
    pub by_user: &'a str,
    pub belongs_to_meal_plan_option: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewMealPlanOptionVoteRow<'a> {
    pub(crate) fn new(
        id: &'a str,
        now: DateTime<Utc>,
        input: &'a MealPlanOptionVoteCreationInput,
    ) -> Self {
        Self {
            id,
            rank: small_to_db(input.rank),
            abstain: input.abstain,
            notes: &input.notes,
            by_user: &input.by_user,
            belongs_to_meal_plan_option: &input.belongs_to_meal_plan_option,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = meal_plan_option_votes)]
pub(crate) struct MealPlanOptionVoteChanges<'a> {
    pub rank: i32,
    pub abstain: bool,
    pub notes: &'a str,
    pub last_updated_at: DateTime<Utc>,
}

impl<'a> MealPlanOptionVoteChanges<'a> {
    pub(crate) fn new(vote: &'a MealPlanOptionVote, now: DateTime<Utc>) -> Self {
        Self {
            rank: small_to_db(vote.rank),
            abstain: vote.abstain,
            notes: &vote.notes,
            last_updated_at: now,
        }
    }
}
