//! Meal plans, their events, the options proposed for each event and the
//! votes cast on those options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit_log::resource_types;
use super::ports::{Record, RepositoryError, Validate, require_id};
use super::text_enum::text_enum;

text_enum! {
    /// Whether a meal plan is still collecting votes.
    pub enum MealPlanStatus {
        AwaitingVotes => "awaiting_votes",
        Finalized => "finalized",
    }
}

text_enum! {
    /// Slot of the day a meal plan event covers.
    pub enum MealName {
        Breakfast => "breakfast",
        SecondBreakfast => "second_breakfast",
        Brunch => "brunch",
        Lunch => "lunch",
        Supper => "supper",
        Dinner => "dinner",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: String,
    pub notes: String,
    pub status: MealPlanStatus,
    pub voting_deadline: DateTime<Utc>,
    pub belongs_to_household: String,
    pub created_by_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl MealPlan {
    /// Whether votes may still be cast at `now`.
    pub fn accepts_votes_at(&self, now: DateTime<Utc>) -> bool {
        self.archived_at.is_none()
            && self.status == MealPlanStatus::AwaitingVotes
            && self.voting_deadline > now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanCreationInput {
    pub notes: String,
    pub voting_deadline: DateTime<Utc>,
    pub belongs_to_household: String,
    pub created_by_user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanEvent {
    pub id: String,
    pub notes: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub meal_name: MealName,
    pub belongs_to_meal_plan: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanEventCreationInput {
    pub notes: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub meal_name: MealName,
    pub belongs_to_meal_plan: String,
}

/// A candidate meal for one event.
///
/// At most one option per event is ever `chosen`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanOption {
    pub id: String,
    pub meal_id: String,
    pub assigned_cook: Option<String>,
    pub assigned_dishwasher: Option<String>,
    pub chosen: bool,
    pub tiebroken: bool,
    pub meal_scale: f64,
    pub notes: String,
    pub belongs_to_meal_plan_event: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanOptionCreationInput {
    pub meal_id: String,
    pub assigned_cook: Option<String>,
    pub assigned_dishwasher: Option<String>,
    pub meal_scale: f64,
    pub notes: String,
    pub belongs_to_meal_plan_event: String,
}

/// One user's ranking of one option. Lower ranks are preferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanOptionVote {
    pub id: String,
    pub rank: u16,
    /// Counts as participation without expressing a preference.
    pub abstain: bool,
    pub notes: String,
    pub by_user: String,
    pub belongs_to_meal_plan_option: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanOptionVoteCreationInput {
    pub rank: u16,
    pub abstain: bool,
    pub notes: String,
    pub by_user: String,
    pub belongs_to_meal_plan_option: String,
}

/// Every vote one user casts for the options of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanOptionVotesCreationInput {
    pub by_user: String,
    pub votes: Vec<MealPlanOptionVoteCreationInput>,
}

impl Validate for MealPlan {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "meal plan id")?;
        require_id(&self.belongs_to_household, "household id")
    }
}

impl Validate for MealPlanCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.belongs_to_household, "household id")?;
        require_id(&self.created_by_user, "user id")
    }
}

impl Validate for MealPlanEvent {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "meal plan event id")?;
        require_id(&self.belongs_to_meal_plan, "meal plan id")
    }
}

impl Validate for MealPlanEventCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.belongs_to_meal_plan, "meal plan id")
    }
}

impl Validate for MealPlanOption {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "meal plan option id")?;
        require_id(&self.meal_id, "meal id")?;
        require_id(&self.belongs_to_meal_plan_event, "meal plan event id")
    }
}

impl Validate for MealPlanOptionCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.meal_id, "meal id")?;
        require_id(&self.belongs_to_meal_plan_event, "meal plan event id")
    }
}

impl Validate for MealPlanOptionVote {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "meal plan option vote id")?;
        require_id(&self.by_user, "user id")?;
        require_id(&self.belongs_to_meal_plan_option, "meal plan option id")
    }
}

impl Validate for MealPlanOptionVoteCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.by_user, "user id")?;
        require_id(&self.belongs_to_meal_plan_option, "meal plan option id")
    }
}

impl Validate for MealPlanOptionVotesCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.by_user, "user id")?;
        self.votes.iter().try_for_each(Validate::validate)
    }
}

impl Record for MealPlan {
    type Scope = str;
    type Creation = MealPlanCreationInput;

    const RESOURCE_TYPE: &'static str = resource_types::MEAL_PLANS;
    const SCOPE_NAME: &'static str = "household id";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for MealPlanEvent {
    type Scope = str;
    type Creation = MealPlanEventCreationInput;

    const RESOURCE_TYPE: &'static str = resource_types::MEAL_PLAN_EVENTS;
    const SCOPE_NAME: &'static str = "meal plan id";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for MealPlanOption {
    type Scope = str;
    type Creation = MealPlanOptionCreationInput;

    const RESOURCE_TYPE: &'static str = resource_types::MEAL_PLAN_OPTIONS;
    const SCOPE_NAME: &'static str = "meal plan event id";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for MealPlanOptionVote {
    type Scope = str;
    type Creation = MealPlanOptionVoteCreationInput;

    const RESOURCE_TYPE: &'static str = resource_types::MEAL_PLAN_OPTION_VOTES;
    const SCOPE_NAME: &'static str = "meal plan option id";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    fn plan(status: MealPlanStatus, deadline_in: Duration) -> MealPlan {
        let now = Utc::now();
        MealPlan {
            id: "mp".to_owned(),
            notes: String::new(),
            status,
            voting_deadline: now + deadline_in,
            belongs_to_household: "h".to_owned(),
            created_by_user: "u".to_owned(),
            created_at: now,
            last_updated_at: None,
            archived_at: None,
        }
    }

    #[rstest]
    #[case(MealPlanStatus::AwaitingVotes, Duration::hours(2), true)]
    #[case(MealPlanStatus::AwaitingVotes, Duration::hours(-2), false)]
    #[case(MealPlanStatus::Finalized, Duration::hours(2), false)]
    fn votes_accepted_until_deadline(
        #[case] status: MealPlanStatus,
        #[case] deadline_in: Duration,
        #[case] accepts: bool,
    ) {
        assert_eq!(plan(status, deadline_in).accepts_votes_at(Utc::now()), accepts);
    }

    #[rstest]
    fn batch_votes_validate_each_vote() {
        let input = MealPlanOptionVotesCreationInput {
            by_user: "u".to_owned(),
            votes: vec![MealPlanOptionVoteCreationInput {
                rank: 0,
                abstain: false,
                notes: String::new(),
                by_user: "u".to_owned(),
                belongs_to_meal_plan_option: String::new(),
            }],
        };

        assert_eq!(
            input.validate(),
            Err(RepositoryError::invalid_identifier("meal plan option id"))
        );
    }
}
