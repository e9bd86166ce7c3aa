//! Port for casting votes and resolving meal plan events.

use async_trait::async_trait;

use crate::domain::{MealPlanOptionVote, MealPlanOptionVotesCreationInput, OptionResolution};

use super::RepositoryError;

#[async_trait]
pub trait MealPlanVotingRepository: Send + Sync {
    /// Whether votes may still be cast on the event.
    async fn meal_plan_event_is_eligible_for_voting(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
    ) -> Result<bool, RepositoryError>;

    /// Tabulate the event's votes and mark the winning option chosen.
    ///
    /// Returns an undecided resolution without touching any row when a
    /// household member has not voted, when nothing was voted on, or when
    /// another finalization got there first.
    async fn finalize_meal_plan_option(
        &self,
        meal_plan_id: &str,
        meal_plan_event_id: &str,
        household_id: &str,
    ) -> Result<OptionResolution, RepositoryError>;

    /// Store every vote one user casts in a single transaction.
    async fn create_meal_plan_option_votes(
        &self,
        input: &MealPlanOptionVotesCreationInput,
    ) -> Result<Vec<MealPlanOptionVote>, RepositoryError>;
}
