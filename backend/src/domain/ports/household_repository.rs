//! Port for household persistence.

use async_trait::async_trait;
use pagination::{QueryFilter, QueryFilteredResult};

use crate::domain::{Household, HouseholdCreationInput};

use super::RepositoryError;

#[async_trait]
pub trait HouseholdRepository: Send + Sync {
    async fn household_exists(&self, household_id: &str) -> Result<bool, RepositoryError>;

    /// Fetch a household with its current members.
    async fn get_household(&self, household_id: &str) -> Result<Household, RepositoryError>;

    /// Households the user currently belongs to. Members are not loaded.
    async fn get_households(
        &self,
        user_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<Household>, RepositoryError>;

    /// Create a household and an admin membership for its owner.
    async fn create_household(
        &self,
        input: &HouseholdCreationInput,
    ) -> Result<Household, RepositoryError>;

    async fn update_household(&self, updated: &Household) -> Result<(), RepositoryError>;

    /// Archive a household owned by `user_id`.
    async fn archive_household(
        &self,
        household_id: &str,
        user_id: &str,
    ) -> Result<(), RepositoryError>;
}
