//! Port for household membership lifecycle operations.
//!
//! Every user keeps exactly one default membership. Operations that remove or
//! move memberships restore that before committing.

use async_trait::async_trait;

use crate::domain::{
    HouseholdOwnershipTransferInput, ModifyUserPermissionsInput, SessionContextData,
};

use super::RepositoryError;

#[async_trait]
pub trait HouseholdMembershipRepository: Send + Sync {
    /// Assemble the authorization snapshot for `user_id`.
    async fn build_session_context_data_for_user(
        &self,
        user_id: &str,
    ) -> Result<SessionContextData, RepositoryError>;

    async fn get_default_household_id_for_user(
        &self,
        user_id: &str,
    ) -> Result<String, RepositoryError>;

    /// Move the user's default flag to `household_id`.
    async fn mark_household_as_user_default(
        &self,
        user_id: &str,
        household_id: &str,
    ) -> Result<(), RepositoryError>;

    async fn user_is_member_of_household(
        &self,
        user_id: &str,
        household_id: &str,
    ) -> Result<bool, RepositoryError>;

    async fn modify_user_permissions(
        &self,
        household_id: &str,
        user_id: &str,
        input: &ModifyUserPermissionsInput,
    ) -> Result<(), RepositoryError>;

    /// Hand the household to a new owner, swapping the two members' roles.
    async fn transfer_household_ownership(
        &self,
        household_id: &str,
        input: &HouseholdOwnershipTransferInput,
    ) -> Result<(), RepositoryError>;

    /// Archive the membership and repair the user's default household.
    async fn remove_user_from_household(
        &self,
        user_id: &str,
        household_id: &str,
    ) -> Result<(), RepositoryError>;
}
