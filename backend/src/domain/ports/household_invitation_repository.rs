//! Port for household invitations.
//!
//! Status changes only apply to pending invitations; accepted, rejected and
//! cancelled are terminal.

use async_trait::async_trait;
use pagination::{QueryFilter, QueryFilteredResult};

use crate::domain::{
    HouseholdInvitation, HouseholdInvitationCreationInput, HouseholdInvitationResponse,
};

use super::RepositoryError;

#[async_trait]
pub trait HouseholdInvitationRepository: Send + Sync {
    async fn household_invitation_exists(
        &self,
        invitation_id: &str,
    ) -> Result<bool, RepositoryError>;

    async fn get_household_invitation_by_token_and_id(
        &self,
        token: &str,
        invitation_id: &str,
    ) -> Result<HouseholdInvitation, RepositoryError>;

    async fn get_household_invitation_by_household_and_id(
        &self,
        household_id: &str,
        invitation_id: &str,
    ) -> Result<HouseholdInvitation, RepositoryError>;

    /// Fetch a pending, unexpired invitation sent to `email_address`.
    async fn get_household_invitation_by_email_and_token(
        &self,
        email_address: &str,
        token: &str,
    ) -> Result<HouseholdInvitation, RepositoryError>;

    async fn get_pending_household_invitations_from_user(
        &self,
        user_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<HouseholdInvitation>, RepositoryError>;

    async fn get_pending_household_invitations_for_user(
        &self,
        user_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<HouseholdInvitation>, RepositoryError>;

    /// Create a pending invitation with a freshly generated token.
    async fn create_household_invitation(
        &self,
        input: &HouseholdInvitationCreationInput,
    ) -> Result<HouseholdInvitation, RepositoryError>;

    async fn cancel_household_invitation(
        &self,
        invitation_id: &str,
        response: &HouseholdInvitationResponse,
    ) -> Result<(), RepositoryError>;

    async fn reject_household_invitation(
        &self,
        invitation_id: &str,
        response: &HouseholdInvitationResponse,
    ) -> Result<(), RepositoryError>;

    /// Accept the invitation and add the invitee as a household member.
    async fn accept_household_invitation(
        &self,
        invitation_id: &str,
        response: &HouseholdInvitationResponse,
    ) -> Result<(), RepositoryError>;
}
