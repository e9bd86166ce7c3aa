//! Port for user account persistence.
//!
//! Registration is the one multi-table operation here: it creates the user,
//! their own household and membership, optionally accepts an invitation and
//! attaches pending invitations addressed to the new email, all in one
//! transaction.

use async_trait::async_trait;
use pagination::{QueryFilter, QueryFilteredResult};

use crate::domain::{
    User, UserAccountStatus, UserAccountStatusUpdateInput, UserDetailsUpdateInput,
    UserRegistrationInput,
};

use super::RepositoryError;

/// Most rows returned by a username search.
pub const USER_SEARCH_LIMIT: i64 = 50;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn user_exists(&self, user_id: &str) -> Result<bool, RepositoryError>;

    /// Fetch a user whose two-factor secret has been verified.
    async fn get_user(&self, user_id: &str) -> Result<User, RepositoryError>;

    async fn get_user_by_username(&self, username: &str) -> Result<User, RepositoryError>;

    async fn get_user_by_email(&self, email_address: &str) -> Result<User, RepositoryError>;

    /// Fetch a user holding the service admin role.
    async fn get_admin_user_by_username(&self, username: &str) -> Result<User, RepositoryError>;

    /// Fetch a user whose two-factor secret is still awaiting verification.
    async fn get_user_with_unverified_two_factor_secret(
        &self,
        user_id: &str,
    ) -> Result<User, RepositoryError>;

    async fn get_user_by_email_address_verification_token(
        &self,
        token: &str,
    ) -> Result<User, RepositoryError>;

    /// Case-insensitive username prefix search, capped at [`USER_SEARCH_LIMIT`].
    async fn search_for_users_by_username(
        &self,
        username_query: &str,
    ) -> Result<Vec<User>, RepositoryError>;

    async fn get_users(
        &self,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<User>, RepositoryError>;

    /// Register a user. A duplicate username or email fails with
    /// [`RepositoryError::AlreadyExists`].
    async fn create_user(&self, input: &UserRegistrationInput) -> Result<User, RepositoryError>;

    async fn update_user(&self, updated: &User) -> Result<(), RepositoryError>;

    async fn update_user_username(
        &self,
        user_id: &str,
        new_username: &str,
    ) -> Result<(), RepositoryError>;

    async fn update_user_email_address(
        &self,
        user_id: &str,
        new_email_address: &str,
    ) -> Result<(), RepositoryError>;

    async fn update_user_details(
        &self,
        user_id: &str,
        input: &UserDetailsUpdateInput,
    ) -> Result<(), RepositoryError>;

    /// Store a new password hash and clear the forced-change flag.
    async fn update_user_password(
        &self,
        user_id: &str,
        new_hashed_password: &str,
    ) -> Result<(), RepositoryError>;

    /// Replace the two-factor secret; the new secret starts unverified.
    async fn update_user_two_factor_secret(
        &self,
        user_id: &str,
        new_secret: &str,
    ) -> Result<(), RepositoryError>;

    async fn mark_user_two_factor_secret_as_verified(
        &self,
        user_id: &str,
    ) -> Result<(), RepositoryError>;

    async fn mark_user_two_factor_secret_as_unverified(
        &self,
        user_id: &str,
    ) -> Result<(), RepositoryError>;

    /// Archive the user together with every membership they hold.
    async fn archive_user(&self, user_id: &str) -> Result<(), RepositoryError>;

    /// Whether the user's account status is one of `statuses`.
    async fn user_has_status(
        &self,
        user_id: &str,
        statuses: &[UserAccountStatus],
    ) -> Result<bool, RepositoryError>;

    async fn get_email_address_verification_token_for_user(
        &self,
        user_id: &str,
    ) -> Result<String, RepositoryError>;

    /// Stamp the email as verified when `token` matches the stored one.
    async fn mark_user_email_address_as_verified(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<(), RepositoryError>;

    async fn update_user_account_status(
        &self,
        user_id: &str,
        input: &UserAccountStatusUpdateInput,
    ) -> Result<(), RepositoryError>;
}
