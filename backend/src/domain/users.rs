//! User accounts and the inputs that create and modify them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::authorization::ServiceRole;
use super::ports::{RepositoryError, Validate, require_id, require_text};
use super::text_enum::text_enum;

text_enum! {
    /// Lifecycle state of a user account.
    pub enum UserAccountStatus {
        /// Registered but email not yet verified.
        Unverified => "unverified",
        /// In good standing.
        Good => "good",
        /// Blocked by an operator.
        Banned => "banned",
        /// Closed permanently.
        Terminated => "terminated",
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email_address: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    #[serde(skip_serializing)]
    pub two_factor_secret: String,
    pub two_factor_secret_verified_at: Option<DateTime<Utc>>,
    pub email_address_verified_at: Option<DateTime<Utc>>,
    pub requires_password_change: bool,
    pub password_last_changed_at: Option<DateTime<Utc>>,
    pub account_status: UserAccountStatus,
    pub account_status_explanation: String,
    pub service_role: ServiceRole,
    pub first_name: String,
    pub last_name: String,
    pub birthday: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Validate for User {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "user id")?;
        require_text(&self.username, "username")?;
        require_text(&self.email_address, "email address")
    }
}

/// Everything needed to register a user.
///
/// Password hashing and TOTP secret derivation happen upstream; this layer
/// stores the prepared values. When both `invitation_token` and
/// `destination_household_id` are present the new user also joins that
/// household.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistrationInput {
    pub username: String,
    pub email_address: String,
    pub hashed_password: String,
    pub two_factor_secret: String,
    pub first_name: String,
    pub last_name: String,
    pub birthday: Option<NaiveDate>,
    /// Name for the user's own household; synthesised when blank.
    pub household_name: String,
    pub invitation_token: Option<String>,
    pub destination_household_id: Option<String>,
}

impl UserRegistrationInput {
    /// The invitation token and destination, when both are present.
    pub fn invitation(&self) -> Option<(&str, &str)> {
        let token = self.invitation_token.as_deref().filter(|t| !t.is_empty())?;
        let household = self
            .destination_household_id
            .as_deref()
            .filter(|h| !h.is_empty())?;
        Some((token, household))
    }

    /// Name of the household created for the new user.
    pub fn household_name(&self) -> String {
        if self.household_name.trim().is_empty() {
            format!("{}'s cool household", self.username)
        } else {
            self.household_name.clone()
        }
    }
}

impl Validate for UserRegistrationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_text(&self.username, "username")?;
        require_text(&self.email_address, "email address")?;
        require_text(&self.hashed_password, "hashed password")
    }
}

/// Household name used when a user is left without any household.
pub fn fallback_household_name(user_id: &str) -> String {
    format!("{user_id}_default")
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailsUpdateInput {
    pub first_name: String,
    pub last_name: String,
    pub birthday: Option<NaiveDate>,
}

impl Validate for UserDetailsUpdateInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Operator request to move a user into a new account status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccountStatusUpdateInput {
    pub new_status: UserAccountStatus,
    pub reason: String,
}

impl Validate for UserAccountStatusUpdateInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_text(&self.reason, "reason")
    }
}
