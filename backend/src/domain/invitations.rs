//! Invitations asking someone to join a household.
//!
//! An invitation starts `pending` and moves at most once, to `accepted`,
//! `rejected` or `cancelled`. Terminal states never revert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ports::{RepositoryError, Validate, require_id, require_text};
use super::text_enum::text_enum;

text_enum! {
    /// Where an invitation is in its lifecycle.
    pub enum HouseholdInvitationStatus {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

impl HouseholdInvitationStatus {
    /// Whether the invitation can still change state.
    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }
}

/// Note recorded when an invitation is accepted as part of registration.
pub const ACCEPTED_DURING_REGISTRATION_NOTE: &str = "accepted during registration";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdInvitation {
    pub id: String,
    pub destination_household: String,
    pub to_email: String,
    /// Set once the invitee has an account.
    pub to_user: Option<String>,
    pub to_name: String,
    pub from_user: String,
    pub status: HouseholdInvitationStatus,
    pub note: String,
    pub status_note: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl HouseholdInvitation {
    /// Whether the invitation may still be accepted at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_pending() && self.archived_at.is_none() && self.expires_at > now
    }
}

/// Values for a new invitation. The token is generated by the persistence
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdInvitationCreationInput {
    pub from_user: String,
    pub to_email: String,
    pub to_user: Option<String>,
    pub to_name: String,
    pub note: String,
    pub destination_household_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Validate for HouseholdInvitationCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.from_user, "from user id")?;
        require_id(&self.destination_household_id, "household id")?;
        require_text(&self.to_email, "invitee email address")
    }
}

/// The token proving the caller holds the invitation, plus a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdInvitationResponse {
    pub token: String,
    pub note: String,
}

impl Validate for HouseholdInvitationResponse {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_text(&self.token, "invitation token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    fn invitation(status: HouseholdInvitationStatus, expires_in: Duration) -> HouseholdInvitation {
        let now = Utc::now();
        HouseholdInvitation {
            id: "inv".to_owned(),
            destination_household: "h".to_owned(),
            to_email: "b@x".to_owned(),
            to_user: None,
            to_name: String::new(),
            from_user: "a".to_owned(),
            status,
            note: String::new(),
            status_note: String::new(),
            token: "t".to_owned(),
            expires_at: now + expires_in,
            created_at: now,
            last_updated_at: None,
            archived_at: None,
        }
    }

    #[rstest]
    #[case(HouseholdInvitationStatus::Pending, Duration::hours(1), true)]
    #[case(HouseholdInvitationStatus::Pending, Duration::hours(-1), false)]
    #[case(HouseholdInvitationStatus::Accepted, Duration::hours(1), false)]
    #[case(HouseholdInvitationStatus::Cancelled, Duration::hours(1), false)]
    fn only_pending_unexpired_invitations_are_open(
        #[case] status: HouseholdInvitationStatus,
        #[case] expires_in: Duration,
        #[case] open: bool,
    ) {
        assert_eq!(invitation(status, expires_in).is_open_at(Utc::now()), open);
    }

    #[rstest]
    fn responses_need_a_token() {
        let response = HouseholdInvitationResponse {
            token: String::new(),
            note: "no thanks".to_owned(),
        };

        assert_eq!(
            response.validate(),
            Err(RepositoryError::empty_input("invitation token"))
        );
    }
}
