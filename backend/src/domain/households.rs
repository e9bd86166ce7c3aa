//! Households and their membership records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::authorization::HouseholdRole;
use super::ports::{RepositoryError, Validate, require_id, require_text};
use super::text_enum::text_enum;
use super::users::User;

text_enum! {
    /// Subscription state of a household.
    pub enum HouseholdBillingStatus {
        Unpaid => "unpaid",
        Paid => "paid",
        Trial => "trial",
    }
}

/// Postal and contact details shared by household inputs and records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdContact {
    pub contact_phone: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A group of users planning meals together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub id: String,
    pub name: String,
    pub billing_status: HouseholdBillingStatus,
    #[serde(flatten)]
    pub contact: HouseholdContact,
    /// Owner.
    pub belongs_to_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    /// Non-archived members; empty on list reads.
    pub members: Vec<HouseholdMember>,
}

impl Validate for Household {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "household id")?;
        require_id(&self.belongs_to_user, "owner user id")?;
        require_text(&self.name, "household name")
    }
}

/// Values for a household created by an existing user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdCreationInput {
    pub name: String,
    #[serde(flatten)]
    pub contact: HouseholdContact,
    pub belongs_to_user: String,
}

impl Validate for HouseholdCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.belongs_to_user, "owner user id")?;
        require_text(&self.name, "household name")
    }
}

/// Links a user to a household with a role and the default-household flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdUserMembership {
    pub id: String,
    pub belongs_to_user: String,
    pub belongs_to_household: String,
    pub household_role: HouseholdRole,
    pub default_household: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

/// A membership together with the member's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdMember {
    pub membership: HouseholdUserMembership,
    pub user: User,
}

/// Change of a member's household role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyUserPermissionsInput {
    pub new_role: HouseholdRole,
    pub reason: String,
}

impl Validate for ModifyUserPermissionsInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_text(&self.reason, "permission change reason")
    }
}

/// Hand-over of a household from its current owner to another member.
///
/// The new owner must differ from the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdOwnershipTransferInput {
    pub current_owner: String,
    pub new_owner: String,
    pub reason: String,
}

impl Validate for HouseholdOwnershipTransferInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.current_owner, "current owner id")?;
        require_id(&self.new_owner, "new owner id")?;
        if self.current_owner == self.new_owner {
            return Err(RepositoryError::invalid_identifier("new owner id"));
        }
        require_text(&self.reason, "ownership transfer reason")
    }
}

/// Pick the default-household candidate among a user's remaining memberships.
///
/// An existing default is kept; otherwise the earliest created membership
/// wins. Returns `None` when nothing remains.
pub fn choose_default_membership(
    memberships: &[HouseholdUserMembership],
) -> Option<&HouseholdUserMembership> {
    memberships
        .iter()
        .find(|m| m.default_household)
        .or_else(|| memberships.iter().min_by_key(|m| (m.created_at, m.id.as_str())))
}
