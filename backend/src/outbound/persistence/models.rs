//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Each read row converts into its domain
//! record with `TryFrom`, which is where stored enum text is parsed and
//! narrowed integers are range checked.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use super::null_values::parse_text;
use super::schema::{
    audit_log_entries, household_invitations, household_user_memberships, households, users,
};
use crate::domain::ports::RepositoryError;
use crate::domain::{
    AuditLogChanges, AuditLogEntry, Household, HouseholdBillingStatus, HouseholdContact,
    HouseholdInvitation, HouseholdUserMembership, User,
};

mod catalogue_rows;
mod meal_planning_rows;
mod webhook_rows;

pub(crate) use catalogue_rows::{
    MealChanges, MealRow, NewMealRow, NewRecipeRatingRow, NewRecipeRow, NewRecipeStepRow,
    NewUserNotificationRow, NewValidInstrumentRow, RecipeChanges, RecipeRatingChanges,
    RecipeRatingRow, RecipeRow, RecipeStepChanges, RecipeStepRow, UserNotificationChanges,
    UserNotificationRow, ValidInstrumentChanges, ValidInstrumentRow,
};
pub(crate) use meal_planning_rows::{
    MealPlanChanges, MealPlanEventChanges, MealPlanEventRow, MealPlanOptionChanges,
    MealPlanOptionRow, MealPlanOptionVoteChanges, MealPlanOptionVoteRow, MealPlanRow,
    NewMealPlanEventRow, NewMealPlanOptionRow, NewMealPlanOptionVoteRow, NewMealPlanRow,
};
pub(crate) use webhook_rows::{
    NewWebhookRow, NewWebhookTriggerEventRow, WebhookRow, WebhookTriggerEventRow,
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Row struct for reading from the users table.
///
/// The verification token is deliberately absent; it is only ever read
/// through a dedicated single-column query.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: String,
    pub username: String,
    pub email_address: String,
    pub hashed_password: String,
    pub two_factor_secret: String,
    pub two_factor_secret_verified_at: Option<DateTime<Utc>>,
    pub email_address_verified_at: Option<DateTime<Utc>>,
    pub requires_password_change: bool,
    pub password_last_changed_at: Option<DateTime<Utc>>,
    pub user_account_status: String,
    pub user_account_status_explanation: String,
    pub service_role: String,
    pub first_name: String,
    pub last_name: String,
    pub birthday: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            account_status: parse_text(&row.user_account_status)?,
            service_role: parse_text(&row.service_role)?,
            id: row.id,
            username: row.username,
            email_address: row.email_address,
            hashed_password: row.hashed_password,
            two_factor_secret: row.two_factor_secret,
            two_factor_secret_verified_at: row.two_factor_secret_verified_at,
            email_address_verified_at: row.email_address_verified_at,
            requires_password_change: row.requires_password_change,
            password_last_changed_at: row.password_last_changed_at,
            account_status_explanation: row.user_account_status_explanation,
            first_name: row.first_name,
            last_name: row.last_name,
            birthday: row.birthday,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

/// Insertable struct for registering a user.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email_address: &'a str,
    pub hashed_password: &'a str,
    pub two_factor_secret: &'a str,
    pub email_address_verification_token: &'a str,
    pub user_account_status: &'a str,
    pub user_account_status_explanation: &'a str,
    pub service_role: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub birthday: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Changeset applied by a whole-record user update.
///
/// `None` clears nullable columns rather than leaving them untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserChanges<'a> {
    pub username: &'a str,
    pub hashed_password: &'a str,
    pub two_factor_secret: &'a str,
    pub two_factor_secret_verified_at: Option<DateTime<Utc>>,
    pub requires_password_change: bool,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub birthday: Option<NaiveDate>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl<'a> UserChanges<'a> {
    pub(crate) fn from_user(user: &'a User, now: DateTime<Utc>) -> Self {
        Self {
            username: &user.username,
            hashed_password: &user.hashed_password,
            two_factor_secret: &user.two_factor_secret,
            two_factor_secret_verified_at: user.two_factor_secret_verified_at,
            requires_password_change: user.requires_password_change,
            first_name: &user.first_name,
            last_name: &user.last_name,
            birthday: user.birthday,
            last_updated_at: Some(now),
        }
    }
}

// ---------------------------------------------------------------------------
// Households and memberships
// ---------------------------------------------------------------------------

/// Row struct for reading from the households table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = households)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct HouseholdRow {
    pub id: String,
    pub name: String,
    pub billing_status: String,
    pub contact_phone: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub belongs_to_user: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<HouseholdRow> for Household {
    type Error = RepositoryError;

    fn try_from(row: HouseholdRow) -> Result<Self, Self::Error> {
        Ok(Self {
            billing_status: parse_text(&row.billing_status)?,
            id: row.id,
            name: row.name,
            contact: HouseholdContact {
                contact_phone: row.contact_phone,
                address_line_1: row.address_line_1,
                address_line_2: row.address_line_2,
                city: row.city,
                state: row.state,
                zip_code: row.zip_code,
                country: row.country,
                latitude: row.latitude,
                longitude: row.longitude,
            },
            belongs_to_user: row.belongs_to_user,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
            members: Vec::new(),
        })
    }
}

/// Insertable struct for creating a household.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = households)]
pub(crate) struct NewHouseholdRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub billing_status: &'a str,
    pub contact_phone: &'a str,
    pub address_line_1: &'a str,
    pub address_line_2: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub zip_code: &'a str,
    pub country: &'a str,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub belongs_to_user: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewHouseholdRow<'a> {
    pub(crate) fn new(
        id: &'a str,
        name: &'a str,
        contact: &'a HouseholdContact,
        owner: &'a str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            billing_status: HouseholdBillingStatus::Unpaid.as_str(),
            contact_phone: &contact.contact_phone,
            address_line_1: &contact.address_line_1,
            address_line_2: &contact.address_line_2,
            city: &contact.city,
            state: &contact.state,
            zip_code: &contact.zip_code,
            country: &contact.country,
            latitude: contact.latitude,
            longitude: contact.longitude,
            belongs_to_user: owner,
            created_at: now,
        }
    }
}

/// Changeset for the editable household fields.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = households)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct HouseholdChanges<'a> {
    pub name: &'a str,
    pub contact_phone: &'a str,
    pub address_line_1: &'a str,
    pub address_line_2: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub zip_code: &'a str,
    pub country: &'a str,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl<'a> HouseholdChanges<'a> {
    pub(crate) fn from_household(household: &'a Household, now: DateTime<Utc>) -> Self {
        let contact = &household.contact;
        Self {
            name: &household.name,
            contact_phone: &contact.contact_phone,
            address_line_1: &contact.address_line_1,
            address_line_2: &contact.address_line_2,
            city: &contact.city,
            state: &contact.state,
            zip_code: &contact.zip_code,
            country: &contact.country,
            latitude: contact.latitude,
            longitude: contact.longitude,
            last_updated_at: Some(now),
        }
    }
}

/// Row struct for reading household memberships.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = household_user_memberships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MembershipRow {
    pub id: String,
    pub belongs_to_household: String,
    pub belongs_to_user: String,
    pub household_role: String,
    pub default_household: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<MembershipRow> for HouseholdUserMembership {
    type Error = RepositoryError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Self {
            household_role: parse_text(&row.household_role)?,
            id: row.id,
            belongs_to_user: row.belongs_to_user,
            belongs_to_household: row.belongs_to_household,
            default_household: row.default_household,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

/// Insertable struct for adding a user to a household.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = household_user_memberships)]
pub(crate) struct NewMembershipRow<'a> {
    pub id: &'a str,
    pub belongs_to_household: &'a str,
    pub belongs_to_user: &'a str,
    pub household_role: &'a str,
    pub default_household: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

/// Row struct for reading household invitations.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = household_invitations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InvitationRow {
    pub id: String,
    pub destination_household: String,
    pub to_email: String,
    pub to_user: Option<String>,
    pub to_name: String,
    pub from_user: String,
    pub status: String,
    pub note: String,
    pub status_note: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<InvitationRow> for HouseholdInvitation {
    type Error = RepositoryError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: parse_text(&row.status)?,
            id: row.id,
            destination_household: row.destination_household,
            to_email: row.to_email,
            to_user: row.to_user,
            to_name: row.to_name,
            from_user: row.from_user,
            note: row.note,
            status_note: row.status_note,
            token: row.token,
            expires_at: row.expires_at,
            created_at: row.created_at,
            last_updated_at: row.last_updated_at,
            archived_at: row.archived_at,
        })
    }
}

/// Insertable struct for issuing an invitation.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = household_invitations)]
pub(crate) struct NewInvitationRow<'a> {
    pub id: &'a str,
    pub destination_household: &'a str,
    pub to_email: &'a str,
    pub to_user: Option<&'a str>,
    pub to_name: &'a str,
    pub from_user: &'a str,
    pub status: &'a str,
    pub note: &'a str,
    pub token: &'a str,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

/// Row struct for reading audit log entries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = audit_log_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AuditLogEntryRow {
    pub id: String,
    pub resource_type: String,
    pub relevant_id: String,
    pub event_type: String,
    pub changes: serde_json::Value,
    pub belongs_to_user: Option<String>,
    pub belongs_to_household: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuditLogEntryRow> for AuditLogEntry {
    type Error = RepositoryError;

    fn try_from(row: AuditLogEntryRow) -> Result<Self, Self::Error> {
        let changes: AuditLogChanges = serde_json::from_value(row.changes).map_err(|err| {
            tracing::warn!(entry = %row.id, error = %err, "stored audit changes are malformed");
            RepositoryError::database(format!("malformed audit changes: {err}"))
        })?;
        Ok(Self {
            event_type: parse_text(&row.event_type)?,
            id: row.id,
            resource_type: row.resource_type,
            relevant_id: row.relevant_id,
            changes,
            belongs_to_user: row.belongs_to_user,
            belongs_to_household: row.belongs_to_household,
            created_at: row.created_at,
        })
    }
}

/// Insertable struct for appending an audit log entry.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_log_entries)]
pub(crate) struct NewAuditLogEntryRow<'a> {
    pub id: &'a str,
    pub resource_type: &'a str,
    pub relevant_id: &'a str,
    pub event_type: &'a str,
    pub changes: serde_json::Value,
    pub belongs_to_user: Option<&'a str>,
    pub belongs_to_household: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    //! Row conversion coverage; database round trips live in `backend/tests`.

    use super::*;
    use crate::domain::{HouseholdRole, UserAccountStatus};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn user_row() -> UserRow {
        UserRow {
            id: "u-1".to_owned(),
            username: "alice".to_owned(),
            email_address: "alice@example.com".to_owned(),
            hashed_password: "hashed".to_owned(),
            two_factor_secret: "secret".to_owned(),
            two_factor_secret_verified_at: None,
            email_address_verified_at: None,
            requires_password_change: false,
            password_last_changed_at: None,
            user_account_status: "unverified".to_owned(),
            user_account_status_explanation: String::new(),
            service_role: "service_user".to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            birthday: None,
            created_at: Utc::now(),
            last_updated_at: None,
            archived_at: None,
        }
    }

    #[rstest]
    fn user_rows_parse_status_and_role(user_row: UserRow) {
        let user = User::try_from(user_row).expect("valid row");

        assert_eq!(user.account_status, UserAccountStatus::Unverified);
        assert_eq!(user.username, "alice");
    }

    #[rstest]
    fn unknown_stored_status_is_a_database_error(mut user_row: UserRow) {
        user_row.user_account_status = "suspended".to_owned();

        let err = User::try_from(user_row).expect_err("unknown status");

        assert!(matches!(err, RepositoryError::Database { .. }));
    }

    #[rstest]
    fn membership_rows_parse_roles() {
        let row = MembershipRow {
            id: "m-1".to_owned(),
            belongs_to_household: "h-1".to_owned(),
            belongs_to_user: "u-1".to_owned(),
            household_role: "household_admin".to_owned(),
            default_household: true,
            created_at: Utc::now(),
            last_updated_at: None,
            archived_at: None,
        };

        let membership = HouseholdUserMembership::try_from(row).expect("valid row");

        assert_eq!(membership.household_role, HouseholdRole::HouseholdAdmin);
        assert!(membership.default_household);
    }

    #[rstest]
    #[case(json!({ "name": { "oldValue": "a", "newValue": "b" } }), true)]
    #[case(json!({ "name": "not a change log" }), false)]
    #[case(json!([1, 2, 3]), false)]
    fn audit_rows_decode_change_maps(#[case] changes: serde_json::Value, #[case] valid: bool) {
        let row = AuditLogEntryRow {
            id: "a-1".to_owned(),
            resource_type: "households".to_owned(),
            relevant_id: "h-1".to_owned(),
            event_type: "updated".to_owned(),
            changes,
            belongs_to_user: None,
            belongs_to_household: Some("h-1".to_owned()),
            created_at: Utc::now(),
        };

        assert_eq!(AuditLogEntry::try_from(row).is_ok(), valid);
    }

    #[rstest]
    fn new_households_start_unpaid() {
        let contact = HouseholdContact::default();
        let row = NewHouseholdRow::new("h-1", "The Den", &contact, "u-1", Utc::now());

        assert_eq!(row.billing_status, "unpaid");
        assert_eq!(row.belongs_to_user, "u-1");
    }
}
