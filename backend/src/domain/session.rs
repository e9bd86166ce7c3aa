//! Per-request authorization snapshot assembled from persistent state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::authorization::{HouseholdRolePermissionsChecker, ServiceRolePermissionChecker};
use super::households::HouseholdUserMembership;
use super::users::{User, UserAccountStatus};

/// Who is making the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequesterInfo {
    pub user_id: String,
    pub username: String,
    pub email_address: String,
    pub account_status: UserAccountStatus,
    pub account_status_explanation: String,
    pub service_permissions: ServiceRolePermissionChecker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContextData {
    pub requester: RequesterInfo,
    /// Household id to the requester's role checker in that household.
    pub household_permissions: HashMap<String, HouseholdRolePermissionsChecker>,
    /// Default household; empty when the user has none.
    pub active_household_id: String,
}

impl SessionContextData {
    /// Build the snapshot for `user` from their non-archived memberships.
    ///
    /// The first membership flagged default becomes the active household.
    pub fn assemble(user: &User, memberships: &[HouseholdUserMembership]) -> Self {
        let household_permissions = memberships
            .iter()
            .map(|m| {
                (
                    m.belongs_to_household.clone(),
                    HouseholdRolePermissionsChecker::new(m.household_role),
                )
            })
            .collect();

        let active_household_id = memberships
            .iter()
            .find(|m| m.default_household)
            .map(|m| m.belongs_to_household.clone())
            .unwrap_or_default();

        Self {
            requester: RequesterInfo {
                user_id: user.id.clone(),
                username: user.username.clone(),
                email_address: user.email_address.clone(),
                account_status: user.account_status,
                account_status_explanation: user.account_status_explanation.clone(),
                service_permissions: ServiceRolePermissionChecker::new(user.service_role),
            },
            household_permissions,
            active_household_id,
        }
    }

    /// Whether the requester has no default household.
    pub fn lacks_active_household(&self) -> bool {
        self.active_household_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::authorization::{HouseholdRole, Permission, ServiceRole};
    use chrono::Utc;
    use rstest::{fixture, rstest};

    #[fixture]
    fn user() -> User {
        User {
            id: "u-1".to_owned(),
            username: "alice".to_owned(),
            email_address: "a@x".to_owned(),
            hashed_password: "hash".to_owned(),
            two_factor_secret: "secret".to_owned(),
            two_factor_secret_verified_at: None,
            email_address_verified_at: None,
            requires_password_change: false,
            password_last_changed_at: None,
            account_status: UserAccountStatus::Good,
            account_status_explanation: String::new(),
            service_role: ServiceRole::ServiceUser,
            first_name: String::new(),
            last_name: String::new(),
            birthday: None,
            created_at: Utc::now(),
            last_updated_at: None,
            archived_at: None,
        }
    }

    fn membership(household: &str, role: HouseholdRole, default_household: bool) -> HouseholdUserMembership {
        HouseholdUserMembership {
            id: format!("m-{household}"),
            belongs_to_user: "u-1".to_owned(),
            belongs_to_household: household.to_owned(),
            household_role: role,
            default_household,
            created_at: Utc::now(),
            last_updated_at: None,
            archived_at: None,
        }
    }

    #[rstest]
    fn maps_each_household_to_its_role(user: User) {
        let memberships = [
            membership("h-1", HouseholdRole::HouseholdAdmin, true),
            membership("h-2", HouseholdRole::HouseholdMember, false),
        ];

        let session = SessionContextData::assemble(&user, &memberships);

        assert_eq!(session.active_household_id, "h-1");
        assert_eq!(session.household_permissions.len(), 2);
        let admin = session.household_permissions.get("h-1").expect("h-1 checker");
        let member = session.household_permissions.get("h-2").expect("h-2 checker");
        assert!(admin.can(Permission::TransferHousehold));
        assert!(!member.can(Permission::TransferHousehold));
        assert_eq!(session.requester.username, "alice");
        assert!(!session.requester.service_permissions.is_service_admin());
    }

    #[rstest]
    fn missing_default_leaves_active_household_empty(user: User) {
        let memberships = [membership("h-1", HouseholdRole::HouseholdMember, false)];

        let session = SessionContextData::assemble(&user, &memberships);

        assert!(session.lacks_active_household());
        assert_eq!(session.household_permissions.len(), 1);
    }
}
