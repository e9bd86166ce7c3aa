//! Roles, permissions and the checkers stored in a session context.
//!
//! Household roles grant permissions inside one household; service roles
//! grant permissions across the whole service. Checkers are plain values so
//! a session snapshot can be cloned and shared between request handlers.

use serde::{Deserialize, Serialize};

use super::text_enum::text_enum;

text_enum! {
    /// Service-wide role carried by every user.
    pub enum ServiceRole {
        /// Regular account.
        ServiceUser => "service_user",
        /// Operator account with service-level privileges.
        ServiceAdmin => "service_admin",
    }
}

text_enum! {
    /// Role a user holds within one household.
    pub enum HouseholdRole {
        /// Participates in planning and voting.
        HouseholdMember => "household_member",
        /// Manages the household, its members and its integrations.
        HouseholdAdmin => "household_admin",
    }
}

text_enum! {
    /// Named capability checked before an action is taken.
    pub enum Permission {
        UpdateHousehold => "update.household",
        ArchiveHousehold => "archive.household",
        AddHouseholdMember => "household.add.member",
        ModifyHouseholdMembership => "household.membership.modify",
        RemoveHouseholdMember => "remove_member.household",
        TransferHousehold => "transfer.household",
        InviteUserToHousehold => "invite.household",
        CreateWebhooks => "create.webhooks",
        ReadWebhooks => "read.webhooks",
        UpdateWebhooks => "update.webhooks",
        ArchiveWebhooks => "archive.webhooks",
        CreateWebhookTriggerEvents => "create.webhook_trigger_events",
        ArchiveWebhookTriggerEvents => "archive.webhook_trigger_events",
        ReadAuditLogEntries => "read.audit_log_entries",
        CreateMealPlans => "create.meal_plans",
        ReadMealPlans => "read.meal_plans",
        UpdateMealPlans => "update.meal_plans",
        ArchiveMealPlans => "archive.meal_plans",
        CreateMealPlanOptionVotes => "create.meal_plan_option_votes",
        ReadMealPlanOptionVotes => "read.meal_plan_option_votes",
        UpdateUserStatus => "update.user_status",
        ReadUser => "read.user",
        SearchUser => "search.user",
        ArchiveServiceSettings => "archive.service_settings",
        CreateValidInstruments => "create.valid_instruments",
        UpdateValidInstruments => "update.valid_instruments",
        ArchiveValidInstruments => "archive.valid_instruments",
    }
}

const HOUSEHOLD_MEMBER_PERMISSIONS: &[Permission] = &[
    Permission::ReadWebhooks,
    Permission::CreateMealPlans,
    Permission::ReadMealPlans,
    Permission::CreateMealPlanOptionVotes,
    Permission::ReadMealPlanOptionVotes,
];

const HOUSEHOLD_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::UpdateHousehold,
    Permission::ArchiveHousehold,
    Permission::AddHouseholdMember,
    Permission::ModifyHouseholdMembership,
    Permission::RemoveHouseholdMember,
    Permission::TransferHousehold,
    Permission::InviteUserToHousehold,
    Permission::CreateWebhooks,
    Permission::UpdateWebhooks,
    Permission::ArchiveWebhooks,
    Permission::CreateWebhookTriggerEvents,
    Permission::ArchiveWebhookTriggerEvents,
    Permission::ReadAuditLogEntries,
    Permission::UpdateMealPlans,
    Permission::ArchiveMealPlans,
];

const SERVICE_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::UpdateUserStatus,
    Permission::ReadUser,
    Permission::SearchUser,
    Permission::ArchiveServiceSettings,
    Permission::CreateValidInstruments,
    Permission::UpdateValidInstruments,
    Permission::ArchiveValidInstruments,
];

impl HouseholdRole {
    /// Whether this role grants `permission`.
    ///
    /// Admins hold every member permission as well as their own.
    pub fn grants(self, permission: Permission) -> bool {
        let member = HOUSEHOLD_MEMBER_PERMISSIONS.contains(&permission);
        match self {
            Self::HouseholdMember => member,
            Self::HouseholdAdmin => member || HOUSEHOLD_ADMIN_PERMISSIONS.contains(&permission),
        }
    }
}

impl ServiceRole {
    /// Whether this role grants `permission` at service level.
    pub fn grants(self, permission: Permission) -> bool {
        match self {
            Self::ServiceUser => false,
            Self::ServiceAdmin => SERVICE_ADMIN_PERMISSIONS.contains(&permission),
        }
    }
}

/// Answers permission questions for one household membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdRolePermissionsChecker {
    role: HouseholdRole,
}

impl HouseholdRolePermissionsChecker {
    /// Checker for a membership holding `role`.
    pub fn new(role: HouseholdRole) -> Self {
        Self { role }
    }

    /// Role the membership holds.
    pub fn role(&self) -> HouseholdRole {
        self.role
    }

    /// Whether the membership may perform `permission`.
    pub fn can(&self, permission: Permission) -> bool {
        self.role.grants(permission)
    }
}

/// Answers permission questions at service level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRolePermissionChecker {
    role: ServiceRole,
}

impl ServiceRolePermissionChecker {
    /// Checker for a user holding `role`.
    pub fn new(role: ServiceRole) -> Self {
        Self { role }
    }

    /// Service role the user holds.
    pub fn role(&self) -> ServiceRole {
        self.role
    }

    /// Whether the user administers the whole service.
    pub fn is_service_admin(&self) -> bool {
        self.role == ServiceRole::ServiceAdmin
    }

    /// Whether the requester may perform `permission` anywhere.
    pub fn can(&self, permission: Permission) -> bool {
        self.role.grants(permission)
    }
}

#[cfg(test)]
mod tests {
    //! Role grants.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Permission::ReadMealPlans, true)]
    #[case(Permission::CreateMealPlanOptionVotes, true)]
    #[case(Permission::TransferHousehold, false)]
    #[case(Permission::ArchiveWebhooks, false)]
    fn members_hold_planning_permissions_only(#[case] permission: Permission, #[case] held: bool) {
        let checker = HouseholdRolePermissionsChecker::new(HouseholdRole::HouseholdMember);

        assert_eq!(checker.can(permission), held);
    }

    #[rstest]
    fn admins_hold_every_household_permission() {
        let checker = HouseholdRolePermissionsChecker::new(HouseholdRole::HouseholdAdmin);

        for permission in HOUSEHOLD_MEMBER_PERMISSIONS
            .iter()
            .chain(HOUSEHOLD_ADMIN_PERMISSIONS)
        {
            assert!(checker.can(*permission), "{permission} should be granted");
        }
        assert!(!checker.can(Permission::UpdateUserStatus));
    }

    #[rstest]
    #[case(ServiceRole::ServiceUser, false)]
    #[case(ServiceRole::ServiceAdmin, true)]
    fn service_permissions_follow_role(#[case] role: ServiceRole, #[case] admin: bool) {
        let checker = ServiceRolePermissionChecker::new(role);

        assert_eq!(checker.is_service_admin(), admin);
        assert_eq!(checker.can(Permission::SearchUser), admin);
        assert!(!checker.can(Permission::UpdateHousehold));
    }

    #[rstest]
    fn permission_names_round_trip_through_text() {
        assert_eq!(
            "household.membership.modify".parse::<Permission>(),
            Ok(Permission::ModifyHouseholdMembership)
        );
        assert_eq!(HouseholdRole::HouseholdAdmin.as_str(), "household_admin");
    }
}
