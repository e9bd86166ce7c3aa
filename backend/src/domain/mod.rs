//! Domain types for household meal planning.
//!
//! Purpose: define the entities the persistence layer reads and writes, the
//! authorization model built from them, and the voting engine that resolves
//! meal plan options. Nothing in here touches the database; adapters live
//! under `outbound` and implement the traits in [`ports`].
//!
//! Public surface:
//! - Users, households, memberships and invitations.
//! - Meal plans, events, options and votes; recipes, meals and catalogue
//!   entries persisted through the standard repository surface.
//! - Webhooks with their trigger events, and audit log entries.
//! - [`SessionContextData`] with household and service permission checkers.
//! - [`voting`]: Schulze tabulation and the tie-break RNG.

pub mod audit_log;
pub mod authorization;
pub mod households;
pub mod ids;
pub mod invitations;
pub mod meal_plans;
pub mod notifications;
pub mod ports;
pub mod recipes;
pub mod session;
mod text_enum;
pub mod users;
pub mod valid_instruments;
pub mod voting;
pub mod webhooks;

pub use self::audit_log::{
    AuditLogChanges, AuditLogEntry, AuditLogEntryCreationInput, AuditLogEventType, AuditOwner,
    ChangeLog, resource_types,
};
pub use self::authorization::{
    HouseholdRole, HouseholdRolePermissionsChecker, Permission, ServiceRole,
    ServiceRolePermissionChecker,
};
pub use self::households::{
    Household, HouseholdBillingStatus, HouseholdContact, HouseholdCreationInput, HouseholdMember,
    HouseholdOwnershipTransferInput, HouseholdUserMembership, ModifyUserPermissionsInput,
    choose_default_membership,
};
pub use self::ids::{
    IdGenerator, RandomSecretGenerator, SECRET_BYTE_LENGTH, SecretGenerator, UuidIdGenerator,
};
pub use self::invitations::{
    ACCEPTED_DURING_REGISTRATION_NOTE, HouseholdInvitation, HouseholdInvitationCreationInput,
    HouseholdInvitationResponse, HouseholdInvitationStatus,
};
pub use self::meal_plans::{
    MealName, MealPlan, MealPlanCreationInput, MealPlanEvent, MealPlanEventCreationInput,
    MealPlanOption, MealPlanOptionCreationInput, MealPlanOptionVote,
    MealPlanOptionVoteCreationInput, MealPlanOptionVotesCreationInput, MealPlanStatus,
};
pub use self::notifications::{
    UserNotification, UserNotificationCreationInput, UserNotificationStatus,
};
pub use self::recipes::{
    Meal, MealCreationInput, Recipe, RecipeCreationInput, RecipeRating,
    RecipeRatingCreationInput, RecipeStep, RecipeStepCreationInput,
};
pub use self::session::{RequesterInfo, SessionContextData};
pub use self::text_enum::UnknownValue;
pub use self::users::{
    User, UserAccountStatus, UserAccountStatusUpdateInput, UserDetailsUpdateInput,
    UserRegistrationInput, fallback_household_name,
};
pub use self::valid_instruments::{ValidInstrument, ValidInstrumentCreationInput};
pub use self::voting::{
    Ballot, OptionResolution, Standing, TieBreakSource, TieBreaker, resolve_options,
    schulze_standings,
};
pub use self::webhooks::{
    Webhook, WebhookCreationInput, WebhookEvent, WebhookTriggerEvent,
    WebhookTriggerEventCreationInput,
};
