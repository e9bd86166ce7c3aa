//! Domain ports implemented by the persistence adapter.

mod macros;
pub(crate) use macros::define_port_error;

mod audit_log_repository;
mod household_invitation_repository;
mod household_membership_repository;
mod household_repository;
mod meal_plan_voting_repository;
mod repository;
mod user_repository;
mod webhook_repository;

pub use audit_log_repository::AuditLogRepository;
pub use household_invitation_repository::HouseholdInvitationRepository;
pub use household_membership_repository::HouseholdMembershipRepository;
pub use household_repository::HouseholdRepository;
pub use meal_plan_voting_repository::MealPlanVotingRepository;
pub use repository::{
    Record, Repository, RepositoryError, ScopeKey, Validate, require_id, require_text,
    with_deadline,
};
pub use user_repository::{USER_SEARCH_LIMIT, UserRepository};
pub use webhook_repository::WebhookRepository;
