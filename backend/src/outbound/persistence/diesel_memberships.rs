//! Household memberships: session context assembly, default-household
//! bookkeeping, role changes, ownership transfer and member removal.
//!
//! Every user keeps exactly one live membership flagged as their default.
//! Operations that move or remove memberships repair the flag inside the
//! same transaction, and commit once at the end.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::{debug, info, warn};

use super::audit_log_writer::write_audit_log_entry;
use super::diesel_helpers::{QueryExecutor, rename_conflict, require_rows};
use super::diesel_households::create_household_for_user;
use super::models::{MembershipRow, NewMembershipRow, UserRow};
use super::querier::Querier;
use super::schema::{household_user_memberships, households, users};
use crate::domain::ports::{HouseholdMembershipRepository, RepositoryError, Validate, require_id};
use crate::domain::{
    AuditLogEntryCreationInput, AuditOwner, HouseholdContact, HouseholdOwnershipTransferInput,
    HouseholdRole, HouseholdUserMembership, IdGenerator, ModifyUserPermissionsInput,
    SessionContextData, User, choose_default_membership, fallback_household_name, resource_types,
};

fn membership_owner(user_id: &str, household_id: &str) -> AuditOwner {
    AuditOwner {
        user: Some(user_id.to_owned()),
        household: Some(household_id.to_owned()),
    }
}

/// Insert a membership and its audit entry on `conn`.
pub(super) async fn insert_membership<C: QueryExecutor>(
    conn: &mut C,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
    household_id: &str,
    user_id: &str,
    role: HouseholdRole,
    default_household: bool,
) -> Result<HouseholdUserMembership, RepositoryError> {
    let id = ids.new_id();
    let row: MembershipRow = diesel::insert_into(household_user_memberships::table)
        .values(NewMembershipRow {
            id: &id,
            belongs_to_household: household_id,
            belongs_to_user: user_id,
            household_role: role.as_str(),
            default_household,
            created_at: now,
        })
        .returning(MembershipRow::as_returning())
        .get_result(conn)
        .await
        .map_err(RepositoryError::from)
        .map_err(rename_conflict("household membership"))?;
    let membership = HouseholdUserMembership::try_from(row)?;

    write_audit_log_entry(
        conn,
        ids,
        now,
        AuditLogEntryCreationInput::created(
            resource_types::HOUSEHOLD_USER_MEMBERSHIPS,
            &membership.id,
        )
        .with_owner(membership_owner(user_id, household_id)),
    )
    .await?;
    Ok(membership)
}

/// Live memberships held by `user_id`, oldest first.
pub(super) async fn memberships_for_user<C: QueryExecutor>(
    conn: &mut C,
    user_id: &str,
) -> Result<Vec<HouseholdUserMembership>, RepositoryError> {
    let rows = household_user_memberships::table
        .filter(household_user_memberships::belongs_to_user.eq(user_id))
        .filter(household_user_memberships::archived_at.is_null())
        .order((
            household_user_memberships::created_at.asc(),
            household_user_memberships::id.asc(),
        ))
        .select(MembershipRow::as_select())
        .load::<MembershipRow>(conn)
        .await?;
    rows.into_iter().map(HouseholdUserMembership::try_from).collect()
}

/// Flag `membership_id` as the user's only default and audit the change.
async fn make_sole_default<C: QueryExecutor>(
    conn: &mut C,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
    membership: &HouseholdUserMembership,
) -> Result<(), RepositoryError> {
    diesel::update(
        household_user_memberships::table
            .filter(household_user_memberships::belongs_to_user.eq(&membership.belongs_to_user))
            .filter(household_user_memberships::archived_at.is_null()),
    )
    .set((
        household_user_memberships::default_household
            .eq(household_user_memberships::id.eq(&membership.id)),
        household_user_memberships::last_updated_at.eq(now),
    ))
    .execute(conn)
    .await?;

    write_audit_log_entry(
        conn,
        ids,
        now,
        AuditLogEntryCreationInput::updated(
            resource_types::HOUSEHOLD_USER_MEMBERSHIPS,
            &membership.id,
        )
        .with_owner(membership_owner(
            &membership.belongs_to_user,
            &membership.belongs_to_household,
        ))
        .with_change("default_household", membership.default_household, true),
    )
    .await?;
    Ok(())
}

/// Set a member's role and audit the change; fails when no live membership
/// matches.
async fn set_household_role<C: QueryExecutor>(
    conn: &mut C,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
    household_id: &str,
    user_id: &str,
    role: HouseholdRole,
) -> Result<(), RepositoryError> {
    let updated: Option<String> = diesel::update(
        household_user_memberships::table
            .filter(household_user_memberships::belongs_to_household.eq(household_id))
            .filter(household_user_memberships::belongs_to_user.eq(user_id))
            .filter(household_user_memberships::archived_at.is_null()),
    )
    .set((
        household_user_memberships::household_role.eq(role.as_str()),
        household_user_memberships::last_updated_at.eq(now),
    ))
    .returning(household_user_memberships::id)
    .get_result(conn)
    .await
    .optional()?;
    let membership_id =
        updated.ok_or_else(|| RepositoryError::not_found("household membership"))?;

    write_audit_log_entry(
        conn,
        ids,
        now,
        AuditLogEntryCreationInput::updated(
            resource_types::HOUSEHOLD_USER_MEMBERSHIPS,
            &membership_id,
        )
        .with_owner(membership_owner(user_id, household_id)),
    )
    .await?;
    Ok(())
}

#[async_trait]
impl HouseholdMembershipRepository for Querier {
    #[tracing::instrument(skip(self), err)]
    async fn build_session_context_data_for_user(
        &self,
        user_id: &str,
    ) -> Result<SessionContextData, RepositoryError> {
        require_id(user_id, "user id")?;

        let mut conn = self.pool.get().await?;
        let row = users::table
            .filter(users::id.eq(user_id))
            .filter(users::archived_at.is_null())
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("user"))?;
        let user = User::try_from(row)?;
        let memberships = memberships_for_user(&mut *conn, user_id).await?;

        let context = SessionContextData::assemble(&user, &memberships);
        if context.lacks_active_household() {
            warn!(
                user_id,
                memberships = memberships.len(),
                "user has no default household"
            );
        }
        Ok(context)
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_default_household_id_for_user(
        &self,
        user_id: &str,
    ) -> Result<String, RepositoryError> {
        require_id(user_id, "user id")?;

        let mut conn = self.pool.get().await?;
        household_user_memberships::table
            .filter(household_user_memberships::belongs_to_user.eq(user_id))
            .filter(household_user_memberships::default_household.eq(true))
            .filter(household_user_memberships::archived_at.is_null())
            .order(household_user_memberships::created_at.asc())
            .select(household_user_memberships::belongs_to_household)
            .first::<String>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("default household"))
    }

    #[tracing::instrument(skip(self), err)]
    async fn mark_household_as_user_default(
        &self,
        user_id: &str,
        household_id: &str,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        require_id(household_id, "household id")?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let memberships = memberships_for_user(conn, user_id).await?;
                let target = memberships
                    .iter()
                    .find(|m| m.belongs_to_household == household_id)
                    .ok_or_else(|| RepositoryError::not_found("household membership"))?;
                make_sole_default(conn, self.ids.as_ref(), now, target).await
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn user_is_member_of_household(
        &self,
        user_id: &str,
        household_id: &str,
    ) -> Result<bool, RepositoryError> {
        require_id(user_id, "user id")?;
        require_id(household_id, "household id")?;

        let mut conn = self.pool.get().await?;
        let found = household_user_memberships::table
            .filter(household_user_memberships::belongs_to_user.eq(user_id))
            .filter(household_user_memberships::belongs_to_household.eq(household_id))
            .filter(household_user_memberships::archived_at.is_null())
            .select(household_user_memberships::id)
            .first::<String>(&mut conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self, input), fields(new_role = %input.new_role), err)]
    async fn modify_user_permissions(
        &self,
        household_id: &str,
        user_id: &str,
        input: &ModifyUserPermissionsInput,
    ) -> Result<(), RepositoryError> {
        require_id(household_id, "household id")?;
        require_id(user_id, "user id")?;
        input.validate()?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                set_household_role(
                    conn,
                    self.ids.as_ref(),
                    now,
                    household_id,
                    user_id,
                    input.new_role,
                )
                .await
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(
        skip(self, input),
        fields(current_owner = %input.current_owner, new_owner = %input.new_owner),
        err
    )]
    async fn transfer_household_ownership(
        &self,
        household_id: &str,
        input: &HouseholdOwnershipTransferInput,
    ) -> Result<(), RepositoryError> {
        require_id(household_id, "household id")?;
        input.validate()?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let affected = diesel::update(
                    households::table
                        .filter(households::id.eq(household_id))
                        .filter(households::belongs_to_user.eq(&input.current_owner))
                        .filter(households::archived_at.is_null()),
                )
                .set((
                    households::belongs_to_user.eq(&input.new_owner),
                    households::last_updated_at.eq(now),
                ))
                .execute(conn)
                .await?;
                require_rows(affected, "household")?;

                write_audit_log_entry(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::updated(resource_types::HOUSEHOLDS, household_id)
                        .with_owner(membership_owner(&input.new_owner, household_id))
                        .with_change(
                            "belongs_to_user",
                            input.current_owner.as_str(),
                            input.new_owner.as_str(),
                        ),
                )
                .await?;

                set_household_role(
                    conn,
                    self.ids.as_ref(),
                    now,
                    household_id,
                    &input.new_owner,
                    HouseholdRole::HouseholdAdmin,
                )
                .await?;
                set_household_role(
                    conn,
                    self.ids.as_ref(),
                    now,
                    household_id,
                    &input.current_owner,
                    HouseholdRole::HouseholdMember,
                )
                .await?;
                info!(household_id, "household ownership transferred");
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn remove_user_from_household(
        &self,
        user_id: &str,
        household_id: &str,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        require_id(household_id, "household id")?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let archived: Option<String> = diesel::update(
                    household_user_memberships::table
                        .filter(household_user_memberships::belongs_to_user.eq(user_id))
                        .filter(household_user_memberships::belongs_to_household.eq(household_id))
                        .filter(household_user_memberships::archived_at.is_null()),
                )
                .set((
                    household_user_memberships::archived_at.eq(now),
                    household_user_memberships::last_updated_at.eq(now),
                    household_user_memberships::default_household.eq(false),
                ))
                .returning(household_user_memberships::id)
                .get_result(conn)
                .await
                .optional()?;
                let membership_id =
                    archived.ok_or_else(|| RepositoryError::not_found("household membership"))?;
                write_audit_log_entry(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::archived(
                        resource_types::HOUSEHOLD_USER_MEMBERSHIPS,
                        &membership_id,
                    )
                    .with_owner(membership_owner(user_id, household_id)),
                )
                .await?;

                let remaining = memberships_for_user(conn, user_id).await?;
                match choose_default_membership(&remaining) {
                    Some(membership) if membership.default_household => {
                        debug!(user_id, "default household unaffected");
                    }
                    Some(membership) => {
                        make_sole_default(conn, self.ids.as_ref(), now, membership).await?;
                    }
                    None => {
                        let household = create_household_for_user(
                            conn,
                            self.ids.as_ref(),
                            now,
                            &fallback_household_name(user_id),
                            &HouseholdContact::default(),
                            user_id,
                            true,
                        )
                        .await?;
                        info!(
                            user_id,
                            household_id = %household.id,
                            "created fallback household for removed user"
                        );
                    }
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }
}
