//! PostgreSQL-backed `HouseholdRepository` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use pagination::{QueryFilter, QueryFilteredResult};
use tracing::info;

use super::audit_log_writer::write_audit_log_entry;
use super::diesel_helpers::{QueryExecutor, apply_time_bounds, load_page, require_rows};
use super::diesel_memberships::insert_membership;
use super::models::{HouseholdChanges, HouseholdRow, MembershipRow, NewHouseholdRow, UserRow};
use super::null_values::count_from_db;
use super::querier::Querier;
use super::schema::{household_user_memberships, households, users};
use crate::domain::ports::{HouseholdRepository, RepositoryError, Validate, require_id};
use crate::domain::{
    AuditLogEntryCreationInput, AuditOwner, Household, HouseholdContact, HouseholdCreationInput,
    HouseholdMember, HouseholdRole, HouseholdUserMembership, IdGenerator, User, resource_types,
};

fn household_owner(household: &Household) -> AuditOwner {
    AuditOwner {
        user: Some(household.belongs_to_user.clone()),
        household: Some(household.id.clone()),
    }
}

/// Insert a household owned by `owner` with an admin membership for them.
///
/// Writes one audit entry for the household and one for the membership.
pub(super) async fn create_household_for_user<C: QueryExecutor>(
    conn: &mut C,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
    name: &str,
    contact: &HouseholdContact,
    owner: &str,
    default_household: bool,
) -> Result<Household, RepositoryError> {
    let id = ids.new_id();
    let row: HouseholdRow = diesel::insert_into(households::table)
        .values(NewHouseholdRow::new(&id, name, contact, owner, now))
        .returning(HouseholdRow::as_returning())
        .get_result(conn)
        .await?;
    let household = Household::try_from(row)?;
    write_audit_log_entry(
        conn,
        ids,
        now,
        AuditLogEntryCreationInput::created(resource_types::HOUSEHOLDS, &household.id)
            .with_owner(household_owner(&household)),
    )
    .await?;

    insert_membership(
        conn,
        ids,
        now,
        &household.id,
        owner,
        HouseholdRole::HouseholdAdmin,
        default_household,
    )
    .await?;
    Ok(household)
}

/// Live members of a household with their accounts, oldest first.
async fn load_members<C: QueryExecutor>(
    conn: &mut C,
    household_id: &str,
) -> Result<Vec<HouseholdMember>, RepositoryError> {
    let rows = household_user_memberships::table
        .inner_join(users::table)
        .filter(household_user_memberships::belongs_to_household.eq(household_id))
        .filter(household_user_memberships::archived_at.is_null())
        .filter(users::archived_at.is_null())
        .order((
            household_user_memberships::created_at.asc(),
            household_user_memberships::id.asc(),
        ))
        .select((MembershipRow::as_select(), UserRow::as_select()))
        .load::<(MembershipRow, UserRow)>(conn)
        .await?;

    rows.into_iter()
        .map(|(membership, user)| {
            Ok(HouseholdMember {
                membership: HouseholdUserMembership::try_from(membership)?,
                user: User::try_from(user)?,
            })
        })
        .collect()
}

#[async_trait]
impl HouseholdRepository for Querier {
    #[tracing::instrument(skip(self), err)]
    async fn household_exists(&self, household_id: &str) -> Result<bool, RepositoryError> {
        require_id(household_id, "household id")?;

        let mut conn = self.pool.get().await?;
        let found = households::table
            .filter(households::id.eq(household_id))
            .filter(households::archived_at.is_null())
            .select(households::id)
            .first::<String>(&mut conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_household(&self, household_id: &str) -> Result<Household, RepositoryError> {
        require_id(household_id, "household id")?;

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let row = households::table
                    .filter(households::id.eq(household_id))
                    .filter(households::archived_at.is_null())
                    .select(HouseholdRow::as_select())
                    .first::<HouseholdRow>(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| RepositoryError::not_found("household"))?;
                let mut household = Household::try_from(row)?;
                household.members = load_members(conn, household_id).await?;
                Ok(household)
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self, filter), err)]
    async fn get_households(
        &self,
        user_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<Household>, RepositoryError> {
        require_id(user_id, "user id")?;
        let filter = self.effective_filter(filter);

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let live = || {
                    households::table
                        .filter(households::archived_at.is_null())
                        .filter(
                            households::id.eq_any(
                                household_user_memberships::table
                                    .filter(household_user_memberships::belongs_to_user.eq(user_id))
                                    .filter(household_user_memberships::archived_at.is_null())
                                    .select(household_user_memberships::belongs_to_household),
                            ),
                        )
                        .into_boxed()
                };
                let total: i64 = live().count().get_result(conn).await?;
                let filtered: i64 = apply_time_bounds!(live(), households, filter)
                    .count()
                    .get_result(conn)
                    .await?;
                let rows = load_page!(
                    apply_time_bounds!(live(), households, filter),
                    households,
                    HouseholdRow,
                    filter,
                    conn
                )?;
                let data = rows
                    .into_iter()
                    .map(Household::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(QueryFilteredResult::new(
                    data,
                    &filter,
                    count_from_db(filtered),
                    count_from_db(total),
                ))
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self, input), fields(owner = %input.belongs_to_user), err)]
    async fn create_household(
        &self,
        input: &HouseholdCreationInput,
    ) -> Result<Household, RepositoryError> {
        input.validate()?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let mut household = create_household_for_user(
                    conn,
                    self.ids.as_ref(),
                    now,
                    &input.name,
                    &input.contact,
                    &input.belongs_to_user,
                    false,
                )
                .await?;
                household.members = load_members(conn, &household.id).await?;
                info!(household_id = %household.id, "household created");
                Ok(household)
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self, updated), fields(household_id = %updated.id), err)]
    async fn update_household(&self, updated: &Household) -> Result<(), RepositoryError> {
        updated.validate()?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let affected = diesel::update(
                    households::table
                        .filter(households::id.eq(&updated.id))
                        .filter(households::archived_at.is_null()),
                )
                .set(HouseholdChanges::from_household(updated, now))
                .execute(conn)
                .await?;
                require_rows(affected, "household")?;
                write_audit_log_entry(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::updated(resource_types::HOUSEHOLDS, &updated.id)
                        .with_owner(household_owner(updated)),
                )
                .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn archive_household(
        &self,
        household_id: &str,
        user_id: &str,
    ) -> Result<(), RepositoryError> {
        require_id(household_id, "household id")?;
        require_id(user_id, "user id")?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let archived: Option<HouseholdRow> = diesel::update(
                    households::table
                        .filter(households::id.eq(household_id))
                        .filter(households::belongs_to_user.eq(user_id))
                        .filter(households::archived_at.is_null()),
                )
                .set((
                    households::archived_at.eq(now),
                    households::last_updated_at.eq(now),
                ))
                .returning(HouseholdRow::as_returning())
                .get_result(conn)
                .await
                .optional()?;
                let Some(row) = archived else {
                    return Ok(());
                };
                let household = Household::try_from(row)?;
                write_audit_log_entry(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::archived(resource_types::HOUSEHOLDS, &household.id)
                        .with_owner(household_owner(&household)),
                )
                .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }
}
