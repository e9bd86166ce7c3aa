//! PostgreSQL-backed `UserRepository` implementation.
//!
//! Registration creates the user, their own household and admin membership,
//! optionally accepts the invitation they registered from, and attaches
//! pending invitations sent to their email address. All of it commits or
//! rolls back together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use pagination::{QueryFilter, QueryFilteredResult};
use tracing::info;

use super::audit_log_writer::write_audit_log_entry;
use super::diesel_helpers::{QueryExecutor, apply_time_bounds, load_page, rename_conflict};
use super::diesel_households::create_household_for_user;
use super::diesel_invitations::{accept_invitation, attach_pending_invitations, find_open_invitation};
use super::models::{NewUserRow, UserChanges, UserRow};
use super::null_values::count_from_db;
use super::querier::Querier;
use super::schema::{household_user_memberships, users};
use crate::domain::ports::{
    RepositoryError, USER_SEARCH_LIMIT, UserRepository, Validate, require_id, require_text,
};
use crate::domain::{
    ACCEPTED_DURING_REGISTRATION_NOTE, AuditLogEntryCreationInput, AuditOwner, HouseholdContact,
    HouseholdInvitationResponse, IdGenerator, SECRET_BYTE_LENGTH, ServiceRole, User,
    UserAccountStatus, UserAccountStatusUpdateInput, UserDetailsUpdateInput,
    UserRegistrationInput, resource_types,
};

fn live_users<'a>() -> users::BoxedQuery<'a, Pg> {
    users::table.filter(users::archived_at.is_null()).into_boxed()
}

/// Escape `LIKE` wildcards so user input only ever matches literally.
fn like_prefix(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 1);
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

async fn write_user_audit<C: QueryExecutor>(
    conn: &mut C,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
    entry: AuditLogEntryCreationInput,
    user_id: &str,
) -> Result<(), RepositoryError> {
    write_audit_log_entry(conn, ids, now, entry.with_owner(AuditOwner::user(user_id))).await?;
    Ok(())
}

/// Columns whose previous value is recorded in the audit change-set.
#[derive(Debug, Clone, Copy)]
enum AuditedColumn {
    Username,
    EmailAddress,
    AccountStatus,
}

/// Current value of an audited column for a live user.
async fn current_value<C: QueryExecutor>(
    conn: &mut C,
    user_id: &str,
    column: AuditedColumn,
) -> Result<String, RepositoryError> {
    let query = live_users().filter(users::id.eq(user_id));
    let value = match column {
        AuditedColumn::Username => query.select(users::username).first::<String>(conn).await,
        AuditedColumn::EmailAddress => {
            query.select(users::email_address).first::<String>(conn).await
        }
        AuditedColumn::AccountStatus => {
            query.select(users::user_account_status).first::<String>(conn).await
        }
    };
    value.optional()?.ok_or_else(|| RepositoryError::not_found("user"))
}

/// Update columns of one live user and audit it, in one transaction.
///
/// The audit expression is evaluated before the update with the transaction
/// connection bound to `$conn`, so it can read previous values.
macro_rules! update_live_user {
    ($querier:ident, $user_id:expr, $now:expr, $values:expr, |$conn:ident| $audit:expr) => {{
        let mut pooled = $querier.pool.get().await?;
        pooled
            .transaction::<_, RepositoryError, _>(|tx| {
                async move {
                    let audit = {
                        let $conn = &mut *tx;
                        $audit
                    };
                    let affected = diesel::update(
                        users::table
                            .filter(users::id.eq($user_id))
                            .filter(users::archived_at.is_null()),
                    )
                    .set(($values, users::last_updated_at.eq($now)))
                    .execute(tx)
                    .await
                    .map_err(RepositoryError::from)
                    .map_err(rename_conflict("user"))?;
                    if affected == 0 {
                        return Err(RepositoryError::not_found("user"));
                    }
                    write_user_audit(tx, $querier.ids.as_ref(), $now, audit, $user_id).await
                }
                .scope_boxed()
            })
            .await
    }};
}

impl Querier {
    async fn fetch_user(&self, query: users::BoxedQuery<'_, Pg>) -> Result<User, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = query
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("user"))?;
        User::try_from(row)
    }
}

#[async_trait]
impl UserRepository for Querier {
    #[tracing::instrument(skip(self), err)]
    async fn user_exists(&self, user_id: &str) -> Result<bool, RepositoryError> {
        require_id(user_id, "user id")?;

        let mut conn = self.pool.get().await?;
        let found = live_users()
            .filter(users::id.eq(user_id))
            .select(users::id)
            .first::<String>(&mut conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_user(&self, user_id: &str) -> Result<User, RepositoryError> {
        require_id(user_id, "user id")?;
        self.fetch_user(
            live_users()
                .filter(users::id.eq(user_id))
                .filter(users::two_factor_secret_verified_at.is_not_null()),
        )
        .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_user_by_username(&self, username: &str) -> Result<User, RepositoryError> {
        require_text(username, "username")?;
        self.fetch_user(live_users().filter(users::username.eq(username)))
            .await
    }

    #[tracing::instrument(skip(self, email_address), err)]
    async fn get_user_by_email(&self, email_address: &str) -> Result<User, RepositoryError> {
        require_text(email_address, "email address")?;
        self.fetch_user(live_users().filter(users::email_address.eq(email_address)))
            .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_admin_user_by_username(&self, username: &str) -> Result<User, RepositoryError> {
        require_text(username, "username")?;
        self.fetch_user(
            live_users()
                .filter(users::username.eq(username))
                .filter(users::service_role.eq(ServiceRole::ServiceAdmin.as_str()))
                .filter(users::two_factor_secret_verified_at.is_not_null()),
        )
        .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_user_with_unverified_two_factor_secret(
        &self,
        user_id: &str,
    ) -> Result<User, RepositoryError> {
        require_id(user_id, "user id")?;
        self.fetch_user(
            live_users()
                .filter(users::id.eq(user_id))
                .filter(users::two_factor_secret_verified_at.is_null()),
        )
        .await
    }

    #[tracing::instrument(skip(self, token), err)]
    async fn get_user_by_email_address_verification_token(
        &self,
        token: &str,
    ) -> Result<User, RepositoryError> {
        require_text(token, "email address verification token")?;
        self.fetch_user(live_users().filter(users::email_address_verification_token.eq(token)))
            .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn search_for_users_by_username(
        &self,
        username_query: &str,
    ) -> Result<Vec<User>, RepositoryError> {
        require_text(username_query, "username query")?;

        let mut conn = self.pool.get().await?;
        let rows = live_users()
            .filter(users::username.ilike(like_prefix(username_query)))
            .order(users::username.asc())
            .limit(USER_SEARCH_LIMIT)
            .select(UserRow::as_select())
            .load::<UserRow>(&mut conn)
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    #[tracing::instrument(skip(self, filter), err)]
    async fn get_users(
        &self,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<User>, RepositoryError> {
        let filter = self.effective_filter(filter);

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let total: i64 = live_users().count().get_result(conn).await?;
                let filtered: i64 = apply_time_bounds!(live_users(), users, filter)
                    .count()
                    .get_result(conn)
                    .await?;
                let rows = load_page!(
                    apply_time_bounds!(live_users(), users, filter),
                    users,
                    UserRow,
                    filter,
                    conn
                )?;
                let data = rows
                    .into_iter()
                    .map(User::try_from)
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

    #[tracing::instrument(skip(self, input), fields(username = %input.username), err)]
    async fn create_user(&self, input: &UserRegistrationInput) -> Result<User, RepositoryError> {
        input.validate()?;
        let user_id = self.ids.new_id();
        let verification_token = self.secrets.generate_base64_secret(SECRET_BYTE_LENGTH);
        let household_name = input.household_name();
        let invitation = input.invitation();
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let row: UserRow = diesel::insert_into(users::table)
                    .values(NewUserRow {
                        id: &user_id,
                        username: &input.username,
                        email_address: &input.email_address,
                        hashed_password: &input.hashed_password,
                        two_factor_secret: &input.two_factor_secret,
                        email_address_verification_token: &verification_token,
                        user_account_status: UserAccountStatus::Unverified.as_str(),
                        user_account_status_explanation: "",
                        service_role: ServiceRole::ServiceUser.as_str(),
                        first_name: &input.first_name,
                        last_name: &input.last_name,
                        birthday: input.birthday,
                        created_at: now,
                    })
                    .returning(UserRow::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(RepositoryError::from)
                    .map_err(rename_conflict("user"))?;
                let user = User::try_from(row)?;
                write_user_audit(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::created(resource_types::USERS, &user.id),
                    &user.id,
                )
                .await?;

                create_household_for_user(
                    conn,
                    self.ids.as_ref(),
                    now,
                    &household_name,
                    &HouseholdContact::default(),
                    &user.id,
                    invitation.is_none(),
                )
                .await?;

                if let Some((token, household_id)) = invitation {
                    let invitation_id =
                        find_open_invitation(conn, now, &user.email_address, token, household_id)
                            .await?;
                    accept_invitation(
                        conn,
                        self.ids.as_ref(),
                        now,
                        &invitation_id,
                        &HouseholdInvitationResponse {
                            token: token.to_owned(),
                            note: ACCEPTED_DURING_REGISTRATION_NOTE.to_owned(),
                        },
                        Some(&user.id),
                        true,
                    )
                    .await?;
                }

                let attached =
                    attach_pending_invitations(conn, now, &user.email_address, &user.id).await?;
                info!(
                    user_id = %user.id,
                    invited = invitation.is_some(),
                    attached,
                    "user registered"
                );
                Ok(user)
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self, updated), fields(user_id = %updated.id), err)]
    async fn update_user(&self, updated: &User) -> Result<(), RepositoryError> {
        updated.validate()?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let affected = diesel::update(
                    users::table
                        .filter(users::id.eq(&updated.id))
                        .filter(users::archived_at.is_null()),
                )
                .set(UserChanges::from_user(updated, now))
                .execute(conn)
                .await
                .map_err(RepositoryError::from)
                .map_err(rename_conflict("user"))?;
                if affected == 0 {
                    return Err(RepositoryError::not_found("user"));
                }
                write_user_audit(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::updated(resource_types::USERS, &updated.id),
                    &updated.id,
                )
                .await
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn update_user_username(
        &self,
        user_id: &str,
        new_username: &str,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        require_text(new_username, "username")?;
        let now = self.now();

        update_live_user!(self, user_id, now, users::username.eq(new_username), |conn| {
            let old = current_value(conn, user_id, AuditedColumn::Username).await?;
            AuditLogEntryCreationInput::updated(resource_types::USERS, user_id)
                .with_change("username", old, new_username)
        })
    }

    #[tracing::instrument(skip(self, new_email_address), err)]
    async fn update_user_email_address(
        &self,
        user_id: &str,
        new_email_address: &str,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        require_text(new_email_address, "email address")?;
        let now = self.now();

        update_live_user!(
            self,
            user_id,
            now,
            (
                users::email_address.eq(new_email_address),
                users::email_address_verified_at.eq(None::<DateTime<Utc>>),
            ),
            |conn| {
                let old = current_value(conn, user_id, AuditedColumn::EmailAddress).await?;
                AuditLogEntryCreationInput::updated(resource_types::USERS, user_id)
                    .with_change("email_address", old, new_email_address)
            }
        )
    }

    #[tracing::instrument(skip(self, input), err)]
    async fn update_user_details(
        &self,
        user_id: &str,
        input: &UserDetailsUpdateInput,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        input.validate()?;
        let now = self.now();

        update_live_user!(
            self,
            user_id,
            now,
            (
                users::first_name.eq(&input.first_name),
                users::last_name.eq(&input.last_name),
                users::birthday.eq(input.birthday),
            ),
            |_conn| AuditLogEntryCreationInput::updated(resource_types::USERS, user_id)
        )
    }

    #[tracing::instrument(skip(self, new_hashed_password), err)]
    async fn update_user_password(
        &self,
        user_id: &str,
        new_hashed_password: &str,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        require_text(new_hashed_password, "hashed password")?;
        let now = self.now();

        update_live_user!(
            self,
            user_id,
            now,
            (
                users::hashed_password.eq(new_hashed_password),
                users::requires_password_change.eq(false),
                users::password_last_changed_at.eq(Some(now)),
            ),
            |_conn| AuditLogEntryCreationInput::updated(resource_types::USERS, user_id)
        )
    }

    #[tracing::instrument(skip(self, new_secret), err)]
    async fn update_user_two_factor_secret(
        &self,
        user_id: &str,
        new_secret: &str,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        require_text(new_secret, "two factor secret")?;
        let now = self.now();

        update_live_user!(
            self,
            user_id,
            now,
            (
                users::two_factor_secret.eq(new_secret),
                users::two_factor_secret_verified_at.eq(None::<DateTime<Utc>>),
            ),
            |_conn| AuditLogEntryCreationInput::updated(resource_types::USERS, user_id)
        )
    }

    #[tracing::instrument(skip(self), err)]
    async fn mark_user_two_factor_secret_as_verified(
        &self,
        user_id: &str,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        let now = self.now();

        update_live_user!(
            self,
            user_id,
            now,
            users::two_factor_secret_verified_at.eq(Some(now)),
            |_conn| AuditLogEntryCreationInput::updated(resource_types::USERS, user_id)
        )
    }

    #[tracing::instrument(skip(self), err)]
    async fn mark_user_two_factor_secret_as_unverified(
        &self,
        user_id: &str,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        let now = self.now();

        update_live_user!(
            self,
            user_id,
            now,
            users::two_factor_secret_verified_at.eq(None::<DateTime<Utc>>),
            |_conn| AuditLogEntryCreationInput::updated(resource_types::USERS, user_id)
        )
    }

    #[tracing::instrument(skip(self), err)]
    async fn archive_user(&self, user_id: &str) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let archived: Option<String> = diesel::update(
                    users::table
                        .filter(users::id.eq(user_id))
                        .filter(users::archived_at.is_null()),
                )
                .set((users::archived_at.eq(now), users::last_updated_at.eq(now)))
                .returning(users::id)
                .get_result(conn)
                .await
                .optional()?;
                if archived.is_none() {
                    return Ok(());
                }
                write_user_audit(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::archived(resource_types::USERS, user_id),
                    user_id,
                )
                .await?;

                let memberships: Vec<(String, String)> = diesel::update(
                    household_user_memberships::table
                        .filter(household_user_memberships::belongs_to_user.eq(user_id))
                        .filter(household_user_memberships::archived_at.is_null()),
                )
                .set((
                    household_user_memberships::archived_at.eq(now),
                    household_user_memberships::last_updated_at.eq(now),
                ))
                .returning((
                    household_user_memberships::id,
                    household_user_memberships::belongs_to_household,
                ))
                .get_results(conn)
                .await?;
                for (membership_id, household_id) in &memberships {
                    write_audit_log_entry(
                        conn,
                        self.ids.as_ref(),
                        now,
                        AuditLogEntryCreationInput::archived(
                            resource_types::HOUSEHOLD_USER_MEMBERSHIPS,
                            membership_id,
                        )
                        .with_owner(AuditOwner {
                            user: Some(user_id.to_owned()),
                            household: Some(household_id.clone()),
                        }),
                    )
                    .await?;
                }
                info!(user_id, memberships = memberships.len(), "user archived");
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self, statuses), err)]
    async fn user_has_status(
        &self,
        user_id: &str,
        statuses: &[UserAccountStatus],
    ) -> Result<bool, RepositoryError> {
        require_id(user_id, "user id")?;
        if statuses.is_empty() {
            return Ok(false);
        }
        let wanted: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        let mut conn = self.pool.get().await?;
        let found = live_users()
            .filter(users::id.eq(user_id))
            .filter(users::user_account_status.eq_any(wanted))
            .select(users::id)
            .first::<String>(&mut conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_email_address_verification_token_for_user(
        &self,
        user_id: &str,
    ) -> Result<String, RepositoryError> {
        require_id(user_id, "user id")?;

        let mut conn = self.pool.get().await?;
        live_users()
            .filter(users::id.eq(user_id))
            .filter(users::email_address_verified_at.is_null())
            .select(users::email_address_verification_token)
            .first::<Option<String>>(&mut conn)
            .await
            .optional()?
            .flatten()
            .ok_or_else(|| RepositoryError::not_found("email address verification token"))
    }

    #[tracing::instrument(skip(self, token), err)]
    async fn mark_user_email_address_as_verified(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        require_text(token, "email address verification token")?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let affected = diesel::update(
                    users::table
                        .filter(users::id.eq(user_id))
                        .filter(users::email_address_verification_token.eq(token))
                        .filter(users::email_address_verified_at.is_null())
                        .filter(users::archived_at.is_null()),
                )
                .set((
                    users::email_address_verified_at.eq(Some(now)),
                    users::last_updated_at.eq(now),
                ))
                .execute(conn)
                .await?;
                if affected == 0 {
                    return Err(RepositoryError::not_found("user"));
                }
                write_user_audit(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::updated(resource_types::USERS, user_id),
                    user_id,
                )
                .await
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self, input), fields(new_status = %input.new_status), err)]
    async fn update_user_account_status(
        &self,
        user_id: &str,
        input: &UserAccountStatusUpdateInput,
    ) -> Result<(), RepositoryError> {
        require_id(user_id, "user id")?;
        input.validate()?;

        let now = self.now();

        update_live_user!(
            self,
            user_id,
            now,
            (
                users::user_account_status.eq(input.new_status.as_str()),
                users::user_account_status_explanation.eq(&input.reason),
            ),
            |conn| {
                let old = current_value(conn, user_id, AuditedColumn::AccountStatus).await?;
                AuditLogEntryCreationInput::updated(resource_types::USERS, user_id)
                    .with_change("user_account_status", old, input.new_status.as_str())
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::persistence::querier::test_support::unreachable_querier;
    use rstest::rstest;

    #[rstest]
    #[case("al", "al%")]
    #[case("50%_off", "50\\%\\_off%")]
    #[case("back\\slash", "back\\\\slash%")]
    fn search_patterns_escape_wildcards(#[case] query: &str, #[case] expected: &str) {
        assert_eq!(like_prefix(query), expected);
    }

    #[tokio::test]
    async fn registration_rejects_blank_username_before_checkout() {
        let querier = unreachable_querier();
        let input = UserRegistrationInput {
            email_address: "a@example.com".to_owned(),
            hashed_password: "hashed".to_owned(),
            ..UserRegistrationInput::default()
        };

        let result = querier.create_user(&input).await;

        assert_eq!(result, Err(RepositoryError::empty_input("username")));
    }

    #[tokio::test]
    async fn search_needs_a_query() {
        let querier = unreachable_querier();

        let result = querier.search_for_users_by_username("  ").await;

        assert_eq!(result, Err(RepositoryError::empty_input("username query")));
    }

    #[tokio::test]
    async fn verification_needs_a_token() {
        let querier = unreachable_querier();

        let result = querier.mark_user_email_address_as_verified("u-1", "").await;

        assert_eq!(
            result,
            Err(RepositoryError::empty_input("email address verification token"))
        );
    }

    #[tokio::test]
    async fn empty_status_set_matches_nothing_without_a_query() {
        let querier = unreachable_querier();

        let result = querier.user_has_status("u-1", &[]).await;

        assert_eq!(result, Ok(false));
    }

    #[tokio::test]
    async fn archive_needs_a_user_id() {
        let querier = unreachable_querier();

        assert_eq!(
            querier.archive_user("").await,
            Err(RepositoryError::invalid_identifier("user id"))
        );
    }
}
