//! PostgreSQL-backed `HouseholdInvitationRepository` implementation.
//!
//! Status transitions lock the invitation row, check it is still pending and
//! then update it under the same guard, so two responses racing on one
//! invitation cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use pagination::{QueryFilter, QueryFilteredResult};
use tracing::{debug, info};

use super::audit_log_writer::write_audit_log_entry;
use super::diesel_helpers::{QueryExecutor, apply_time_bounds, load_page, require_rows};
use super::diesel_memberships::insert_membership;
use super::models::{InvitationRow, NewInvitationRow};
use super::null_values::{count_from_db, non_empty};
use super::querier::Querier;
use super::schema::household_invitations;
use crate::domain::ports::{
    HouseholdInvitationRepository, RepositoryError, Validate, require_id, require_text,
};
use crate::domain::{
    AuditLogEntryCreationInput, AuditOwner, HouseholdInvitation, HouseholdInvitationCreationInput,
    HouseholdInvitationResponse, HouseholdInvitationStatus, HouseholdRole, IdGenerator,
    SECRET_BYTE_LENGTH, resource_types,
};

fn invitation_owner(invitation: &HouseholdInvitation) -> AuditOwner {
    AuditOwner {
        user: invitation.to_user.clone(),
        household: Some(invitation.destination_household.clone()),
    }
}

fn pending_invitations<'a>() -> household_invitations::BoxedQuery<'a, Pg> {
    household_invitations::table
        .filter(household_invitations::archived_at.is_null())
        .filter(household_invitations::status.eq(HouseholdInvitationStatus::Pending.as_str()))
        .into_boxed()
}

/// Move a pending invitation to `status`, recording `response.note`.
///
/// Acceptance additionally requires the invitation to be unexpired. Fails
/// with `NotFound` when no pending invitation matches both id and token.
async fn transition_invitation<C: QueryExecutor>(
    conn: &mut C,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
    invitation_id: &str,
    response: &HouseholdInvitationResponse,
    status: HouseholdInvitationStatus,
) -> Result<HouseholdInvitation, RepositoryError> {
    let row = household_invitations::table
        .filter(household_invitations::id.eq(invitation_id))
        .filter(household_invitations::token.eq(&response.token))
        .filter(household_invitations::archived_at.is_null())
        .select(InvitationRow::as_select())
        .for_update()
        .first::<InvitationRow>(conn)
        .await
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("household invitation"))?;
    let mut invitation = HouseholdInvitation::try_from(row)?;

    let acceptable = status != HouseholdInvitationStatus::Accepted || invitation.is_open_at(now);
    if !invitation.status.is_pending() || !acceptable {
        debug!(
            invitation_id,
            current = %invitation.status,
            requested = %status,
            "invitation is no longer open"
        );
        return Err(RepositoryError::not_found("household invitation"));
    }

    let affected = diesel::update(
        household_invitations::table
            .filter(household_invitations::id.eq(invitation_id))
            .filter(household_invitations::status.eq(HouseholdInvitationStatus::Pending.as_str())),
    )
    .set((
        household_invitations::status.eq(status.as_str()),
        household_invitations::status_note.eq(&response.note),
        household_invitations::last_updated_at.eq(now),
    ))
    .execute(conn)
    .await?;
    require_rows(affected, "household invitation")?;

    let previous = invitation.status;
    invitation.status = status;
    invitation.status_note.clone_from(&response.note);
    invitation.last_updated_at = Some(now);
    write_audit_log_entry(
        conn,
        ids,
        now,
        AuditLogEntryCreationInput::updated(resource_types::HOUSEHOLD_INVITATIONS, &invitation.id)
            .with_owner(invitation_owner(&invitation))
            .with_change("status", previous.as_str(), status.as_str()),
    )
    .await?;
    Ok(invitation)
}

/// Accept an invitation and add the invitee to the destination household.
///
/// `invitee` overrides the invitation's `to_user`, which is how a user who
/// registered from the invitation claims it.
pub(super) async fn accept_invitation<C: QueryExecutor>(
    conn: &mut C,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
    invitation_id: &str,
    response: &HouseholdInvitationResponse,
    invitee: Option<&str>,
    default_household: bool,
) -> Result<HouseholdInvitation, RepositoryError> {
    let mut invitation = transition_invitation(
        conn,
        ids,
        now,
        invitation_id,
        response,
        HouseholdInvitationStatus::Accepted,
    )
    .await?;

    if let Some(user_id) = invitee.filter(|u| invitation.to_user.as_deref() != Some(*u)) {
        diesel::update(household_invitations::table.find(invitation_id))
            .set(household_invitations::to_user.eq(user_id))
            .execute(conn)
            .await?;
        invitation.to_user = Some(user_id.to_owned());
    }
    let member = invitation
        .to_user
        .as_deref()
        .ok_or_else(|| RepositoryError::not_found("invitee"))?;

    insert_membership(
        conn,
        ids,
        now,
        &invitation.destination_household,
        member,
        HouseholdRole::HouseholdMember,
        default_household,
    )
    .await?;
    info!(
        invitation_id,
        household_id = %invitation.destination_household,
        "household invitation accepted"
    );
    Ok(invitation)
}

/// Id of the open invitation for `email_address` into `household_id`
/// carrying `token`.
pub(super) async fn find_open_invitation<C: QueryExecutor>(
    conn: &mut C,
    now: DateTime<Utc>,
    email_address: &str,
    token: &str,
    household_id: &str,
) -> Result<String, RepositoryError> {
    pending_invitations()
        .filter(household_invitations::to_email.eq(email_address))
        .filter(household_invitations::token.eq(token))
        .filter(household_invitations::destination_household.eq(household_id))
        .filter(household_invitations::expires_at.gt(now))
        .select(household_invitations::id)
        .first::<String>(conn)
        .await
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("household invitation"))
}

/// Point pending invitations addressed to `email_address` at `user_id`.
pub(super) async fn attach_pending_invitations<C: QueryExecutor>(
    conn: &mut C,
    now: DateTime<Utc>,
    email_address: &str,
    user_id: &str,
) -> Result<usize, RepositoryError> {
    let attached = diesel::update(
        household_invitations::table
            .filter(household_invitations::to_email.eq(email_address))
            .filter(household_invitations::status.eq(HouseholdInvitationStatus::Pending.as_str()))
            .filter(household_invitations::archived_at.is_null()),
    )
    .set((
        household_invitations::to_user.eq(user_id),
        household_invitations::last_updated_at.eq(now),
    ))
    .execute(conn)
    .await?;
    Ok(attached)
}

impl Querier {
    async fn fetch_invitation(
        &self,
        query: household_invitations::BoxedQuery<'_, Pg>,
    ) -> Result<HouseholdInvitation, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = query
            .select(InvitationRow::as_select())
            .first::<InvitationRow>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("household invitation"))?;
        HouseholdInvitation::try_from(row)
    }

    async fn list_pending_invitations(
        &self,
        column_filter: impl Fn() -> household_invitations::BoxedQuery<'static, Pg> + Send + Sync,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<HouseholdInvitation>, RepositoryError> {
        let filter = self.effective_filter(filter);

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let total: i64 = column_filter().count().get_result(conn).await?;
                let filtered: i64 = apply_time_bounds!(column_filter(), household_invitations, filter)
                    .count()
                    .get_result(conn)
                    .await?;
                let rows = load_page!(
                    apply_time_bounds!(column_filter(), household_invitations, filter),
                    household_invitations,
                    InvitationRow,
                    filter,
                    conn
                )?;
                let data = rows
                    .into_iter()
                    .map(HouseholdInvitation::try_from)
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
}

#[async_trait]
impl HouseholdInvitationRepository for Querier {
    #[tracing::instrument(skip(self), err)]
    async fn household_invitation_exists(
        &self,
        invitation_id: &str,
    ) -> Result<bool, RepositoryError> {
        require_id(invitation_id, "household invitation id")?;

        let mut conn = self.pool.get().await?;
        let found = household_invitations::table
            .filter(household_invitations::id.eq(invitation_id))
            .filter(household_invitations::archived_at.is_null())
            .select(household_invitations::id)
            .first::<String>(&mut conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self, token), err)]
    async fn get_household_invitation_by_token_and_id(
        &self,
        token: &str,
        invitation_id: &str,
    ) -> Result<HouseholdInvitation, RepositoryError> {
        require_text(token, "invitation token")?;
        require_id(invitation_id, "household invitation id")?;

        self.fetch_invitation(
            household_invitations::table
                .filter(household_invitations::id.eq(invitation_id))
                .filter(household_invitations::token.eq(token))
                .filter(household_invitations::archived_at.is_null())
                .into_boxed(),
        )
        .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_household_invitation_by_household_and_id(
        &self,
        household_id: &str,
        invitation_id: &str,
    ) -> Result<HouseholdInvitation, RepositoryError> {
        require_id(household_id, "household id")?;
        require_id(invitation_id, "household invitation id")?;

        self.fetch_invitation(
            household_invitations::table
                .filter(household_invitations::id.eq(invitation_id))
                .filter(household_invitations::destination_household.eq(household_id))
                .filter(household_invitations::archived_at.is_null())
                .into_boxed(),
        )
        .await
    }

    #[tracing::instrument(skip(self, email_address, token), err)]
    async fn get_household_invitation_by_email_and_token(
        &self,
        email_address: &str,
        token: &str,
    ) -> Result<HouseholdInvitation, RepositoryError> {
        require_text(email_address, "email address")?;
        require_text(token, "invitation token")?;
        let now = self.now();

        self.fetch_invitation(
            pending_invitations()
                .filter(household_invitations::to_email.eq(email_address))
                .filter(household_invitations::token.eq(token))
                .filter(household_invitations::expires_at.gt(now)),
        )
        .await
    }

    #[tracing::instrument(skip(self, filter), err)]
    async fn get_pending_household_invitations_from_user(
        &self,
        user_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<HouseholdInvitation>, RepositoryError> {
        require_id(user_id, "user id")?;
        let user_id = user_id.to_owned();

        self.list_pending_invitations(
            move || {
                pending_invitations().filter(household_invitations::from_user.eq(user_id.clone()))
            },
            filter,
        )
        .await
    }

    #[tracing::instrument(skip(self, filter), err)]
    async fn get_pending_household_invitations_for_user(
        &self,
        user_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<HouseholdInvitation>, RepositoryError> {
        require_id(user_id, "user id")?;
        let user_id = user_id.to_owned();

        self.list_pending_invitations(
            move || pending_invitations().filter(household_invitations::to_user.eq(user_id.clone())),
            filter,
        )
        .await
    }

    #[tracing::instrument(
        skip(self, input),
        fields(household_id = %input.destination_household_id, from_user = %input.from_user),
        err
    )]
    async fn create_household_invitation(
        &self,
        input: &HouseholdInvitationCreationInput,
    ) -> Result<HouseholdInvitation, RepositoryError> {
        input.validate()?;
        let id = self.ids.new_id();
        let token = self.secrets.generate_base64_secret(SECRET_BYTE_LENGTH);
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let row: InvitationRow = diesel::insert_into(household_invitations::table)
                    .values(NewInvitationRow {
                        id: &id,
                        destination_household: &input.destination_household_id,
                        to_email: &input.to_email,
                        to_user: non_empty(input.to_user.as_deref()),
                        to_name: &input.to_name,
                        from_user: &input.from_user,
                        status: HouseholdInvitationStatus::Pending.as_str(),
                        note: &input.note,
                        token: &token,
                        expires_at: input.expires_at,
                        created_at: now,
                    })
                    .returning(InvitationRow::as_returning())
                    .get_result(conn)
                    .await?;
                let invitation = HouseholdInvitation::try_from(row)?;
                write_audit_log_entry(
                    conn,
                    self.ids.as_ref(),
                    now,
                    AuditLogEntryCreationInput::created(
                        resource_types::HOUSEHOLD_INVITATIONS,
                        &invitation.id,
                    )
                    .with_owner(AuditOwner {
                        user: Some(invitation.from_user.clone()),
                        household: Some(invitation.destination_household.clone()),
                    }),
                )
                .await?;
                Ok(invitation)
            }
            .scope_boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self, response), err)]
    async fn cancel_household_invitation(
        &self,
        invitation_id: &str,
        response: &HouseholdInvitationResponse,
    ) -> Result<(), RepositoryError> {
        self.respond(invitation_id, response, HouseholdInvitationStatus::Cancelled)
            .await
    }

    #[tracing::instrument(skip(self, response), err)]
    async fn reject_household_invitation(
        &self,
        invitation_id: &str,
        response: &HouseholdInvitationResponse,
    ) -> Result<(), RepositoryError> {
        self.respond(invitation_id, response, HouseholdInvitationStatus::Rejected)
            .await
    }

    #[tracing::instrument(skip(self, response), err)]
    async fn accept_household_invitation(
        &self,
        invitation_id: &str,
        response: &HouseholdInvitationResponse,
    ) -> Result<(), RepositoryError> {
        self.respond(invitation_id, response, HouseholdInvitationStatus::Accepted)
            .await
    }
}

impl Querier {
    async fn respond(
        &self,
        invitation_id: &str,
        response: &HouseholdInvitationResponse,
        status: HouseholdInvitationStatus,
    ) -> Result<(), RepositoryError> {
        require_id(invitation_id, "household invitation id")?;
        response.validate()?;
        let now = self.now();

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                if status == HouseholdInvitationStatus::Accepted {
                    accept_invitation(conn, self.ids.as_ref(), now, invitation_id, response, None, false)
                        .await?;
                } else {
                    transition_invitation(conn, self.ids.as_ref(), now, invitation_id, response, status)
                        .await?;
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::persistence::querier::test_support::unreachable_querier;
    use rstest::rstest;

    fn response(token: &str) -> HouseholdInvitationResponse {
        HouseholdInvitationResponse {
            token: token.to_owned(),
            note: String::new(),
        }
    }

    #[rstest]
    #[case("", "tok", "household invitation id")]
    #[tokio::test]
    async fn responses_validate_the_invitation_id(
        #[case] invitation_id: &str,
        #[case] token: &str,
        #[case] name: &str,
    ) {
        let querier = unreachable_querier();

        let result = querier
            .accept_household_invitation(invitation_id, &response(token))
            .await;

        assert_eq!(result, Err(RepositoryError::invalid_identifier(name)));
    }

    #[tokio::test]
    async fn responses_need_a_token() {
        let querier = unreachable_querier();

        let result = querier.reject_household_invitation("inv-1", &response(" ")).await;

        assert_eq!(result, Err(RepositoryError::empty_input("invitation token")));
    }

    #[tokio::test]
    async fn lookup_by_email_needs_an_address() {
        let querier = unreachable_querier();

        let result = querier
            .get_household_invitation_by_email_and_token("", "tok")
            .await;

        assert_eq!(result, Err(RepositoryError::empty_input("email address")));
    }

    #[rstest]
    fn owner_follows_invitee_and_destination() {
        let invitation = HouseholdInvitation {
            id: "inv-1".to_owned(),
            destination_household: "h-1".to_owned(),
            to_email: "b@example.com".to_owned(),
            to_user: None,
            to_name: "B".to_owned(),
            from_user: "u-1".to_owned(),
            status: HouseholdInvitationStatus::Pending,
            note: String::new(),
            status_note: String::new(),
            token: "tok".to_owned(),
            expires_at: Utc::now(),
            created_at: Utc::now(),
            last_updated_at: None,
            archived_at: None,
        };

        let owner = invitation_owner(&invitation);

        assert_eq!(owner.user, None);
        assert_eq!(owner.household.as_deref(), Some("h-1"));
    }
}
