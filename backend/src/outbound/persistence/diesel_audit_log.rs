//! PostgreSQL-backed `AuditLogRepository` implementation.
//!
//! Entries are append-only and carry no update or archive timestamps, so
//! list filters only honour the creation bounds.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use pagination::{QueryFilter, QueryFilteredResult};

use super::diesel_helpers::{apply_time_bounds, load_page};
use super::models::AuditLogEntryRow;
use super::null_values::count_from_db;
use super::querier::Querier;
use super::schema::audit_log_entries;
use crate::domain::AuditLogEntry;
use crate::domain::ports::{AuditLogRepository, RepositoryError, require_id};

/// Which owner column scopes a listing.
#[derive(Debug, Clone, Copy)]
enum EntryOwner {
    User,
    Household,
}

/// Entries owned by `owner_id`, optionally restricted to `kinds`.
///
/// An empty `kinds` slice matches no entries.
fn scoped_entries(
    owner: EntryOwner,
    owner_id: &str,
    kinds: Option<&[String]>,
) -> impl Fn() -> audit_log_entries::BoxedQuery<'static, Pg> + Send + Sync {
    let owner_id = owner_id.to_owned();
    let kinds = kinds.map(<[String]>::to_vec);
    move || {
        let mut query = audit_log_entries::table.into_boxed();
        query = match owner {
            EntryOwner::User => query.filter(audit_log_entries::belongs_to_user.eq(owner_id.clone())),
            EntryOwner::Household => {
                query.filter(audit_log_entries::belongs_to_household.eq(owner_id.clone()))
            }
        };
        if let Some(kinds) = &kinds {
            query = query.filter(audit_log_entries::resource_type.eq_any(kinds.clone()));
        }
        query
    }
}

impl Querier {
    async fn list_audit_log_entries(
        &self,
        scope: impl Fn() -> audit_log_entries::BoxedQuery<'static, Pg> + Send + Sync,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<AuditLogEntry>, RepositoryError> {
        let filter = self.effective_filter(filter);

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            async move {
                let total: i64 = scope().count().get_result(conn).await?;
                let filtered: i64 =
                    apply_time_bounds!(created_only scope(), audit_log_entries, filter)
                        .count()
                        .get_result(conn)
                        .await?;
                let rows = load_page!(
                    apply_time_bounds!(created_only scope(), audit_log_entries, filter),
                    audit_log_entries,
                    AuditLogEntryRow,
                    filter,
                    conn
                )?;
                let data = rows
                    .into_iter()
                    .map(AuditLogEntry::try_from)
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
impl AuditLogRepository for Querier {
    #[tracing::instrument(skip(self), err)]
    async fn get_audit_log_entry(&self, entry_id: &str) -> Result<AuditLogEntry, RepositoryError> {
        require_id(entry_id, "audit log entry id")?;

        let mut conn = self.pool.get().await?;
        let row = audit_log_entries::table
            .find(entry_id)
            .select(AuditLogEntryRow::as_select())
            .first::<AuditLogEntryRow>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("audit log entry"))?;
        AuditLogEntry::try_from(row)
    }

    #[tracing::instrument(skip(self, filter), err)]
    async fn get_audit_log_entries_for_user(
        &self,
        user_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<AuditLogEntry>, RepositoryError> {
        require_id(user_id, "user id")?;
        self.list_audit_log_entries(scoped_entries(EntryOwner::User, user_id, None), filter)
            .await
    }

    #[tracing::instrument(skip(self, filter), err)]
    async fn get_audit_log_entries_for_user_and_resource_type(
        &self,
        user_id: &str,
        resource_types: &[String],
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<AuditLogEntry>, RepositoryError> {
        require_id(user_id, "user id")?;
        self.list_audit_log_entries(
            scoped_entries(EntryOwner::User, user_id, Some(resource_types)),
            filter,
        )
        .await
    }

    #[tracing::instrument(skip(self, filter), err)]
    async fn get_audit_log_entries_for_household(
        &self,
        household_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<AuditLogEntry>, RepositoryError> {
        require_id(household_id, "household id")?;
        self.list_audit_log_entries(
            scoped_entries(EntryOwner::Household, household_id, None),
            filter,
        )
        .await
    }

    #[tracing::instrument(skip(self, filter), err)]
    async fn get_audit_log_entries_for_household_and_resource_type(
        &self,
        household_id: &str,
        resource_types: &[String],
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<AuditLogEntry>, RepositoryError> {
        require_id(household_id, "household id")?;
        self.list_audit_log_entries(
            scoped_entries(EntryOwner::Household, household_id, Some(resource_types)),
            filter,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::persistence::querier::test_support::unreachable_querier;

    #[tokio::test]
    async fn single_entry_requires_an_id() {
        let querier = unreachable_querier();

        let result = querier.get_audit_log_entry("").await;

        assert_eq!(
            result,
            Err(RepositoryError::invalid_identifier("audit log entry id"))
        );
    }

    #[tokio::test]
    async fn household_listing_requires_a_household() {
        let querier = unreachable_querier();

        let result = querier
            .get_audit_log_entries_for_household_and_resource_type(
                "",
                &["webhooks".to_owned()],
                None,
            )
            .await;

        assert_eq!(
            result,
            Err(RepositoryError::invalid_identifier("household id"))
        );
    }
}
