//! Shared helpers and macros for the Diesel adapter.
//!
//! - Error mapping from pool and Diesel errors to [`RepositoryError`].
//! - [`QueryExecutor`], the connection bound internal write helpers accept so
//!   they compose inside a caller's transaction.
//! - Macros for archived-row filtering, time bounds and paging.

use diesel::pg::Pg;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::AsyncConnection;
use tracing::debug;

use crate::domain::ports::RepositoryError;

use super::pool::PoolError;

/// A connection that can run statements, inside a transaction or not.
///
/// `AsyncConnection::transaction` hands its closure the same connection type,
/// so helpers written against this bound work on a pooled connection and on
/// an open transaction alike.
pub(crate) trait QueryExecutor: AsyncConnection<Backend = Pg> + Send {}

impl<C> QueryExecutor for C where C: AsyncConnection<Backend = Pg> + Send {}

/// Map pool errors to repository errors.
pub(crate) fn map_pool_error(error: PoolError) -> RepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            RepositoryError::database(message)
        }
    }
}

/// Map Diesel errors to repository errors.
///
/// Unique violations become [`RepositoryError::AlreadyExists`] naming the
/// violated constraint; callers that know the resource rename it with
/// [`rename_conflict`].
pub(crate) fn map_diesel_error(error: DieselError) -> RepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(%error, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => RepositoryError::not_found("record"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            RepositoryError::already_exists(info.constraint_name().unwrap_or("record"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RepositoryError::database("database connection error")
        }
        DieselError::DatabaseError(_, info) => RepositoryError::database(info.message()),
        other => RepositoryError::database(other.to_string()),
    }
}

impl From<DieselError> for RepositoryError {
    fn from(error: DieselError) -> Self {
        map_diesel_error(error)
    }
}

impl From<PoolError> for RepositoryError {
    fn from(error: PoolError) -> Self {
        map_pool_error(error)
    }
}

/// Report a uniqueness conflict as `resource already exists`.
pub(crate) fn rename_conflict(resource: &str) -> impl Fn(RepositoryError) -> RepositoryError + '_ {
    move |error| match error {
        RepositoryError::AlreadyExists { .. } => RepositoryError::already_exists(resource),
        other => other,
    }
}

/// Fail with `NotFound` when a guarded write touched no rows.
pub(crate) fn require_rows(affected: usize, resource: &str) -> Result<(), RepositoryError> {
    if affected == 0 {
        return Err(RepositoryError::not_found(resource));
    }
    Ok(())
}

/// Narrow constraints on a boxed query to the filter's time window.
///
/// The `created_only` form serves tables without `last_updated_at`.
macro_rules! apply_time_bounds {
    (created_only $query:expr, $table:ident, $filter:expr) => {{
        let filter: &::pagination::QueryFilter = &$filter;
        let mut query = $query;
        if let Some(before) = filter.created_before {
            query = query.filter($table::created_at.lt(before));
        }
        if let Some(after) = filter.created_after {
            query = query.filter($table::created_at.gt(after));
        }
        query
    }};
    ($query:expr, $table:ident, $filter:expr) => {{
        let filter: &::pagination::QueryFilter = &$filter;
        let mut query = $crate::outbound::persistence::diesel_helpers::apply_time_bounds!(created_only $query, $table, filter);
        if let Some(before) = filter.updated_before {
            query = query.filter($table::last_updated_at.lt(before));
        }
        if let Some(after) = filter.updated_after {
            query = query.filter($table::last_updated_at.gt(after));
        }
        query
    }};
}

pub(crate) use apply_time_bounds;

/// Load one page of `$row` from a boxed query, oldest first.
macro_rules! load_page {
    ($query:expr, $table:ident, $row:ty, $filter:expr, $conn:expr) => {{
        let filter: &::pagination::QueryFilter = &$filter;
        $query
            .select(<$row>::as_select())
            .order(($table::created_at.asc(), $table::id.asc()))
            .limit(i64::from(filter.limit()))
            .offset(i64::from(filter.offset()))
            .load::<$row>($conn)
            .await
    }};
}

pub(crate) use load_page;

#[cfg(test)]
mod tests {
    //! Error mapping coverage for the Diesel adapter.

    use super::*;
    use rstest::rstest;

    #[derive(Debug)]
    struct Info(&'static str, Option<&'static str>);

    impl diesel::result::DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            self.0
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.1
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn database_error(kind: DatabaseErrorKind, info: Info) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(info))
    }

    #[rstest]
    fn not_found_maps_to_not_found() {
        assert!(map_diesel_error(DieselError::NotFound).is_not_found());
    }

    #[rstest]
    fn unique_violation_names_the_constraint() {
        let err = map_diesel_error(database_error(
            DatabaseErrorKind::UniqueViolation,
            Info("duplicate key", Some("users_username_live_idx")),
        ));

        assert_eq!(err, RepositoryError::already_exists("users_username_live_idx"));
        assert_eq!(
            rename_conflict("user")(err),
            RepositoryError::already_exists("user")
        );
    }

    #[rstest]
    #[case(DatabaseErrorKind::ClosedConnection, "database connection error")]
    #[case(DatabaseErrorKind::ForeignKeyViolation, "violates foreign key")]
    fn other_driver_errors_are_database_errors(
        #[case] kind: DatabaseErrorKind,
        #[case] expected: &str,
    ) {
        let err = map_diesel_error(database_error(kind, Info("violates foreign key", None)));

        assert_eq!(err, RepositoryError::database(expected));
    }

    #[rstest]
    fn pool_errors_are_database_errors() {
        let err: RepositoryError = PoolError::checkout("timed out").into();
        assert_eq!(err, RepositoryError::database("timed out"));
    }

    #[rstest]
    fn renaming_leaves_other_errors_alone() {
        let err = RepositoryError::database("boom");
        assert_eq!(rename_conflict("user")(err.clone()), err);
        assert_eq!(
            rename_conflict("user")(RepositoryError::already_exists("users_username_key")),
            RepositoryError::already_exists("user")
        );
    }

    #[rstest]
    #[case(0, Err(RepositoryError::not_found("membership")))]
    #[case(1, Ok(()))]
    fn guarded_writes_need_rows(#[case] affected: usize, #[case] expected: Result<(), RepositoryError>) {
        assert_eq!(require_rows(affected, "membership"), expected);
    }
}
