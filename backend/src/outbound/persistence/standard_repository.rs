//! Macro implementing [`Repository`](crate::domain::ports::Repository) for
//! simple records.
//!
//! Every simple table has the same shape: text `id`, an optional parent
//! column, `created_at`, `last_updated_at` and `archived_at`. The macro
//! generates the six standard operations once per record so the per-entity
//! code is limited to its row conversions and audit attribution.

/// Generate `impl Repository<$record> for Querier`.
///
/// The invoking module must import `diesel::prelude::*`,
/// `diesel_async::{AsyncConnection, RunQueryDsl}`,
/// `diesel_async::scoped_futures::ScopedFutureExt` and the `$table` schema
/// module; everything else is referenced by path.
///
/// - `scope: none` declares an unscoped record; otherwise name the parent
///   column, which is added to every read and archive predicate.
/// - `new_row` maps `(id, now, &creation_input)` to an insertable row.
/// - `changes` maps `(&record, now)` to a changeset.
/// - `owner` attributes audit entries for a record.
macro_rules! standard_repository {
    (@scoped $query:expr, $table:ident, none, $scope:expr) => {
        $query
    };
    (@scoped $query:expr, $table:ident, $col:ident, $scope:expr) => {
        $query.filter($table::$col.eq($scope))
    };
    (@archive_target $table:ident, none, $scope:expr, $id:expr) => {
        $table::table
            .filter($table::id.eq($id))
            .filter($table::archived_at.is_null())
    };
    (@archive_target $table:ident, $col:ident, $scope:expr, $id:expr) => {
        $table::table
            .filter($table::id.eq($id))
            .filter($table::$col.eq($scope))
            .filter($table::archived_at.is_null())
    };
    (
        record: $record:ty,
        row: $row:ty,
        table: $table:ident,
        scope: $scope_col:ident,
        noun: $noun:literal,
        new_row: $new_row:expr,
        changes: $changes:expr,
        owner: |$rec:ident| $owner:expr $(,)?
    ) => {
        #[async_trait::async_trait]
        impl $crate::domain::ports::Repository<$record>
            for $crate::outbound::persistence::Querier {
            #[tracing::instrument(
                skip(self, scope),
                fields(resource = <$record as $crate::domain::ports::Record>::RESOURCE_TYPE),
                err
            )]
            async fn exists(
                &self,
                scope: &<$record as $crate::domain::ports::Record>::Scope,
                id: &str,
            ) -> Result<bool, $crate::domain::ports::RepositoryError> {
                $crate::domain::ports::ScopeKey::check(scope, <$record as $crate::domain::ports::Record>::SCOPE_NAME)?;
                $crate::domain::ports::require_id(id, concat!($noun, " id"))?;

                let mut conn = self.pool.get().await?;
                let base = $table::table
                    .filter($table::id.eq(id))
                    .filter($table::archived_at.is_null())
                    .into_boxed();
                let found = $crate::outbound::persistence::standard_repository::standard_repository!(
                    @scoped base, $table, $scope_col, scope
                )
                .select($table::id)
                .first::<String>(&mut conn)
                .await
                .optional()?;
                Ok(found.is_some())
            }

            #[tracing::instrument(
                skip(self, scope),
                fields(resource = <$record as $crate::domain::ports::Record>::RESOURCE_TYPE),
                err
            )]
            async fn get(
                &self,
                scope: &<$record as $crate::domain::ports::Record>::Scope,
                id: &str,
            ) -> Result<$record, $crate::domain::ports::RepositoryError> {
                $crate::domain::ports::ScopeKey::check(scope, <$record as $crate::domain::ports::Record>::SCOPE_NAME)?;
                $crate::domain::ports::require_id(id, concat!($noun, " id"))?;

                let mut conn = self.pool.get().await?;
                let base = $table::table
                    .filter($table::id.eq(id))
                    .filter($table::archived_at.is_null())
                    .into_boxed();
                let row = $crate::outbound::persistence::standard_repository::standard_repository!(
                    @scoped base, $table, $scope_col, scope
                )
                .select(<$row>::as_select())
                .first::<$row>(&mut conn)
                .await
                .optional()?;
                row.map(<$record>::try_from)
                    .transpose()?
                    .ok_or_else(|| $crate::domain::ports::RepositoryError::not_found($noun))
            }

            #[tracing::instrument(
                skip(self, scope, filter),
                fields(resource = <$record as $crate::domain::ports::Record>::RESOURCE_TYPE),
                err
            )]
            async fn list(
                &self,
                scope: &<$record as $crate::domain::ports::Record>::Scope,
                filter: Option<::pagination::QueryFilter>,
            ) -> Result<::pagination::QueryFilteredResult<$record>, $crate::domain::ports::RepositoryError> {
                $crate::domain::ports::ScopeKey::check(scope, <$record as $crate::domain::ports::Record>::SCOPE_NAME)?;
                let filter = self.effective_filter(filter);

                let mut conn = self.pool.get().await?;
                conn.transaction::<_, $crate::domain::ports::RepositoryError, _>(|conn| {
                    async move {
                        let live = || {
                            $crate::outbound::persistence::standard_repository::standard_repository!(
                                @scoped $table::table.filter($table::archived_at.is_null()).into_boxed(),
                                $table, $scope_col, scope
                            )
                        };
                        let total: i64 = live().count().get_result(conn).await?;
                        let filtered: i64 = $crate::outbound::persistence::diesel_helpers::apply_time_bounds!(live(), $table, filter)
                            .count()
                            .get_result(conn)
                            .await?;
                        let rows = $crate::outbound::persistence::diesel_helpers::load_page!(
                            $crate::outbound::persistence::diesel_helpers::apply_time_bounds!(live(), $table, filter),
                            $table,
                            $row,
                            filter,
                            conn
                        )?;
                        let data = rows
                            .into_iter()
                            .map(<$record>::try_from)
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(::pagination::QueryFilteredResult::new(
                            data,
                            &filter,
                            $crate::outbound::persistence::null_values::count_from_db(filtered),
                            $crate::outbound::persistence::null_values::count_from_db(total),
                        ))
                    }
                    .scope_boxed()
                })
                .await
            }

            #[tracing::instrument(
                skip(self, input),
                fields(resource = <$record as $crate::domain::ports::Record>::RESOURCE_TYPE),
                err
            )]
            async fn create(
                &self,
                input: &<$record as $crate::domain::ports::Record>::Creation,
            ) -> Result<$record, $crate::domain::ports::RepositoryError> {
                $crate::domain::ports::Validate::validate(input)?;
                let id = self.ids.new_id();
                let now = self.now();

                let mut conn = self.pool.get().await?;
                conn.transaction::<_, $crate::domain::ports::RepositoryError, _>(|conn| {
                    async move {
                        let row: $row = diesel::insert_into($table::table)
                            .values($new_row(&id, now, input))
                            .returning(<$row>::as_returning())
                            .get_result(conn)
                            .await
                            .map_err($crate::domain::ports::RepositoryError::from)
                            .map_err($crate::outbound::persistence::diesel_helpers::rename_conflict($noun))?;
                        let record = <$record>::try_from(row)?;
                        let owner = {
                            let $rec = &record;
                            $owner
                        };
                        $crate::outbound::persistence::audit_log_writer::write_audit_log_entry(
                            conn,
                            self.ids.as_ref(),
                            now,
                            $crate::domain::AuditLogEntryCreationInput::created(
                                <$record as $crate::domain::ports::Record>::RESOURCE_TYPE,
                                $crate::domain::ports::Record::id(&record),
                            )
                            .with_owner(owner),
                        )
                        .await?;
                        Ok(record)
                    }
                    .scope_boxed()
                })
                .await
            }

            #[tracing::instrument(
                skip(self, updated),
                fields(
                    resource = <$record as $crate::domain::ports::Record>::RESOURCE_TYPE,
                    id = %$crate::domain::ports::Record::id(updated),
                ),
                err
            )]
            async fn update(&self, updated: &$record) -> Result<(), $crate::domain::ports::RepositoryError> {
                $crate::domain::ports::Validate::validate(updated)?;
                let now = self.now();

                let mut conn = self.pool.get().await?;
                conn.transaction::<_, $crate::domain::ports::RepositoryError, _>(|conn| {
                    async move {
                        let affected = diesel::update(
                            $table::table
                                .filter($table::id.eq($crate::domain::ports::Record::id(updated)))
                                .filter($table::archived_at.is_null()),
                        )
                        .set($changes(updated, now))
                        .execute(conn)
                        .await
                        .map_err($crate::domain::ports::RepositoryError::from)
                            .map_err($crate::outbound::persistence::diesel_helpers::rename_conflict($noun))?;
                        $crate::outbound::persistence::diesel_helpers::require_rows(affected, $noun)?;
                        let owner = {
                            let $rec = updated;
                            $owner
                        };
                        $crate::outbound::persistence::audit_log_writer::write_audit_log_entry(
                            conn,
                            self.ids.as_ref(),
                            now,
                            $crate::domain::AuditLogEntryCreationInput::updated(
                                <$record as $crate::domain::ports::Record>::RESOURCE_TYPE,
                                $crate::domain::ports::Record::id(updated),
                            )
                            .with_owner(owner),
                        )
                        .await?;
                        Ok(())
                    }
                    .scope_boxed()
                })
                .await
            }

            #[tracing::instrument(
                skip(self, scope),
                fields(resource = <$record as $crate::domain::ports::Record>::RESOURCE_TYPE),
                err
            )]
            async fn archive(
                &self,
                scope: &<$record as $crate::domain::ports::Record>::Scope,
                id: &str,
            ) -> Result<(), $crate::domain::ports::RepositoryError> {
                $crate::domain::ports::ScopeKey::check(scope, <$record as $crate::domain::ports::Record>::SCOPE_NAME)?;
                $crate::domain::ports::require_id(id, concat!($noun, " id"))?;
                let now = self.now();

                let mut conn = self.pool.get().await?;
                conn.transaction::<_, $crate::domain::ports::RepositoryError, _>(|conn| {
                    async move {
                        let archived: Option<$row> = diesel::update(
                            $crate::outbound::persistence::standard_repository::standard_repository!(
                                @archive_target $table, $scope_col, scope, id
                            ),
                        )
                        .set((
                            $table::archived_at.eq(now),
                            $table::last_updated_at.eq(now),
                        ))
                        .returning(<$row>::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?;
                        let Some(row) = archived else {
                            return Ok(());
                        };
                        let record = <$record>::try_from(row)?;
                        let owner = {
                            let $rec = &record;
                            $owner
                        };
                        $crate::outbound::persistence::audit_log_writer::write_audit_log_entry(
                            conn,
                            self.ids.as_ref(),
                            now,
                            $crate::domain::AuditLogEntryCreationInput::archived(
                                <$record as $crate::domain::ports::Record>::RESOURCE_TYPE,
                                $crate::domain::ports::Record::id(&record),
                            )
                            .with_owner(owner),
                        )
                        .await?;
                        Ok(())
                    }
                    .scope_boxed()
                })
                .await
            }
        }
    };
}

pub(crate) use standard_repository;
