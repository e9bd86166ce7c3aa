//! Append-only audit log writes.
//!
//! Mutators call [`write_audit_log_entry`] with the connection of their own
//! transaction, so the audit row commits or rolls back with the change it
//! describes.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::diesel_helpers::QueryExecutor;
use super::models::{AuditLogEntryRow, NewAuditLogEntryRow};
use super::schema::audit_log_entries;
use crate::domain::IdGenerator;
use crate::domain::ports::RepositoryError;
use crate::domain::{AuditLogEntry, AuditLogEntryCreationInput};

/// Serialise the change map to the JSON stored in `audit_log_entries.changes`.
pub(crate) fn encode_changes(
    input: &AuditLogEntryCreationInput,
) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(&input.changes)
        .map_err(|err| RepositoryError::database(format!("unserialisable audit changes: {err}")))
}

/// Insert one audit log entry on `conn` and return it as stored.
pub(crate) async fn write_audit_log_entry<C: QueryExecutor>(
    conn: &mut C,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
    input: AuditLogEntryCreationInput,
) -> Result<AuditLogEntry, RepositoryError> {
    let id = ids.new_id();
    let row = NewAuditLogEntryRow {
        id: &id,
        resource_type: input.resource_type,
        relevant_id: &input.relevant_id,
        event_type: input.event_type.as_str(),
        changes: encode_changes(&input)?,
        belongs_to_user: input.belongs_to_user.as_deref(),
        belongs_to_household: input.belongs_to_household.as_deref(),
        created_at: now,
    };

    let stored: AuditLogEntryRow = diesel::insert_into(audit_log_entries::table)
        .values(&row)
        .returning(AuditLogEntryRow::as_returning())
        .get_result(conn)
        .await?;

    debug!(
        resource_type = input.resource_type,
        relevant_id = %input.relevant_id,
        event_type = input.event_type.as_str(),
        "audit log entry written"
    );
    AuditLogEntry::try_from(stored)
}
