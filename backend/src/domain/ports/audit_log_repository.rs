//! Read-only port over the audit log. Entries are written by the mutating
//! operations themselves.

use async_trait::async_trait;
use pagination::{QueryFilter, QueryFilteredResult};

use crate::domain::AuditLogEntry;

use super::RepositoryError;

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn get_audit_log_entry(&self, entry_id: &str) -> Result<AuditLogEntry, RepositoryError>;

    async fn get_audit_log_entries_for_user(
        &self,
        user_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<AuditLogEntry>, RepositoryError>;

    async fn get_audit_log_entries_for_user_and_resource_type(
        &self,
        user_id: &str,
        resource_types: &[String],
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<AuditLogEntry>, RepositoryError>;

    async fn get_audit_log_entries_for_household(
        &self,
        household_id: &str,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<AuditLogEntry>, RepositoryError>;

    async fn get_audit_log_entries_for_household_and_resource_type(
        &self,
        household_id: &str,
        resource_types: &[String],
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<AuditLogEntry>, RepositoryError>;
}
