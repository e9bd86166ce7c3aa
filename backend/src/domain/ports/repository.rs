//! The standard repository surface shared by simple entities, and the error
//! type every persistence port reports.
//!
//! A simple entity is anything whose persistence needs nothing beyond
//! existence checks, single-row reads, paged lists, creation, whole-value
//! updates and logical archival. Entities filed under a parent row (a step
//! under its recipe, a vote under its option) name that parent as their
//! scope, and every read or archive includes it in the predicate.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use pagination::{QueryFilter, QueryFilteredResult};

use super::define_port_error;

define_port_error! {
    /// Failures surfaced by the persistence layer.
    pub enum RepositoryError {
        /// An identifier argument was empty.
        InvalidIdentifier { name: String } => "invalid identifier provided for {name}",
        /// A required text argument other than an identifier was empty.
        EmptyInput { name: String } => "empty input provided for {name}",
        /// The target row does not exist or has been archived.
        NotFound { resource: String } => "{resource} not found",
        /// A uniqueness rule rejected the write.
        AlreadyExists { resource: String } => "{resource} already exists",
        /// Any other driver, pool or transaction failure.
        Database { message: String } => "database error: {message}",
        /// The caller's deadline elapsed before the operation finished.
        Cancelled { message: String } => "operation cancelled: {message}",
    }
}

impl RepositoryError {
    /// Whether the error means the target row is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Reject an empty identifier before any database work happens.
///
/// # Examples
/// ```
/// use backend::domain::ports::{require_id, RepositoryError};
///
/// assert!(require_id("abc", "user id").is_ok());
/// assert_eq!(
///     require_id("", "user id"),
///     Err(RepositoryError::invalid_identifier("user id")),
/// );
/// ```
pub fn require_id(value: &str, name: &str) -> Result<(), RepositoryError> {
    if value.is_empty() {
        return Err(RepositoryError::invalid_identifier(name));
    }
    Ok(())
}

/// Reject a blank required string that is not an identifier.
pub fn require_text(value: &str, name: &str) -> Result<(), RepositoryError> {
    if value.trim().is_empty() {
        return Err(RepositoryError::empty_input(name));
    }
    Ok(())
}

/// Run `operation`, failing with [`RepositoryError::Cancelled`] when it does
/// not finish within `deadline`.
///
/// Dropping the operation's future aborts the statement in flight; an open
/// transaction is rolled back when its connection returns to the pool.
pub async fn with_deadline<T, F>(deadline: Duration, operation: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(elapsed) => Err(RepositoryError::cancelled(elapsed.to_string())),
    }
}

/// Input validation run before an operation touches the database.
pub trait Validate {
    /// Check required identifiers and text fields.
    fn validate(&self) -> Result<(), RepositoryError>;
}

/// Parent key of a scoped record.
///
/// Unscoped records use `()`; scoped records use `str`, the parent row id.
pub trait ScopeKey: Send + Sync {
    /// Check the key, naming it `name` in any error.
    fn check(&self, name: &str) -> Result<(), RepositoryError>;
}

impl ScopeKey for () {
    fn check(&self, _name: &str) -> Result<(), RepositoryError> {
        Ok(())
    }
}

impl ScopeKey for str {
    fn check(&self, name: &str) -> Result<(), RepositoryError> {
        require_id(self, name)
    }
}

/// A record persisted through [`Repository`].
pub trait Record: Validate + Clone + Send + Sync + 'static {
    /// Key of the parent row the record is filed under.
    type Scope: ScopeKey + ?Sized;
    /// Values needed to create a new record.
    type Creation: Validate + Send + Sync;

    /// Resource name written to audit log entries.
    const RESOURCE_TYPE: &'static str;
    /// Human-readable name of the scope key, used in errors.
    const SCOPE_NAME: &'static str;

    /// Primary key.
    fn id(&self) -> &str;
}

/// Uniform persistence surface for simple records.
///
/// Identifiers and scope keys are validated before a connection is checked
/// out. Mutators write an audit log entry in the same transaction.
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    /// Whether a non-archived record with `id` exists under `scope`.
    async fn exists(&self, scope: &R::Scope, id: &str) -> Result<bool, RepositoryError>;

    /// Fetch a non-archived record, failing with `NotFound` when absent.
    async fn get(&self, scope: &R::Scope, id: &str) -> Result<R, RepositoryError>;

    /// Fetch one page of non-archived records under `scope`.
    ///
    /// A missing filter reads the first page with the configured page size.
    async fn list(
        &self,
        scope: &R::Scope,
        filter: Option<QueryFilter>,
    ) -> Result<QueryFilteredResult<R>, RepositoryError>;

    /// Insert a record built from `input` and return it as stored.
    async fn create(&self, input: &R::Creation) -> Result<R, RepositoryError>;

    /// Overwrite the mutable fields of the record identified by `updated.id()`.
    async fn update(&self, updated: &R) -> Result<(), RepositoryError>;

    /// Mark the record archived. Archiving an archived record is a no-op.
    async fn archive(&self, scope: &R::Scope, id: &str) -> Result<(), RepositoryError>;
}
