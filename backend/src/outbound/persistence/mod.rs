//! PostgreSQL persistence adapter using Diesel ORM.
//!
//! Every port in [`crate::domain::ports`] is implemented on one façade,
//! [`Querier`], which owns a `bb8` pool of `diesel-async` connections plus
//! the clock, identifier generators and tie-break source the write paths
//! need.
//!
//! # Architecture
//!
//! - **Thin adapters**: each `diesel_*` module translates between Diesel
//!   rows and domain types for one port. Multi-step procedures (registration,
//!   member removal, finalization) run inside a single transaction.
//! - **Internal models**: row structs (`models`) and table definitions
//!   (`schema`) never leave this module.
//! - **Explicit transactions**: write helpers take any
//!   [`diesel_helpers::QueryExecutor`], so they compose inside the caller's
//!   transaction. The audit-log writer relies on this.
//! - **Strongly typed errors**: driver and pool failures map to
//!   [`crate::domain::ports::RepositoryError`].
//!
//! # Example
//!
//! ```ignore
//! use backend::domain::ports::UserRepository;
//! use backend::outbound::persistence::{DbPool, PoolConfig, Querier};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/mealplan")).await?;
//! let querier = Querier::new(pool);
//! let user = querier.get_user("user-id").await?;
//! ```

mod audit_log_writer;
mod diesel_audit_log;
mod diesel_catalogue;
pub(crate) mod diesel_helpers;
mod diesel_households;
mod diesel_invitations;
mod diesel_meal_plans;
mod diesel_memberships;
mod diesel_recipes;
mod diesel_users;
mod diesel_webhooks;
mod models;
mod null_values;
mod pool;
mod querier;
mod schema;
mod standard_repository;

pub use pool::{DbPool, PoolConfig, PoolError};
pub use querier::{Querier, QuerierSetupError};
