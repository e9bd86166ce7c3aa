//! Shared helper utilities for backend integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`; each
//! suite pulls this module in with `mod support;`.

#![allow(dead_code, reason = "each suite uses a different subset of helpers")]

pub mod cluster_skip;
pub mod embedded_postgres;
pub mod pg_embed;
pub mod world;

pub use cluster_skip::handle_cluster_setup_failure;
pub use embedded_postgres::provision_template_database;
pub use world::QuerierWorld;

/// Render a `postgres` error with enough detail to be useful in CI logs.
///
/// The `postgres::Error` `Display` implementation often collapses database
/// errors to a generic `db error`, which hides the message and SQLSTATE.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    summary
}
