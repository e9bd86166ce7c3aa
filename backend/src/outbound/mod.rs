//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations.

pub mod persistence;
