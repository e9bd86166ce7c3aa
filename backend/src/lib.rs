//! Persistence layer for household meal planning.
//!
//! [`domain`] holds the entities, port traits and the voting engine;
//! [`outbound::persistence`] implements those ports on PostgreSQL;
//! [`config`] loads the settings that wire the two together.

pub mod config;
pub mod domain;
pub mod outbound;
