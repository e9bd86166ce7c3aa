#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), forbid(clippy::expect_used))]
//! Apply pending schema migrations to the configured database.
//!
//! # Examples
//! ```sh
//! MEALPLAN_DATABASE_URL=postgres://localhost/mealplan \
//!     cargo run --manifest-path backend/Cargo.toml --bin mealplan-migrate
//! ```

use backend::config::QuerierSettings;
use color_eyre::eyre::{Result, WrapErr, eyre};
use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = QuerierSettings::load().wrap_err("load settings")?;
    let url = settings
        .database_url
        .as_deref()
        .ok_or_else(|| eyre!("MEALPLAN_DATABASE_URL is not set"))?;

    let mut conn = PgConnection::establish(url).wrap_err("connect to database")?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| eyre!("run migrations: {err}"))?;
    for version in &applied {
        info!(%version, "migration applied");
    }
    info!(count = applied.len(), "schema up to date");
    Ok(())
}
