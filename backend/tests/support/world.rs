//! A `Querier` bound to a freshly cloned database, plus the fixtures the
//! integration suites share.
//!
//! Suites keep synchronous test bodies and drive the async ports through a
//! runtime owned by the world, so the embedded cluster bootstrap never runs
//! inside Tokio.

use std::future::Future;

use backend::domain::ports::{
    HouseholdInvitationRepository, HouseholdMembershipRepository, UserRepository,
};
use backend::domain::{HouseholdInvitationCreationInput, TieBreaker, User, UserRegistrationInput};
use backend::outbound::persistence::{DbPool, PoolConfig, Querier};
use chrono::{Duration, Utc};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use postgres::types::ToSql;
use postgres::{Client, NoTls};
use rstest::fixture;
use tokio::runtime::Runtime;

use super::format_postgres_error;
use super::pg_embed::shared_cluster;
use super::{handle_cluster_setup_failure, provision_template_database};

pub struct QuerierWorld {
    pub querier: Querier,
    /// Tokio runtime reused for every port call in one test.
    pub runtime: Runtime,
    pub database_url: String,
    _database: TemporaryDatabase,
}

impl QuerierWorld {
    fn setup() -> Result<Self, String> {
        let runtime = Runtime::new().map_err(|err| err.to_string())?;
        let cluster = shared_cluster()?;
        let database = provision_template_database(cluster)?;
        let database_url = database.url().to_string();

        let config = PoolConfig::new(&database_url)
            .with_max_size(2)
            .with_min_idle(Some(1));
        let pool = runtime
            .block_on(async { DbPool::new(config).await })
            .map_err(|err| err.to_string())?;
        let querier = Querier::new(pool).with_tie_breaker(TieBreaker::seeded(11));

        Ok(Self {
            querier,
            runtime,
            database_url,
            _database: database,
        })
    }

    /// Drive one async port call to completion.
    pub fn run<F: Future>(&self, operation: F) -> F::Output {
        self.runtime.block_on(operation)
    }

    /// Evaluate a `SELECT count(*) ...` statement directly against the database.
    pub fn count(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> i64 {
        let mut client = Client::connect(&self.database_url, NoTls)
            .unwrap_or_else(|err| panic!("connect: {}", format_postgres_error(&err)));
        let row = client
            .query_one(sql, params)
            .unwrap_or_else(|err| panic!("{sql}: {}", format_postgres_error(&err)));
        row.get(0)
    }

    /// Register a user without an invitation.
    pub fn register(&self, username: &str) -> User {
        self.run(self.querier.create_user(&registration(username)))
            .expect("registration succeeds")
    }

    /// Register `username` through an invitation sent by `inviter` into
    /// `household_id`.
    pub fn register_invited(&self, inviter: &User, household_id: &str, username: &str) -> User {
        let invitation = self
            .run(self.querier.create_household_invitation(&invitation_for(
                inviter,
                household_id,
                username,
            )))
            .expect("invitation created");
        let input = UserRegistrationInput {
            invitation_token: Some(invitation.token),
            destination_household_id: Some(household_id.to_owned()),
            ..registration(username)
        };
        self.run(self.querier.create_user(&input))
            .expect("invited registration succeeds")
    }

    pub fn default_household(&self, user_id: &str) -> String {
        self.run(self.querier.get_default_household_id_for_user(user_id))
            .expect("user has a default household")
    }

    /// Live memberships of `user_id` flagged default.
    pub fn default_membership_count(&self, user_id: &str) -> i64 {
        self.count(
            "SELECT count(*) FROM household_user_memberships \
             WHERE belongs_to_user = $1 AND default_household AND archived_at IS NULL",
            &[&user_id],
        )
    }

    pub fn audit_entry_count(&self) -> i64 {
        self.count("SELECT count(*) FROM audit_log_entries", &[])
    }
}

pub fn email_for(username: &str) -> String {
    format!("{username}@example.com")
}

pub fn registration(username: &str) -> UserRegistrationInput {
    UserRegistrationInput {
        username: username.to_owned(),
        email_address: email_for(username),
        hashed_password: "argon2-hash".to_owned(),
        two_factor_secret: "totp-secret".to_owned(),
        first_name: username.to_owned(),
        ..UserRegistrationInput::default()
    }
}

pub fn invitation_for(
    inviter: &User,
    household_id: &str,
    username: &str,
) -> HouseholdInvitationCreationInput {
    HouseholdInvitationCreationInput {
        from_user: inviter.id.clone(),
        to_email: email_for(username),
        to_user: None,
        to_name: username.to_owned(),
        note: "join us".to_owned(),
        destination_household_id: household_id.to_owned(),
        expires_at: Utc::now() + Duration::days(1),
    }
}

#[fixture]
pub fn querier_world() -> Option<QuerierWorld> {
    match QuerierWorld::setup() {
        Ok(world) => Some(world),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}
