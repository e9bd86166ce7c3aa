//! Access to the process-wide embedded PostgreSQL cluster.
//!
//! The cluster is bootstrapped once per test binary by
//! `pg-embed-setup-unpriv`; each test then clones its own database from a
//! migrated template.

use std::time::Duration;

use pg_embedded_setup_unpriv::ClusterHandle;

/// Maximum number of attempts for transient bootstrap errors.
const MAX_ATTEMPTS: u32 = 4;

/// Base delay between attempts (doubles with each retry).
const RETRY_DELAY_MS: u64 = 500;

/// Returns true if the error message suggests a transient network issue.
fn is_transient_error(err: &str) -> bool {
    let transient_patterns = [
        "error decoding response body",
        "connection reset",
        "connection refused",
        "timed out",
        "temporarily unavailable",
        "dns error",
    ];

    let err_lower = err.to_lowercase();
    transient_patterns
        .iter()
        .any(|pattern| err_lower.contains(pattern))
}

/// Keeps `PG_PASSWORD` stable so a reused data directory still accepts the
/// credentials of a later process.
fn ensure_stable_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the cluster bootstrap spawns any threads.
        unsafe {
            std::env::set_var("PG_PASSWORD", "mealplan_embedded_test");
        }
    }
}

/// Returns the shared cluster handle, retrying transient download failures.
pub fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    ensure_stable_password();
    let mut last_error = String::new();
    for attempt in 0..MAX_ATTEMPTS {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(err) => {
                last_error = format!("{err:?}");
                if attempt + 1 < MAX_ATTEMPTS && is_transient_error(&last_error) {
                    let delay = Duration::from_millis(RETRY_DELAY_MS * (1 << attempt));
                    eprintln!(
                        "pg-embed: transient error on attempt {}/{MAX_ATTEMPTS}, retrying in {delay:?}: {last_error}",
                        attempt + 1,
                    );
                    std::thread::sleep(delay);
                } else {
                    break;
                }
            }
        }
    }
    Err(last_error)
}
