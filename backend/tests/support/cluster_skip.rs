//! Helpers for controlling embedded test cluster behaviour.
//!
//! Suites that depend on embedded PostgreSQL can be skipped where the cluster
//! cannot start. The `SKIP_TEST_CLUSTER` policy lives here so every suite
//! behaves the same way.

/// Returns true when `SKIP_TEST_CLUSTER` is "1", "true" or "yes"
/// (case-insensitive).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Handles embedded cluster setup failures consistently across suites.
///
/// When `SKIP_TEST_CLUSTER` is truthy, prints a skip marker and returns `None`.
/// Otherwise, panics so CI breakage is not masked.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
