//! Conversions between domain values and nullable or narrower SQL columns.
//!
//! Every function here is total and pure. Values the database should never
//! hold (negative ranks, unknown enum strings) surface as
//! [`RepositoryError::Database`] rather than panicking.

use std::str::FromStr;

use tracing::warn;

use crate::domain::UnknownValue;
use crate::domain::ports::RepositoryError;

/// Treat an empty optional identifier as missing.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

pub(crate) fn small_to_db(value: u16) -> i32 {
    i32::from(value)
}

/// Read a non-negative `INTEGER` column into a `u16`.
pub(crate) fn small_from_db(value: i32, column: &str) -> Result<u16, RepositoryError> {
    u16::try_from(value).map_err(|_| {
        warn!(column, value, "integer column out of range");
        RepositoryError::database(format!("{column} out of range: {value}"))
    })
}

/// Saturate an optional duration in seconds into a nullable `INTEGER`.
pub(crate) fn seconds_to_db(value: Option<u32>) -> Option<i32> {
    value.map(|secs| i32::try_from(secs).unwrap_or(i32::MAX))
}

/// Negative stored durations read back as missing.
pub(crate) fn seconds_from_db(value: Option<i32>) -> Option<u32> {
    value.and_then(|secs| u32::try_from(secs).ok())
}

/// Parse a text column into one of the domain's text enums.
pub(crate) fn parse_text<T>(value: &str) -> Result<T, RepositoryError>
where
    T: FromStr<Err = UnknownValue>,
{
    value.parse().map_err(|err: UnknownValue| {
        warn!(kind = err.kind(), value, "unrecognised enum value in row");
        RepositoryError::database(err.to_string())
    })
}

/// Row count as the unsigned type used by paged results.
pub(crate) fn count_from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    //! Null and range translation for persisted values.

    use super::*;
    use crate::domain::{HouseholdRole, MealPlanStatus};
    use rstest::rstest;

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("u-1"), Some("u-1"))]
    fn empty_identifiers_become_null(#[case] input: Option<&str>, #[case] expected: Option<&str>) {
        assert_eq!(non_empty(input), expected);
    }

    #[rstest]
    #[case(0, Ok(0))]
    #[case(7, Ok(7))]
    #[case(-1, Err(RepositoryError::database("rank out of range: -1")))]
    #[case(70_000, Err(RepositoryError::database("rank out of range: 70000")))]
    fn ranks_must_fit(#[case] stored: i32, #[case] expected: Result<u16, RepositoryError>) {
        assert_eq!(small_from_db(stored, "rank"), expected);
    }

    #[rstest]
    fn rank_round_trips() {
        assert_eq!(small_from_db(small_to_db(u16::MAX), "rank"), Ok(u16::MAX));
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(90), Some(90))]
    #[case(Some(u32::MAX), Some(i32::MAX))]
    fn durations_saturate(#[case] input: Option<u32>, #[case] expected: Option<i32>) {
        assert_eq!(seconds_to_db(input), expected);
    }

    #[rstest]
    #[case(Some(-5), None)]
    #[case(Some(30), Some(30))]
    #[case(None, None)]
    fn negative_durations_are_missing(#[case] stored: Option<i32>, #[case] expected: Option<u32>) {
        assert_eq!(seconds_from_db(stored), expected);
    }

    #[rstest]
    fn enum_text_parses_or_reports() {
        assert_eq!(
            parse_text::<HouseholdRole>("household_admin"),
            Ok(HouseholdRole::HouseholdAdmin)
        );
        let err = parse_text::<MealPlanStatus>("pending").expect_err("unknown status");
        assert!(matches!(err, RepositoryError::Database { .. }));
    }

    #[rstest]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(count_from_db(-3), 0);
        assert_eq!(count_from_db(12), 12);
    }
}
