//! Standard repository surface for valid instruments and user notifications.

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::{
    NewUserNotificationRow, NewValidInstrumentRow, UserNotificationChanges, UserNotificationRow,
    ValidInstrumentChanges, ValidInstrumentRow,
};
use super::schema::{user_notifications, valid_instruments};
use super::standard_repository::standard_repository;
use crate::domain::{AuditOwner, UserNotification, ValidInstrument};

standard_repository! {
    record: ValidInstrument,
    row: ValidInstrumentRow,
    table: valid_instruments,
    scope: none,
    noun: "valid instrument",
    new_row: NewValidInstrumentRow::new,
    changes: ValidInstrumentChanges::new,
    owner: |_instrument| AuditOwner::nobody(),
}

standard_repository! {
    record: UserNotification,
    row: UserNotificationRow,
    table: user_notifications,
    scope: belongs_to_user,
    noun: "user notification",
    new_row: NewUserNotificationRow::new,
    changes: UserNotificationChanges::new,
    owner: |notification| AuditOwner::user(&notification.belongs_to_user),
}

#[cfg(test)]
mod tests {
    use crate::domain::ports::{Repository, RepositoryError};
    use crate::domain::{UserNotification, ValidInstrument};
    use crate::outbound::persistence::querier::test_support::unreachable_querier;
    use rstest::rstest;

    #[rstest]
    #[case("", "n-1", "user id")]
    #[case("u-1", "", "user notification id")]
    #[tokio::test]
    async fn notification_reads_validate_both_ids(
        #[case] user_id: &str,
        #[case] notification_id: &str,
        #[case] name: &str,
    ) {
        let querier = unreachable_querier();

        let result = Repository::<UserNotification>::get(&querier, user_id, notification_id).await;

        assert_eq!(result, Err(RepositoryError::invalid_identifier(name)));
    }

    #[tokio::test]
    async fn instrument_lists_reach_the_pool() {
        let querier = unreachable_querier();

        let result = Repository::<ValidInstrument>::list(&querier, &(), None).await;

        assert!(matches!(result, Err(RepositoryError::Database { .. })));
    }
}
