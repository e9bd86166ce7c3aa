//! Append-only records of mutations to tracked resources.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::text_enum::text_enum;

/// Resource names recorded in `resource_type`.
pub mod resource_types {
    pub const USERS: &str = "users";
    pub const HOUSEHOLDS: &str = "households";
    pub const HOUSEHOLD_USER_MEMBERSHIPS: &str = "household_user_memberships";
    pub const HOUSEHOLD_INVITATIONS: &str = "household_invitations";
    pub const MEAL_PLANS: &str = "meal_plans";
    pub const MEAL_PLAN_EVENTS: &str = "meal_plan_events";
    pub const MEAL_PLAN_OPTIONS: &str = "meal_plan_options";
    pub const MEAL_PLAN_OPTION_VOTES: &str = "meal_plan_option_votes";
    pub const MEALS: &str = "meals";
    pub const RECIPES: &str = "recipes";
    pub const RECIPE_STEPS: &str = "recipe_steps";
    pub const RECIPE_RATINGS: &str = "recipe_ratings";
    pub const VALID_INSTRUMENTS: &str = "valid_instruments";
    pub const USER_NOTIFICATIONS: &str = "user_notifications";
    pub const WEBHOOKS: &str = "webhooks";
    pub const WEBHOOK_TRIGGER_EVENTS: &str = "webhook_trigger_events";
}

text_enum! {
    /// Kind of mutation an entry records.
    pub enum AuditLogEventType {
        Created => "created",
        Updated => "updated",
        Archived => "archived",
    }
}

/// Before and after values of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLog {
    pub old_value: Value,
    pub new_value: Value,
}

/// Field name to change, stored as JSON.
pub type AuditLogChanges = BTreeMap<String, ChangeLog>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub resource_type: String,
    pub relevant_id: String,
    pub event_type: AuditLogEventType,
    pub changes: AuditLogChanges,
    pub belongs_to_user: Option<String>,
    pub belongs_to_household: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Values for an entry; the writer assigns `id` and `created_at`.
///
/// # Examples
/// ```
/// use backend::domain::{AuditLogEntryCreationInput, AuditLogEventType};
///
/// let entry = AuditLogEntryCreationInput::updated("users", "u-1")
///     .with_user("u-1")
///     .with_change("username", "old", "new");
/// assert_eq!(entry.event_type, AuditLogEventType::Updated);
/// assert_eq!(entry.changes.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntryCreationInput {
    pub resource_type: &'static str,
    pub relevant_id: String,
    pub event_type: AuditLogEventType,
    pub changes: AuditLogChanges,
    pub belongs_to_user: Option<String>,
    pub belongs_to_household: Option<String>,
}

impl AuditLogEntryCreationInput {
    /// An unowned entry with no recorded changes.
    pub fn new(
        resource_type: &'static str,
        relevant_id: impl Into<String>,
        event_type: AuditLogEventType,
    ) -> Self {
        Self {
            resource_type,
            relevant_id: relevant_id.into(),
            event_type,
            changes: AuditLogChanges::new(),
            belongs_to_user: None,
            belongs_to_household: None,
        }
    }

    /// Entry for a freshly inserted row.
    pub fn created(resource_type: &'static str, relevant_id: impl Into<String>) -> Self {
        Self::new(resource_type, relevant_id, AuditLogEventType::Created)
    }

    /// Entry for an in-place update.
    pub fn updated(resource_type: &'static str, relevant_id: impl Into<String>) -> Self {
        Self::new(resource_type, relevant_id, AuditLogEventType::Updated)
    }

    /// Entry for a logical archive.
    pub fn archived(resource_type: &'static str, relevant_id: impl Into<String>) -> Self {
        Self::new(resource_type, relevant_id, AuditLogEventType::Archived)
    }

    /// Attribute the entry to a user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.belongs_to_user = Some(user_id.into());
        self
    }

    /// Attribute the entry to a household.
    #[must_use]
    pub fn with_household(mut self, household_id: impl Into<String>) -> Self {
        self.belongs_to_household = Some(household_id.into());
        self
    }

    /// Attribute the entry to whoever owns the affected row.
    #[must_use]
    pub fn with_owner(mut self, owner: AuditOwner) -> Self {
        self.belongs_to_user = owner.user;
        self.belongs_to_household = owner.household;
        self
    }

    /// Record that `field` moved from `old` to `new`.
    #[must_use]
    pub fn with_change(
        mut self,
        field: impl Into<String>,
        old: impl Into<Value>,
        new: impl Into<Value>,
    ) -> Self {
        self.changes.insert(
            field.into(),
            ChangeLog {
                old_value: old.into(),
                new_value: new.into(),
            },
        );
        self
    }
}

/// User and household an audited row belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOwner {
    /// Value of `belongs_to_user`.
    pub user: Option<String>,
    /// Value of `belongs_to_household`.
    pub household: Option<String>,
}

impl AuditOwner {
    /// Owned by a user alone.
    pub fn user(user_id: &str) -> Self {
        Self {
            user: Some(user_id.to_owned()),
            household: None,
        }
    }

    /// Owned by a household alone.
    pub fn household(household_id: &str) -> Self {
        Self {
            user: None,
            household: Some(household_id.to_owned()),
        }
    }

    /// Owned by neither, as for service-level catalogue rows.
    pub fn nobody() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn changes_serialise_as_camel_case_map() {
        let input = AuditLogEntryCreationInput::updated(resource_types::MEAL_PLAN_OPTIONS, "o-1")
            .with_change("chosen", false, true)
            .with_change("tiebroken", false, true);

        let value = serde_json::to_value(&input.changes).expect("serialise changes");

        assert_eq!(
            value,
            json!({
                "chosen": { "oldValue": false, "newValue": true },
                "tiebroken": { "oldValue": false, "newValue": true },
            })
        );
    }

    #[rstest]
    fn changes_round_trip_from_stored_json() {
        let stored = json!({ "username": { "oldValue": "a", "newValue": "b" } });

        let changes: AuditLogChanges = serde_json::from_value(stored).expect("deserialise");

        let change = changes.get("username").expect("username change");
        assert_eq!(change.old_value, json!("a"));
        assert_eq!(change.new_value, json!("b"));
    }

    #[rstest]
    fn owner_sets_both_attributions() {
        let input = AuditLogEntryCreationInput::archived(resource_types::WEBHOOKS, "w-1")
            .with_owner(AuditOwner::household("h-1"));

        assert_eq!(input.belongs_to_household.as_deref(), Some("h-1"));
        assert!(input.belongs_to_user.is_none());
        assert_eq!(input.event_type, AuditLogEventType::Archived);
    }
}
