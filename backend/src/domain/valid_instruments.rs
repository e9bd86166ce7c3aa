//! Kitchen instruments recipes may call for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit_log::resource_types;
use super::ports::{Record, RepositoryError, Validate, require_id, require_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidInstrument {
    pub id: String,
    pub name: String,
    pub plural_name: String,
    pub description: String,
    pub icon_path: String,
    pub slug: String,
    pub usable_for_storage: bool,
    pub display_in_summary_lists: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidInstrumentCreationInput {
    pub name: String,
    pub plural_name: String,
    pub description: String,
    pub icon_path: String,
    pub slug: String,
    pub usable_for_storage: bool,
    pub display_in_summary_lists: bool,
}

impl Validate for ValidInstrument {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_id(&self.id, "valid instrument id")?;
        require_text(&self.name, "valid instrument name")
    }
}

impl Validate for ValidInstrumentCreationInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        require_text(&self.name, "valid instrument name")
    }
}

impl Record for ValidInstrument {
    type Scope = ();
    type Creation = ValidInstrumentCreationInput;

    const RESOURCE_TYPE: &'static str = resource_types::VALID_INSTRUMENTS;
    const SCOPE_NAME: &'static str = "";

    fn id(&self) -> &str {
        &self.id
    }
}
