use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ActionKind;

/// Open key/value bag attached to an interaction (capture source, user agent, ...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One recorded interaction against a scenario page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: i64,
    pub scenario_id: String,
    pub session_id: String,
    pub action_performed: ActionKind,
    pub element_interacted: String,
    pub value_filled: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Caller-supplied interaction, before validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewInteraction {
    pub action: Option<String>,
    pub element: Option<String>,
    pub value: Option<String>,
    pub metadata: Option<Metadata>,
}

/// A validated interaction ready to be appended to a store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub scenario_id: String,
    pub session_id: String,
    pub action_performed: ActionKind,
    pub element_interacted: String,
    pub value_filled: Option<String>,
    pub metadata: Metadata,
}
