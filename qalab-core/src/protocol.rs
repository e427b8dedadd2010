use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;
use crate::models::NewInteraction;

pub const PROTOCOL: &str = "qalab/1";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum QalabRequest {
    Ping,
    Health,
    ListScenarios {
        #[serde(default)]
        labels: Vec<String>,
    },
    GetScenario {
        id: String,
    },
    Record {
        scenario_id: String,
        session_id: String,
        interaction: NewInteraction,
    },
    Validate {
        scenario_id: String,
        session_id: String,
    },
    Reset {
        scenario_id: String,
        session_id: String,
    },
    ResetAll {
        session_id: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QalabResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    /// `not_found`, `invalid_input` or `internal` when `status` is "error".
    pub kind: Option<String>,
    pub version: String,
}

impl QalabResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            kind: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(kind: &str, msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            kind: Some(kind.to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

impl From<ScenarioError> for QalabResponse {
    fn from(e: ScenarioError) -> Self {
        QalabResponse::err(e.kind(), e.public_message())
    }
}
