use serde::{Deserialize, Serialize};

use super::InteractionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Neutral,
    Pass,
    Fail,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Neutral => "neutral",
            VerdictStatus::Pass => "pass",
            VerdictStatus::Fail => "fail",
        }
    }
}

/// Verdict for one (scenario, session) pair. Always derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: VerdictStatus,
    pub message: String,
    pub actions: Vec<InteractionRecord>,
    pub action_count: usize,
}
