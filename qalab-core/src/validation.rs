//! Scenario validation - recorded interactions → pass / fail / neutral
//!
//! The verdict is always derived fresh from the store:
//!   - no records            → neutral
//!   - last record matches   → pass  (action AND target, exact, case-sensitive)
//!   - anything else         → fail
//!
//! Only the most recent interaction decides the status. Earlier ones are
//! returned in `actions` for display and never change the outcome.

use std::sync::Arc;

use crate::catalog::ScenarioCatalog;
use crate::error::{ScenarioError, StoreError};
use crate::models::{
    ActionKind, InteractionRecord, NewInteraction, NewRecord, ScenarioDefinition,
    ValidationResult, VerdictStatus,
};
use crate::store::InteractionStore;

pub const NO_ACTIONS_MESSAGE: &str = "No actions recorded yet";

/// Pure verdict computation over an ordered interaction history.
pub fn judge(definition: &ScenarioDefinition, records: Vec<InteractionRecord>) -> ValidationResult {
    if records.is_empty() {
        return ValidationResult {
            status: VerdictStatus::Neutral,
            message: NO_ACTIONS_MESSAGE.to_string(),
            actions: records,
            action_count: 0,
        };
    }

    let last = &records[records.len() - 1];
    let action_ok = last.action_performed == definition.expected_action;
    let target_ok = last.element_interacted == definition.expected_target;

    let (status, message) = if action_ok && target_ok {
        (
            VerdictStatus::Pass,
            format!(
                "Correct: {} on '{}'",
                definition.expected_action, definition.expected_target
            ),
        )
    } else {
        let reason = match (action_ok, target_ok) {
            (false, true) => "wrong action",
            (true, false) => "wrong target",
            _ => "wrong action and target",
        };
        (
            VerdictStatus::Fail,
            format!(
                "Incorrect ({}): expected {} on '{}', got {} on '{}'",
                reason,
                definition.expected_action,
                definition.expected_target,
                last.action_performed,
                last.element_interacted
            ),
        )
    };

    let action_count = records.len();
    ValidationResult {
        status,
        message,
        actions: records,
        action_count,
    }
}

/// Front door for recording, judging and resetting scenario interactions.
#[derive(Clone)]
pub struct ValidationService {
    catalog: Arc<ScenarioCatalog>,
    store: Arc<dyn InteractionStore>,
}

impl ValidationService {
    pub fn new(catalog: Arc<ScenarioCatalog>, store: Arc<dyn InteractionStore>) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn store_backend(&self) -> &str {
        self.store.backend()
    }

    fn resolve(&self, scenario_id: &str) -> Result<&ScenarioDefinition, ScenarioError> {
        self.catalog
            .get(scenario_id)
            .ok_or_else(|| ScenarioError::NotFound(scenario_id.to_string()))
    }

    pub fn scenario(&self, scenario_id: &str) -> Result<ScenarioDefinition, ScenarioError> {
        self.resolve(scenario_id).cloned()
    }

    pub fn scenarios(&self) -> Vec<ScenarioDefinition> {
        self.catalog.all().to_vec()
    }

    /// Compute the current verdict for (scenario, session). Persists nothing.
    pub async fn validate_and_update(
        &self,
        scenario_id: &str,
        session_id: &str,
    ) -> Result<ValidationResult, ScenarioError> {
        let definition = self.resolve(scenario_id)?;
        let records = self
            .store
            .query_all(scenario_id, session_id)
            .await
            .map_err(|e| storage_failure("query_all", Some(scenario_id), session_id, e))?;

        let result = judge(definition, records);
        tracing::debug!(
            scenario_id,
            session_id,
            status = result.status.as_str(),
            action_count = result.action_count,
            "validated scenario"
        );
        Ok(result)
    }

    /// Append one interaction. Does not compute a verdict.
    pub async fn record_interaction(
        &self,
        scenario_id: &str,
        session_id: &str,
        interaction: NewInteraction,
    ) -> Result<InteractionRecord, ScenarioError> {
        self.resolve(scenario_id)?;

        let action = required(interaction.action, "action")?;
        let element = required(interaction.element, "element")?;
        let action: ActionKind = action.parse().map_err(ScenarioError::Validation)?;

        let value_filled = match (action, interaction.value) {
            (ActionKind::Fill, value) => value,
            (_, Some(_)) => {
                tracing::debug!(scenario_id, %action, "discarding value for non-fill action");
                None
            }
            (_, None) => None,
        };

        let record = NewRecord {
            scenario_id: scenario_id.to_string(),
            session_id: session_id.to_string(),
            action_performed: action,
            element_interacted: element,
            value_filled,
            metadata: interaction.metadata.unwrap_or_default(),
        };

        let stored = self
            .store
            .append(record)
            .await
            .map_err(|e| storage_failure("append", Some(scenario_id), session_id, e))?;

        tracing::info!(
            "Recorded {} on '{}' for scenario {} (record {})",
            stored.action_performed,
            stored.element_interacted,
            scenario_id,
            stored.id
        );
        Ok(stored)
    }

    /// Clear one scenario's history for a session. Unknown scenario ids are
    /// accepted so stale records can still be removed.
    pub async fn reset(&self, scenario_id: &str, session_id: &str) -> Result<u64, ScenarioError> {
        let removed = self
            .store
            .delete_all(scenario_id, session_id)
            .await
            .map_err(|e| storage_failure("delete_all", Some(scenario_id), session_id, e))?;
        tracing::info!("Reset scenario {}: removed {} records", scenario_id, removed);
        Ok(removed)
    }

    /// Clear every scenario's history for a session.
    pub async fn reset_all(&self, session_id: &str) -> Result<u64, ScenarioError> {
        let removed = self
            .store
            .delete_all_for_session(session_id)
            .await
            .map_err(|e| storage_failure("delete_all_for_session", None, session_id, e))?;
        tracing::info!("Reset session: removed {} records", removed);
        Ok(removed)
    }

    pub fn search_scenarios(&self, label_filters: &[String]) -> Vec<ScenarioDefinition> {
        self.catalog.filter_by_labels(label_filters)
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ScenarioError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ScenarioError::Validation(format!("{} field is required", field))),
    }
}

fn storage_failure(
    operation: &str,
    scenario_id: Option<&str>,
    session_id: &str,
    err: StoreError,
) -> ScenarioError {
    tracing::error!(
        operation,
        scenario_id = scenario_id.unwrap_or("*"),
        session_id,
        error = %err,
        "interaction store failure"
    );
    ScenarioError::Storage(err)
}

// ============================================================================
// TESTS
// ============================================================================
