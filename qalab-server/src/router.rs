use qalab_core::protocol::{QalabRequest, QalabResponse};
use qalab_core::ValidationService;
use serde::Serialize;
use sqlx::PgPool;

pub async fn handle_request(request: QalabRequest, service: &ValidationService) -> QalabResponse {
    handle_request_with_pool(request, service, None).await
}

/// Handle request with an optional database pool for health reporting
pub async fn handle_request_with_pool(
    request: QalabRequest,
    service: &ValidationService,
    pool: Option<&PgPool>,
) -> QalabResponse {
    match request {
        QalabRequest::Ping => QalabResponse::pong(),
        QalabRequest::Health => {
            let mut body = serde_json::json!({
                "status": "healthy",
                "store": service.store_backend(),
                "scenarios": service.catalog().len(),
            });
            if let Some(pool) = pool {
                match qalab_core::db::health_check(pool).await {
                    Ok(v) => body["postgresql"] = serde_json::json!(v),
                    Err(e) => {
                        tracing::error!("DB health check failed: {}", e);
                        return QalabResponse::err("internal", "database unavailable");
                    }
                }
            }
            QalabResponse::ok(body)
        }
        QalabRequest::ListScenarios { labels } => {
            let scenarios = service.search_scenarios(&labels);
            let count = scenarios.len();
            match serde_json::to_value(&scenarios) {
                Ok(list) => QalabResponse::ok(serde_json::json!({
                    "scenarios": list,
                    "count": count,
                    "labels": labels,
                })),
                Err(e) => serialization_failure(e),
            }
        }
        QalabRequest::GetScenario { id } => match service.scenario(&id) {
            Ok(def) => to_response(&def),
            Err(e) => e.into(),
        },
        QalabRequest::Record {
            scenario_id,
            session_id,
            interaction,
        } => match service
            .record_interaction(&scenario_id, &session_id, interaction)
            .await
        {
            Ok(record) => to_response(&record),
            Err(e) => e.into(),
        },
        QalabRequest::Validate {
            scenario_id,
            session_id,
        } => match service.validate_and_update(&scenario_id, &session_id).await {
            Ok(result) => to_response(&result),
            Err(e) => e.into(),
        },
        QalabRequest::Reset {
            scenario_id,
            session_id,
        } => match service.reset(&scenario_id, &session_id).await {
            Ok(removed) => QalabResponse::ok(serde_json::json!({
                "scenario_id": scenario_id,
                "removed": removed,
            })),
            Err(e) => e.into(),
        },
        QalabRequest::ResetAll { session_id } => match service.reset_all(&session_id).await {
            Ok(removed) => QalabResponse::ok(serde_json::json!({"removed": removed})),
            Err(e) => e.into(),
        },
    }
}

fn to_response<T: Serialize>(value: &T) -> QalabResponse {
    match serde_json::to_value(value) {
        Ok(data) => QalabResponse::ok(data),
        Err(e) => serialization_failure(e),
    }
}

fn serialization_failure(e: serde_json::Error) -> QalabResponse {
    tracing::error!("Failed to serialize response: {}", e);
    QalabResponse::err("internal", "internal error")
}
