use crate::infra::{deserialize_date, AppState};
use crate::pipeline::{calculate_from_csv, CalculationOutcome};
use agent_incentives::error::AppError;
use axum::extract::rejection::JsonRejection;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;

#[derive(Debug, Deserialize)]
pub(crate) struct CalculationRequest {
    pub(crate) contracts_csv: String,
    pub(crate) rules_csv: String,
    #[serde(default)]
    pub(crate) consecutive_rules_csv: Option<String>,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) period_start: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) period_end: NaiveDate,
    #[serde(default)]
    pub(crate) company_filter: Option<String>,
}

pub(crate) fn router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/incentives/calculate", post(calculate_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn calculate_endpoint(
    Extension(state): Extension<AppState>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Result<Json<CalculationOutcome>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::Input(rejection.body_text()))?;
    let CalculationRequest {
        contracts_csv,
        rules_csv,
        consecutive_rules_csv,
        period_start,
        period_end,
        company_filter,
    } = request;

    let engine = state.engine.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        calculate_from_csv(
            &engine,
            Cursor::new(contracts_csv.into_bytes()),
            Cursor::new(rules_csv.into_bytes()),
            consecutive_rules_csv.map(|csv| Cursor::new(csv.into_bytes())),
            period_start,
            period_end,
            company_filter.as_deref(),
        )
    })
    .await
    .map_err(|err| AppError::Server(axum::Error::new(err)))??;

    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{CONTRACTS_CSV, RULES_CSV};
    use agent_incentives::workflows::incentives::{EngineConfig, IncentiveEngine};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn build_router(ready: bool) -> Router {
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            engine: Arc::new(IncentiveEngine::new(EngineConfig::default())),
        };
        router().layer(Extension(state))
    }

    async fn post_calculation(body: Value) -> (StatusCode, Value) {
        let response = build_router(true)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/incentives/calculate")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        (status, serde_json::from_slice(&body).expect("json"))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_reflects_the_startup_flag() {
        let response = build_router(false)
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn metrics_are_rendered_as_text() {
        let response = build_router(true)
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|value| value.as_bytes()),
            Some("text/plain; version=0.0.4".as_bytes())
        );
    }

    #[tokio::test]
    async fn calculation_returns_results_summary_and_recommendations() {
        let (status, body) = post_calculation(json!({
            "contracts_csv": CONTRACTS_CSV,
            "rules_csv": RULES_CSV,
            "period_start": "2025-03-01",
            "period_end": "2025-03-31",
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().expect("results array");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["agent_id"], "kim");
        assert_eq!(results[0]["final_payout"], 10_000.0);
        assert_eq!(body["summary"]["total_final_payout"], 14_000.0);
        assert!(body["recommendations"].as_array().is_some());
        assert!(body.get("contracts").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn calculation_leaves_the_runtime_free_for_other_routes() {
        let app = build_router(true);
        let calculation = tokio::spawn(post_calculation(json!({
            "contracts_csv": CONTRACTS_CSV,
            "rules_csv": RULES_CSV,
            "period_start": "2025-03-01",
            "period_end": "2025-03-31",
        })));

        let health = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(health.status(), StatusCode::OK);

        let (status, body) = calculation.await.expect("calculation task");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["total_final_payout"], 14_000.0);
    }

    #[tokio::test]
    async fn inverted_window_is_a_bad_request() {
        let (status, body) = post_calculation(json!({
            "contracts_csv": CONTRACTS_CSV,
            "rules_csv": RULES_CSV,
            "period_start": "2025-03-31",
            "period_end": "2025-03-01",
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn malformed_requests_are_bad_requests() {
        let (status, body) = post_calculation(json!({
            "contracts_csv": CONTRACTS_CSV,
            "period_start": "someday",
            "period_end": "2025-03-31",
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .is_some_and(|message| message.starts_with("invalid input")));
    }
}
