use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tokio::time::Instant;

use crate::consistency::ConsistencyReport;
use crate::error::ApiError;
use crate::metrics;
use crate::models::{
    BatchFeatureRequest, BatchFeatureResponse, ConsistencyRequest, FeatureRequestBody,
    FeatureResponse, HealthResponse, StatsResponse,
};
use crate::server::AppState;

/// `POST /api/v1/features`
pub async fn get_features(
    State(state): State<AppState>,
    payload: Result<Json<FeatureRequestBody>, JsonRejection>,
) -> Result<Json<FeatureResponse>, ApiError> {
    let Json(body) = payload?;
    let request = body.into_request()?;
    let result = match state.request_deadline {
        Some(limit) => {
            state
                .resolver
                .resolve_before(&request, Instant::now() + limit)
                .await?
        }
        None => state.resolver.resolve(&request).await?,
    };
    Ok(Json(result.into()))
}

/// `POST /api/v1/features/batch`
pub async fn get_features_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchFeatureRequest>, JsonRejection>,
) -> Result<Json<BatchFeatureResponse>, ApiError> {
    let start = Instant::now();
    let Json(body) = payload?;
    let requests = body.into_requests()?;
    let results = state.batch.resolve_many(requests).await?;

    Ok(Json(BatchFeatureResponse {
        responses: results.into_iter().map(FeatureResponse::from).collect(),
        latency_ms: start.elapsed().as_millis() as u64,
    }))
}

/// `POST /api/v1/consistency`: compare remote and offline values.
pub async fn check_consistency(
    State(state): State<AppState>,
    payload: Result<Json<ConsistencyRequest>, JsonRejection>,
) -> Result<Json<ConsistencyReport>, ApiError> {
    let Json(body) = payload?;
    let (entities, features) = body.into_parts()?;
    let report = state.consistency.check_many(&entities, &features).await?;
    Ok(Json(report))
}

/// `GET /stats`
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.stats.snapshot().into())
}

/// `GET /health`: 503 unless both backing tiers answer.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (redis, postgres) = tokio::join!(
        state.resolver.remote().health(),
        state.resolver.offline().health()
    );
    if let Err(err) = &redis {
        tracing::warn!(error = %err, "redis health check failed");
    }
    if let Err(err) = &postgres {
        tracing::warn!(error = %err, "postgres health check failed");
    }

    let body = HealthResponse::new(redis.is_ok(), postgres.is_ok());
    let status = if body.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// `GET /metrics`: Prometheus text format.
pub async fn prometheus_metrics() -> impl IntoResponse {
    match metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "metrics recorder not installed".to_string(),
        ),
    }
}
