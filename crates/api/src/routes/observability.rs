//! Health check and Prometheus metrics endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use booking::Notifier;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use store::{BookingStore, EventQuery};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// GET /health: reports whether the store answers queries.
pub async fn health<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
) -> (StatusCode, Json<HealthResponse>)
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    match state.catalog.list_events(EventQuery::new().limit(1)).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                store: "up",
            }),
        ),
        Err(err) => {
            tracing::error!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    store: "down",
                }),
            )
        }
    }
}

/// GET /metrics: Prometheus text exposition.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
