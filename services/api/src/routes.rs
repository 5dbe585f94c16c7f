use crate::infra::{AppState, FormStore};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use outreach_forms::error::AppError;
use outreach_forms::forms::{form_router, SubmissionHandler};
use outreach_forms::store::AppendLog;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

pub(crate) fn with_form_routes(handler: Arc<SubmissionHandler<FormStore>>) -> axum::Router {
    form_router(handler)
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/sheets/initialize",
            axum::routing::post(initialize_sheets_endpoint),
        )
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready", "sheetsInitialized": state.store.is_initialized() })
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

pub(crate) async fn initialize_sheets_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Err(err) = state.store.ensure_initialized().await {
        error!(
            backend = state.store.backend().label(),
            error = %err,
            "sheet initialization failed"
        );
        return Err(err.into());
    }

    info!(backend = state.store.backend().label(), "sheets initialized");
    Ok(Json(json!({
        "success": true,
        "message": "Spreadsheet is ready to receive donations and applications.",
    })))
}
