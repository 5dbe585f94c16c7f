use crate::cli::ServeArgs;
use crate::infra::{build_store, AppState};
use crate::routes::with_form_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use outreach_forms::config::AppConfig;
use outreach_forms::error::AppError;
use outreach_forms::store::AppendLog;
use outreach_forms::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (store, handler) = build_store(&config.sheets).await?;
    if config.sheets.initialize_on_startup {
        // Appends initialize lazily, so a failure here only delays the header rows.
        if let Err(err) = store.ensure_initialized().await {
            warn!(error = %err, "sheet initialization on startup failed");
        }
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        store: store.clone(),
    };

    let app = with_form_routes(handler)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        backend = store.backend().label(),
        "outreach forms service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
