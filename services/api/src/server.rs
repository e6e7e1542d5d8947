use crate::cli::ServeArgs;
use crate::infra::{AppState, ReportState};
use crate::routes::with_report_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use partner_metrics::config::AppConfig;
use partner_metrics::error::AppError;
use partner_metrics::telemetry;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    if config.reporting.appointments_csv.is_none() {
        warn!("APPOINTMENTS_CSV is not set; partner reports will be empty");
    }
    if config.reporting.management_key.is_none() {
        warn!("MANAGEMENT_KEY is not set; management dashboard and token issuing are disabled");
    }
    let report_state = ReportState::from_config(&config);
    if let Err(err) = report_state.refresh_tokens(Utc::now()) {
        warn!(error = %err, "could not pre-register partner tokens; will retry on first lookup");
    }

    let app = with_report_routes(report_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, timezone = %config.reporting.timezone, "partner metrics service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
