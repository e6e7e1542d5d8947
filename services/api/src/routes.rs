use crate::infra::{deserialize_optional_timestamp, AppState, ReportState};
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use partner_metrics::access::{AccessError, CacheKey, TokenRegistry};
use partner_metrics::error::AppError;
use partner_metrics::import::{AppointmentImporter, RecordPayload};
use partner_metrics::metrics::{PartnerKey, PartnerMetricsView, RawRecord, SkippedRecordView};
use partner_metrics::reports::html::{render_management_dashboard, render_partner_html};
use partner_metrics::reports::ManagementSummary;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RollupRequest {
    #[serde(default)]
    pub(crate) records: Option<Vec<RecordPayload>>,
    #[serde(default)]
    pub(crate) csv: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub(crate) now: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RollupResponse {
    pub(crate) now: DateTime<Utc>,
    pub(crate) report_date: NaiveDate,
    pub(crate) summary: ManagementSummary,
    pub(crate) partners: Vec<PartnerMetricsView>,
    pub(crate) skipped: Vec<SkippedRecordView>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenRequest {
    pub(crate) management_key: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct IssuedToken {
    pub(crate) partner: PartnerKey,
    pub(crate) token: String,
    pub(crate) url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) count: usize,
    pub(crate) tokens: Vec<IssuedToken>,
}

pub(crate) fn with_report_routes(state: ReportState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/rollup", post(rollup_endpoint))
        .route("/api/v1/tokens", post(tokens_endpoint))
        .route("/partner/:token", get(partner_report_endpoint))
        .route("/management/:key", get(management_dashboard_endpoint))
        .layer(Extension(state))
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

/// Aggregates records posted in the body; falls back to the configured source when none are given.
pub(crate) async fn rollup_endpoint(
    Extension(state): Extension<ReportState>,
    Json(payload): Json<RollupRequest>,
) -> Result<Json<RollupResponse>, AppError> {
    let RollupRequest { records, csv, now } = payload;
    let now = now.unwrap_or_else(Utc::now);
    let importer = AppointmentImporter::new(state.timezone());

    let records: Option<Vec<RawRecord>> = match (records, csv) {
        (Some(payloads), _) => Some(importer.from_payloads(payloads)),
        (None, Some(csv)) => Some(importer.from_reader(Cursor::new(csv.into_bytes()))?),
        (None, None) => None,
    };

    let outcome = state.aggregator.aggregate_checked(records.as_deref(), now)?;
    info!(
        partners = outcome.table.len(),
        skipped = outcome.skipped.len(),
        "rollup computed"
    );

    Ok(Json(RollupResponse {
        now,
        report_date: state.report_date(now),
        summary: ManagementSummary::from_table(&outcome.table),
        partners: outcome.table.views(),
        skipped: outcome.skipped.iter().map(|skipped| skipped.to_view()).collect(),
    }))
}

pub(crate) async fn tokens_endpoint(
    Extension(state): Extension<ReportState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    state.management.verify(&payload.management_key)?;

    let outcome = state.rollup(Utc::now())?;
    let tokens: Vec<IssuedToken> = outcome
        .table
        .keys()
        .filter(|key| !key.is_unknown())
        .map(|key| {
            let token = state.tokens.token_for(key);
            IssuedToken {
                partner: key.clone(),
                url: state.partner_url(&token),
                token,
            }
        })
        .collect();

    info!(count = tokens.len(), "partner report tokens issued");
    Ok(Json(TokenResponse {
        count: tokens.len(),
        tokens,
    }))
}

pub(crate) async fn partner_report_endpoint(
    Extension(state): Extension<ReportState>,
    Path(token): Path<String>,
) -> Result<Html<String>, AppError> {
    let now = Utc::now();

    let key = match state.tokens.resolve(&token) {
        Some(key) => key,
        None if state.tokens.is_keyed() && TokenRegistry::is_well_formed(&token) => {
            // links minted by the notifier process are derivable from the current partner list
            state.refresh_tokens(now)?;
            state
                .tokens
                .resolve(&token)
                .ok_or(AccessError::UnknownToken)?
        }
        None => return Err(AccessError::UnknownToken.into()),
    };

    let cache_key = CacheKey::partner(key.clone(), state.report_date(now));
    if let Some(html) = state.cache.get(&cache_key, now) {
        return Ok(Html(html));
    }

    let outcome = state.rollup(now)?;
    let metrics = outcome
        .table
        .get(&key)
        .ok_or_else(|| AccessError::UnknownPartner(key.clone()))?;
    let html = render_partner_html(metrics, now.with_timezone(&state.timezone()));
    state.cache.insert(cache_key, html.clone(), now);

    info!(partner = %key, "partner report rendered");
    Ok(Html(html))
}

pub(crate) async fn management_dashboard_endpoint(
    Extension(state): Extension<ReportState>,
    Path(key): Path<String>,
) -> Result<Html<String>, AppError> {
    state.management.verify(&key)?;
    let now = Utc::now();

    let cache_key = CacheKey::management(state.report_date(now));
    if let Some(html) = state.cache.get(&cache_key, now) {
        return Ok(Html(html));
    }

    let outcome = state.rollup(now)?;
    let html = render_management_dashboard(&outcome.table, now.with_timezone(&state.timezone()));
    state.cache.insert(cache_key, html.clone(), now);
    Ok(Html(html))
}
