use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use metrics_exporter_prometheus::PrometheusHandle;
use partner_metrics::access::{ManagementGate, ReportCache, TokenRegistry};
use partner_metrics::config::AppConfig;
use partner_metrics::import::{CsvRecordSource, ImportError, RecordSource, StaticRecordSource};
use partner_metrics::metrics::{AggregationOutcome, Aggregator};
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Everything the report routes need; built once at startup and shared by handle.
#[derive(Clone)]
pub(crate) struct ReportState {
    pub(crate) source: Arc<dyn RecordSource>,
    pub(crate) aggregator: Aggregator,
    pub(crate) tokens: Arc<TokenRegistry>,
    pub(crate) cache: Arc<ReportCache>,
    pub(crate) management: ManagementGate,
    pub(crate) public_base_url: String,
    /// When keyed tokens were last re-derived from the record source.
    pub(crate) token_refresh: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl ReportState {
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        let reporting = &config.reporting;
        let source: Arc<dyn RecordSource> = match &reporting.appointments_csv {
            Some(path) => Arc::new(CsvRecordSource::new(path.clone(), reporting.timezone)),
            None => Arc::new(StaticRecordSource::new(Vec::new())),
        };

        Self {
            source,
            aggregator: Aggregator::new(reporting.timezone)
                .with_revenue_per_kw(reporting.revenue_per_kw),
            tokens: Arc::new(TokenRegistry::with_secret(reporting.token_secret.clone())),
            cache: Arc::new(ReportCache::new(reporting.cache_ttl)),
            management: ManagementGate::new(reporting.management_key.as_deref()),
            public_base_url: reporting.public_base_url.clone(),
            token_refresh: Arc::default(),
        }
    }

    pub(crate) fn timezone(&self) -> Tz {
        self.aggregator.timezone()
    }

    pub(crate) fn report_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone()).date_naive()
    }

    /// Fetches the current records and aggregates them against `now`.
    pub(crate) fn rollup(&self, now: DateTime<Utc>) -> Result<AggregationOutcome, ImportError> {
        let records = self.source.fetch()?;
        Ok(self.aggregator.aggregate(&records, now))
    }

    /// Re-derives keyed tokens for every current partner, at most once per cache TTL.
    /// Returns whether the source was read.
    pub(crate) fn refresh_tokens(&self, now: DateTime<Utc>) -> Result<bool, ImportError> {
        if !self.tokens.is_keyed() {
            return Ok(false);
        }

        let mut last = self
            .token_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let fresh = last
            .and_then(|at| (now - at).to_std().ok())
            .is_some_and(|age| age < self.cache.ttl());
        if fresh {
            return Ok(false);
        }

        let outcome = self.rollup(now)?;
        self.tokens.register_all(outcome.table.keys());
        *last = Some(now);
        debug!(tokens = self.tokens.len(), "partner tokens refreshed");
        Ok(true)
    }

    pub(crate) fn partner_url(&self, token: &str) -> String {
        format!("{}/partner/{}", self.public_base_url, token)
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}

pub(crate) fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_timestamp(&value).map_err(serde::de::Error::custom))
        .transpose()
}
