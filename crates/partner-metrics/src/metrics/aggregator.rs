use super::identity::{normalize, PartnerKey};
use super::record::{OccurredAt, RawRecord, DEFAULT_REVENUE_PER_KW};
use super::rollup::RollupTable;
use super::status;
use super::views::SkippedRecordView;
use super::window::{Window, WindowBounds, REFERENCE_TIMEZONE};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("no appointment records were supplied")]
    MissingInput,
}

/// Why a record contributed to no window counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnparseableTimestamp(String),
    MissingTimestamp,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnparseableTimestamp(raw) => write!(f, "unparseable timestamp '{raw}'"),
            SkipReason::MissingTimestamp => write!(f, "no appointment or creation timestamp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub partner: PartnerKey,
    pub reason: SkipReason,
}

impl SkippedRecord {
    pub fn to_view(&self) -> SkippedRecordView {
        SkippedRecordView {
            index: self.index,
            partner: self.partner.clone(),
            reason: self.reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationOutcome {
    pub table: RollupTable,
    pub skipped: Vec<SkippedRecord>,
}

/// Folds appointment records into a [`RollupTable`].
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    timezone: Tz,
    revenue_per_kw: f64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            timezone: REFERENCE_TIMEZONE,
            revenue_per_kw: DEFAULT_REVENUE_PER_KW,
        }
    }
}

impl Aggregator {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            ..Self::default()
        }
    }

    pub fn with_revenue_per_kw(mut self, revenue_per_kw: f64) -> Self {
        self.revenue_per_kw = revenue_per_kw;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn aggregate(&self, records: &[RawRecord], now: DateTime<Utc>) -> AggregationOutcome {
        let bounds = WindowBounds::resolve(now, self.timezone);
        let mut outcome = AggregationOutcome::default();

        for (index, record) in records.iter().enumerate() {
            let key = normalize(&record.partner_identity, record.route_label.as_deref());
            let metrics = outcome.table.entry(key.clone());

            let occurred_at = match &record.occurred_at {
                OccurredAt::At(at) => *at,
                OccurredAt::Unparseable(raw) => {
                    debug!(index, partner = %key, raw = %raw, "skipping record with unparseable timestamp");
                    outcome.skipped.push(SkippedRecord {
                        index,
                        partner: key,
                        reason: SkipReason::UnparseableTimestamp(raw.clone()),
                    });
                    continue;
                }
                OccurredAt::Missing => {
                    debug!(index, partner = %key, "skipping record without timestamp");
                    outcome.skipped.push(SkippedRecord {
                        index,
                        partner: key,
                        reason: SkipReason::MissingTimestamp,
                    });
                    continue;
                }
            };

            let windows = bounds.classify(occurred_at);
            let category = status::classify(&record.status_label);
            let revenue_cents = record.estimated_revenue_cents(self.revenue_per_kw);

            for window in windows.iter() {
                metrics.window_mut(window).record(category, revenue_cents);
            }
            if windows.contains(Window::Week) {
                metrics.has_activity_in_trailing_window = true;
            }
        }

        outcome
    }

    /// Variant for callers whose record collection may be absent altogether.
    pub fn aggregate_checked(
        &self,
        records: Option<&[RawRecord]>,
        now: DateTime<Utc>,
    ) -> Result<AggregationOutcome, AggregationError> {
        records
            .map(|records| self.aggregate(records, now))
            .ok_or(AggregationError::MissingInput)
    }
}

/// Aggregates with the New York calendar and default revenue estimate.
pub fn aggregate(records: &[RawRecord], now: DateTime<Utc>) -> RollupTable {
    Aggregator::default().aggregate(records, now).table
}
