use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estimated revenue per kW of system size when no explicit sale value exists.
pub const DEFAULT_REVENUE_PER_KW: f64 = 1500.0;

/// When an appointment happened, as far as the source could tell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurredAt {
    At(DateTime<Utc>),
    Unparseable(String),
    Missing,
}

impl OccurredAt {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(at) => Some(*at),
            Self::Unparseable(_) | Self::Missing => None,
        }
    }
}

/// One appointment as delivered by a record source. Never mutated by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub partner_identity: String,
    pub route_label: Option<String>,
    pub status_label: String,
    pub occurred_at: OccurredAt,
    pub sale_value: Option<f64>,
    pub size_kw: Option<f64>,
}

impl RawRecord {
    pub fn new(
        partner_identity: impl Into<String>,
        status_label: impl Into<String>,
        occurred_at: OccurredAt,
    ) -> Self {
        Self {
            partner_identity: partner_identity.into(),
            route_label: None,
            status_label: status_label.into(),
            occurred_at,
            sale_value: None,
            size_kw: None,
        }
    }

    pub fn with_route(mut self, route_label: impl Into<String>) -> Self {
        self.route_label = Some(route_label.into());
        self
    }

    pub fn with_sale_value(mut self, sale_value: f64) -> Self {
        self.sale_value = Some(sale_value);
        self
    }

    pub fn with_size_kw(mut self, size_kw: f64) -> Self {
        self.size_kw = Some(size_kw);
        self
    }

    /// Revenue in whole cents: the sale value if present, otherwise size times the per-kW rate.
    pub fn estimated_revenue_cents(&self, revenue_per_kw: f64) -> u64 {
        let dollars = match (self.sale_value, self.size_kw) {
            (Some(value), _) => value,
            (None, Some(size)) => size * revenue_per_kw,
            (None, None) => 0.0,
        };

        if !dollars.is_finite() || dollars <= 0.0 {
            return 0;
        }
        (dollars * 100.0).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RawRecord {
        RawRecord::new("Crew A", "Sat", OccurredAt::Missing)
    }

    #[test]
    fn sale_value_wins_over_size_estimate() {
        let record = record().with_sale_value(42_000.5).with_size_kw(8.0);
        assert_eq!(record.estimated_revenue_cents(DEFAULT_REVENUE_PER_KW), 4_200_050);
    }

    #[test]
    fn size_estimate_uses_per_kw_rate() {
        let record = record().with_size_kw(7.2);
        assert_eq!(record.estimated_revenue_cents(DEFAULT_REVENUE_PER_KW), 1_080_000);
    }

    #[test]
    fn missing_or_invalid_values_estimate_zero() {
        assert_eq!(record().estimated_revenue_cents(DEFAULT_REVENUE_PER_KW), 0);
        let negative = record().with_sale_value(-10.0);
        assert_eq!(negative.estimated_revenue_cents(DEFAULT_REVENUE_PER_KW), 0);
        let nan = record().with_size_kw(f64::NAN);
        assert_eq!(nan.estimated_revenue_cents(DEFAULT_REVENUE_PER_KW), 0);
    }
}
