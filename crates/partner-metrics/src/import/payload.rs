use super::timestamp::resolve_occurred_at;
use crate::metrics::RawRecord;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Loosely-shaped appointment record as posted by webhook or API callers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecordPayload {
    #[serde(default, alias = "partner")]
    pub partner_identity: String,
    #[serde(default, alias = "route")]
    pub route_label: Option<String>,
    #[serde(default, alias = "status")]
    pub status_label: String,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub sale_value: Option<f64>,
    #[serde(default, alias = "kw_size")]
    pub size_kw: Option<f64>,
}

impl RecordPayload {
    pub fn into_record(self, timezone: Tz) -> RawRecord {
        let occurred_at = resolve_occurred_at(
            self.appointment_date.as_deref(),
            self.created_on.as_deref(),
            timezone,
        );

        RawRecord {
            partner_identity: self.partner_identity,
            route_label: self.route_label.filter(|route| !route.trim().is_empty()),
            status_label: self.status_label,
            occurred_at,
            sale_value: self.sale_value.filter(|value| value.is_finite()),
            size_kw: self.size_kw.filter(|value| value.is_finite()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{OccurredAt, REFERENCE_TIMEZONE};

    #[test]
    fn payload_accepts_short_field_names() {
        let payload: RecordPayload = serde_json::from_str(
            r#"{"partner":" Crew A","route":"","status":"Sat","created_on":"2025-06-18T12:00:00Z","kw_size":6.0}"#,
        )
        .expect("payload deserializes");
        let record = payload.into_record(REFERENCE_TIMEZONE);

        assert_eq!(record.partner_identity, " Crew A");
        assert!(record.route_label.is_none());
        assert_eq!(record.size_kw, Some(6.0));
        assert!(matches!(record.occurred_at, OccurredAt::At(_)));
    }

    #[test]
    fn empty_payload_defaults_every_field() {
        let payload: RecordPayload = serde_json::from_str("{}").expect("payload deserializes");
        let record = payload.into_record(REFERENCE_TIMEZONE);
        assert_eq!(record.partner_identity, "");
        assert_eq!(record.occurred_at, OccurredAt::Missing);
    }
}
