use super::empty_string_as_none;
use super::timestamp::resolve_occurred_at;
use crate::metrics::RawRecord;
use chrono_tz::Tz;
use serde::Deserialize;
use std::io::Read;
use tracing::debug;

pub(crate) fn parse_records<R: Read>(reader: R, timezone: Tz) -> Result<Vec<RawRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut records = Vec::new();

    for row in csv_reader.deserialize::<CloserRow>() {
        records.push(row?.into_record(timezone));
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct CloserRow {
    #[serde(
        rename = "Partner",
        alias = "Partner Assigned",
        alias = "partner-assigned-from-full-org-app",
        default
    )]
    partner: String,
    #[serde(
        rename = "Appt Route",
        alias = "Route",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    route: Option<String>,
    #[serde(rename = "Status", alias = "Appt Status", default)]
    status: String,
    #[serde(
        rename = "Appointment Date",
        alias = "Appt Date",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    appointment_date: Option<String>,
    #[serde(
        rename = "Created On",
        alias = "Created At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    created_on: Option<String>,
    #[serde(
        rename = "Sale Value",
        alias = "Revenue",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    sale_value: Option<String>,
    #[serde(
        rename = "KW Size",
        alias = "kw-size",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    kw_size: Option<String>,
}

impl CloserRow {
    fn into_record(self, timezone: Tz) -> RawRecord {
        let occurred_at = resolve_occurred_at(
            self.appointment_date.as_deref(),
            self.created_on.as_deref(),
            timezone,
        );

        RawRecord {
            sale_value: self.sale_value.as_deref().and_then(parse_amount),
            size_kw: self.kw_size.as_deref().and_then(parse_amount),
            partner_identity: self.partner,
            route_label: self.route,
            status_label: self.status,
            occurred_at,
        }
    }
}

/// Accepts "$12,500.00"-style amounts; anything else is treated as absent.
pub(crate) fn parse_amount(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Some(amount),
        _ => {
            debug!(raw = value, "ignoring non-numeric amount");
            None
        }
    }
}
