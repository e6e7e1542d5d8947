use crate::metrics::window::local_midnight;
use crate::metrics::OccurredAt;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

const LOCAL_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];
const LOCAL_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Parses RFC 3339 instants, or local date/times interpreted in `timezone`.
pub fn parse_timestamp(value: &str, timezone: Tz) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in LOCAL_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return timezone
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc));
        }
    }

    LOCAL_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .map(|date| local_midnight(timezone, date))
}

/// The appointment date wins; the creation timestamp is used only when the appointment date is absent.
pub fn resolve_occurred_at(
    appointment_date: Option<&str>,
    created_on: Option<&str>,
    timezone: Tz,
) -> OccurredAt {
    let present = |value: &&str| !value.trim().is_empty();
    let Some(raw) = appointment_date
        .filter(present)
        .or_else(|| created_on.filter(present))
    else {
        return OccurredAt::Missing;
    };

    match parse_timestamp(raw, timezone) {
        Some(at) => OccurredAt::At(at),
        None => OccurredAt::Unparseable(raw.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::REFERENCE_TIMEZONE;

    #[test]
    fn parses_rfc3339_and_local_formats() {
        let rfc = parse_timestamp("2025-06-18T13:00:00Z", REFERENCE_TIMEZONE).expect("rfc3339");
        assert_eq!(rfc, Utc.with_ymd_and_hms(2025, 6, 18, 13, 0, 0).unwrap());

        let local = parse_timestamp("2025-06-18 09:00:00", REFERENCE_TIMEZONE).expect("local");
        assert_eq!(local, rfc);

        let date = parse_timestamp("2025-06-18", REFERENCE_TIMEZONE).expect("date");
        assert_eq!(date, Utc.with_ymd_and_hms(2025, 6, 18, 4, 0, 0).unwrap());

        let us_date = parse_timestamp("06/18/2025", REFERENCE_TIMEZONE).expect("us date");
        assert_eq!(us_date, date);

        assert!(parse_timestamp("  ", REFERENCE_TIMEZONE).is_none());
        assert!(parse_timestamp("yesterday", REFERENCE_TIMEZONE).is_none());
    }

    #[test]
    fn creation_timestamp_is_a_fallback_only() {
        let tz = REFERENCE_TIMEZONE;
        assert!(matches!(
            resolve_occurred_at(None, Some("2025-06-18"), tz),
            OccurredAt::At(_)
        ));
        assert!(matches!(
            resolve_occurred_at(Some(" "), Some("2025-06-18"), tz),
            OccurredAt::At(_)
        ));
        assert_eq!(
            resolve_occurred_at(Some("soon"), Some("2025-06-18"), tz),
            OccurredAt::Unparseable("soon".to_string())
        );
        assert_eq!(resolve_occurred_at(None, None, tz), OccurredAt::Missing);
    }
}
