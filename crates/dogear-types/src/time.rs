use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, de};

/// Layouts accepted for timestamps that carry no offset. SQLite's
/// `datetime('now')` produces the first one.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a stored or client-supplied timestamp. Values without an offset are
/// interpreted as UTC.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ndt| ndt.and_utc())
}

/// Canonical storage form: RFC 3339, UTC, microsecond precision. Fixed width,
/// so lexical order matches chronological order.
pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `deserialize_with` helper for optional request timestamps. Blank strings
/// are treated as absent.
pub fn deserialize_optional_utc<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_utc(s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {s}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn naive_values_are_read_as_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap();
        assert_eq!(parse_utc("2024-03-09 14:30:05"), Some(expected));
        assert_eq!(parse_utc("2024-03-09T14:30:05"), Some(expected));
        assert_eq!(
            parse_utc("2024-03-09 14:30:05.250").map(|d| d.timestamp_subsec_millis()),
            Some(250)
        );
    }

    #[test]
    fn offsets_are_normalized() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(parse_utc("2024-03-09T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_utc("not a date"), None);
    }

    #[test]
    fn storage_format_is_fixed_width_utc() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_utc(dt), "2024-01-02T03:04:05.000000Z");
        assert_eq!(parse_utc(&format_utc(dt)), Some(dt));
    }
}
