use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Naive literal formats accepted after RFC 3339 fails. Naive timestamps are
/// taken as UTC; the literal carries no offset to honor.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Lenient timestamp coercion: absent, non-string, or unparsable values all
/// degrade to `None` instead of failing the record.
pub fn coerce_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = value?.as_str()?;
    parse_instant(raw.trim())
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    // Bare dates land at midnight UTC
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

/// Numeric coercion: JSON numbers pass through, numeric strings are parsed,
/// everything else degrades to `None`.
pub fn coerce_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Identifier/enum passthrough: strings only, no validation.
pub fn coerce_string(value: Option<&Value>) -> Option<String> {
    value?.as_str().map(str::to_owned)
}
