use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};

/// Parse a WMS `time` value into UTC.
///
/// Accepts:
/// - RFC 3339 timestamps with any offset (`2023-10-01T00:00:00Z`, `...+02:00`)
/// - `YYYY-MM-DDTHH:MM:SS` without offset (taken as UTC)
/// - `YYYY-MM-DD` (midnight UTC)
pub fn parse_wms_time(s: &str) -> Result<DateTime<Utc>> {
    let trimmed = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.and_utc());
    }

    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        && let Some(dt) = d.and_hms_opt(0, 0, 0)
    {
        return Ok(dt.and_utc());
    }

    Err(Error::InvalidRequest(format!("unsupported time format: {trimmed}")))
}

/// Render as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_wms_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn normalize_wms_time(s: &str) -> Result<String> {
    Ok(format_wms_time(&parse_wms_time(s)?))
}
