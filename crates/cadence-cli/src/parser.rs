use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_english::{parse_date_string, Dialect};

/// Parse a date argument: RFC 3339 first, then the common compact forms,
/// then free-form English ("tomorrow", "next friday").
pub fn parse_datetime(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    parse_date_string(input, Utc::now(), Dialect::Us)
        .map_err(|e| anyhow::anyhow!("Failed to parse date '{}': {}", input, e))
}
