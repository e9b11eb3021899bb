use crate::error::CoreError;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Validate an IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Normalize an all-day pair: the start snaps to 00:00:00 and the end to
/// 23:59:59 of their respective calendar days in the record's timezone.
/// Applied on every mutation of an all-day record.
pub fn normalize_all_day(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timezone: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>), CoreError> {
    let tz = validate_timezone(timezone)?;
    let start_day = start.with_timezone(&tz).date_naive();
    let end_day = end.with_timezone(&tz).date_naive();

    let day_start = NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default();
    let day_end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();

    Ok((
        local_instant(tz, start_day, day_start),
        local_instant(tz, end_day, day_end),
    ))
}

/// Resolve a local wall-clock time to UTC. Ambiguous times (DST fold) take
/// the earlier mapping; nonexistent times (DST gap) shift forward an hour.
fn local_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .unwrap_or_else(|| naive.and_utc())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_validate_timezone() {
        assert!(validate_timezone("UTC").is_ok());
        assert!(validate_timezone("America/New_York").is_ok());
        assert!(validate_timezone("Invalid/Timezone").is_err());
    }

    #[test]
    fn all_day_normalization_in_utc() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 2, 14, 0, 0).unwrap();
        let (s, e) = normalize_all_day(start, end, "UTC").unwrap();
        assert_eq!(s, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(e, Utc.with_ymd_and_hms(2024, 6, 2, 23, 59, 59).unwrap());
    }

    #[test]
    fn all_day_normalization_respects_record_timezone() {
        // 10:30 UTC on June 1 is 06:30 in New York; local midnight is 04:00 UTC (EDT)
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
        let (s, e) = normalize_all_day(start, start, "America/New_York").unwrap();
        assert_eq!(s, Utc.with_ymd_and_hms(2024, 6, 1, 4, 0, 0).unwrap());
        assert_eq!(e, Utc.with_ymd_and_hms(2024, 6, 2, 3, 59, 59).unwrap());
    }

    #[test]
    fn normalization_is_idempotent() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
        let (s1, e1) = normalize_all_day(start, start, "Europe/Berlin").unwrap();
        let (s2, e2) = normalize_all_day(s1, e1, "Europe/Berlin").unwrap();
        assert_eq!((s1, e1), (s2, e2));
        assert_eq!(s2.with_timezone(&chrono_tz::Europe::Berlin).hour(), 0);
    }
}
