//! Recurrence rule value type and its textual grammar.
//!
//! Rules travel as a semicolon-delimited `KEY=value` string
//! (`FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,FR;COUNT=10`, the familiar calendar
//! recurrence grammar). Parsing produces an immutable [`RecurrenceRule`];
//! encoding is the inverse, omitting parts at their defaults, so that
//! `parse(encode(r)) == r` for every rule this grammar can express.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Step unit of a recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
}

impl Frequency {
    fn as_str(&self) -> &'static str {
        match self {
            Frequency::Yearly => "YEARLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Daily => "DAILY",
        }
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "YEARLY" => Ok(Frequency::Yearly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "WEEKLY" => Ok(Frequency::Weekly),
            "DAILY" => Ok(Frequency::Daily),
            other => Err(CoreError::MalformedRule(format!(
                "unrecognized frequency '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One BYDAY entry: a weekday, optionally prefixed with an ordinal
/// (`2MO` = second Monday of the period, `-1FR` = last Friday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByDay {
    pub ordinal: Option<i32>,
    pub weekday: Weekday,
}

/// Stopping condition of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The rule never ends on its own.
    Never,
    /// The sequence spans this many occurrences, the anchor included.
    After(u32),
    /// No occurrence may start after this instant (inclusive).
    OnDate(DateTime<Utc>),
}

/// An instant excluded from the generated sequence. `date_only` entries
/// suppress every instant on that UTC calendar date; full entries match
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionDate {
    pub at: DateTime<Utc>,
    pub date_only: bool,
}

/// Immutable recurrence definition. Constructed by [`RecurrenceRule::parse`]
/// or directly; never mutated after construction, so there is no cached
/// derived state to invalidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub by_day: Vec<ByDay>,
    pub by_month: Vec<u32>,
    pub by_month_day: Vec<i32>,
    pub by_set_pos: Vec<i32>,
    pub termination: Termination,
    pub exception_dates: Vec<ExceptionDate>,
}

impl RecurrenceRule {
    /// Parses the textual grammar.
    ///
    /// Fails with [`CoreError::MalformedRule`] when FREQ is missing or
    /// unrecognized, when COUNT and UNTIL are both present, when a numeric
    /// part does not parse, or when an unknown part appears.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let mut frequency: Option<Frequency> = None;
        let mut interval: u32 = 1;
        let mut by_day: Vec<ByDay> = Vec::new();
        let mut by_month: Vec<u32> = Vec::new();
        let mut by_month_day: Vec<i32> = Vec::new();
        let mut by_set_pos: Vec<i32> = Vec::new();
        let mut count: Option<u32> = None;
        let mut until: Option<DateTime<Utc>> = None;
        let mut exception_dates: Vec<ExceptionDate> = Vec::new();

        for part in text.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=').ok_or_else(|| {
                CoreError::MalformedRule(format!("rule part '{}' is not KEY=value", part))
            })?;
            let value = value.trim();

            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => frequency = Some(value.parse()?),
                "INTERVAL" => {
                    interval = parse_positive_int(value, "INTERVAL")?;
                }
                "COUNT" => {
                    count = Some(parse_positive_int(value, "COUNT")?);
                }
                "UNTIL" => {
                    until = Some(parse_until(value)?);
                }
                "BYDAY" => {
                    for item in value.split(',') {
                        push_unique(&mut by_day, parse_by_day(item.trim())?);
                    }
                }
                "BYMONTH" => {
                    for item in value.split(',') {
                        let month: u32 = parse_int(item.trim(), "BYMONTH")?;
                        if !(1..=12).contains(&month) {
                            return Err(CoreError::MalformedRule(format!(
                                "BYMONTH value {} out of range",
                                month
                            )));
                        }
                        push_unique(&mut by_month, month);
                    }
                }
                "BYMONTHDAY" => {
                    for item in value.split(',') {
                        let day: i32 = parse_int(item.trim(), "BYMONTHDAY")?;
                        if day == 0 || day.abs() > 31 {
                            return Err(CoreError::MalformedRule(format!(
                                "BYMONTHDAY value {} out of range",
                                day
                            )));
                        }
                        push_unique(&mut by_month_day, day);
                    }
                }
                "BYSETPOS" => {
                    for item in value.split(',') {
                        let pos: i32 = parse_int(item.trim(), "BYSETPOS")?;
                        if pos == 0 || pos.abs() > 366 {
                            return Err(CoreError::MalformedRule(format!(
                                "BYSETPOS value {} out of range",
                                pos
                            )));
                        }
                        push_unique(&mut by_set_pos, pos);
                    }
                }
                "EXDATE" => {
                    for item in value.split(',') {
                        push_unique(&mut exception_dates, parse_exception(item.trim())?);
                    }
                }
                other => {
                    return Err(CoreError::MalformedRule(format!(
                        "unrecognized rule part '{}'",
                        other
                    )));
                }
            }
        }

        let frequency = frequency
            .ok_or_else(|| CoreError::MalformedRule("FREQ part is required".to_string()))?;

        let termination = match (count, until) {
            (Some(_), Some(_)) => {
                return Err(CoreError::MalformedRule(
                    "COUNT and UNTIL are mutually exclusive".to_string(),
                ));
            }
            (Some(n), None) => Termination::After(n),
            (None, Some(d)) => Termination::OnDate(d),
            (None, None) => Termination::Never,
        };

        Ok(RecurrenceRule {
            frequency,
            interval,
            by_day,
            by_month,
            by_month_day,
            by_set_pos,
            termination,
            exception_dates,
        })
    }

    /// Encodes back into the textual grammar. Parts at their defaults
    /// (INTERVAL=1, empty by-lists, no termination) are omitted.
    pub fn encode(&self) -> String {
        let mut parts: Vec<String> = vec![format!("FREQ={}", self.frequency)];

        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        if !self.by_day.is_empty() {
            let days: Vec<String> = self.by_day.iter().map(encode_by_day).collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }
        if !self.by_month.is_empty() {
            parts.push(format!("BYMONTH={}", join_ints(&self.by_month)));
        }
        if !self.by_month_day.is_empty() {
            parts.push(format!("BYMONTHDAY={}", join_ints(&self.by_month_day)));
        }
        if !self.by_set_pos.is_empty() {
            parts.push(format!("BYSETPOS={}", join_ints(&self.by_set_pos)));
        }
        match self.termination {
            Termination::Never => {}
            Termination::After(n) => parts.push(format!("COUNT={}", n)),
            Termination::OnDate(d) => {
                parts.push(format!("UNTIL={}", d.format("%Y%m%dT%H%M%SZ")));
            }
        }
        if !self.exception_dates.is_empty() {
            let entries: Vec<String> = self
                .exception_dates
                .iter()
                .map(|ex| {
                    if ex.date_only {
                        ex.at.format("%Y%m%d").to_string()
                    } else {
                        ex.at.format("%Y%m%dT%H%M%SZ").to_string()
                    }
                })
                .collect();
            parts.push(format!("EXDATE={}", entries.join(",")));
        }

        parts.join(";")
    }

    /// Whether the given instant is suppressed by one of the rule's
    /// exception dates, at the granularity recorded on the exception.
    pub fn excludes(&self, start: DateTime<Utc>) -> bool {
        self.exception_dates.iter().any(|ex| {
            if ex.date_only {
                ex.at.date_naive() == start.date_naive()
            } else {
                ex.at == start
            }
        })
    }

    /// The COUNT value, if the rule terminates after a fixed number of
    /// occurrences. Persisted denormalized alongside the rule text.
    pub fn count(&self) -> Option<u32> {
        match self.termination {
            Termination::After(n) => Some(n),
            _ => None,
        }
    }

    /// The UNTIL instant, if the rule terminates on a date. Persisted
    /// denormalized alongside the rule text.
    pub fn until(&self) -> Option<DateTime<Utc>> {
        match self.termination {
            Termination::OnDate(d) => Some(d),
            _ => None,
        }
    }
}

impl FromStr for RecurrenceRule {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecurrenceRule::parse(s)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn parse_int<T: FromStr>(value: &str, part: &str) -> Result<T, CoreError> {
    value.parse().map_err(|_| {
        CoreError::MalformedRule(format!("{} value '{}' is not an integer", part, value))
    })
}

fn parse_positive_int(value: &str, part: &str) -> Result<u32, CoreError> {
    let n: u32 = parse_int(value, part)?;
    if n == 0 {
        return Err(CoreError::MalformedRule(format!(
            "{} must be at least 1",
            part
        )));
    }
    Ok(n)
}

fn parse_by_day(item: &str) -> Result<ByDay, CoreError> {
    if item.len() < 2 {
        return Err(CoreError::MalformedRule(format!(
            "BYDAY entry '{}' is too short",
            item
        )));
    }
    let split = item.len() - 2;
    let (prefix, code) = item.split_at(split);
    let weekday = weekday_from_code(code)?;
    let ordinal = if prefix.is_empty() {
        None
    } else {
        let n: i32 = parse_int(prefix, "BYDAY")?;
        if n == 0 || n.abs() > 53 {
            return Err(CoreError::MalformedRule(format!(
                "BYDAY ordinal {} out of range",
                n
            )));
        }
        Some(n)
    };
    Ok(ByDay { ordinal, weekday })
}

fn encode_by_day(day: &ByDay) -> String {
    match day.ordinal {
        Some(n) => format!("{}{}", n, weekday_code(day.weekday)),
        None => weekday_code(day.weekday).to_string(),
    }
}

fn weekday_from_code(code: &str) -> Result<Weekday, CoreError> {
    match code.to_ascii_uppercase().as_str() {
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        "SU" => Ok(Weekday::Sun),
        other => Err(CoreError::MalformedRule(format!(
            "unrecognized weekday code '{}'",
            other
        ))),
    }
}

fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

// UNTIL accepts the date-only and the full datetime forms; date-only values
// normalize to midnight UTC, and encode always re-emits the full form.
fn parse_until(value: &str) -> Result<DateTime<Utc>, CoreError> {
    if let Some(date) = parse_compact_date(value) {
        return Ok(date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC));
    }
    parse_compact_datetime(value)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| CoreError::MalformedRule(format!("UNTIL value '{}' is not a date", value)))
}

fn parse_exception(value: &str) -> Result<ExceptionDate, CoreError> {
    if let Some(date) = parse_compact_date(value) {
        let at = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC);
        return Ok(ExceptionDate {
            at,
            date_only: true,
        });
    }
    parse_compact_datetime(value)
        .map(|dt| ExceptionDate {
            at: dt.and_utc(),
            date_only: false,
        })
        .ok_or_else(|| CoreError::MalformedRule(format!("EXDATE value '{}' is not a date", value)))
}

fn parse_compact_date(value: &str) -> Option<NaiveDate> {
    if value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()) {
        NaiveDate::parse_from_str(value, "%Y%m%d").ok()
    } else {
        None
    }
}

fn parse_compact_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.strip_suffix('Z').unwrap_or(value);
    if trimmed.len() == 15 {
        NaiveDateTime::parse_from_str(trimmed, "%Y%m%dT%H%M%S").ok()
    } else {
        None
    }
}

fn join_ints<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
