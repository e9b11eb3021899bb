//! Occurrence expansion: turns a [`RecurrenceRule`] anchored at a date
//! record's own start/end pair into a lazy, strictly ordered sequence of
//! generated occurrence spans.
//!
//! The anchor itself is never emitted — it is persisted separately as the
//! `first` cache entry — and every emitted span preserves the anchor's
//! duration. Expansion is deterministic: identical (rule, anchor, bounds)
//! inputs always produce the identical sequence, which the cache diff
//! relies on.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};
use std::collections::VecDeque;

use crate::rrule::{Frequency, RecurrenceRule, Termination};

/// Consecutive empty periods tolerated before a rule is declared barren
/// (e.g. `FREQ=MONTHLY;BYMONTH=2;BYMONTHDAY=30` never matches). High enough
/// that a daily rule constrained to a leap day still clears the gap between
/// leap years.
const MAX_BARREN_PERIODS: u32 = 4_000;

/// One generated occurrence: a start/end instant pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Lazy iterator over the instants a rule generates beyond its anchor.
///
/// Instants are strictly increasing and deduplicated. Candidates that fall
/// at or before the anchor window, match an exception date, or precede the
/// lower bound are suppressed; suppressed candidates after the anchor still
/// consume COUNT slots, so a bounded rule spans the same calendar range no
/// matter how it is windowed.
#[derive(Debug, Clone)]
pub struct Expansion {
    rule: RecurrenceRule,
    anchor_start: DateTime<Utc>,
    anchor_end: DateTime<Utc>,
    duration: Duration,
    lower_bound: DateTime<Utc>,
    upper_bound: Option<DateTime<Utc>>,
    remaining: Option<u32>,
    until: Option<DateTime<Utc>>,
    period: i64,
    pending: VecDeque<NaiveDateTime>,
    barren_periods: u32,
    last_emitted: Option<DateTime<Utc>>,
    done: bool,
}

/// Expands `rule` anchored at `(anchor_start, anchor_end)`.
///
/// `lower_bound` is inclusive: instants before it are generated (and consume
/// COUNT) but not emitted. `upper_bound`, when present, ends the sequence
/// after the last instant at or before it; persistence passes `None` and
/// lets the rule's own termination bound the walk.
pub fn expand(
    rule: &RecurrenceRule,
    anchor_start: DateTime<Utc>,
    anchor_end: DateTime<Utc>,
    lower_bound: DateTime<Utc>,
    upper_bound: Option<DateTime<Utc>>,
) -> Expansion {
    let remaining = match rule.termination {
        // The anchor is occurrence number one.
        Termination::After(n) => Some(n.saturating_sub(1)),
        _ => None,
    };
    let until = match rule.termination {
        Termination::OnDate(d) => Some(d),
        _ => None,
    };
    Expansion {
        rule: rule.clone(),
        anchor_start,
        anchor_end,
        duration: anchor_end - anchor_start,
        lower_bound,
        upper_bound,
        remaining,
        until,
        period: 0,
        pending: VecDeque::new(),
        barren_periods: 0,
        last_emitted: None,
        done: false,
    }
}

/// Bounded expansion for UI previews: at most `limit` spans, cache untouched.
pub fn preview(
    rule: &RecurrenceRule,
    anchor_start: DateTime<Utc>,
    anchor_end: DateTime<Utc>,
    limit: usize,
) -> Vec<OccurrenceSpan> {
    expand(
        rule,
        anchor_start,
        anchor_end,
        anchor_end + Duration::seconds(1),
        None,
    )
    .take(limit)
    .collect()
}

impl Iterator for Expansion {
    type Item = OccurrenceSpan;

    fn next(&mut self) -> Option<OccurrenceSpan> {
        loop {
            if self.done {
                return None;
            }

            let Some(candidate) = self.pending.pop_front() else {
                self.fill_next_period();
                continue;
            };

            let start = candidate.and_utc();

            // Instants at or before the anchor start are not part of the
            // sequence (the anchor is handled by the caller).
            if start <= self.anchor_start {
                continue;
            }
            if let Some(until) = self.until {
                if start > until {
                    self.done = true;
                    return None;
                }
            }
            match &mut self.remaining {
                Some(n) if *n == 0 => {
                    self.done = true;
                    return None;
                }
                Some(n) => *n -= 1,
                None => {}
            }
            // Collides with the anchor window: suppressed, slot consumed.
            if start <= self.anchor_end {
                continue;
            }
            if self.rule.excludes(start) {
                continue;
            }
            if start < self.lower_bound {
                continue;
            }
            if let Some(upper) = self.upper_bound {
                if start > upper {
                    self.done = true;
                    return None;
                }
            }
            if self.last_emitted == Some(start) {
                continue;
            }
            self.last_emitted = Some(start);
            return Some(OccurrenceSpan {
                start,
                end: start + self.duration,
            });
        }
    }
}

impl Expansion {
    fn fill_next_period(&mut self) {
        let period = self.period;
        self.period += 1;

        let candidates = period_candidates(&self.rule, self.anchor_start.naive_utc(), period);
        if candidates.is_empty() {
            self.barren_periods += 1;
            if self.barren_periods >= MAX_BARREN_PERIODS {
                self.done = true;
            }
            return;
        }
        self.barren_periods = 0;
        self.pending.extend(candidates);
    }
}

/// All candidate instants within one period (period 0 contains the anchor),
/// sorted ascending, with BYSETPOS applied.
fn period_candidates(rule: &RecurrenceRule, anchor: NaiveDateTime, period: i64) -> Vec<NaiveDateTime> {
    let time = anchor.time();
    let anchor_date = anchor.date();
    let step = rule.interval.max(1) as i64 * period;

    let mut days: Vec<NaiveDate> = match rule.frequency {
        Frequency::Daily => {
            let date = anchor_date + Duration::days(step);
            if day_filters_match(rule, date) {
                vec![date]
            } else {
                Vec::new()
            }
        }
        Frequency::Weekly => {
            let base = anchor_date + Duration::days(step * 7);
            let monday = base - Duration::days(base.weekday().num_days_from_monday() as i64);
            let weekdays: Vec<Weekday> = if rule.by_day.is_empty() {
                vec![anchor_date.weekday()]
            } else {
                rule.by_day.iter().map(|d| d.weekday).collect()
            };
            weekdays
                .into_iter()
                .map(|wd| monday + Duration::days(wd.num_days_from_monday() as i64))
                .filter(|d| day_filters_match(rule, *d))
                .collect()
        }
        Frequency::Monthly => {
            let (year, month) = add_months(anchor_date.year(), anchor_date.month(), step);
            month_candidates(rule, year, month, anchor_date.day())
        }
        Frequency::Yearly => {
            let year = anchor_date.year() + step as i32;
            let months: Vec<u32> = if rule.by_month.is_empty() {
                vec![anchor_date.month()]
            } else {
                rule.by_month.clone()
            };
            months
                .into_iter()
                .flat_map(|m| month_candidates(rule, year, m, anchor_date.day()))
                .collect()
        }
    };

    days.sort();
    days.dedup();
    let days = apply_set_pos(&rule.by_set_pos, days);
    days.into_iter().map(|d| d.and_time(time)).collect()
}

/// BYMONTH / BYMONTHDAY / plain-weekday BYDAY act as filters for daily and
/// weekly stepping (they generate days only for monthly/yearly rules).
fn day_filters_match(rule: &RecurrenceRule, date: NaiveDate) -> bool {
    if !rule.by_month.is_empty() && !rule.by_month.contains(&date.month()) {
        return false;
    }
    if !rule.by_month_day.is_empty() {
        let last = days_in_month(date.year(), date.month());
        let matched = rule.by_month_day.iter().any(|&md| {
            resolve_month_day(md, last).map(|d| d == date.day()).unwrap_or(false)
        });
        if !matched {
            return false;
        }
    }
    if !rule.by_day.is_empty() && !rule.by_day.iter().any(|bd| bd.weekday == date.weekday()) {
        return false;
    }
    true
}

/// Candidate days inside one calendar month of a monthly or yearly rule.
fn month_candidates(rule: &RecurrenceRule, year: i32, month: u32, anchor_day: u32) -> Vec<NaiveDate> {
    if !rule.by_month.is_empty() && !rule.by_month.contains(&month) {
        return Vec::new();
    }
    let last = days_in_month(year, month);
    let mut days: Vec<NaiveDate> = Vec::new();

    if !rule.by_month_day.is_empty() {
        for &md in &rule.by_month_day {
            if let Some(day) = resolve_month_day(md, last) {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    days.push(date);
                }
            }
        }
    } else if !rule.by_day.is_empty() {
        for bd in &rule.by_day {
            match bd.ordinal {
                Some(n) => {
                    if let Some(date) = nth_weekday_of_month(year, month, bd.weekday, n) {
                        days.push(date);
                    }
                }
                None => {
                    for day in 1..=last {
                        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                            if date.weekday() == bd.weekday {
                                days.push(date);
                            }
                        }
                    }
                }
            }
        }
    } else if anchor_day <= last {
        // Months lacking the anchor's day (e.g. Feb for a day-31 anchor)
        // produce nothing.
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, anchor_day) {
            days.push(date);
        }
    }

    days.sort();
    days.dedup();
    days
}

/// Maps a signed BYMONTHDAY value onto a concrete day of a month with
/// `last` days; negative values count back from the end.
fn resolve_month_day(month_day: i32, last: u32) -> Option<u32> {
    let day = if month_day > 0 {
        month_day
    } else {
        last as i32 + 1 + month_day
    };
    if day >= 1 && day as u32 <= last {
        Some(day as u32)
    } else {
        None
    }
}

/// The nth weekday of a month; negative ordinals count from the end.
fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, ordinal: i32) -> Option<NaiveDate> {
    let last = days_in_month(year, month);
    if ordinal > 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let offset =
            (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
        let day = 1 + offset + (ordinal as u32 - 1) * 7;
        if day <= last {
            NaiveDate::from_ymd_opt(year, month, day)
        } else {
            None
        }
    } else {
        let last_date = NaiveDate::from_ymd_opt(year, month, last)?;
        let back =
            (last_date.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
        let day = last as i32 - back as i32 - (-ordinal - 1) * 7;
        if day >= 1 {
            NaiveDate::from_ymd_opt(year, month, day as u32)
        } else {
            None
        }
    }
}

/// BYSETPOS selects 1-based positions from the period's candidate list;
/// negative positions count from the end.
fn apply_set_pos(positions: &[i32], days: Vec<NaiveDate>) -> Vec<NaiveDate> {
    if positions.is_empty() || days.is_empty() {
        return days;
    }
    let len = days.len() as i32;
    let mut picked: Vec<NaiveDate> = positions
        .iter()
        .filter_map(|&p| {
            let idx = if p > 0 { p - 1 } else { len + p };
            if (0..len).contains(&idx) {
                Some(days[idx as usize])
            } else {
                None
            }
        })
        .collect();
    picked.sort();
    picked.dedup();
    picked
}

fn add_months(year: i32, month: u32, offset: i64) -> (i32, u32) {
    let zero_based = year as i64 * 12 + (month as i64 - 1) + offset;
    (
        zero_based.div_euclid(12) as i32,
        (zero_based.rem_euclid(12) + 1) as u32,
    )
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(30)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn anchor() -> (DateTime<Utc>, DateTime<Utc>) {
        // 2024-01-01 was a Monday
        (
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
        )
    }

    fn expand_all(rule_text: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<OccurrenceSpan> {
        let rule = RecurrenceRule::parse(rule_text).unwrap();
        expand(&rule, start, end, end + Duration::seconds(1), None).collect()
    }

    fn starts(spans: &[OccurrenceSpan]) -> Vec<DateTime<Utc>> {
        spans.iter().map(|s| s.start).collect()
    }

    #[test]
    fn daily_count_generates_count_minus_one_beyond_anchor() {
        let (start, end) = anchor();
        let spans = expand_all("FREQ=DAILY;COUNT=4", start, end);
        assert_eq!(
            starts(&spans),
            vec![
                Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 4, 9, 0, 0).unwrap(),
            ]
        );
        // duration of the anchor is preserved on every span
        for span in &spans {
            assert_eq!(span.end - span.start, Duration::hours(1));
        }
    }

    #[test]
    fn anchor_instant_is_never_emitted() {
        let (start, end) = anchor();
        // the rule's first match is the anchor's own Monday
        let spans = expand_all("FREQ=WEEKLY;COUNT=3", start, end);
        assert_eq!(
            starts(&spans),
            vec![
                Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn weekly_interval_skips_weeks() {
        let (start, end) = anchor();
        let spans = expand_all("FREQ=WEEKLY;INTERVAL=2;COUNT=3", start, end);
        assert_eq!(
            starts(&spans),
            vec![
                Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 29, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn weekly_by_day_walks_each_listed_weekday() {
        let (start, end) = anchor();
        let spans = expand_all("FREQ=WEEKLY;BYDAY=MO,WE;COUNT=5", start, end);
        assert_eq!(
            starts(&spans),
            vec![
                Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn monthly_negative_month_day_tracks_month_end() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap();
        let spans = expand_all("FREQ=MONTHLY;BYMONTHDAY=-1;COUNT=3", start, end);
        assert_eq!(
            starts(&spans),
            vec![
                // 2024 is a leap year
                Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn monthly_nth_weekday() {
        // 2024-01-09 is the second Tuesday of January
        let start = Utc.with_ymd_and_hms(2024, 1, 9, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 9, 10, 0, 0).unwrap();
        let spans = expand_all("FREQ=MONTHLY;BYDAY=2TU;COUNT=3", start, end);
        assert_eq!(
            starts(&spans),
            vec![
                Utc.with_ymd_and_hms(2024, 2, 13, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn monthly_last_friday() {
        let start = Utc.with_ymd_and_hms(2024, 1, 26, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 26, 10, 0, 0).unwrap();
        let spans = expand_all("FREQ=MONTHLY;BYDAY=-1FR;COUNT=2", start, end);
        assert_eq!(
            starts(&spans),
            vec![Utc.with_ymd_and_hms(2024, 2, 23, 9, 0, 0).unwrap()]
        );
    }

    #[test]
    fn set_pos_selects_last_weekday_of_month() {
        // 2024-01-31 is a Wednesday, the last weekday of January
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap();
        let spans = expand_all(
            "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1;COUNT=2",
            start,
            end,
        );
        assert_eq!(
            starts(&spans),
            vec![Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap()]
        );
    }

    #[test]
    fn monthly_anchor_day_skips_short_months() {
        let start = Utc.with_ymd_and_hms(2023, 1, 31, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2023, 1, 31, 10, 0, 0).unwrap();
        let spans = expand_all("FREQ=MONTHLY;COUNT=4", start, end);
        // 2023 is not a leap year: February has no 31st, neither do Apr/Jun
        assert_eq!(
            starts(&spans),
            vec![
                Utc.with_ymd_and_hms(2023, 3, 31, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2023, 5, 31, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2023, 7, 31, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn yearly_steps_years() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 15, 13, 0, 0).unwrap();
        let spans = expand_all("FREQ=YEARLY;COUNT=3", start, end);
        assert_eq!(
            starts(&spans),
            vec![
                Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn yearly_by_month_expands_each_listed_month() {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();
        let spans = expand_all("FREQ=YEARLY;BYMONTH=1,7;COUNT=4", start, end);
        assert_eq!(
            starts(&spans),
            vec![
                Utc.with_ymd_and_hms(2024, 7, 10, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 7, 10, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn until_is_inclusive_and_final() {
        let (start, end) = anchor();
        let spans = expand_all("FREQ=DAILY;UNTIL=20240103T090000Z", start, end);
        assert_eq!(
            starts(&spans),
            vec![
                Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn exceptions_suppress_but_consume_count() {
        let (start, end) = anchor();
        let spans = expand_all("FREQ=WEEKLY;COUNT=3;EXDATE=20240108T090000Z", start, end);
        // the second occurrence is suppressed; the third survives
        assert_eq!(
            starts(&spans),
            vec![Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()]
        );
    }

    #[test]
    fn date_only_exception_matches_any_time_that_day() {
        let (start, end) = anchor();
        let spans = expand_all("FREQ=WEEKLY;COUNT=3;EXDATE=20240108", start, end);
        assert_eq!(
            starts(&spans),
            vec![Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()]
        );
    }

    #[test]
    fn lower_bound_suppresses_emission_without_shifting_the_sequence() {
        let (start, end) = anchor();
        let rule = RecurrenceRule::parse("FREQ=DAILY;COUNT=5").unwrap();
        let lower = Utc.with_ymd_and_hms(2024, 1, 4, 9, 0, 0).unwrap();
        let spans: Vec<_> = expand(&rule, start, end, lower, None).collect();
        assert_eq!(
            starts(&spans),
            vec![
                Utc.with_ymd_and_hms(2024, 1, 4, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn upper_bound_cuts_unbounded_rules() {
        let (start, end) = anchor();
        let rule = RecurrenceRule::parse("FREQ=DAILY").unwrap();
        let upper = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        let spans: Vec<_> =
            expand(&rule, start, end, end + Duration::seconds(1), Some(upper)).collect();
        assert_eq!(spans.len(), 4); // Jan 2 through Jan 5
    }

    #[test]
    fn impossible_rule_terminates() {
        let (start, end) = anchor();
        let rule = RecurrenceRule::parse("FREQ=MONTHLY;BYMONTH=2;BYMONTHDAY=30").unwrap();
        let mut expansion = expand(&rule, start, end, end + Duration::seconds(1), None);
        assert!(expansion.next().is_none());
    }

    #[test]
    fn preview_caps_the_number_of_spans() {
        let (start, end) = anchor();
        let rule = RecurrenceRule::parse("FREQ=DAILY").unwrap();
        let spans = preview(&rule, start, end, 10);
        assert_eq!(spans.len(), 10);
        assert_eq!(
            spans[0].start,
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn ordering_is_strictly_increasing() {
        let (start, end) = anchor();
        let spans = expand_all("FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;COUNT=20", start, end);
        for window in spans.windows(2) {
            assert!(window[0].start < window[1].start);
        }
    }
}
