//! Calendar-feed generation: maps a date record's cached occurrences onto
//! feed events, one per occurrence. Serializing events into a feed file
//! format is the host's concern.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{DateRecord, Occurrence};

/// One feed entry. The raw rule text rides along on the event backing the
/// record's own anchor, so downstream consumers can reconstruct the series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEvent {
    pub uid: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub rrule: Option<String>,
}

/// Deterministic per-occurrence uid: the same record and instant always
/// produce the same identifier across regenerations.
pub fn event_uid(date_id: Uuid, start: DateTime<Utc>) -> String {
    format!("{}-{}", date_id.simple(), start.timestamp())
}

/// Builds one feed event per cached occurrence. `decorate` is applied to
/// each event after construction — hosts hang titles, locations or custom
/// properties on events through it instead of an ambient hook bus.
pub fn events_for_date<F>(
    date: &DateRecord,
    occurrences: &[Occurrence],
    mut decorate: F,
) -> Vec<FeedEvent>
where
    F: FnMut(&Occurrence, &mut FeedEvent),
{
    occurrences
        .iter()
        .map(|occurrence| {
            let mut event = FeedEvent {
                uid: event_uid(date.id, occurrence.start_at),
                start_at: occurrence.start_at,
                end_at: occurrence.end_at,
                all_day: occurrence.all_day,
                rrule: if occurrence.is_first {
                    date.rrule.as_ref().map(|r| r.encode())
                } else {
                    None
                },
            };
            decorate(occurrence, &mut event);
            event
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::rrule::RecurrenceRule;

    fn record_with_rule() -> DateRecord {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        DateRecord {
            id: Uuid::now_v7(),
            element_id: Uuid::now_v7(),
            site_id: Uuid::nil(),
            field_id: Uuid::now_v7(),
            start_at: start,
            end_at: end,
            all_day: false,
            timezone: "UTC".to_string(),
            rrule: Some(RecurrenceRule::parse("FREQ=WEEKLY;COUNT=3").unwrap()),
            sort_order: 0,
            deleted_with_owner: false,
            created_at: start,
            updated_at: start,
        }
    }

    fn occurrence(date: &DateRecord, start: DateTime<Utc>, is_first: bool) -> Occurrence {
        Occurrence {
            date_id: date.id,
            element_id: date.element_id,
            site_id: date.site_id,
            field_id: date.field_id,
            start_at: start,
            end_at: start + chrono::Duration::hours(1),
            all_day: false,
            is_first,
        }
    }

    #[test]
    fn one_event_per_occurrence_with_rule_on_first() {
        let date = record_with_rule();
        let occurrences = vec![
            occurrence(&date, date.start_at, true),
            occurrence(&date, date.start_at + chrono::Duration::weeks(1), false),
        ];

        let events = events_for_date(&date, &occurrences, |_, _| {});
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].rrule.as_deref(), Some("FREQ=WEEKLY;COUNT=3"));
        assert!(events[1].rrule.is_none());
    }

    #[test]
    fn uids_are_deterministic_and_distinct() {
        let date = record_with_rule();
        let a = event_uid(date.id, date.start_at);
        let b = event_uid(date.id, date.start_at);
        let c = event_uid(date.id, date.start_at + chrono::Duration::weeks(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn decoration_callback_sees_every_event() {
        let date = record_with_rule();
        let occurrences = vec![
            occurrence(&date, date.start_at, true),
            occurrence(&date, date.start_at + chrono::Duration::weeks(1), false),
        ];

        let mut seen = 0;
        let events = events_for_date(&date, &occurrences, |occ, event| {
            seen += 1;
            if occ.is_first {
                event.uid = format!("master-{}", event.uid);
            }
        });
        assert_eq!(seen, 2);
        assert!(events[0].uid.starts_with("master-"));
    }
}
