use cadence_core::expander;
use cadence_core::rrule::RecurrenceRule;
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_daily_year(c: &mut Criterion) {
    let rule = RecurrenceRule::parse("FREQ=DAILY;COUNT=366").unwrap();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let end = start + Duration::hours(1);

    c.bench_function("expand daily year", |b| {
        b.iter(|| {
            let spans: Vec<_> = expander::expand(
                black_box(&rule),
                start,
                end,
                end + Duration::seconds(1),
                None,
            )
            .collect();
            black_box(spans)
        })
    });
}

fn bench_monthly_set_pos(c: &mut Criterion) {
    let rule =
        RecurrenceRule::parse("FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1;COUNT=120").unwrap();
    let start = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
    let end = start + Duration::hours(1);

    c.bench_function("expand monthly last weekday", |b| {
        b.iter(|| {
            let spans: Vec<_> = expander::expand(
                black_box(&rule),
                start,
                end,
                end + Duration::seconds(1),
                None,
            )
            .collect();
            black_box(spans)
        })
    });
}

fn bench_parse_random_rules(c: &mut Criterion) {
    let frequencies = ["DAILY", "WEEKLY", "MONTHLY", "YEARLY"];
    c.bench_function("parse rule text", |b| {
        b.iter(|| {
            let freq = frequencies[fastrand::usize(0..frequencies.len())];
            let interval = fastrand::u32(1..12);
            let text = format!("FREQ={};INTERVAL={};COUNT=10", freq, interval);
            black_box(RecurrenceRule::parse(&text).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_daily_year,
    bench_monthly_set_pos,
    bench_parse_random_rules
);
criterion_main!(benches);
