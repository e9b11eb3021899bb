use anyhow::Result;
use cadence_core::models::NewDateData;
use cadence_core::repository::OccurrenceRepository;
use cadence_core::service::OccurrenceService;
use chrono::Duration;

use crate::cli::AddCommand;
use crate::config::Config;
use crate::parser::parse_datetime;
use crate::util::{parse_id, parse_site};

pub async fn add_date(
    service: &OccurrenceService,
    command: AddCommand,
    config: &Config,
) -> Result<()> {
    let element_id = parse_id(&command.element)?;
    let site_id = parse_site(command.site.as_deref())?;
    let field_id = parse_id(&command.field)?;

    let start_at = parse_datetime(&command.start)?;
    let end_at = match command.end.as_deref() {
        Some(end) => parse_datetime(end)?,
        None => start_at + Duration::hours(1),
    };

    let record = service
        .save_date(NewDateData {
            element_id,
            site_id,
            field_id,
            start_at,
            end_at,
            all_day: command.all_day,
            timezone: command
                .timezone
                .clone()
                .or_else(|| Some(config.default_timezone.clone())),
            rrule: command.recurrence,
            sort_order: command.sort_order,
        })
        .await?;

    println!(
        "Created date {} ({} – {})",
        record.id,
        record.start_at.format("%Y-%m-%d %H:%M"),
        record.end_at.format("%Y-%m-%d %H:%M")
    );

    if record.rrule.is_some() {
        let cached = service
            .repository()
            .entries_for_date(record.id, None)
            .await?;
        println!("Cached {} occurrences.", cached.len());
    }

    Ok(())
}
