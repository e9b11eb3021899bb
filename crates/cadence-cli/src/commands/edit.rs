use anyhow::Result;
use cadence_core::models::UpdateDateData;
use cadence_core::service::OccurrenceService;

use crate::cli::EditCommand;
use crate::parser::parse_datetime;
use crate::util::parse_id;

pub async fn edit_date(service: &OccurrenceService, command: EditCommand) -> Result<()> {
    let id = parse_id(&command.id)?;

    let rrule = if command.recurrence_clear {
        Some(None)
    } else {
        command.recurrence.map(Some)
    };

    let data = UpdateDateData {
        start_at: command
            .start
            .as_deref()
            .map(parse_datetime)
            .transpose()?,
        end_at: command.end.as_deref().map(parse_datetime).transpose()?,
        all_day: command.all_day,
        timezone: command.timezone,
        rrule,
        sort_order: command.sort_order,
    };

    let record = service.update_date(id, data).await?;
    println!(
        "Updated date {} ({} – {})",
        record.id,
        record.start_at.format("%Y-%m-%d %H:%M"),
        record.end_at.format("%Y-%m-%d %H:%M")
    );

    Ok(())
}
