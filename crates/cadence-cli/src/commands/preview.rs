use anyhow::Result;
use cadence_core::service::OccurrenceService;
use chrono::{Duration, Utc};

use crate::cli::PreviewCommand;
use crate::parser::parse_datetime;
use crate::views::table::display_spans;

pub async fn preview(service: &OccurrenceService, command: PreviewCommand) -> Result<()> {
    let start = match command.start.as_deref() {
        Some(start) => parse_datetime(start)?,
        None => Utc::now(),
    };
    let end = start + Duration::minutes(command.duration_minutes.unwrap_or(60));

    let spans = service.preview(&command.rule, start, end, command.count)?;
    display_spans(&spans);
    Ok(())
}
