use anyhow::Result;
use cadence_core::service::OccurrenceService;

use crate::cli::RestoreCommand;
use crate::util::parse_id;

pub async fn restore_date(service: &OccurrenceService, command: RestoreCommand) -> Result<()> {
    let id = parse_id(&command.id)?;
    service.restore_date(id).await?;
    println!("Restored date {} with its cached occurrences.", id);
    Ok(())
}
