use anyhow::Result;
use cadence_core::repository::DateRepository;
use cadence_core::service::OccurrenceService;
use dialoguer::Confirm;

use crate::cli::DeleteCommand;
use crate::util::parse_id;

pub async fn delete_date(service: &OccurrenceService, command: DeleteCommand) -> Result<()> {
    let id = parse_id(&command.id)?;

    let record = service
        .repository()
        .find_date_by_id(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Date record '{}' not found", id))?;

    if !command.force {
        let verb = if command.hard { "permanently delete" } else { "delete" };
        let confirmation = Confirm::new()
            .with_prompt(format!(
                "Are you sure you want to {} the date starting {}?",
                verb,
                record.start_at.format("%Y-%m-%d %H:%M")
            ))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    if command.hard {
        service.hard_delete_date(id).await?;
        println!("Deleted date {} and its cached occurrences.", id);
    } else {
        service.delete_date(id).await?;
        println!("Deleted date {} (restorable with 'cadence restore').", id);
    }

    Ok(())
}
