use anyhow::Result;
use cadence_core::service::OccurrenceService;

use crate::cli::DuplicateCommand;
use crate::util::{parse_id, parse_site};

pub async fn duplicate_date(service: &OccurrenceService, command: DuplicateCommand) -> Result<()> {
    let id = parse_id(&command.id)?;
    let element_id = parse_id(&command.element)?;
    let site_id = parse_site(command.site.as_deref())?;

    let copy = service.duplicate_date(id, element_id, site_id).await?;
    println!("Duplicated date {} as {} on element {}.", id, copy.id, element_id);
    Ok(())
}
