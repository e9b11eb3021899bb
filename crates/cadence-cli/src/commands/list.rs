use anyhow::Result;
use cadence_core::repository::DateRepository;
use cadence_core::service::OccurrenceService;

use crate::cli::ListCommand;
use crate::util::{parse_id, parse_site};
use crate::views::table::display_dates;

pub async fn list_dates(service: &OccurrenceService, command: ListCommand) -> Result<()> {
    let element_id = parse_id(&command.element)?;
    let site_id = parse_site(command.site.as_deref())?;
    let field_id = parse_id(&command.field)?;

    let dates = service
        .repository()
        .find_dates_for_field(element_id, site_id, field_id)
        .await?;

    display_dates(&dates);
    Ok(())
}
