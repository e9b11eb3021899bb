use anyhow::Result;
use cadence_core::service::OccurrenceService;

use crate::cli::OccurrencesCommand;
use crate::parser::parse_datetime;
use crate::util::{parse_id, parse_site};
use crate::views::table::display_occurrences;

pub async fn list_occurrences(
    service: &OccurrenceService,
    command: OccurrencesCommand,
) -> Result<()> {
    let element_id = parse_id(&command.element)?;
    let site_id = parse_site(command.site.as_deref())?;
    let field_id = parse_id(&command.field)?;
    let include_first = !command.skip_first;

    let occurrences = match (command.from.as_deref(), command.to.as_deref()) {
        (Some(from), Some(to)) => {
            service
                .occurrences_in_range(
                    element_id,
                    site_id,
                    field_id,
                    parse_datetime(from)?,
                    parse_datetime(to)?,
                    include_first,
                )
                .await?
        }
        _ => {
            service
                .all_occurrences(
                    element_id,
                    site_id,
                    field_id,
                    command.only_future,
                    include_first,
                )
                .await?
        }
    };

    if command.json {
        println!("{}", serde_json::to_string_pretty(&occurrences)?);
    } else {
        display_occurrences(&occurrences);
    }

    Ok(())
}
