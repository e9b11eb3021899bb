use anyhow::Result;
use cadence_core::service::OccurrenceService;
use chrono_humanize::HumanTime;

use crate::cli::NextCommand;
use crate::util::{parse_id, parse_site};

pub async fn next_occurrence(service: &OccurrenceService, command: NextCommand) -> Result<()> {
    let element_id = parse_id(&command.element)?;
    let site_id = parse_site(command.site.as_deref())?;
    let field_id = parse_id(&command.field)?;

    let occurrence = if command.fallback_last {
        service
            .next_or_last_occurrence(element_id, site_id, field_id)
            .await?
    } else {
        service.next_occurrence(element_id, site_id, field_id).await?
    };

    match occurrence {
        Some(occurrence) if command.json => {
            println!("{}", serde_json::to_string_pretty(&occurrence)?);
        }
        Some(occurrence) => {
            println!(
                "{} ({})",
                occurrence.start_at.format("%Y-%m-%d %H:%M"),
                HumanTime::from(occurrence.start_at)
            );
        }
        None => println!("No occurrences."),
    }

    Ok(())
}
