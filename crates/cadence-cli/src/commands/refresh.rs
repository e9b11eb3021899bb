use anyhow::Result;
use cadence_core::service::OccurrenceService;
use std::io::Write;

use crate::cli::RefreshCommand;

pub async fn refresh(service: &OccurrenceService, command: RefreshCommand) -> Result<()> {
    let show_progress = !command.json;
    let summary = service
        .refresh_all(command.only_future, |done, total| {
            if show_progress && total > 0 {
                print!(
                    "\rReconciling {}/{} ({:.0}%)",
                    done,
                    total,
                    done as f64 / total as f64 * 100.0
                );
                let _ = std::io::stdout().flush();
            }
        })
        .await?;

    if show_progress {
        println!();
    }

    if command.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Processed {} records in {} ms: {} rows inserted, {} deleted.",
        summary.records_processed, summary.duration_ms, summary.rows_inserted, summary.rows_deleted
    );
    if summary.records_skipped > 0 {
        println!("Skipped {} records:", summary.records_skipped);
        for error in &summary.errors {
            println!("  {}", error);
        }
    }

    Ok(())
}
