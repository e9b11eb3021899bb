use cadence_core::db;
use cadence_core::error::CoreError;
use cadence_core::repository::SqliteRepository;
use cadence_core::service::{AllowAll, OccurrenceService, ReconcileConfig};
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use std::sync::Arc;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

#[tokio::main]
async fn main() {
    let config = config::Config::new().unwrap_or_else(|_| config::Config::default());

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let repository = SqliteRepository::new(db_pool);
    let service = OccurrenceService::new(
        repository,
        Arc::new(AllowAll),
        ReconcileConfig {
            max_generated_occurrences: config.engine.max_generated_occurrences,
        },
    );

    let cli = cli::Cli::parse();

    let result = match cli.command {
        cli::Commands::Add(command) => commands::add::add_date(&service, command, &config).await,
        cli::Commands::Edit(command) => commands::edit::edit_date(&service, command).await,
        cli::Commands::Delete(command) => commands::delete::delete_date(&service, command).await,
        cli::Commands::Restore(command) => commands::restore::restore_date(&service, command).await,
        cli::Commands::Duplicate(command) => {
            commands::duplicate::duplicate_date(&service, command).await
        }
        cli::Commands::List(command) => commands::list::list_dates(&service, command).await,
        cli::Commands::Next(command) => commands::next::next_occurrence(&service, command).await,
        cli::Commands::Occurrences(command) => {
            commands::occurrences::list_occurrences(&service, command).await
        }
        cli::Commands::Refresh(command) => commands::refresh::refresh(&service, command).await,
        cli::Commands::Preview(command) => commands::preview::preview(&service, command).await,
    };

    if let Err(e) = result {
        handle_error(e);
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<CoreError>())
    {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} Date record not found: {}", "Error:".style(error_style), s);
            }
            CoreError::MalformedRule(s) => {
                eprintln!(
                    "{} Invalid recurrence rule: {}",
                    "Error:".style(error_style),
                    s.yellow()
                );
            }
            CoreError::InvalidTimezone(s) => {
                eprintln!(
                    "{} Invalid timezone: {}. Use IANA names like 'America/New_York'.",
                    "Error:".style(error_style),
                    s.yellow()
                );
            }
            CoreError::InvalidOwner { element_id, site_id } => {
                eprintln!(
                    "{} Owner element {} is missing on site {}",
                    "Error:".style(error_style),
                    element_id,
                    site_id
                );
            }
            CoreError::InvalidField(field_id) => {
                eprintln!(
                    "{} Field {} no longer exists",
                    "Error:".style(error_style),
                    field_id
                );
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
    std::process::exit(1);
}
