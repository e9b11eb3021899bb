use clap::{Parser, Subcommand};

/// Manage recurring dates and their occurrence cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a date record to an element field
    Add(AddCommand),
    /// Edit a date record
    Edit(EditCommand),
    /// Delete a date record (soft by default)
    Delete(DeleteCommand),
    /// Restore a soft-deleted date record
    Restore(RestoreCommand),
    /// Duplicate a date record onto another element or site
    Duplicate(DuplicateCommand),
    /// List the date records of an element field
    List(ListCommand),
    /// Show the next occurrence of an element field
    Next(NextCommand),
    /// List cached occurrences of an element field
    Occurrences(OccurrencesCommand),
    /// Reconcile the occurrence cache of every live date record
    Refresh(RefreshCommand),
    /// Expand a rule text without touching the cache
    Preview(PreviewCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// Owning element id
    pub element: String,
    /// Field id on the owning element
    #[clap(long)]
    pub field: String,
    /// Site id (defaults to the primary site)
    #[clap(long)]
    pub site: Option<String>,
    /// Start of the date (e.g. '2026-09-01 09:00', 'tomorrow')
    #[clap(long)]
    pub start: String,
    /// End of the date; defaults to one hour after start
    #[clap(long)]
    pub end: Option<String>,
    /// Treat as an all-day date
    #[clap(long)]
    pub all_day: bool,
    /// IANA timezone for all-day normalization
    #[clap(long)]
    pub timezone: Option<String>,
    /// Recurrence rule text (e.g. 'FREQ=WEEKLY;BYDAY=MO,FR;COUNT=10')
    #[clap(long)]
    pub recurrence: Option<String>,
    /// Explicit position among sibling dates
    #[clap(long)]
    pub sort_order: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The id of the date record to edit
    pub id: String,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    /// Set or clear the all-day flag
    #[arg(long)]
    pub all_day: Option<bool>,

    #[arg(long)]
    pub timezone: Option<String>,

    /// Replace the recurrence rule
    #[arg(long)]
    pub recurrence: Option<String>,
    /// Remove the recurrence rule entirely
    #[arg(long, conflicts_with = "recurrence")]
    pub recurrence_clear: bool,

    #[arg(long)]
    pub sort_order: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The id of the date record to delete
    pub id: String,
    /// Skip the confirmation prompt
    #[clap(long, short)]
    pub force: bool,
    /// Remove the record and its cache rows permanently
    #[clap(long)]
    pub hard: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RestoreCommand {
    /// The id of the date record to restore
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct DuplicateCommand {
    /// The id of the date record to duplicate
    pub id: String,
    /// Element the copy belongs to
    #[clap(long)]
    pub element: String,
    /// Site the copy belongs to (defaults to the primary site)
    #[clap(long)]
    pub site: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    pub element: String,
    #[clap(long)]
    pub field: String,
    #[clap(long)]
    pub site: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct NextCommand {
    pub element: String,
    #[clap(long)]
    pub field: String,
    #[clap(long)]
    pub site: Option<String>,
    /// Fall back to the chronologically last occurrence when nothing lies ahead
    #[clap(long)]
    pub fallback_last: bool,
    /// Emit JSON instead of text
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct OccurrencesCommand {
    pub element: String,
    #[clap(long)]
    pub field: String,
    #[clap(long)]
    pub site: Option<String>,
    /// Lower bound of the range filter
    #[clap(long, requires = "to")]
    pub from: Option<String>,
    /// Upper bound of the range filter
    #[clap(long, requires = "from")]
    pub to: Option<String>,
    /// Only occurrences starting at or after now
    #[clap(long)]
    pub only_future: bool,
    /// Exclude the record's own anchor entry
    #[clap(long)]
    pub skip_first: bool,
    /// Emit JSON instead of a table
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RefreshCommand {
    /// Leave past occurrences untouched
    #[clap(long)]
    pub only_future: bool,
    /// Emit the job summary as JSON
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    /// Recurrence rule text to expand
    pub rule: String,
    /// Anchor start (defaults to now)
    #[clap(long)]
    pub start: Option<String>,
    /// Anchor duration in minutes (defaults to 60)
    #[clap(long)]
    pub duration_minutes: Option<i64>,
    /// Maximum number of occurrences to show
    #[clap(long, default_value_t = 10)]
    pub count: usize,
}
