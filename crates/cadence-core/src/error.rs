use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Malformed recurrence rule: {0}")]
    MalformedRule(String),

    #[error("Owner element {element_id} is missing or inaccessible on site {site_id}")]
    InvalidOwner { element_id: Uuid, site_id: Uuid },

    #[error("Field {0} no longer exists")]
    InvalidField(Uuid),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Occurrence reconciliation failed for date {date_id}")]
    Reconciliation {
        date_id: Uuid,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Date record not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
