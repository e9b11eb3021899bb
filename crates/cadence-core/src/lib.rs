//! # Cadence Core Library
//!
//! Recurring-date engine for content records: authors attach dates with
//! optional recurrence rules to elements, and this crate keeps a persisted
//! cache of every concrete occurrence in sync with those rules.
//!
//! ## Design
//!
//! - **Write-amortized expansion**: rules expand when a record is saved,
//!   never when it is read. Temporal queries ("next occurrence", "overlaps
//!   this range") are plain index scans over the cache.
//! - **Minimal-diff reconciliation**: on every change the target occurrence
//!   set is diffed against the persisted rows; matched rows are untouched,
//!   the rest insert or delete inside one transaction.
//! - **Immutable rules**: a [`rrule::RecurrenceRule`] is parsed once and
//!   never mutated; the textual form round-trips losslessly.
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`rrule`]: Recurrence rule value type and its textual grammar
//! - [`expander`]: Lazy expansion of rules into occurrence instants
//! - [`repository`]: Data access layer with Repository pattern
//! - [`service`]: Reconciliation orchestration and the query layer
//! - [`feed`]: Calendar-feed event generation over cached occurrences
//! - [`timezone`]: Timezone validation and all-day normalization
//! - [`error`]: Error types with context
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     db,
//!     models::NewDateData,
//!     repository::SqliteRepository,
//!     service::OccurrenceService,
//! };
//! use chrono::{Duration, Utc};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("cadence.db").await?;
//!     let service = OccurrenceService::with_defaults(SqliteRepository::new(pool));
//!
//!     let element_id = Uuid::now_v7();
//!     let field_id = Uuid::now_v7();
//!     let start = Utc::now() + Duration::days(1);
//!
//!     let record = service
//!         .save_date(NewDateData {
//!             element_id,
//!             site_id: Uuid::nil(),
//!             field_id,
//!             start_at: start,
//!             end_at: start + Duration::hours(1),
//!             all_day: false,
//!             timezone: None,
//!             rrule: Some("FREQ=WEEKLY;COUNT=10".to_string()),
//!             sort_order: None,
//!         })
//!         .await?;
//!     println!("created date record {}", record.id);
//!
//!     let next = service
//!         .next_occurrence(element_id, Uuid::nil(), field_id)
//!         .await?;
//!     println!("next occurrence: {:?}", next.map(|o| o.start_at));
//!
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod expander;
pub mod feed;
pub mod models;
pub mod repository;
pub mod rrule;
pub mod service;
pub mod timezone;
