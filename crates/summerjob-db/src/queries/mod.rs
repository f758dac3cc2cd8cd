//! Query functions, one module per table group.
//!
//! Catalogue queries (events, workers, cars, proposed jobs) take a
//! `&PgPool`. Queries over the tables the engine mutates take a
//! `&mut PgConnection` so they compose inside a transaction
//! (`&mut *tx`) as well as on a pooled connection.

pub mod active_jobs;
pub mod adoration;
pub mod cars;
pub mod events;
pub mod plans;
pub mod proposed_jobs;
pub mod rides;
pub mod workers;

/// Whether a query error is a PostgreSQL unique-constraint violation.
///
/// Works through `anyhow` context layers added by the query functions.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}
