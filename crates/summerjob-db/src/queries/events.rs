//! Database query functions for the `summerjob_events` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::SummerJobEvent;

/// Insert a new (inactive) event.
pub async fn insert_event(
    pool: &PgPool,
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<SummerJobEvent> {
    let event = sqlx::query_as::<_, SummerJobEvent>(
        "INSERT INTO summerjob_events (name, start_date, end_date) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(name)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await
    .context("failed to insert event")?;

    Ok(event)
}

/// Fetch an event by its ID.
pub async fn get_event(pool: &PgPool, id: Uuid) -> Result<Option<SummerJobEvent>> {
    let event = sqlx::query_as::<_, SummerJobEvent>("SELECT * FROM summerjob_events WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch event")?;

    Ok(event)
}

/// List all events, most recent first.
pub async fn list_events(pool: &PgPool) -> Result<Vec<SummerJobEvent>> {
    let events = sqlx::query_as::<_, SummerJobEvent>(
        "SELECT * FROM summerjob_events ORDER BY start_date DESC",
    )
    .fetch_all(pool)
    .await
    .context("failed to list events")?;

    Ok(events)
}

/// Fetch the currently active event, if any.
pub async fn get_active_event(pool: &PgPool) -> Result<Option<SummerJobEvent>> {
    let event =
        sqlx::query_as::<_, SummerJobEvent>("SELECT * FROM summerjob_events WHERE is_active")
            .fetch_optional(pool)
            .await
            .context("failed to fetch active event")?;

    Ok(event)
}

/// Make `id` the single active event.
///
/// Deactivates every other event in the same transaction. Returns `None`
/// (and changes nothing) when the event does not exist.
pub async fn set_active_event(pool: &PgPool, id: Uuid) -> Result<Option<SummerJobEvent>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    sqlx::query("UPDATE summerjob_events SET is_active = FALSE WHERE is_active AND id <> $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("failed to deactivate events")?;

    let event = sqlx::query_as::<_, SummerJobEvent>(
        "UPDATE summerjob_events SET is_active = TRUE WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .context("failed to activate event")?;

    if event.is_some() {
        tx.commit().await.context("failed to commit transaction")?;
    }

    Ok(event)
}
