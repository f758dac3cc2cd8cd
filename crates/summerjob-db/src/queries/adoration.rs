//! Database query functions for the `adoration_slots` and
//! `adoration_slot_workers` tables.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{AdorationSlot, SlotWithWorkers, WorkerContact};

/// Insert one slot per entry of `starts`, all sharing length, location and
/// capacity. Returns the number of rows inserted.
pub async fn insert_slots(
    conn: &mut PgConnection,
    event_id: Uuid,
    starts: &[NaiveDateTime],
    length_minutes: i32,
    location: &str,
    capacity: i32,
) -> Result<u64> {
    let result = sqlx::query(
        "INSERT INTO adoration_slots (event_id, date_start, length_minutes, location, capacity) \
         SELECT $1, s, $3, $4, $5 FROM UNNEST($2::timestamp[]) AS s",
    )
    .bind(event_id)
    .bind(starts)
    .bind(length_minutes)
    .bind(location)
    .bind(capacity)
    .execute(conn)
    .await
    .context("failed to insert adoration slots")?;

    Ok(result.rows_affected())
}

/// Fetch a slot by ID.
pub async fn get_slot(conn: &mut PgConnection, id: Uuid) -> Result<Option<AdorationSlot>> {
    let slot = sqlx::query_as::<_, AdorationSlot>("SELECT * FROM adoration_slots WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch adoration slot")?;

    Ok(slot)
}

/// Fetch a slot and hold a row lock on it until the transaction ends.
pub async fn lock_slot(conn: &mut PgConnection, id: Uuid) -> Result<Option<AdorationSlot>> {
    let slot = sqlx::query_as::<_, AdorationSlot>(
        "SELECT * FROM adoration_slots WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .context("failed to lock adoration slot")?;

    Ok(slot)
}

/// Number of workers signed up for a slot.
pub async fn count_workers(conn: &mut PgConnection, slot_id: Uuid) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM adoration_slot_workers WHERE slot_id = $1")
            .bind(slot_id)
            .fetch_one(conn)
            .await
            .context("failed to count slot workers")?;

    Ok(count)
}

/// Whether `worker_id` is signed up for `slot_id`.
pub async fn is_signed_up(conn: &mut PgConnection, slot_id: Uuid, worker_id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM adoration_slot_workers WHERE slot_id = $1 AND worker_id = $2)",
    )
    .bind(slot_id)
    .bind(worker_id)
    .fetch_one(conn)
    .await
    .context("failed to check slot sign-up")?;

    Ok(exists)
}

/// Sign a worker up. Idempotent.
pub async fn add_worker(conn: &mut PgConnection, slot_id: Uuid, worker_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        "INSERT INTO adoration_slot_workers (slot_id, worker_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(slot_id)
    .bind(worker_id)
    .execute(conn)
    .await
    .context("failed to sign worker up for slot")?;

    Ok(result.rows_affected())
}

/// Remove a worker's sign-up. Returns the number of rows affected.
pub async fn remove_worker(
    conn: &mut PgConnection,
    slot_id: Uuid,
    worker_id: Uuid,
) -> Result<u64> {
    let result =
        sqlx::query("DELETE FROM adoration_slot_workers WHERE slot_id = $1 AND worker_id = $2")
            .bind(slot_id)
            .bind(worker_id)
            .execute(conn)
            .await
            .context("failed to cancel slot sign-up")?;

    Ok(result.rows_affected())
}

/// Delete a slot; sign-ups cascade.
pub async fn delete_slot(conn: &mut PgConnection, id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM adoration_slots WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .context("failed to delete adoration slot")?;

    Ok(result.rows_affected())
}

/// Change a slot's location.
pub async fn update_location(conn: &mut PgConnection, id: Uuid, location: &str) -> Result<u64> {
    let result = sqlx::query("UPDATE adoration_slots SET location = $1 WHERE id = $2")
        .bind(location)
        .bind(id)
        .execute(conn)
        .await
        .context("failed to update adoration slot location")?;

    Ok(result.rows_affected())
}

/// Overwrite the editable fields of a slot. Returns the updated row.
pub async fn update_slot(
    conn: &mut PgConnection,
    id: Uuid,
    date_start: NaiveDateTime,
    length_minutes: i32,
    location: &str,
    capacity: i32,
) -> Result<Option<AdorationSlot>> {
    let slot = sqlx::query_as::<_, AdorationSlot>(
        "UPDATE adoration_slots \
         SET date_start = $1, length_minutes = $2, location = $3, capacity = $4 \
         WHERE id = $5 \
         RETURNING *",
    )
    .bind(date_start)
    .bind(length_minutes)
    .bind(location)
    .bind(capacity)
    .bind(id)
    .fetch_optional(conn)
    .await
    .context("failed to update adoration slot")?;

    Ok(slot)
}

/// Every slot of the event starting on `day`, ordered by start, with the
/// contacts of the workers signed up for each.
pub async fn list_slots_for_day(
    conn: &mut PgConnection,
    event_id: Uuid,
    day: NaiveDate,
) -> Result<Vec<SlotWithWorkers>> {
    let from = day.and_hms_opt(0, 0, 0).context("invalid day start")?;
    let until = day
        .succ_opt()
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .context("day out of range")?;

    let slots = sqlx::query_as::<_, AdorationSlot>(
        "SELECT * FROM adoration_slots \
         WHERE event_id = $1 AND date_start >= $2 AND date_start < $3 \
         ORDER BY date_start, id",
    )
    .bind(event_id)
    .bind(from)
    .bind(until)
    .fetch_all(&mut *conn)
    .await
    .context("failed to list adoration slots for day")?;

    let slot_ids: Vec<Uuid> = slots.iter().map(|s| s.id).collect();
    let signups: Vec<SignupRow> = sqlx::query_as(
        "SELECT asw.slot_id, w.id, w.first_name, w.last_name, w.phone \
         FROM adoration_slot_workers asw \
         JOIN workers w ON w.id = asw.worker_id \
         WHERE asw.slot_id = ANY($1) \
         ORDER BY w.last_name, w.first_name, w.id",
    )
    .bind(&slot_ids)
    .fetch_all(&mut *conn)
    .await
    .context("failed to list adoration sign-ups for day")?;

    let mut by_slot: HashMap<Uuid, Vec<WorkerContact>> = HashMap::new();
    for row in signups {
        by_slot.entry(row.slot_id).or_default().push(row.contact);
    }

    Ok(slots
        .into_iter()
        .map(|slot| {
            let workers = by_slot.remove(&slot.id).unwrap_or_default();
            SlotWithWorkers { slot, workers }
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct SignupRow {
    slot_id: Uuid,
    #[sqlx(flatten)]
    contact: WorkerContact,
}
