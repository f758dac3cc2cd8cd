//! Slot generation, sign-ups and slot maintenance.

use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use summerjob_db::models::{AdorationSlot, SlotWithWorkers};
use summerjob_db::queries::{adoration, events, workers};

use crate::error::{EngineError, EngineResult, Entity};

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Request to generate slots over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSlotRequest {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    /// Start of the first slot of each day.
    pub from_time: NaiveTime,
    /// No slot of a day ends after this time.
    pub to_time: NaiveTime,
    pub length_minutes: i32,
    pub location: String,
    pub capacity: i32,
}

/// Start timestamps of every slot `request` describes.
///
/// Each day gets `(to_time - from_time) / length_minutes` consecutive slots;
/// a trailing remainder shorter than one slot is dropped.
pub fn slot_starts(request: &BulkSlotRequest) -> EngineResult<Vec<NaiveDateTime>> {
    if request.from_time >= request.to_time {
        return Err(EngineError::InvalidRange(format!(
            "start time {} is not before end time {}",
            request.from_time, request.to_time
        )));
    }
    if request.date_from > request.date_to {
        return Err(EngineError::InvalidRange(format!(
            "first day {} is after last day {}",
            request.date_from, request.date_to
        )));
    }
    if request.length_minutes <= 0 {
        return Err(EngineError::InvalidInput(format!(
            "slot length must be positive, got {}",
            request.length_minutes
        )));
    }
    if request.capacity < 0 {
        return Err(EngineError::InvalidInput(format!(
            "capacity must not be negative, got {}",
            request.capacity
        )));
    }

    let length = i64::from(request.length_minutes);
    let per_day = (request.to_time - request.from_time).num_minutes() / length;

    let starts = request
        .date_from
        .iter_days()
        .take_while(|day| *day <= request.date_to)
        .flat_map(|day| {
            let first = day.and_time(request.from_time);
            (0..per_day).map(move |i| first + Duration::minutes(i * length))
        })
        .collect();

    Ok(starts)
}

/// Generate and store the slots described by `request`. Returns how many
/// were created.
pub async fn create_slots_bulk(
    pool: &PgPool,
    event_id: Uuid,
    request: &BulkSlotRequest,
) -> EngineResult<u64> {
    let starts = slot_starts(request)?;
    events::get_event(pool, event_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Event, event_id))?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let created = adoration::insert_slots(
        &mut *tx,
        event_id,
        &starts,
        request.length_minutes,
        &request.location,
        request.capacity,
    )
    .await?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(
        %event_id,
        created,
        from = %request.date_from,
        to = %request.date_to,
        "adoration slots created"
    );
    Ok(created)
}

// -----------------------------------------------------------------------
// Sign-ups
// -----------------------------------------------------------------------

/// Sign a worker up for a slot.
///
/// Idempotent. Fails with [`EngineError::CapacityExceeded`] when the slot is
/// full; the slot row stays locked from the count to the insert.
pub async fn signup(pool: &PgPool, slot_id: Uuid, worker_id: Uuid) -> EngineResult<()> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let slot = adoration::lock_slot(&mut *tx, slot_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::AdorationSlot, slot_id))?;
    if !workers::find_missing(&mut *tx, &[worker_id]).await?.is_empty() {
        return Err(EngineError::not_found(Entity::Worker, worker_id));
    }

    if adoration::is_signed_up(&mut *tx, slot_id, worker_id).await? {
        return Ok(());
    }

    let taken = adoration::count_workers(&mut *tx, slot_id).await?;
    if taken >= i64::from(slot.capacity) {
        warn!(%slot_id, %worker_id, capacity = slot.capacity, "adoration slot is full");
        return Err(EngineError::CapacityExceeded {
            slot_id,
            capacity: slot.capacity,
        });
    }

    adoration::add_worker(&mut *tx, slot_id, worker_id).await?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(%slot_id, %worker_id, "signed up for adoration");
    Ok(())
}

/// Remove a worker's sign-up. Cancelling an absent sign-up does nothing.
pub async fn cancel_signup(pool: &PgPool, slot_id: Uuid, worker_id: Uuid) -> EngineResult<()> {
    let mut conn = pool.acquire().await.context("failed to acquire connection")?;

    let removed = adoration::remove_worker(&mut *conn, slot_id, worker_id).await?;
    if removed == 0 && adoration::get_slot(&mut *conn, slot_id).await?.is_none() {
        return Err(EngineError::not_found(Entity::AdorationSlot, slot_id));
    }

    if removed > 0 {
        info!(%slot_id, %worker_id, "adoration sign-up cancelled");
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Maintenance
// -----------------------------------------------------------------------

/// Per-item result of a bulk slot operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: Uuid,
    pub reason: String,
}

impl BulkOutcome {
    fn record(&mut self, id: Uuid, result: EngineResult<()>) {
        match result {
            Ok(()) => self.succeeded.push(id),
            Err(err) => self.failed.push(BulkFailure {
                id,
                reason: err.to_string(),
            }),
        }
    }
}

/// Delete a slot together with its sign-ups.
pub async fn delete_slot(pool: &PgPool, slot_id: Uuid) -> EngineResult<()> {
    let mut conn = pool.acquire().await.context("failed to acquire connection")?;
    if adoration::delete_slot(&mut *conn, slot_id).await? == 0 {
        return Err(EngineError::not_found(Entity::AdorationSlot, slot_id));
    }
    info!(%slot_id, "adoration slot deleted");
    Ok(())
}

/// Delete each slot independently. A failure on one slot does not undo the
/// others.
pub async fn bulk_delete(pool: &PgPool, slot_ids: &[Uuid]) -> BulkOutcome {
    let mut outcome = BulkOutcome::default();
    for &slot_id in slot_ids {
        outcome.record(slot_id, delete_slot(pool, slot_id).await);
    }
    if !outcome.failed.is_empty() {
        warn!(failed = outcome.failed.len(), "bulk slot delete partially failed");
    }
    outcome
}

/// Move each slot to `location` independently.
pub async fn bulk_update_location(
    pool: &PgPool,
    slot_ids: &[Uuid],
    location: &str,
) -> EngineResult<BulkOutcome> {
    if location.trim().is_empty() {
        return Err(EngineError::InvalidInput("location must not be empty".to_string()));
    }

    let mut outcome = BulkOutcome::default();
    for &slot_id in slot_ids {
        let result = update_location(pool, slot_id, location).await;
        outcome.record(slot_id, result);
    }
    info!(
        updated = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        %location,
        "adoration slots relocated"
    );
    Ok(outcome)
}

async fn update_location(pool: &PgPool, slot_id: Uuid, location: &str) -> EngineResult<()> {
    let mut conn = pool.acquire().await.context("failed to acquire connection")?;
    if adoration::update_location(&mut *conn, slot_id, location).await? == 0 {
        return Err(EngineError::not_found(Entity::AdorationSlot, slot_id));
    }
    Ok(())
}

/// New values for [`edit_slot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotEdit {
    pub capacity: i32,
    /// Minutes after midnight of the slot's own day.
    pub start_minute_of_day: i32,
    pub length_minutes: i32,
    pub location: String,
}

impl SlotEdit {
    fn validate(&self) -> EngineResult<()> {
        if !(0..MINUTES_PER_DAY).contains(&self.start_minute_of_day) {
            return Err(EngineError::InvalidRange(format!(
                "start minute {} is outside the day",
                self.start_minute_of_day
            )));
        }
        if self.length_minutes <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "slot length must be positive, got {}",
                self.length_minutes
            )));
        }
        if self.capacity < 0 {
            return Err(EngineError::InvalidInput(format!(
                "capacity must not be negative, got {}",
                self.capacity
            )));
        }
        if self.location.trim().is_empty() {
            return Err(EngineError::InvalidInput("location must not be empty".to_string()));
        }
        Ok(())
    }

    /// Start timestamp on the calendar day of `current`.
    fn start_on_day_of(&self, current: NaiveDateTime) -> NaiveDateTime {
        current.date().and_time(NaiveTime::MIN)
            + Duration::minutes(i64::from(self.start_minute_of_day))
    }
}

/// Overwrite a slot's capacity, start time, length and location.
///
/// The slot stays on its calendar day. Lowering capacity below the current
/// number of sign-ups fails with [`EngineError::CapacityExceeded`].
pub async fn edit_slot(pool: &PgPool, slot_id: Uuid, edit: &SlotEdit) -> EngineResult<AdorationSlot> {
    edit.validate()?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let slot = adoration::lock_slot(&mut *tx, slot_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::AdorationSlot, slot_id))?;

    let taken = adoration::count_workers(&mut *tx, slot_id).await?;
    if i64::from(edit.capacity) < taken {
        warn!(%slot_id, capacity = edit.capacity, taken, "capacity below current sign-ups");
        return Err(EngineError::CapacityExceeded {
            slot_id,
            capacity: edit.capacity,
        });
    }

    let updated = adoration::update_slot(
        &mut *tx,
        slot_id,
        edit.start_on_day_of(slot.date_start),
        edit.length_minutes,
        &edit.location,
        edit.capacity,
    )
    .await?
    .ok_or_else(|| EngineError::not_found(Entity::AdorationSlot, slot_id))?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(%slot_id, start = %updated.date_start, "adoration slot edited");
    Ok(updated)
}

// -----------------------------------------------------------------------
// Day views
// -----------------------------------------------------------------------

/// Every slot of the day with the contacts of everyone signed up.
pub async fn slots_for_day_admin(
    pool: &PgPool,
    event_id: Uuid,
    day: NaiveDate,
) -> EngineResult<Vec<SlotWithWorkers>> {
    let mut conn = pool.acquire().await.context("failed to acquire connection")?;
    Ok(adoration::list_slots_for_day(&mut *conn, event_id, day).await?)
}

/// A slot as offered to one worker: occupancy but no names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSlotView {
    pub id: Uuid,
    pub date_start: NaiveDateTime,
    pub length_minutes: i32,
    pub location: String,
    pub capacity: i32,
    pub worker_count: usize,
    pub is_signed_up: bool,
}

/// Slots of the day the worker is in or could still join.
pub async fn slots_for_day_user(
    pool: &PgPool,
    event_id: Uuid,
    day: NaiveDate,
    worker_id: Uuid,
) -> EngineResult<Vec<UserSlotView>> {
    let slots = slots_for_day_admin(pool, event_id, day).await?;
    Ok(user_view(slots, worker_id))
}

pub(crate) fn user_view(slots: Vec<SlotWithWorkers>, worker_id: Uuid) -> Vec<UserSlotView> {
    slots
        .into_iter()
        .filter_map(|s| {
            let is_signed_up = s.has_worker(worker_id);
            let worker_count = s.workers.len();
            let has_room = worker_count < usize::try_from(s.slot.capacity).unwrap_or(0);
            (is_signed_up || has_room).then(|| UserSlotView {
                id: s.slot.id,
                date_start: s.slot.date_start,
                length_minutes: s.slot.length_minutes,
                location: s.slot.location,
                capacity: s.slot.capacity,
                worker_count,
                is_signed_up,
            })
        })
        .collect()
}
