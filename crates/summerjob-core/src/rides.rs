//! Ride consistency: a worker travels in at most one vehicle per plan and a
//! driver never rides as a passenger of their own car.

use std::collections::HashSet;

use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use summerjob_db::models::{ActiveJob, RideWithPassengers, WorkerContact};
use summerjob_db::queries::{active_jobs, cars, plans, rides, workers};

use crate::assignment::lock_job_plan;
use crate::error::{EngineError, EngineResult, Entity};
use crate::resync;

/// Create a ride under a job.
///
/// The driver is dropped from `passenger_ids`. Passengers leave any other
/// ride of the plan, as in [`update_ride`].
pub async fn create_ride(
    pool: &PgPool,
    job_id: Uuid,
    driver_id: Uuid,
    car_id: Uuid,
    passenger_ids: &[Uuid],
) -> EngineResult<RideWithPassengers> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let job = lock_job_plan(&mut *tx, job_id).await?;
    let ride = insert_ride(&mut *tx, &job, driver_id, car_id, passenger_ids).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        ride_id = %ride.ride.id,
        %job_id,
        %driver_id,
        passengers = ride.passenger_ids.len(),
        "ride created"
    );
    Ok(ride)
}

/// Insert a ride and board its passengers under a plan the caller has
/// locked.
pub(crate) async fn insert_ride(
    conn: &mut PgConnection,
    job: &ActiveJob,
    driver_id: Uuid,
    car_id: Uuid,
    passenger_ids: &[Uuid],
) -> EngineResult<RideWithPassengers> {
    let passengers = passengers_without_driver(passenger_ids, driver_id);

    let mut everyone = passengers.clone();
    everyone.push(driver_id);
    if let Some(&missing) = workers::find_missing(conn, &everyone).await?.first() {
        return Err(EngineError::not_found(Entity::Worker, missing));
    }
    let car = cars::get_car(conn, car_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Car, car_id))?;
    if passengers.len() >= usize::try_from(car.seats).unwrap_or(0) {
        warn!(%car_id, seats = car.seats, passengers = passengers.len(), "ride is over car capacity");
    }

    let ride = rides::insert_ride(conn, job.id, driver_id, car_id).await?;
    board(conn, job.plan_id, ride.id, &passengers).await?;

    rides::get_with_passengers(conn, ride.id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Ride, ride.id))
}

/// Replace the passengers of a ride.
///
/// Every requested passenger is removed from other rides of the plan, and
/// any other ride of the plan they drive is deleted. The ride's driver is
/// never stored as a passenger.
pub async fn update_ride(
    pool: &PgPool,
    ride_id: Uuid,
    passenger_ids: &[Uuid],
) -> EngineResult<RideWithPassengers> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let ride = lock_ride_plan(&mut *tx, ride_id).await?;
    let plan_id = active_jobs::get_active_job(&mut *tx, ride.ride.job_id)
        .await?
        .map(|job| job.plan_id)
        .ok_or_else(|| EngineError::not_found(Entity::ActiveJob, ride.ride.job_id))?;

    let passengers = passengers_without_driver(passenger_ids, ride.ride.driver_id);
    if let Some(&missing) = workers::find_missing(&mut *tx, &passengers).await?.first() {
        return Err(EngineError::not_found(Entity::Worker, missing));
    }

    let claim = board(&mut *tx, plan_id, ride_id, &passengers).await?;

    let updated = rides::get_with_passengers(&mut *tx, ride_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Ride, ride_id))?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        %ride_id,
        %plan_id,
        passengers = updated.passenger_ids.len(),
        released_seats = claim.released_seats,
        deleted_rides = claim.deleted_rides.len(),
        "ride passengers updated"
    );
    Ok(updated)
}

/// Delete a ride. Returns the passengers left without a ride.
pub async fn delete_ride(pool: &PgPool, ride_id: Uuid) -> EngineResult<Vec<Uuid>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let ride = lock_ride_plan(&mut *tx, ride_id).await?;
    rides::delete_ride(&mut *tx, ride_id).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(%ride_id, stranded = ride.passenger_ids.len(), "ride deleted");
    Ok(ride.passenger_ids)
}

/// Job members of the plan who neither drive nor ride, by name.
pub async fn workers_without_ride(pool: &PgPool, plan_id: Uuid) -> EngineResult<Vec<WorkerContact>> {
    plans::get_plan(pool, plan_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Plan, plan_id))?;

    let mut conn = pool.acquire().await.context("failed to acquire connection")?;

    let memberships = active_jobs::list_memberships_for_plan(&mut *conn, plan_id).await?;
    let plan_rides = rides::list_for_plan(&mut *conn, plan_id).await?;

    let carried: HashSet<Uuid> = plan_rides
        .iter()
        .flat_map(|r| std::iter::once(r.ride.driver_id).chain(r.passenger_ids.iter().copied()))
        .collect();
    let stranded: Vec<Uuid> = memberships
        .into_iter()
        .map(|(_, worker_id)| worker_id)
        .filter(|id| !carried.contains(id))
        .collect();

    Ok(workers::get_contacts(&mut *conn, &stranded).await?)
}

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

async fn board(
    conn: &mut PgConnection,
    plan_id: Uuid,
    ride_id: Uuid,
    passengers: &[Uuid],
) -> EngineResult<resync::PassengerClaim> {
    let claim = resync::claim_passengers(conn, plan_id, ride_id, passengers).await?;
    rides::replace_passengers(conn, ride_id, passengers).await?;
    Ok(claim)
}

/// Resolve a ride's plan, lock it, and re-read the ride under the lock.
async fn lock_ride_plan(conn: &mut PgConnection, ride_id: Uuid) -> EngineResult<RideWithPassengers> {
    let plan_id = rides::plan_id_for_ride(conn, ride_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Ride, ride_id))?;
    plans::lock_plan(conn, plan_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Plan, plan_id))?;

    rides::get_with_passengers(conn, ride_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Ride, ride_id))
}

/// Requested passengers, deduplicated, without the driver.
fn passengers_without_driver(passenger_ids: &[Uuid], driver_id: Uuid) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(passenger_ids.len());
    passenger_ids
        .iter()
        .copied()
        .filter(|id| *id != driver_id && seen.insert(*id))
        .collect()
}
