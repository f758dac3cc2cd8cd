//! Database query functions for the `rides` and `ride_passengers` tables.

use anyhow::{Context, Result};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{Ride, RideWithPassengers};

/// Shared projection: ride columns plus the aggregated passenger list.
const RIDE_WITH_PASSENGERS: &str = "SELECT r.*, \
        COALESCE(array_agg(rp.worker_id) FILTER (WHERE rp.worker_id IS NOT NULL), '{}') \
            AS passenger_ids \
     FROM rides r \
     JOIN active_jobs aj ON aj.id = r.job_id \
     LEFT JOIN ride_passengers rp ON rp.ride_id = r.id";

/// Insert a ride (without passengers).
pub async fn insert_ride(
    conn: &mut PgConnection,
    job_id: Uuid,
    driver_id: Uuid,
    car_id: Uuid,
) -> Result<Ride> {
    let ride = sqlx::query_as::<_, Ride>(
        "INSERT INTO rides (job_id, driver_id, car_id) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(job_id)
    .bind(driver_id)
    .bind(car_id)
    .fetch_one(conn)
    .await
    .context("failed to insert ride")?;

    Ok(ride)
}

/// Fetch a ride by ID.
pub async fn get_ride(conn: &mut PgConnection, id: Uuid) -> Result<Option<Ride>> {
    let ride = sqlx::query_as::<_, Ride>("SELECT * FROM rides WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch ride")?;

    Ok(ride)
}

/// The plan a ride belongs to (through its job).
pub async fn plan_id_for_ride(conn: &mut PgConnection, ride_id: Uuid) -> Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT aj.plan_id FROM rides r JOIN active_jobs aj ON aj.id = r.job_id WHERE r.id = $1",
    )
    .bind(ride_id)
    .fetch_optional(conn)
    .await
    .context("failed to look up plan for ride")?;

    Ok(row.map(|(id,)| id))
}

/// Delete a ride; its passenger rows cascade.
pub async fn delete_ride(conn: &mut PgConnection, id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM rides WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .context("failed to delete ride")?;

    Ok(result.rows_affected())
}

/// Replace the passenger set of a ride.
pub async fn replace_passengers(
    conn: &mut PgConnection,
    ride_id: Uuid,
    passenger_ids: &[Uuid],
) -> Result<()> {
    sqlx::query("DELETE FROM ride_passengers WHERE ride_id = $1")
        .bind(ride_id)
        .execute(&mut *conn)
        .await
        .context("failed to clear ride passengers")?;

    sqlx::query(
        "INSERT INTO ride_passengers (ride_id, worker_id) \
         SELECT $1, p FROM UNNEST($2::uuid[]) AS p \
         ON CONFLICT DO NOTHING",
    )
    .bind(ride_id)
    .bind(passenger_ids)
    .execute(&mut *conn)
    .await
    .context("failed to insert ride passengers")?;

    Ok(())
}

/// Delete the rides under `job_id` that `driver_id` drives. Returns the
/// deleted ride IDs.
pub async fn delete_rides_driven_in_job(
    conn: &mut PgConnection,
    job_id: Uuid,
    driver_id: Uuid,
) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("DELETE FROM rides WHERE job_id = $1 AND driver_id = $2 RETURNING id")
            .bind(job_id)
            .bind(driver_id)
            .fetch_all(conn)
            .await
            .context("failed to delete rides driven by worker")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Delete every ride in the plan that `driver_id` drives, except
/// `keep_ride`. Returns the deleted ride IDs.
pub async fn delete_rides_driven_in_plan(
    conn: &mut PgConnection,
    plan_id: Uuid,
    driver_id: Uuid,
    keep_ride: Option<Uuid>,
) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "DELETE FROM rides r USING active_jobs aj \
         WHERE r.job_id = aj.id AND aj.plan_id = $1 AND r.driver_id = $2 \
           AND ($3::uuid IS NULL OR r.id <> $3) \
         RETURNING r.id",
    )
    .bind(plan_id)
    .bind(driver_id)
    .bind(keep_ride)
    .fetch_all(conn)
    .await
    .context("failed to delete rides driven in plan")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Remove `worker_id` as a passenger from every ride of the plan except
/// `keep_ride`. Returns the number of passenger rows removed.
pub async fn remove_passenger_in_plan(
    conn: &mut PgConnection,
    plan_id: Uuid,
    worker_id: Uuid,
    keep_ride: Option<Uuid>,
) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM ride_passengers rp USING rides r, active_jobs aj \
         WHERE rp.ride_id = r.id AND r.job_id = aj.id \
           AND aj.plan_id = $1 AND rp.worker_id = $2 \
           AND ($3::uuid IS NULL OR r.id <> $3)",
    )
    .bind(plan_id)
    .bind(worker_id)
    .bind(keep_ride)
    .execute(conn)
    .await
    .context("failed to remove passenger from plan rides")?;

    Ok(result.rows_affected())
}

/// Every ride of the plan with its passengers, ordered by creation.
pub async fn list_for_plan(
    conn: &mut PgConnection,
    plan_id: Uuid,
) -> Result<Vec<RideWithPassengers>> {
    let query = format!(
        "{RIDE_WITH_PASSENGERS} WHERE aj.plan_id = $1 GROUP BY r.id ORDER BY r.created_at, r.id"
    );
    let rides = sqlx::query_as::<_, RideWithPassengers>(&query)
        .bind(plan_id)
        .fetch_all(conn)
        .await
        .context("failed to list rides for plan")?;

    Ok(rides)
}

/// Every ride of one job with its passengers.
pub async fn list_for_job(
    conn: &mut PgConnection,
    job_id: Uuid,
) -> Result<Vec<RideWithPassengers>> {
    let query = format!(
        "{RIDE_WITH_PASSENGERS} WHERE r.job_id = $1 GROUP BY r.id ORDER BY r.created_at, r.id"
    );
    let rides = sqlx::query_as::<_, RideWithPassengers>(&query)
        .bind(job_id)
        .fetch_all(conn)
        .await
        .context("failed to list rides for job")?;

    Ok(rides)
}

/// Fetch one ride with its passengers.
pub async fn get_with_passengers(
    conn: &mut PgConnection,
    ride_id: Uuid,
) -> Result<Option<RideWithPassengers>> {
    let query = format!("{RIDE_WITH_PASSENGERS} WHERE r.id = $1 GROUP BY r.id");
    let ride = sqlx::query_as::<_, RideWithPassengers>(&query)
        .bind(ride_id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch ride with passengers")?;

    Ok(ride)
}
