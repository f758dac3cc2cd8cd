//! Plan resynchronization: the cascades that keep job membership and rides
//! consistent when a worker moves.
//!
//! Both procedures run on the caller's connection, which is expected to be
//! inside a transaction holding the plan lock (see
//! [`summerjob_db::queries::plans::lock_plan`]).

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::Serialize;
use sqlx::PgConnection;
use tracing::debug;
use uuid::Uuid;

use summerjob_db::queries::{active_jobs, rides};

/// What [`evict_worker`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eviction {
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub was_member: bool,
    pub was_responsible: bool,
    /// Rides under the job that the worker drove. Their passengers are left
    /// without a ride.
    pub deleted_rides: Vec<Uuid>,
    /// Passenger seats the worker held anywhere in the plan.
    pub released_seats: u64,
}

/// Remove `worker_id` from `job_id` and from every ride that depended on it.
///
/// 1. Clear the job's responsible worker if it is this worker.
/// 2. Drop the membership.
/// 3. Delete the job's rides driven by the worker.
/// 4. Remove the worker as a passenger from every ride of the plan, since
///    workers may ride with a driver of another job.
pub async fn evict_worker(
    conn: &mut PgConnection,
    plan_id: Uuid,
    job_id: Uuid,
    worker_id: Uuid,
) -> Result<Eviction> {
    let was_responsible = active_jobs::clear_responsible_if(conn, job_id, worker_id).await? > 0;
    let was_member = active_jobs::remove_worker(conn, job_id, worker_id).await? > 0;
    let deleted_rides = rides::delete_rides_driven_in_job(conn, job_id, worker_id).await?;
    let released_seats = rides::remove_passenger_in_plan(conn, plan_id, worker_id, None).await?;

    debug!(
        %plan_id,
        %job_id,
        %worker_id,
        was_responsible,
        deleted_rides = deleted_rides.len(),
        released_seats,
        "worker evicted from job"
    );

    Ok(Eviction {
        job_id,
        worker_id,
        was_member,
        was_responsible,
        deleted_rides,
        released_seats,
    })
}

/// What [`claim_passengers`] removed elsewhere in the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassengerClaim {
    pub released_seats: u64,
    pub deleted_rides: Vec<Uuid>,
}

/// Make `passenger_ids` free to board `ride_id`.
///
/// A worker travels in one vehicle at a time: each passenger loses any seat
/// in another ride of the plan, and any other ride of the plan that they
/// drive is deleted.
pub async fn claim_passengers(
    conn: &mut PgConnection,
    plan_id: Uuid,
    ride_id: Uuid,
    passenger_ids: &[Uuid],
) -> Result<PassengerClaim> {
    let mut claim = PassengerClaim::default();
    for &worker_id in passenger_ids {
        claim.released_seats +=
            rides::remove_passenger_in_plan(conn, plan_id, worker_id, Some(ride_id)).await?;
        let deleted =
            rides::delete_rides_driven_in_plan(conn, plan_id, worker_id, Some(ride_id)).await?;
        if !deleted.is_empty() {
            debug!(%plan_id, %worker_id, rides = ?deleted, "driver became passenger; ride deleted");
        }
        claim.deleted_rides.extend(deleted);
    }
    Ok(claim)
}

// -----------------------------------------------------------------------
// Consistency check
// -----------------------------------------------------------------------

/// A broken plan invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    WorkerInSeveralJobs { worker_id: Uuid, job_ids: Vec<Uuid> },
    ResponsibleNotMember { job_id: Uuid, worker_id: Uuid },
    DriverIsPassenger { ride_id: Uuid, worker_id: Uuid },
    PassengerInSeveralRides { worker_id: Uuid, ride_ids: Vec<Uuid> },
}

/// Check the membership and ride invariants of a plan.
///
/// Returns an empty list for a consistent plan. Used by tests and by
/// `summerjob plan check`.
pub async fn check_plan(conn: &mut PgConnection, plan_id: Uuid) -> Result<Vec<Violation>> {
    let jobs = active_jobs::list_for_plan(conn, plan_id).await?;
    let memberships = active_jobs::list_memberships_for_plan(conn, plan_id).await?;
    let plan_rides = rides::list_for_plan(conn, plan_id).await?;

    let mut violations = Vec::new();

    let mut jobs_by_worker: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    let member_pairs: HashSet<(Uuid, Uuid)> = memberships.iter().copied().collect();
    for (job_id, worker_id) in &memberships {
        jobs_by_worker.entry(*worker_id).or_default().push(*job_id);
    }
    for (worker_id, mut job_ids) in jobs_by_worker {
        if job_ids.len() > 1 {
            job_ids.sort();
            violations.push(Violation::WorkerInSeveralJobs { worker_id, job_ids });
        }
    }

    for job in &jobs {
        if let Some(worker_id) = job.responsible_worker_id {
            if !member_pairs.contains(&(job.id, worker_id)) {
                violations.push(Violation::ResponsibleNotMember {
                    job_id: job.id,
                    worker_id,
                });
            }
        }
    }

    let mut rides_by_passenger: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for ride in &plan_rides {
        if ride.passenger_ids.contains(&ride.ride.driver_id) {
            violations.push(Violation::DriverIsPassenger {
                ride_id: ride.ride.id,
                worker_id: ride.ride.driver_id,
            });
        }
        for passenger in &ride.passenger_ids {
            rides_by_passenger
                .entry(*passenger)
                .or_default()
                .push(ride.ride.id);
        }
    }
    for (worker_id, mut ride_ids) in rides_by_passenger {
        if ride_ids.len() > 1 {
            ride_ids.sort();
            violations.push(Violation::PassengerInSeveralRides {
                worker_id,
                ride_ids,
            });
        }
    }

    Ok(violations)
}
