//! Assignment engine: scheduling proposed jobs into a plan and keeping each
//! worker in at most one job per plan.
//!
//! Every write runs in one transaction that starts by locking the plan row,
//! so concurrent reassignments within a plan serialize.

use std::collections::HashSet;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use summerjob_db::models::{ActiveJob, Plan};
use summerjob_db::queries::{self, active_jobs, plans, proposed_jobs, workers};

use crate::error::{EngineError, EngineResult, Entity};
use crate::resync;

/// Descriptions to store on a new active job. Missing fields are copied from
/// the proposed job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveJobDescriptions {
    pub public_description: Option<String>,
    pub private_description: Option<String>,
}

/// One entry of a bulk scheduling request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActiveJob {
    pub proposed_job_id: Uuid,
    #[serde(default)]
    pub descriptions: ActiveJobDescriptions,
}

/// Partial update of an active job. `None` leaves a field unchanged.
///
/// `responsible_worker_id: Some(None)` clears the responsible worker.
#[derive(Debug, Clone, Default)]
pub struct ActiveJobUpdate {
    pub public_description: Option<String>,
    pub private_description: Option<String>,
    pub responsible_worker_id: Option<Option<Uuid>>,
    pub worker_ids: Option<Vec<Uuid>>,
}

/// Net effect of a membership change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MembershipChange {
    pub added: Vec<Uuid>,
    pub removed: Vec<Uuid>,
    /// `(worker_id, previous_job_id)` for workers pulled out of another job
    /// of the same plan.
    pub moved: Vec<(Uuid, Uuid)>,
}

// -----------------------------------------------------------------------
// Membership
// -----------------------------------------------------------------------

/// Replace the worker set of a job.
///
/// Removed workers are evicted (see [`resync::evict_worker`]). Added workers
/// already in another job of the plan are evicted from that job first.
pub async fn update_active_job_workers(
    pool: &PgPool,
    job_id: Uuid,
    worker_ids: &[Uuid],
) -> EngineResult<MembershipChange> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let job = lock_job_plan(&mut *tx, job_id).await?;
    let change = apply_membership(&mut *tx, &job, worker_ids).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        %job_id,
        plan_id = %job.plan_id,
        added = change.added.len(),
        removed = change.removed.len(),
        moved = change.moved.len(),
        "job workers updated"
    );
    Ok(change)
}

/// Evict a single worker from a job. A worker who is not a member leaves the
/// plan untouched apart from stray passenger seats.
pub async fn remove_worker_from_job(
    pool: &PgPool,
    job_id: Uuid,
    worker_id: Uuid,
) -> EngineResult<resync::Eviction> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let job = lock_job_plan(&mut *tx, job_id).await?;
    let eviction = resync::evict_worker(&mut *tx, job.plan_id, job.id, worker_id).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        %job_id,
        %worker_id,
        deleted_rides = eviction.deleted_rides.len(),
        "worker removed from job"
    );
    Ok(eviction)
}

/// Apply descriptions, membership and responsible worker in one transaction.
///
/// A responsible worker must be a member of the job once the membership
/// change is applied.
pub async fn update_active_job(
    pool: &PgPool,
    job_id: Uuid,
    update: ActiveJobUpdate,
) -> EngineResult<ActiveJob> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let job = lock_job_plan(&mut *tx, job_id).await?;

    if update.public_description.is_some() || update.private_description.is_some() {
        active_jobs::update_descriptions(
            &mut *tx,
            job.id,
            update.public_description.as_deref(),
            update.private_description.as_deref(),
        )
        .await?;
    }

    if let Some(worker_ids) = &update.worker_ids {
        apply_membership(&mut *tx, &job, worker_ids).await?;
    }

    if let Some(responsible) = update.responsible_worker_id {
        set_responsible(&mut *tx, job.id, responsible).await?;
    }

    let job = active_jobs::get_active_job(&mut *tx, job_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::ActiveJob, job_id))?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(%job_id, "active job updated");
    Ok(job)
}

/// Diff the current worker set against `requested` and apply it.
///
/// Runs on a connection that already holds the plan lock.
pub(crate) async fn apply_membership(
    conn: &mut PgConnection,
    job: &ActiveJob,
    requested: &[Uuid],
) -> EngineResult<MembershipChange> {
    let requested = dedup(requested);

    let missing = workers::find_missing(conn, &requested).await?;
    if let Some(&id) = missing.first() {
        warn!(job_id = %job.id, worker_id = %id, "unknown worker in membership request");
        return Err(EngineError::not_found(Entity::Worker, id));
    }

    let current = active_jobs::list_worker_ids(conn, job.id).await?;
    let current_set: HashSet<Uuid> = current.iter().copied().collect();
    let requested_set: HashSet<Uuid> = requested.iter().copied().collect();

    let mut change = MembershipChange {
        added: requested
            .iter()
            .copied()
            .filter(|id| !current_set.contains(id))
            .collect(),
        removed: current
            .iter()
            .copied()
            .filter(|id| !requested_set.contains(id))
            .collect(),
        moved: Vec::new(),
    };

    for &worker_id in &change.removed {
        resync::evict_worker(conn, job.plan_id, job.id, worker_id).await?;
    }

    for &worker_id in &change.added {
        if let Some(previous) = active_jobs::find_job_for_worker(conn, job.plan_id, worker_id).await?
        {
            if previous != job.id {
                resync::evict_worker(conn, job.plan_id, previous, worker_id).await?;
                info!(%worker_id, evicted_from = %previous, to = %job.id, "worker moved between jobs");
                change.moved.push((worker_id, previous));
            }
        }
        active_jobs::add_worker(conn, job.id, job.plan_id, worker_id).await?;
    }

    Ok(change)
}

/// Set or clear the responsible worker; a new one must already be a member.
pub(crate) async fn set_responsible(
    conn: &mut PgConnection,
    job_id: Uuid,
    responsible: Option<Uuid>,
) -> EngineResult<()> {
    if let Some(worker_id) = responsible {
        let members = active_jobs::list_worker_ids(conn, job_id).await?;
        if !members.contains(&worker_id) {
            warn!(%job_id, %worker_id, "responsible worker is not a member");
            return Err(EngineError::InvalidInput(format!(
                "responsible worker {worker_id} is not assigned to job {job_id}"
            )));
        }
    }
    active_jobs::set_responsible_worker(conn, job_id, responsible).await?;
    Ok(())
}

// -----------------------------------------------------------------------
// Scheduling
// -----------------------------------------------------------------------

/// Schedule a proposed job into a plan.
///
/// Fails with [`EngineError::DuplicateAssignment`] when the proposed job is
/// already scheduled in that plan.
pub async fn create_active_job(
    pool: &PgPool,
    plan_id: Uuid,
    proposed_job_id: Uuid,
    descriptions: ActiveJobDescriptions,
) -> EngineResult<ActiveJob> {
    let jobs = create_active_jobs_bulk(
        pool,
        plan_id,
        &[NewActiveJob {
            proposed_job_id,
            descriptions,
        }],
    )
    .await?;

    jobs.into_iter()
        .next()
        .ok_or_else(|| EngineError::Storage(anyhow::anyhow!("active job insert returned no row")))
}

/// Schedule several proposed jobs into a plan, all or nothing.
///
/// Duplicates are checked against the plan and within the batch before
/// anything is written.
pub async fn create_active_jobs_bulk(
    pool: &PgPool,
    plan_id: Uuid,
    jobs: &[NewActiveJob],
) -> EngineResult<Vec<ActiveJob>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = plans::lock_plan(&mut *tx, plan_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Plan, plan_id))?;
    let created = schedule_jobs(&mut *tx, &plan, jobs).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(%plan_id, count = created.len(), "active jobs created");
    Ok(created)
}

/// Validate and insert `jobs` under a plan the caller has locked.
pub(crate) async fn schedule_jobs(
    conn: &mut PgConnection,
    plan: &Plan,
    jobs: &[NewActiveJob],
) -> EngineResult<Vec<ActiveJob>> {
    let mut seen = HashSet::new();
    for job in jobs {
        if !seen.insert(job.proposed_job_id) {
            warn!(plan_id = %plan.id, proposed_job_id = %job.proposed_job_id, "duplicate proposed job in batch");
            return Err(EngineError::DuplicateAssignment {
                proposed_job_id: job.proposed_job_id,
                plan_id: plan.id,
            });
        }
    }

    let ids: Vec<Uuid> = jobs.iter().map(|j| j.proposed_job_id).collect();
    if let Some(&existing) = active_jobs::find_scheduled_proposed_jobs(conn, plan.id, &ids)
        .await?
        .first()
    {
        warn!(plan_id = %plan.id, proposed_job_id = %existing, "proposed job already scheduled");
        return Err(EngineError::DuplicateAssignment {
            proposed_job_id: existing,
            plan_id: plan.id,
        });
    }

    let proposed = proposed_jobs::get_proposed_jobs(conn, &ids).await?;

    let mut created = Vec::with_capacity(jobs.len());
    for job in jobs {
        let Some(source) = proposed.iter().find(|p| p.id == job.proposed_job_id) else {
            return Err(EngineError::not_found(
                Entity::ProposedJob,
                job.proposed_job_id,
            ));
        };
        if source.event_id != plan.event_id {
            return Err(EngineError::InvalidInput(format!(
                "proposed job {} belongs to another event than plan {}",
                source.id, plan.id
            )));
        }

        let public = job
            .descriptions
            .public_description
            .as_deref()
            .unwrap_or(&source.public_description);
        let private = job
            .descriptions
            .private_description
            .as_deref()
            .unwrap_or(&source.private_description);

        let inserted =
            active_jobs::insert_active_job(conn, plan.id, source.id, public, private).await;
        match inserted {
            Ok(active) => created.push(active),
            // A concurrent insert slipped past the pre-check.
            Err(err) if queries::is_unique_violation(&err) => {
                return Err(EngineError::DuplicateAssignment {
                    proposed_job_id: source.id,
                    plan_id: plan.id,
                });
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(created)
}

/// Delete an active job. Its memberships and rides go with it.
pub async fn delete_active_job(pool: &PgPool, job_id: Uuid) -> EngineResult<()> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let job = lock_job_plan(&mut *tx, job_id).await?;
    active_jobs::delete_active_job(&mut *tx, job.id).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(%job_id, plan_id = %job.plan_id, "active job deleted");
    Ok(())
}

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

/// Resolve a job's plan, lock it, and re-read the job under the lock.
pub(crate) async fn lock_job_plan(conn: &mut PgConnection, job_id: Uuid) -> EngineResult<ActiveJob> {
    let not_found = || EngineError::not_found(Entity::ActiveJob, job_id);

    let job = active_jobs::get_active_job(conn, job_id)
        .await?
        .ok_or_else(not_found)?;
    plans::lock_plan(conn, job.plan_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Plan, job.plan_id))?;

    // The job may have been deleted while we waited for the lock.
    active_jobs::get_active_job(conn, job_id)
        .await?
        .ok_or_else(not_found)
}

/// Drop repeated IDs, keeping first occurrences in order.
fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
