//! Database query functions for the `active_jobs` and `active_job_workers`
//! tables.

use anyhow::{Context, Result};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{ActiveJob, ActiveJobSummary};

/// Insert an active job. The `(proposed_job_id, plan_id)` pair is UNIQUE;
/// a duplicate surfaces as a database error carrying the constraint name.
pub async fn insert_active_job(
    conn: &mut PgConnection,
    plan_id: Uuid,
    proposed_job_id: Uuid,
    public_description: &str,
    private_description: &str,
) -> Result<ActiveJob> {
    let job = sqlx::query_as::<_, ActiveJob>(
        "INSERT INTO active_jobs (plan_id, proposed_job_id, public_description, private_description) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(proposed_job_id)
    .bind(public_description)
    .bind(private_description)
    .fetch_one(conn)
    .await
    .context("failed to insert active job")?;

    Ok(job)
}

/// Fetch an active job by ID.
pub async fn get_active_job(conn: &mut PgConnection, id: Uuid) -> Result<Option<ActiveJob>> {
    let job = sqlx::query_as::<_, ActiveJob>("SELECT * FROM active_jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch active job")?;

    Ok(job)
}

/// Of the given proposed job IDs, return those already scheduled in the plan.
pub async fn find_scheduled_proposed_jobs(
    conn: &mut PgConnection,
    plan_id: Uuid,
    proposed_job_ids: &[Uuid],
) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT proposed_job_id FROM active_jobs \
         WHERE plan_id = $1 AND proposed_job_id = ANY($2)",
    )
    .bind(plan_id)
    .bind(proposed_job_ids)
    .fetch_all(conn)
    .await
    .context("failed to look up scheduled proposed jobs")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// List the active jobs of a plan in creation order.
pub async fn list_for_plan(conn: &mut PgConnection, plan_id: Uuid) -> Result<Vec<ActiveJob>> {
    let jobs = sqlx::query_as::<_, ActiveJob>(
        "SELECT * FROM active_jobs WHERE plan_id = $1 ORDER BY created_at, id",
    )
    .bind(plan_id)
    .fetch_all(conn)
    .await
    .context("failed to list active jobs for plan")?;

    Ok(jobs)
}

/// List the active jobs of a plan joined with their proposed job names,
/// ordered by name.
pub async fn list_summaries_for_plan(
    conn: &mut PgConnection,
    plan_id: Uuid,
) -> Result<Vec<ActiveJobSummary>> {
    let jobs = sqlx::query_as::<_, ActiveJobSummary>(
        "SELECT aj.id, aj.plan_id, aj.proposed_job_id, pj.name, \
                aj.public_description, aj.responsible_worker_id \
         FROM active_jobs aj \
         JOIN proposed_jobs pj ON pj.id = aj.proposed_job_id \
         WHERE aj.plan_id = $1 \
         ORDER BY pj.name, aj.id",
    )
    .bind(plan_id)
    .fetch_all(conn)
    .await
    .context("failed to list active job summaries")?;

    Ok(jobs)
}

/// Delete an active job; memberships and rides cascade.
pub async fn delete_active_job(conn: &mut PgConnection, id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM active_jobs WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .context("failed to delete active job")?;

    Ok(result.rows_affected())
}

/// Overwrite whichever descriptions are `Some`.
pub async fn update_descriptions(
    conn: &mut PgConnection,
    id: Uuid,
    public_description: Option<&str>,
    private_description: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE active_jobs \
         SET public_description = COALESCE($1, public_description), \
             private_description = COALESCE($2, private_description) \
         WHERE id = $3",
    )
    .bind(public_description)
    .bind(private_description)
    .bind(id)
    .execute(conn)
    .await
    .context("failed to update active job descriptions")?;

    Ok(())
}

/// Set (or clear) the responsible worker.
pub async fn set_responsible_worker(
    conn: &mut PgConnection,
    id: Uuid,
    worker_id: Option<Uuid>,
) -> Result<()> {
    sqlx::query("UPDATE active_jobs SET responsible_worker_id = $1 WHERE id = $2")
        .bind(worker_id)
        .bind(id)
        .execute(conn)
        .await
        .context("failed to set responsible worker")?;

    Ok(())
}

/// Clear the responsible worker only if it currently is `worker_id`.
/// Returns the number of rows affected (0 or 1).
pub async fn clear_responsible_if(
    conn: &mut PgConnection,
    id: Uuid,
    worker_id: Uuid,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE active_jobs SET responsible_worker_id = NULL \
         WHERE id = $1 AND responsible_worker_id = $2",
    )
    .bind(id)
    .bind(worker_id)
    .execute(conn)
    .await
    .context("failed to clear responsible worker")?;

    Ok(result.rows_affected())
}

// -----------------------------------------------------------------------
// Membership
// -----------------------------------------------------------------------

/// IDs of the workers assigned to a job.
pub async fn list_worker_ids(conn: &mut PgConnection, job_id: Uuid) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT worker_id FROM active_job_workers WHERE job_id = $1")
            .bind(job_id)
            .fetch_all(conn)
            .await
            .context("failed to list job workers")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// `(job_id, worker_id)` for every membership in the plan.
pub async fn list_memberships_for_plan(
    conn: &mut PgConnection,
    plan_id: Uuid,
) -> Result<Vec<(Uuid, Uuid)>> {
    let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
        "SELECT job_id, worker_id FROM active_job_workers WHERE plan_id = $1",
    )
    .bind(plan_id)
    .fetch_all(conn)
    .await
    .context("failed to list plan memberships")?;

    Ok(rows)
}

/// The job in `plan_id` that `worker_id` is currently assigned to, if any.
pub async fn find_job_for_worker(
    conn: &mut PgConnection,
    plan_id: Uuid,
    worker_id: Uuid,
) -> Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT job_id FROM active_job_workers WHERE plan_id = $1 AND worker_id = $2",
    )
    .bind(plan_id)
    .bind(worker_id)
    .fetch_optional(conn)
    .await
    .context("failed to look up worker's job")?;

    Ok(row.map(|(id,)| id))
}

/// Add a worker to a job. `UNIQUE (plan_id, worker_id)` rejects a second job
/// in the same plan.
pub async fn add_worker(
    conn: &mut PgConnection,
    job_id: Uuid,
    plan_id: Uuid,
    worker_id: Uuid,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO active_job_workers (job_id, plan_id, worker_id) VALUES ($1, $2, $3) \
         ON CONFLICT (job_id, worker_id) DO NOTHING",
    )
    .bind(job_id)
    .bind(plan_id)
    .bind(worker_id)
    .execute(conn)
    .await
    .context("failed to add worker to job")?;

    Ok(())
}

/// Remove a worker from a job. Returns the number of rows affected.
pub async fn remove_worker(conn: &mut PgConnection, job_id: Uuid, worker_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM active_job_workers WHERE job_id = $1 AND worker_id = $2")
        .bind(job_id)
        .bind(worker_id)
        .execute(conn)
        .await
        .context("failed to remove worker from job")?;

    Ok(result.rows_affected())
}
