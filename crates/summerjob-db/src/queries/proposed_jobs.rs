//! Database query functions for the `proposed_jobs` table.

use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::ProposedJob;

/// Insert a proposed job for an event. Optional fields take their column
/// defaults.
pub async fn insert_proposed_job(
    pool: &PgPool,
    event_id: Uuid,
    name: &str,
    public_description: &str,
    private_description: &str,
) -> Result<ProposedJob> {
    let job = sqlx::query_as::<_, ProposedJob>(
        "INSERT INTO proposed_jobs (event_id, name, public_description, private_description) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(event_id)
    .bind(name)
    .bind(public_description)
    .bind(private_description)
    .fetch_one(pool)
    .await
    .context("failed to insert proposed job")?;

    Ok(job)
}

/// Fetch every proposed job whose ID is in `ids`.
pub async fn get_proposed_jobs(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<ProposedJob>> {
    let jobs = sqlx::query_as::<_, ProposedJob>("SELECT * FROM proposed_jobs WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(conn)
        .await
        .context("failed to fetch proposed jobs")?;

    Ok(jobs)
}
