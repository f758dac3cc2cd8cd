//! Database query functions for the `workers` table.

use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{Worker, WorkerContact};

/// Fields for a new worker row.
#[derive(Debug, Clone, Copy)]
pub struct NewWorker<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: &'a str,
    pub email: &'a str,
    pub is_strong: bool,
}

/// Insert a worker.
pub async fn insert_worker(pool: &PgPool, worker: &NewWorker<'_>) -> Result<Worker> {
    let row = sqlx::query_as::<_, Worker>(
        "INSERT INTO workers (first_name, last_name, phone, email, is_strong) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(worker.first_name)
    .bind(worker.last_name)
    .bind(worker.phone)
    .bind(worker.email)
    .bind(worker.is_strong)
    .fetch_one(pool)
    .await
    .context("failed to insert worker")?;

    Ok(row)
}

/// Fetch a worker by ID.
pub async fn get_worker(pool: &PgPool, id: Uuid) -> Result<Option<Worker>> {
    let worker = sqlx::query_as::<_, Worker>("SELECT * FROM workers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch worker")?;

    Ok(worker)
}

/// Return the IDs out of `ids` that do not exist in the `workers` table.
pub async fn find_missing(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT requested.id FROM UNNEST($1::uuid[]) AS requested(id) \
         WHERE NOT EXISTS (SELECT 1 FROM workers w WHERE w.id = requested.id)",
    )
    .bind(ids)
    .fetch_all(conn)
    .await
    .context("failed to check worker ids")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Contacts for the given worker IDs. Unknown IDs are skipped.
pub async fn get_contacts(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<WorkerContact>> {
    let contacts = sqlx::query_as::<_, WorkerContact>(
        "SELECT id, first_name, last_name, phone FROM workers \
         WHERE id = ANY($1) \
         ORDER BY last_name, first_name",
    )
    .bind(ids)
    .fetch_all(conn)
    .await
    .context("failed to fetch worker contacts")?;

    Ok(contacts)
}
