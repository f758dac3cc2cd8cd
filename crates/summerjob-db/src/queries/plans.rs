//! Database query functions for the `plans` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::Plan;

/// Insert a new (unpublished) plan for `day`.
pub async fn insert_plan(pool: &PgPool, event_id: Uuid, day: NaiveDate) -> Result<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
        "INSERT INTO plans (event_id, day) VALUES ($1, $2) RETURNING *",
    )
    .bind(event_id)
    .bind(day)
    .fetch_one(pool)
    .await
    .context("failed to insert plan")?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// Fetch a plan and hold a row lock on it until the transaction ends.
///
/// Every plan-scoped mutation takes this lock first, so concurrent
/// reassignments within one plan serialize.
pub async fn lock_plan(conn: &mut PgConnection, id: Uuid) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to lock plan")?;

    Ok(plan)
}

/// List the plans of an event, ordered by day.
pub async fn list_plans_for_event(pool: &PgPool, event_id: Uuid) -> Result<Vec<Plan>> {
    let plans = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE event_id = $1 ORDER BY day")
        .bind(event_id)
        .fetch_all(pool)
        .await
        .context("failed to list plans")?;

    Ok(plans)
}

/// Find the plan of an event for a given day.
pub async fn get_plan_for_day(
    pool: &PgPool,
    event_id: Uuid,
    day: NaiveDate,
) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE event_id = $1 AND day = $2")
        .bind(event_id)
        .bind(day)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan for day")?;

    Ok(plan)
}

/// Set the published flag. Returns the number of rows affected.
pub async fn set_published(pool: &PgPool, id: Uuid, published: bool) -> Result<u64> {
    let result = sqlx::query("UPDATE plans SET published = $1 WHERE id = $2")
        .bind(published)
        .bind(id)
        .execute(pool)
        .await
        .context("failed to update plan published flag")?;

    Ok(result.rows_affected())
}

/// Delete a plan; its active jobs, memberships and rides cascade.
pub async fn delete_plan(pool: &PgPool, id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM plans WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete plan")?;

    Ok(result.rows_affected())
}
