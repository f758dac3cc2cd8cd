//! Plan management. A plan is one day of the active event.

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use summerjob_db::models::Plan;
use summerjob_db::queries::{self, plans};

use crate::context::EventContext;
use crate::error::{EngineError, EngineResult, Entity};
use crate::my_plan::{PlanSnapshot, load_snapshot};

/// Create a plan for `day`, which must fall inside the active event.
pub async fn create_plan(pool: &PgPool, ctx: &EventContext, day: NaiveDate) -> EngineResult<Plan> {
    if !ctx.event.contains_day(day) {
        warn!(%day, event_id = %ctx.event_id(), "plan day outside event");
        return Err(EngineError::InvalidInput(format!(
            "{day} is outside event {} ({} to {})",
            ctx.event.name, ctx.event.start_date, ctx.event.end_date
        )));
    }

    match plans::insert_plan(pool, ctx.event_id(), day).await {
        Ok(plan) => {
            info!(plan_id = %plan.id, %day, "plan created");
            Ok(plan)
        }
        Err(err) if queries::is_unique_violation(&err) => Err(EngineError::InvalidInput(format!(
            "a plan for {day} already exists"
        ))),
        Err(err) => Err(err.into()),
    }
}

/// Publish or unpublish a plan. Workers see their job only once published.
pub async fn publish_plan(pool: &PgPool, plan_id: Uuid, published: bool) -> EngineResult<()> {
    if plans::set_published(pool, plan_id, published).await? == 0 {
        return Err(EngineError::not_found(Entity::Plan, plan_id));
    }
    info!(%plan_id, published, "plan publication changed");
    Ok(())
}

/// Delete a plan with all its jobs and rides.
pub async fn delete_plan(pool: &PgPool, plan_id: Uuid) -> EngineResult<()> {
    if plans::delete_plan(pool, plan_id).await? == 0 {
        return Err(EngineError::not_found(Entity::Plan, plan_id));
    }
    info!(%plan_id, "plan deleted");
    Ok(())
}

/// A plan with its jobs, members and rides.
pub async fn get_plan(pool: &PgPool, plan_id: Uuid) -> EngineResult<PlanSnapshot> {
    let plan = plans::get_plan(pool, plan_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Plan, plan_id))?;
    let mut conn = pool.acquire().await.context("failed to acquire connection")?;
    load_snapshot(&mut *conn, plan).await
}

/// Plans of the active event, by day.
pub async fn list_plans(pool: &PgPool, ctx: &EventContext) -> EngineResult<Vec<Plan>> {
    Ok(plans::list_plans_for_event(pool, ctx.event_id()).await?)
}
