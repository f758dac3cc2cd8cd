//! Entry point for batches produced by an automatic planner.
//!
//! A batch goes through the same scheduling, membership and ride logic as a
//! manual edit, inside one transaction.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use summerjob_db::models::ActiveJob;
use summerjob_db::queries::{active_jobs, plans};

use crate::assignment::{self, ActiveJobDescriptions, NewActiveJob};
use crate::error::{EngineError, EngineResult, Entity};
use crate::rides;

/// A job the planner wants scheduled, fully staffed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedJob {
    pub proposed_job_id: Uuid,
    #[serde(default)]
    pub public_description: Option<String>,
    #[serde(default)]
    pub private_description: Option<String>,
    #[serde(default)]
    pub worker_ids: Vec<Uuid>,
    #[serde(default)]
    pub rides: Vec<PlannedRide>,
    #[serde(default)]
    pub responsible_worker_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedRide {
    pub driver_id: Uuid,
    pub car_id: Uuid,
    #[serde(default)]
    pub passenger_ids: Vec<Uuid>,
}

/// Parse a JSON array of [`PlannedJob`].
pub fn parse_planned_jobs(json: &str) -> EngineResult<Vec<PlannedJob>> {
    serde_json::from_str(json)
        .map_err(|e| EngineError::InvalidInput(format!("malformed planned jobs: {e}")))
}

/// Schedule, staff and wire up every planned job, all or nothing.
pub async fn apply_planned_jobs(
    pool: &PgPool,
    plan_id: Uuid,
    planned: &[PlannedJob],
) -> EngineResult<Vec<ActiveJob>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = plans::lock_plan(&mut *tx, plan_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Plan, plan_id))?;

    let requests: Vec<NewActiveJob> = planned
        .iter()
        .map(|p| NewActiveJob {
            proposed_job_id: p.proposed_job_id,
            descriptions: ActiveJobDescriptions {
                public_description: p.public_description.clone(),
                private_description: p.private_description.clone(),
            },
        })
        .collect();
    let created = assignment::schedule_jobs(&mut *tx, &plan, &requests).await?;

    let mut ride_count = 0;
    for (job, plan_entry) in created.iter().zip(planned) {
        assignment::apply_membership(&mut *tx, job, &plan_entry.worker_ids).await?;
        for ride in &plan_entry.rides {
            rides::insert_ride(&mut *tx, job, ride.driver_id, ride.car_id, &ride.passenger_ids)
                .await?;
            ride_count += 1;
        }
        if plan_entry.responsible_worker_id.is_some() {
            assignment::set_responsible(&mut *tx, job.id, plan_entry.responsible_worker_id).await?;
        }
    }

    let mut applied = Vec::with_capacity(created.len());
    for job in &created {
        let job = active_jobs::get_active_job(&mut *tx, job.id)
            .await?
            .ok_or_else(|| EngineError::not_found(Entity::ActiveJob, job.id))?;
        applied.push(job);
    }

    tx.commit().await.context("failed to commit transaction")?;

    info!(%plan_id, jobs = applied.len(), rides = ride_count, "planned jobs applied");
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_entry_parses_with_defaults() {
        let id = Uuid::new_v4();
        let jobs = parse_planned_jobs(&format!(r#"[{{"proposed_job_id": "{id}"}}]"#)).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].proposed_job_id, id);
        assert!(jobs[0].worker_ids.is_empty());
        assert!(jobs[0].rides.is_empty());
        assert!(jobs[0].responsible_worker_id.is_none());
    }

    #[test]
    fn full_entry_parses() {
        let (job, driver, car, passenger) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        let json = format!(
            r#"[{{
                "proposed_job_id": "{job}",
                "public_description": "Paint the fence",
                "worker_ids": ["{driver}", "{passenger}"],
                "rides": [{{"driver_id": "{driver}", "car_id": "{car}", "passenger_ids": ["{passenger}"]}}],
                "responsible_worker_id": "{driver}"
            }}]"#
        );
        let jobs = parse_planned_jobs(&json).unwrap();
        assert_eq!(jobs[0].public_description.as_deref(), Some("Paint the fence"));
        assert_eq!(jobs[0].rides[0].passenger_ids, vec![passenger]);
        assert_eq!(jobs[0].responsible_worker_id, Some(driver));
    }

    #[test]
    fn malformed_json_is_invalid_input() {
        let err = parse_planned_jobs("{not json").unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}
