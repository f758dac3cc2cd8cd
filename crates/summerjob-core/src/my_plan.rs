//! The per-worker, per-day read model: which job, which ride, which
//! adoration slots and who is around.

use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use uuid::Uuid;

use summerjob_db::models::{ActiveJobSummary, Plan, ProposedJob, RideWithPassengers, WorkerContact};
use summerjob_db::queries::{active_jobs, cars, plans, proposed_jobs, rides, workers};

use crate::adoration::{AdjacencyConfig, AdorationAssignment, for_worker_day};
use crate::context::EventContext;
use crate::error::{EngineError, EngineResult, Entity};

/// One day as seen by one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MyPlan {
    pub day: NaiveDate,
    /// Present only when the plan is published and the worker has a job.
    pub job: Option<MyJob>,
    pub adorations: Vec<AdorationAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MyJob {
    /// 1-based position of the job when the plan's jobs are sorted by name.
    pub seq_num: usize,
    pub name: String,
    pub description: String,
    pub responsible_worker_name: Option<String>,
    pub worker_names: Vec<String>,
    pub address: String,
    pub contact: String,
    pub has_food: bool,
    pub has_shower: bool,
    pub ride: Option<MyRide>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MyRide {
    pub car_name: String,
    pub is_driver: bool,
    pub driver_name: String,
    pub driver_phone: String,
    /// Whether the ride belongs to the worker's own job.
    pub ends_at_my_job: bool,
    pub end_job_name: String,
}

// -----------------------------------------------------------------------
// Snapshot
// -----------------------------------------------------------------------

/// A plan with its jobs, members and rides resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSnapshot {
    pub plan: Plan,
    pub jobs: Vec<JobSnapshot>,
    pub rides: Vec<RideSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job: ActiveJobSummary,
    pub proposed: ProposedJob,
    pub workers: Vec<WorkerContact>,
    pub responsible: Option<WorkerContact>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RideSnapshot {
    pub ride: RideWithPassengers,
    pub car_name: String,
    pub driver: WorkerContact,
}

/// Load a plan's jobs, members and rides in one pass.
pub async fn load_snapshot(conn: &mut PgConnection, plan: Plan) -> EngineResult<PlanSnapshot> {
    let summaries = active_jobs::list_summaries_for_plan(conn, plan.id).await?;
    let memberships = active_jobs::list_memberships_for_plan(conn, plan.id).await?;
    let plan_rides = rides::list_for_plan(conn, plan.id).await?;

    let proposed_ids: Vec<Uuid> = summaries.iter().map(|j| j.proposed_job_id).collect();
    let mut proposed: HashMap<Uuid, ProposedJob> = proposed_jobs::get_proposed_jobs(conn, &proposed_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut people: Vec<Uuid> = memberships.iter().map(|(_, w)| *w).collect();
    people.extend(plan_rides.iter().map(|r| r.ride.driver_id));
    people.extend(summaries.iter().filter_map(|j| j.responsible_worker_id));
    people.sort();
    people.dedup();
    let contacts = workers::get_contacts(conn, &people).await?;
    let contact_by_id: HashMap<Uuid, &WorkerContact> = contacts.iter().map(|c| (c.id, c)).collect();

    let car_ids: Vec<Uuid> = plan_rides.iter().map(|r| r.ride.car_id).collect();
    let car_names: HashMap<Uuid, String> = cars::get_cars(conn, &car_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut jobs = Vec::with_capacity(summaries.len());
    for job in summaries {
        let proposed = proposed
            .remove(&job.proposed_job_id)
            .ok_or_else(|| EngineError::not_found(Entity::ProposedJob, job.proposed_job_id))?;
        // `contacts` is ordered by name, which keeps co-worker lists stable.
        let workers = contacts
            .iter()
            .filter(|c| memberships.contains(&(job.id, c.id)))
            .cloned()
            .collect();
        let responsible = job
            .responsible_worker_id
            .and_then(|id| contact_by_id.get(&id).map(|c| (*c).clone()));
        jobs.push(JobSnapshot {
            job,
            proposed,
            workers,
            responsible,
        });
    }

    let mut ride_snapshots = Vec::with_capacity(plan_rides.len());
    for ride in plan_rides {
        let driver = contact_by_id
            .get(&ride.ride.driver_id)
            .map(|c| (*c).clone())
            .ok_or_else(|| EngineError::not_found(Entity::Worker, ride.ride.driver_id))?;
        let car_name = car_names
            .get(&ride.ride.car_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(Entity::Car, ride.ride.car_id))?;
        ride_snapshots.push(RideSnapshot {
            ride,
            car_name,
            driver,
        });
    }

    Ok(PlanSnapshot {
        plan,
        jobs,
        rides: ride_snapshots,
    })
}

// -----------------------------------------------------------------------
// Projection
// -----------------------------------------------------------------------

/// Dictionary order for job names: letters first, ignoring case and
/// accents, then accented after plain, then lowercase before uppercase.
fn compare_names(a: &str, b: &str) -> Ordering {
    let base = |s: &str| -> String {
        s.nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect()
    };
    let folded = |s: &str| -> String { s.nfd().flat_map(char::to_lowercase).collect() };

    base(a)
        .cmp(&base(b))
        .then_with(|| folded(a).cmp(&folded(b)))
        .then_with(|| b.cmp(a))
}

/// The worker's job on a published plan, if any.
pub fn project_job(snapshot: &PlanSnapshot, worker_id: Uuid) -> Option<MyJob> {
    if !snapshot.plan.published {
        return None;
    }

    let mine = snapshot
        .jobs
        .iter()
        .find(|j| j.workers.iter().any(|w| w.id == worker_id))?;

    let mut order: Vec<&JobSnapshot> = snapshot.jobs.iter().collect();
    order.sort_by(|a, b| compare_names(&a.job.name, &b.job.name).then(a.job.id.cmp(&b.job.id)));
    let seq_num = order.iter().position(|j| j.job.id == mine.job.id)? + 1;

    let job_names: HashMap<Uuid, &str> = snapshot
        .jobs
        .iter()
        .map(|j| (j.job.id, j.job.name.as_str()))
        .collect();

    let own_rides = snapshot.rides.iter().filter(|r| r.ride.ride.job_id == mine.job.id);
    let ride = own_rides
        .chain(snapshot.rides.iter())
        .find(|r| r.ride.carries(worker_id))
        .map(|r| MyRide {
            car_name: r.car_name.clone(),
            is_driver: r.ride.ride.driver_id == worker_id,
            driver_name: r.driver.full_name(),
            driver_phone: r.driver.phone.clone(),
            ends_at_my_job: r.ride.ride.job_id == mine.job.id,
            end_job_name: job_names
                .get(&r.ride.ride.job_id)
                .map(|n| (*n).to_string())
                .unwrap_or_default(),
        });

    Some(MyJob {
        seq_num,
        name: mine.job.name.clone(),
        description: mine.proposed.public_description.clone(),
        responsible_worker_name: mine.responsible.as_ref().map(WorkerContact::full_name),
        worker_names: mine.workers.iter().map(WorkerContact::full_name).collect(),
        address: mine.proposed.address.clone(),
        contact: mine.proposed.contact.clone(),
        has_food: mine.proposed.has_food,
        has_shower: mine.proposed.has_shower,
        ride,
    })
}

// -----------------------------------------------------------------------
// Entry points
// -----------------------------------------------------------------------

/// One plan of the active event as seen by `worker_id`.
pub async fn my_plan_for_day(
    pool: &PgPool,
    ctx: &EventContext,
    plan_id: Uuid,
    worker_id: Uuid,
    config: &AdjacencyConfig,
) -> EngineResult<MyPlan> {
    ensure_worker(pool, worker_id).await?;
    let plan = plans::get_plan(pool, plan_id)
        .await?
        .filter(|p| p.event_id == ctx.event_id())
        .ok_or_else(|| EngineError::not_found(Entity::Plan, plan_id))?;
    project_plan(pool, ctx, plan, worker_id, config).await
}

/// The worker's view of `day`. A day without a plan still carries the
/// adoration slots.
pub async fn my_plan_on(
    pool: &PgPool,
    ctx: &EventContext,
    day: NaiveDate,
    worker_id: Uuid,
    config: &AdjacencyConfig,
) -> EngineResult<MyPlan> {
    ensure_worker(pool, worker_id).await?;
    match plans::get_plan_for_day(pool, ctx.event_id(), day).await? {
        Some(plan) => project_plan(pool, ctx, plan, worker_id, config).await,
        None => Ok(MyPlan {
            day,
            job: None,
            adorations: for_worker_day(pool, ctx.event_id(), worker_id, day, config).await?,
        }),
    }
}

/// Every plan of the active event, by day.
pub async fn my_plans(
    pool: &PgPool,
    ctx: &EventContext,
    worker_id: Uuid,
    config: &AdjacencyConfig,
) -> EngineResult<Vec<MyPlan>> {
    ensure_worker(pool, worker_id).await?;
    let all = plans::list_plans_for_event(pool, ctx.event_id()).await?;

    let mut out = Vec::with_capacity(all.len());
    for plan in all {
        out.push(project_plan(pool, ctx, plan, worker_id, config).await?);
    }
    Ok(out)
}

async fn project_plan(
    pool: &PgPool,
    ctx: &EventContext,
    plan: Plan,
    worker_id: Uuid,
    config: &AdjacencyConfig,
) -> EngineResult<MyPlan> {
    let day = plan.day;
    let job = if plan.published {
        let mut conn = pool.acquire().await.context("failed to acquire connection")?;
        let snapshot = load_snapshot(&mut *conn, plan).await?;
        project_job(&snapshot, worker_id)
    } else {
        None
    };
    let adorations = for_worker_day(pool, ctx.event_id(), worker_id, day, config).await?;

    Ok(MyPlan {
        day,
        job,
        adorations,
    })
}

async fn ensure_worker(pool: &PgPool, worker_id: Uuid) -> EngineResult<()> {
    workers::get_worker(pool, worker_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Worker, worker_id))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use summerjob_db::models::Ride;

    use super::*;

    fn contact(first: &str, last: &str) -> WorkerContact {
        WorkerContact {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: format!("+420 {first}"),
        }
    }

    fn plan(published: bool) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            day: NaiveDate::from_ymd_opt(2026, 7, 14).unwrap(),
            published,
            created_at: Utc::now(),
        }
    }

    fn job(plan: &Plan, name: &str, workers: Vec<WorkerContact>) -> JobSnapshot {
        let proposed = ProposedJob {
            id: Uuid::new_v4(),
            event_id: plan.event_id,
            name: name.to_string(),
            public_description: format!("{name} for everyone"),
            private_description: String::new(),
            address: format!("{name} street 1"),
            contact: "owner".to_string(),
            has_food: true,
            has_shower: false,
        };
        JobSnapshot {
            job: ActiveJobSummary {
                id: Uuid::new_v4(),
                plan_id: plan.id,
                proposed_job_id: proposed.id,
                name: name.to_string(),
                public_description: proposed.public_description.clone(),
                responsible_worker_id: None,
            },
            proposed,
            workers,
            responsible: None,
        }
    }

    fn ride(job: &JobSnapshot, driver: &WorkerContact, passengers: &[&WorkerContact]) -> RideSnapshot {
        RideSnapshot {
            ride: RideWithPassengers {
                ride: Ride {
                    id: Uuid::new_v4(),
                    job_id: job.job.id,
                    driver_id: driver.id,
                    car_id: Uuid::new_v4(),
                    created_at: Utc::now(),
                },
                passenger_ids: passengers.iter().map(|p| p.id).collect(),
            },
            car_name: format!("{}'s car", driver.first_name),
            driver: driver.clone(),
        }
    }

    #[test]
    fn unpublished_plan_hides_job() {
        let me = contact("Jana", "Nová");
        let p = plan(false);
        let jobs = vec![job(&p, "Garden", vec![me.clone()])];
        let snapshot = PlanSnapshot { plan: p, jobs, rides: vec![] };
        assert!(project_job(&snapshot, me.id).is_none());
    }

    #[test]
    fn worker_without_job_gets_none() {
        let p = plan(true);
        let jobs = vec![job(&p, "Garden", vec![contact("Eva", "Malá")])];
        let snapshot = PlanSnapshot { plan: p, jobs, rides: vec![] };
        assert!(project_job(&snapshot, Uuid::new_v4()).is_none());
    }

    #[test]
    fn sequence_number_follows_name_order() {
        let me = contact("Jana", "Nová");
        let p = plan(true);
        let jobs = vec![
            job(&p, "Woodshed", vec![contact("Eva", "Malá")]),
            job(&p, "Roof", vec![me.clone()]),
            job(&p, "Attic", vec![contact("Petr", "Velký")]),
        ];
        let snapshot = PlanSnapshot { plan: p, jobs, rides: vec![] };

        let mine = project_job(&snapshot, me.id).unwrap();
        assert_eq!(mine.seq_num, 2);
        assert_eq!(mine.name, "Roof");
        assert_eq!(mine.description, "Roof for everyone");
        assert_eq!(mine.responsible_worker_name, None);
        assert!(mine.ride.is_none());
    }

    #[test]
    fn sequence_number_ignores_case_and_accents() {
        let me = contact("Jana", "Nová");
        let p = plan(true);
        let jobs = vec![
            job(&p, "Zahrada", vec![contact("Eva", "Malá")]),
            job(&p, "Čištění", vec![me.clone()]),
            job(&p, "alej", vec![contact("Petr", "Velký")]),
        ];
        let snapshot = PlanSnapshot { plan: p, jobs, rides: vec![] };

        assert_eq!(project_job(&snapshot, me.id).unwrap().seq_num, 2);
    }

    #[test]
    fn name_order_breaks_ties_on_accents_then_case() {
        assert_eq!(compare_names("cesta", "Čistění"), Ordering::Less);
        assert_eq!(compare_names("Čistka", "Cistka"), Ordering::Greater);
        assert_eq!(compare_names("alej", "Alej"), Ordering::Less);
        assert_eq!(compare_names("Alej", "Alej"), Ordering::Equal);
    }

    #[test]
    fn own_job_ride_wins_over_foreign_ride() {
        let me = contact("Jana", "Nová");
        let own_driver = contact("Karel", "Řidič");
        let other_driver = contact("Ota", "Cizí");
        let p = plan(true);
        let mut mine_job = job(&p, "Garden", vec![me.clone(), own_driver.clone()]);
        mine_job.responsible = Some(own_driver.clone());
        let other_job = job(&p, "Barn", vec![other_driver.clone()]);

        // The foreign ride is listed first; the own job's ride must still win.
        let rides = vec![
            ride(&other_job, &other_driver, &[&me]),
            ride(&mine_job, &own_driver, &[&me]),
        ];
        let snapshot = PlanSnapshot {
            plan: p,
            jobs: vec![mine_job, other_job],
            rides,
        };

        let mine = project_job(&snapshot, me.id).unwrap();
        let my_ride = mine.ride.unwrap();
        assert!(my_ride.ends_at_my_job);
        assert!(!my_ride.is_driver);
        assert_eq!(my_ride.driver_name, "Karel Řidič");
        assert_eq!(my_ride.end_job_name, "Garden");
        assert_eq!(mine.responsible_worker_name.as_deref(), Some("Karel Řidič"));
    }

    #[test]
    fn ride_to_another_job_is_reported() {
        let me = contact("Jana", "Nová");
        let driver = contact("Ota", "Cizí");
        let p = plan(true);
        let mine_job = job(&p, "Garden", vec![me.clone()]);
        let other_job = job(&p, "Barn", vec![driver.clone()]);
        let rides = vec![ride(&other_job, &driver, &[&me])];
        let snapshot = PlanSnapshot {
            plan: p,
            jobs: vec![mine_job, other_job],
            rides,
        };

        let my_ride = project_job(&snapshot, me.id).unwrap().ride.unwrap();
        assert!(!my_ride.ends_at_my_job);
        assert_eq!(my_ride.end_job_name, "Barn");
        assert_eq!(my_ride.car_name, "Ota's car");
    }

    #[test]
    fn driver_sees_themself_as_driver() {
        let me = contact("Jana", "Nová");
        let p = plan(true);
        let mine_job = job(&p, "Garden", vec![me.clone()]);
        let rides = vec![ride(&mine_job, &me, &[])];
        let snapshot = PlanSnapshot {
            plan: p,
            jobs: vec![mine_job],
            rides,
        };

        let my_ride = project_job(&snapshot, me.id).unwrap().ride.unwrap();
        assert!(my_ride.is_driver);
        assert_eq!(my_ride.driver_phone, "+420 Jana");
    }
}
