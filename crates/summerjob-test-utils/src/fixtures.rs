//! Seed data for integration tests.
//!
//! Every helper inserts through the real query layer and panics on failure,
//! which is what a test wants.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use summerjob_db::models::{Car, Plan, ProposedJob, SummerJobEvent, Worker};
use summerjob_db::queries::workers::NewWorker;
use summerjob_db::queries::{cars, events, plans, proposed_jobs, workers};

/// The day every seeded plan is scheduled on.
pub fn plan_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 14).expect("valid date")
}

/// An active event spanning July 2026 with one plan on [`plan_day`].
pub struct SeededDay {
    pub event: SummerJobEvent,
    pub plan: Plan,
}

/// Insert and activate an event, then add a plan for [`plan_day`].
pub async fn seed_day(pool: &PgPool) -> SeededDay {
    let event = events::insert_event(
        pool,
        "Summer 2026",
        NaiveDate::from_ymd_opt(2026, 7, 1).expect("valid date"),
        NaiveDate::from_ymd_opt(2026, 7, 31).expect("valid date"),
    )
    .await
    .expect("insert_event should succeed");
    let event = events::set_active_event(pool, event.id)
        .await
        .expect("set_active_event should succeed")
        .expect("event should exist");
    let plan = plans::insert_plan(pool, event.id, plan_day())
        .await
        .expect("insert_plan should succeed");
    SeededDay { event, plan }
}

/// Add a second plan for another day of the same event.
pub async fn seed_plan(pool: &PgPool, event_id: Uuid, day: NaiveDate) -> Plan {
    plans::insert_plan(pool, event_id, day)
        .await
        .expect("insert_plan should succeed")
}

/// Insert a worker with a phone number derived from the name.
pub async fn worker(pool: &PgPool, first_name: &str, last_name: &str) -> Worker {
    let phone = format!("+420 {}{}", first_name.len(), last_name.len());
    let email = format!(
        "{}.{}@example.org",
        first_name.to_lowercase(),
        last_name.to_lowercase()
    );
    workers::insert_worker(
        pool,
        &NewWorker {
            first_name,
            last_name,
            phone: &phone,
            email: &email,
            is_strong: false,
        },
    )
    .await
    .expect("insert_worker should succeed")
}

/// Insert a four-seat car owned by `owner_id`.
pub async fn car(pool: &PgPool, owner_id: Uuid, name: &str) -> Car {
    cars::insert_car(pool, owner_id, name, 4)
        .await
        .expect("insert_car should succeed")
}

/// Insert a proposed job for the event.
pub async fn proposed_job(pool: &PgPool, event_id: Uuid, name: &str) -> ProposedJob {
    proposed_jobs::insert_proposed_job(
        pool,
        event_id,
        name,
        &format!("{name} (public)"),
        &format!("{name} (private)"),
    )
    .await
    .expect("insert_proposed_job should succeed")
}
