//! Integration tests for the embedded migrations and the storage-level
//! constraints that back the engine's invariants.

use chrono::NaiveDate;
use sqlx::PgPool;

use summerjob_db::pool;
use summerjob_db::queries::{self, active_jobs, events};
use summerjob_test_utils::fixtures;
use summerjob_test_utils::{create_test_db, drop_test_db};

async fn schedule(pool: &PgPool, plan_id: uuid::Uuid, proposed_job_id: uuid::Uuid) -> uuid::Uuid {
    let mut conn = pool.acquire().await.unwrap();
    active_jobs::insert_active_job(&mut conn, plan_id, proposed_job_id, "public", "private")
        .await
        .expect("insert_active_job should succeed")
        .id
}

#[tokio::test]
async fn migrations_create_every_table_empty() {
    let (pool, db_name) = create_test_db().await;

    let counts = pool::table_counts(&pool).await.unwrap();
    assert_eq!(counts.len(), 11);
    assert!(counts.iter().all(|(_, n)| *n == 0), "unexpected rows: {counts:?}");

    // Re-running is a no-op.
    pool::run_migrations(&pool).await.unwrap();

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn proposed_job_scheduled_once_per_plan() {
    let (pool, db_name) = create_test_db().await;
    let day = fixtures::seed_day(&pool).await;
    let proposed = fixtures::proposed_job(&pool, day.event.id, "Garden").await;

    schedule(&pool, day.plan.id, proposed.id).await;

    let mut conn = pool.acquire().await.unwrap();
    let err = active_jobs::insert_active_job(&mut conn, day.plan.id, proposed.id, "a", "b")
        .await
        .unwrap_err();
    assert!(queries::is_unique_violation(&err), "got {err:#}");
    drop(conn);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn worker_cannot_join_two_jobs_of_one_plan() {
    let (pool, db_name) = create_test_db().await;
    let day = fixtures::seed_day(&pool).await;
    let garden = fixtures::proposed_job(&pool, day.event.id, "Garden").await;
    let roof = fixtures::proposed_job(&pool, day.event.id, "Roof").await;
    let job_a = schedule(&pool, day.plan.id, garden.id).await;
    let job_b = schedule(&pool, day.plan.id, roof.id).await;
    let w = fixtures::worker(&pool, "Jana", "Nova").await;

    let mut conn = pool.acquire().await.unwrap();
    active_jobs::add_worker(&mut conn, job_a, day.plan.id, w.id).await.unwrap();
    // Same job again is absorbed.
    active_jobs::add_worker(&mut conn, job_a, day.plan.id, w.id).await.unwrap();

    let err = active_jobs::add_worker(&mut conn, job_b, day.plan.id, w.id)
        .await
        .unwrap_err();
    assert!(queries::is_unique_violation(&err), "got {err:#}");

    assert_eq!(
        active_jobs::find_job_for_worker(&mut conn, day.plan.id, w.id).await.unwrap(),
        Some(job_a)
    );
    drop(conn);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn membership_plan_must_match_job_plan() {
    let (pool, db_name) = create_test_db().await;
    let day = fixtures::seed_day(&pool).await;
    let other_plan = fixtures::seed_plan(
        &pool,
        day.event.id,
        NaiveDate::from_ymd_opt(2026, 7, 15).unwrap(),
    )
    .await;
    let garden = fixtures::proposed_job(&pool, day.event.id, "Garden").await;
    let job = schedule(&pool, day.plan.id, garden.id).await;
    let w = fixtures::worker(&pool, "Jana", "Nova").await;

    let mut conn = pool.acquire().await.unwrap();
    let result = active_jobs::add_worker(&mut conn, job, other_plan.id, w.id).await;
    assert!(result.is_err());
    drop(conn);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn only_one_event_is_active() {
    let (pool, db_name) = create_test_db().await;
    let july = events::insert_event(
        &pool,
        "July",
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 7, 31).unwrap(),
    )
    .await
    .unwrap();
    let august = events::insert_event(
        &pool,
        "August",
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 8, 31).unwrap(),
    )
    .await
    .unwrap();

    events::set_active_event(&pool, july.id).await.unwrap();

    // Bypassing set_active_event trips the partial unique index.
    let direct = sqlx::query("UPDATE summerjob_events SET is_active = TRUE WHERE id = $1")
        .bind(august.id)
        .execute(&pool)
        .await;
    assert!(direct.is_err());

    events::set_active_event(&pool, august.id).await.unwrap();
    let active = events::get_active_event(&pool).await.unwrap().unwrap();
    assert_eq!(active.id, august.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn deleting_plan_cascades_to_jobs_and_rides() {
    let (pool, db_name) = create_test_db().await;
    let day = fixtures::seed_day(&pool).await;
    let garden = fixtures::proposed_job(&pool, day.event.id, "Garden").await;
    let job = schedule(&pool, day.plan.id, garden.id).await;
    let driver = fixtures::worker(&pool, "Adam", "Driver").await;
    let car = fixtures::car(&pool, driver.id, "Octavia").await;

    let mut conn = pool.acquire().await.unwrap();
    active_jobs::add_worker(&mut conn, job, day.plan.id, driver.id).await.unwrap();
    summerjob_db::queries::rides::insert_ride(&mut conn, job, driver.id, car.id)
        .await
        .unwrap();
    drop(conn);

    assert_eq!(
        summerjob_db::queries::plans::delete_plan(&pool, day.plan.id).await.unwrap(),
        1
    );

    let counts = pool::table_counts(&pool).await.unwrap();
    for table in ["plans", "active_jobs", "active_job_workers", "rides"] {
        let n = counts.iter().find(|(t, _)| *t == table).unwrap().1;
        assert_eq!(n, 0, "{table} should be empty");
    }

    pool.close().await;
    drop_test_db(&db_name).await;
}
