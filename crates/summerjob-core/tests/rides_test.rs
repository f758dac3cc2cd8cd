//! Integration tests for ride creation, passenger claims and deletion.

use sqlx::PgPool;
use uuid::Uuid;

use summerjob_core::assignment::{self, ActiveJobDescriptions};
use summerjob_core::{EngineError, Entity, resync, rides};
use summerjob_db::models::{ActiveJob, Worker};
use summerjob_db::queries::rides as ride_db;
use summerjob_test_utils::fixtures::{self, SeededDay};
use summerjob_test_utils::{create_test_db, drop_test_db};

async fn staffed_job(pool: &PgPool, day: &SeededDay, name: &str, staff: &[&Worker]) -> ActiveJob {
    let proposed = fixtures::proposed_job(pool, day.event.id, name).await;
    let job = assignment::create_active_job(
        pool,
        day.plan.id,
        proposed.id,
        ActiveJobDescriptions::default(),
    )
    .await
    .expect("create_active_job should succeed");
    let ids: Vec<Uuid> = staff.iter().map(|w| w.id).collect();
    assignment::update_active_job_workers(pool, job.id, &ids)
        .await
        .expect("update_active_job_workers should succeed");
    job
}

async fn passengers(pool: &PgPool, ride_id: Uuid) -> Option<Vec<Uuid>> {
    let mut conn = pool.acquire().await.unwrap();
    ride_db::get_with_passengers(&mut conn, ride_id)
        .await
        .unwrap()
        .map(|r| {
            let mut ids = r.passenger_ids;
            ids.sort();
            ids
        })
}

#[tokio::test]
async fn driver_listed_as_passenger_is_dropped() {
    let (pool, db_name) = create_test_db().await;
    let day = fixtures::seed_day(&pool).await;
    let driver = fixtures::worker(&pool, "Adam", "Driver").await;
    let rider = fixtures::worker(&pool, "Bara", "Rider").await;
    let job = staffed_job(&pool, &day, "Garden", &[&driver, &rider]).await;
    let car = fixtures::car(&pool, driver.id, "Octavia").await;

    let ride = rides::create_ride(&pool, job.id, driver.id, car.id, &[driver.id, rider.id])
        .await
        .unwrap();
    assert_eq!(ride.passenger_ids, vec![rider.id]);

    let updated = rides::update_ride(&pool, ride.ride.id, &[rider.id, driver.id])
        .await
        .unwrap();
    assert_eq!(updated.passenger_ids, vec![rider.id]);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn claimed_passenger_leaves_previous_ride() {
    let (pool, db_name) = create_test_db().await;
    let day = fixtures::seed_day(&pool).await;
    let d1 = fixtures::worker(&pool, "Dana", "First").await;
    let d2 = fixtures::worker(&pool, "David", "Second").await;
    let rider = fixtures::worker(&pool, "Eva", "Rider").await;
    let job_a = staffed_job(&pool, &day, "Garden", &[&d1, &rider]).await;
    let job_b = staffed_job(&pool, &day, "Roof", &[&d2]).await;
    let car1 = fixtures::car(&pool, d1.id, "Octavia").await;
    let car2 = fixtures::car(&pool, d2.id, "Fabia").await;

    let r1 = rides::create_ride(&pool, job_a.id, d1.id, car1.id, &[rider.id])
        .await
        .unwrap();
    let r2 = rides::create_ride(&pool, job_b.id, d2.id, car2.id, &[])
        .await
        .unwrap();

    rides::update_ride(&pool, r2.ride.id, &[rider.id]).await.unwrap();

    assert_eq!(passengers(&pool, r1.ride.id).await, Some(vec![]));
    assert_eq!(passengers(&pool, r2.ride.id).await, Some(vec![rider.id]));

    let mut conn = pool.acquire().await.unwrap();
    assert!(resync::check_plan(&mut conn, day.plan.id).await.unwrap().is_empty());
    drop(conn);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn driver_becoming_passenger_loses_own_ride() {
    let (pool, db_name) = create_test_db().await;
    let day = fixtures::seed_day(&pool).await;
    let d1 = fixtures::worker(&pool, "Dana", "First").await;
    let d2 = fixtures::worker(&pool, "David", "Second").await;
    let rider = fixtures::worker(&pool, "Eva", "Rider").await;
    let job_a = staffed_job(&pool, &day, "Garden", &[&d1]).await;
    let job_b = staffed_job(&pool, &day, "Roof", &[&d2, &rider]).await;
    let car1 = fixtures::car(&pool, d1.id, "Octavia").await;
    let car2 = fixtures::car(&pool, d2.id, "Fabia").await;

    let r1 = rides::create_ride(&pool, job_a.id, d1.id, car1.id, &[])
        .await
        .unwrap();
    let r2 = rides::create_ride(&pool, job_b.id, d2.id, car2.id, &[rider.id])
        .await
        .unwrap();

    // David now rides with Dana; his own car stays home.
    rides::update_ride(&pool, r1.ride.id, &[d2.id]).await.unwrap();

    assert_eq!(passengers(&pool, r1.ride.id).await, Some(vec![d2.id]));
    assert_eq!(passengers(&pool, r2.ride.id).await, None);

    let stranded = rides::workers_without_ride(&pool, day.plan.id).await.unwrap();
    assert_eq!(stranded.iter().map(|w| w.id).collect::<Vec<_>>(), vec![rider.id]);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn deleting_ride_strands_passengers() {
    let (pool, db_name) = create_test_db().await;
    let day = fixtures::seed_day(&pool).await;
    let driver = fixtures::worker(&pool, "Adam", "Driver").await;
    let a = fixtures::worker(&pool, "Bara", "Rider").await;
    let b = fixtures::worker(&pool, "Cyril", "Rider").await;
    let job = staffed_job(&pool, &day, "Garden", &[&driver, &a, &b]).await;
    let car = fixtures::car(&pool, driver.id, "Octavia").await;

    let ride = rides::create_ride(&pool, job.id, driver.id, car.id, &[a.id, b.id])
        .await
        .unwrap();

    let mut stranded = rides::delete_ride(&pool, ride.ride.id).await.unwrap();
    stranded.sort();
    let mut expected = vec![a.id, b.id];
    expected.sort();
    assert_eq!(stranded, expected);

    let without = rides::workers_without_ride(&pool, day.plan.id).await.unwrap();
    assert_eq!(without.len(), 3);

    let err = rides::delete_ride(&pool, ride.ride.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { entity: Entity::Ride, .. }));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn unknown_car_is_not_found() {
    let (pool, db_name) = create_test_db().await;
    let day = fixtures::seed_day(&pool).await;
    let driver = fixtures::worker(&pool, "Adam", "Driver").await;
    let job = staffed_job(&pool, &day, "Garden", &[&driver]).await;

    let car_id = Uuid::new_v4();
    let err = rides::create_ride(&pool, job.id, driver.id, car_id, &[])
        .await
        .unwrap_err();
    assert!(
        matches!(err, EngineError::NotFound { entity: Entity::Car, id } if id == car_id),
        "got {err:?}"
    );

    let mut conn = pool.acquire().await.unwrap();
    assert!(ride_db::list_for_job(&mut conn, job.id).await.unwrap().is_empty());
    drop(conn);

    pool.close().await;
    drop_test_db(&db_name).await;
}
