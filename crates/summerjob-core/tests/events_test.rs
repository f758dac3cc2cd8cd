//! Integration tests for event activation and the active-event cache.

use chrono::NaiveDate;
use uuid::Uuid;

use summerjob_core::{ActiveEventCache, EngineError, Entity, events};
use summerjob_test_utils::{create_test_db, drop_test_db};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, m, d).unwrap()
}

#[tokio::test]
async fn activation_switches_cached_event() {
    let (pool, db_name) = create_test_db().await;
    let cache = ActiveEventCache::new();

    let err = cache.get(&pool).await.unwrap_err();
    assert!(matches!(err, EngineError::NoActiveEvent));

    let july = events::create_event(&pool, "July", date(7, 1), date(7, 31)).await.unwrap();
    let august = events::create_event(&pool, "August", date(8, 1), date(8, 31)).await.unwrap();

    events::activate_event(&pool, &cache, july.id).await.unwrap();
    assert_eq!(cache.get(&pool).await.unwrap().event_id(), july.id);

    events::activate_event(&pool, &cache, august.id).await.unwrap();
    assert_eq!(cache.get(&pool).await.unwrap().event_id(), august.id);

    let listed = events::list_events(&pool).await.unwrap();
    let active: Vec<_> = listed.iter().filter(|e| e.is_active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, august.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn activating_unknown_event_changes_nothing() {
    let (pool, db_name) = create_test_db().await;
    let cache = ActiveEventCache::new();
    let july = events::create_event(&pool, "July", date(7, 1), date(7, 31)).await.unwrap();
    events::activate_event(&pool, &cache, july.id).await.unwrap();

    let ghost = Uuid::new_v4();
    let err = events::activate_event(&pool, &cache, ghost).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { entity: Entity::Event, id } if id == ghost));
    assert_eq!(cache.get(&pool).await.unwrap().event_id(), july.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn inverted_event_dates_are_rejected() {
    let (pool, db_name) = create_test_db().await;

    let err = events::create_event(&pool, "Backwards", date(7, 31), date(7, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRange(_)));
    assert!(events::list_events(&pool).await.unwrap().is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}
