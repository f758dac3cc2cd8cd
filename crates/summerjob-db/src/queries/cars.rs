//! Database query functions for the `cars` table.

use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::Car;

/// Insert a car owned by `owner_id`.
pub async fn insert_car(pool: &PgPool, owner_id: Uuid, name: &str, seats: i32) -> Result<Car> {
    let car = sqlx::query_as::<_, Car>(
        "INSERT INTO cars (owner_id, name, seats) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(owner_id)
    .bind(name)
    .bind(seats)
    .fetch_one(pool)
    .await
    .context("failed to insert car")?;

    Ok(car)
}

/// Fetch a car by ID.
pub async fn get_car(conn: &mut PgConnection, id: Uuid) -> Result<Option<Car>> {
    let car = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch car")?;

    Ok(car)
}

/// Fetch every car whose ID is in `ids`.
pub async fn get_cars(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<Car>> {
    let cars = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(conn)
        .await
        .context("failed to fetch cars")?;

    Ok(cars)
}
