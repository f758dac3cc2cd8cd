//! Handlers for `summerjob ride` subcommands.

use anyhow::Result;
use sqlx::PgPool;

use summerjob_core::rides;

use crate::RideCommands;
use crate::resolve::{parse_id, parse_ids};

pub async fn run_ride_command(command: RideCommands, pool: &PgPool) -> Result<()> {
    match command {
        RideCommands::Create {
            job_id,
            driver,
            car,
            passengers,
        } => {
            let ride = rides::create_ride(
                pool,
                parse_id("job", &job_id)?,
                parse_id("driver", &driver)?,
                parse_id("car", &car)?,
                &parse_ids("passenger", &passengers)?,
            )
            .await?;
            println!(
                "Ride {} created with {} passenger(s).",
                ride.ride.id,
                ride.passenger_ids.len()
            );
        }
        RideCommands::Passengers { ride_id, worker_ids } => {
            let ride_id = parse_id("ride", &ride_id)?;
            let ride = rides::update_ride(pool, ride_id, &parse_ids("passenger", &worker_ids)?).await?;
            println!(
                "Ride {ride_id} now carries {} passenger(s).",
                ride.passenger_ids.len()
            );
        }
        RideCommands::Delete { ride_id } => {
            let ride_id = parse_id("ride", &ride_id)?;
            let stranded = rides::delete_ride(pool, ride_id).await?;
            println!("Ride {ride_id} deleted.");
            if !stranded.is_empty() {
                println!("Passengers now without a ride:");
                for w in &stranded {
                    println!("  {w}");
                }
            }
        }
        RideCommands::Stranded { plan_id } => {
            let workers = rides::workers_without_ride(pool, parse_id("plan", &plan_id)?).await?;
            if workers.is_empty() {
                println!("Every worker of the plan has a ride.");
            }
            for w in &workers {
                println!("{:<36}  {:<30}  {}", w.id, w.full_name(), w.phone);
            }
        }
    }
    Ok(())
}
