//! `summerjob my-plan`: a worker's day as text or JSON.

use anyhow::Result;
use sqlx::PgPool;

use summerjob_core::adoration::AdjacencyConfig;
use summerjob_core::my_plan::{self, MyPlan};
use summerjob_core::EventContext;

use crate::resolve::{parse_day, parse_id};

pub async fn run_my_plan(
    pool: &PgPool,
    worker_id: &str,
    day: Option<&str>,
    json: bool,
    adjacency: &AdjacencyConfig,
) -> Result<()> {
    let worker_id = parse_id("worker", worker_id)?;
    let ctx = EventContext::resolve(pool).await?;

    let views = match day {
        Some(day) => vec![my_plan::my_plan_on(pool, &ctx, parse_day(day)?, worker_id, adjacency).await?],
        None => my_plan::my_plans(pool, &ctx, worker_id, adjacency).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("No plans in {} yet.", ctx.event.name);
    }
    for view in &views {
        print_day(view);
    }
    Ok(())
}

fn print_day(view: &MyPlan) {
    println!("{}", view.day.format("%A %Y-%m-%d"));

    match &view.job {
        Some(job) => {
            println!("  Job #{}: {}", job.seq_num, job.name);
            if !job.description.is_empty() {
                println!("    {}", job.description);
            }
            println!("    Address:  {}", job.address);
            println!("    Contact:  {}", job.contact);
            if let Some(resp) = &job.responsible_worker_name {
                println!("    Responsible: {resp}");
            }
            println!("    Team:     {}", job.worker_names.join(", "));
            println!(
                "    Food: {}  Shower: {}",
                if job.has_food { "yes" } else { "no" },
                if job.has_shower { "yes" } else { "no" },
            );
            match &job.ride {
                Some(ride) if ride.is_driver => println!("    You drive {}.", ride.car_name),
                Some(ride) => {
                    println!(
                        "    Ride: {} with {} ({})",
                        ride.car_name, ride.driver_name, ride.driver_phone
                    );
                    if !ride.ends_at_my_job {
                        println!("      drops you off via {}", ride.end_job_name);
                    }
                }
                None => println!("    No ride assigned."),
            }
        }
        None => println!("  No job."),
    }

    for a in &view.adorations {
        let with: Vec<String> = a.same_time_workers.iter().map(|w| w.full_name()).collect();
        println!(
            "  Adoration {}-{} at {}{}",
            a.start_time.format("%H:%M"),
            a.end_time.format("%H:%M"),
            a.location,
            if with.is_empty() { String::new() } else { format!(" with {}", with.join(", ")) },
        );
        for w in &a.previous_workers {
            println!("    takes over from {} ({})", w.full_name(), w.phone);
        }
        for w in &a.next_workers {
            println!("    hands over to {} ({})", w.full_name(), w.phone);
        }
    }
}
