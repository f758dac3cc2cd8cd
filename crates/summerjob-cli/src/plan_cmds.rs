//! Handlers for `summerjob plan` subcommands.
//!
//! - `plan create <day>`          -- create the plan for a day
//! - `plan list`                  -- list plans of the active event
//! - `plan show <id>`             -- jobs, members and rides of a plan
//! - `plan publish <id>`          -- make the plan visible to workers
//! - `plan delete <id>`           -- delete a plan with its jobs and rides
//! - `plan check <id>`            -- report broken assignment invariants
//! - `plan apply <id> <file>`     -- apply a planner's JSON batch

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use sqlx::PgPool;
use uuid::Uuid;

use summerjob_core::my_plan::PlanSnapshot;
use summerjob_core::{EventContext, planned, plans, resync};

use crate::PlanCommands;
use crate::resolve::{parse_day, parse_id};

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

pub async fn run_plan_command(command: PlanCommands, pool: &PgPool) -> Result<()> {
    match command {
        PlanCommands::Create { day } => {
            let ctx = EventContext::resolve(pool).await?;
            let plan = plans::create_plan(pool, &ctx, parse_day(&day)?).await?;
            println!("Plan created for {}: {}", plan.day, plan.id);
            Ok(())
        }
        PlanCommands::List => cmd_list(pool).await,
        PlanCommands::Show { plan_id, json } => {
            let snapshot = plans::get_plan(pool, parse_id("plan", &plan_id)?).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot);
            }
            Ok(())
        }
        PlanCommands::Publish { plan_id, unpublish } => {
            let id = parse_id("plan", &plan_id)?;
            plans::publish_plan(pool, id, !unpublish).await?;
            if unpublish {
                println!("Plan {id} withdrawn.");
            } else {
                println!("Plan {id} published.");
            }
            Ok(())
        }
        PlanCommands::Delete { plan_id } => {
            let id = parse_id("plan", &plan_id)?;
            plans::delete_plan(pool, id).await?;
            println!("Plan {id} deleted.");
            Ok(())
        }
        PlanCommands::Check { plan_id } => cmd_check(pool, &plan_id).await,
        PlanCommands::Apply { plan_id, file } => cmd_apply(pool, &plan_id, &file).await,
    }
}

// -----------------------------------------------------------------------
// summerjob plan list
// -----------------------------------------------------------------------

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let ctx = EventContext::resolve(pool).await?;
    let all = plans::list_plans(pool, &ctx).await?;

    if all.is_empty() {
        println!(
            "No plans for {}. Use `summerjob plan create <day>` to add one.",
            ctx.event.name
        );
        return Ok(());
    }

    println!("Event: {}", ctx.event.name);
    println!("{:<36}  {:<10}  PUBLISHED", "ID", "DAY");
    for plan in &all {
        println!(
            "{:<36}  {:<10}  {}",
            plan.id,
            plan.day,
            if plan.published { "yes" } else { "no" },
        );
    }
    Ok(())
}

// -----------------------------------------------------------------------
// summerjob plan show <id>
// -----------------------------------------------------------------------

fn print_snapshot(snapshot: &PlanSnapshot) {
    let plan = &snapshot.plan;
    println!("Plan: {}", plan.day);
    println!("  ID:         {}", plan.id);
    println!("  Published:  {}", if plan.published { "yes" } else { "no" });
    println!("  Jobs:       {}", snapshot.jobs.len());
    println!("  Rides:      {}", snapshot.rides.len());

    let mut rides_by_job: HashMap<Uuid, Vec<_>> = HashMap::new();
    for ride in &snapshot.rides {
        rides_by_job.entry(ride.ride.ride.job_id).or_default().push(ride);
    }

    for job in &snapshot.jobs {
        println!();
        println!("  {}", job.job.name);
        println!("    ID:           {}", job.job.id);
        if let Some(resp) = &job.responsible {
            println!("    Responsible:  {}", resp.full_name());
        }
        let names: Vec<String> = job.workers.iter().map(|w| w.full_name()).collect();
        println!("    Workers:      {}", names.join(", "));

        for ride in rides_by_job.get(&job.job.id).into_iter().flatten() {
            println!(
                "    Ride {} ({}): driver {}, {} passenger(s)",
                ride.ride.ride.id,
                ride.car_name,
                ride.driver.full_name(),
                ride.ride.passenger_ids.len(),
            );
        }
    }
}

// -----------------------------------------------------------------------
// summerjob plan check <id>
// -----------------------------------------------------------------------

async fn cmd_check(pool: &PgPool, plan_id: &str) -> Result<()> {
    let id = parse_id("plan", plan_id)?;
    let mut conn = pool.acquire().await.context("failed to acquire connection")?;
    let violations = resync::check_plan(&mut *conn, id).await?;
    drop(conn);

    if violations.is_empty() {
        println!("Plan {id} is consistent.");
        return Ok(());
    }

    println!("Plan {id} has {} problem(s):", violations.len());
    for v in &violations {
        println!("  - {}", serde_json::to_string(v)?);
    }
    bail!("plan {id} failed the consistency check");
}

// -----------------------------------------------------------------------
// summerjob plan apply <id> <file>
// -----------------------------------------------------------------------

async fn cmd_apply(pool: &PgPool, plan_id: &str, file_path: &str) -> Result<()> {
    let id = parse_id("plan", plan_id)?;
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read planned jobs file: {file_path}"))?;
    let batch = planned::parse_planned_jobs(&content)
        .with_context(|| format!("failed to parse planned jobs file: {file_path}"))?;

    let jobs = planned::apply_planned_jobs(pool, id, &batch).await?;

    println!("Applied {} job(s) to plan {id}.", jobs.len());
    for job in &jobs {
        println!("  {}", job.id);
    }
    Ok(())
}
