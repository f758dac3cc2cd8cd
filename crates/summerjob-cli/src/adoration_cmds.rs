//! Handlers for `summerjob adoration` subcommands.

use anyhow::Result;
use sqlx::PgPool;

use summerjob_core::EventContext;
use summerjob_core::adoration::{self, AdjacencyConfig, BulkOutcome, BulkSlotRequest, SlotEdit};

use crate::AdorationCommands;
use crate::resolve::{parse_day, parse_id, parse_ids, parse_minute_of_day, parse_time};

pub async fn run_adoration_command(
    command: AdorationCommands,
    pool: &PgPool,
    adjacency: &AdjacencyConfig,
) -> Result<()> {
    match command {
        AdorationCommands::Create {
            from,
            to,
            start,
            end,
            length,
            location,
            capacity,
        } => {
            let ctx = EventContext::resolve(pool).await?;
            let request = BulkSlotRequest {
                date_from: parse_day(&from)?,
                date_to: parse_day(&to)?,
                from_time: parse_time(&start)?,
                to_time: parse_time(&end)?,
                length_minutes: length,
                location,
                capacity,
            };
            let created = adoration::create_slots_bulk(pool, ctx.event_id(), &request).await?;
            println!("Created {created} slot(s) for {}.", ctx.event.name);
        }
        AdorationCommands::List { day, worker } => {
            let ctx = EventContext::resolve(pool).await?;
            let day = parse_day(&day)?;
            match worker {
                Some(worker) => {
                    let worker_id = parse_id("worker", &worker)?;
                    list_for_worker(pool, &ctx, day, worker_id, adjacency).await?;
                }
                None => list_admin(pool, &ctx, day).await?,
            }
        }
        AdorationCommands::Signup { slot_id, worker_id } => {
            let slot_id = parse_id("slot", &slot_id)?;
            let worker_id = parse_id("worker", &worker_id)?;
            adoration::signup(pool, slot_id, worker_id).await?;
            println!("Worker {worker_id} signed up for slot {slot_id}.");
        }
        AdorationCommands::Cancel { slot_id, worker_id } => {
            let slot_id = parse_id("slot", &slot_id)?;
            let worker_id = parse_id("worker", &worker_id)?;
            adoration::cancel_signup(pool, slot_id, worker_id).await?;
            println!("Worker {worker_id} is no longer in slot {slot_id}.");
        }
        AdorationCommands::Edit {
            slot_id,
            start,
            length,
            capacity,
            location,
        } => {
            let slot_id = parse_id("slot", &slot_id)?;
            let edit = SlotEdit {
                capacity,
                start_minute_of_day: parse_minute_of_day(&start)?,
                length_minutes: length,
                location,
            };
            let slot = adoration::edit_slot(pool, slot_id, &edit).await?;
            println!(
                "Slot {} now {} - {} at {} (capacity {}).",
                slot.id,
                slot.date_start.format("%Y-%m-%d %H:%M"),
                slot.date_end().format("%H:%M"),
                slot.location,
                slot.capacity
            );
        }
        AdorationCommands::Delete { slot_ids } => {
            let ids = parse_ids("slot", &slot_ids)?;
            let outcome = adoration::bulk_delete(pool, &ids).await;
            print_outcome("deleted", &outcome);
        }
        AdorationCommands::Relocate { location, slot_ids } => {
            let ids = parse_ids("slot", &slot_ids)?;
            let outcome = adoration::bulk_update_location(pool, &ids, &location).await?;
            print_outcome("relocated", &outcome);
        }
    }
    Ok(())
}

async fn list_admin(pool: &PgPool, ctx: &EventContext, day: chrono::NaiveDate) -> Result<()> {
    let slots = adoration::slots_for_day_admin(pool, ctx.event_id(), day).await?;
    if slots.is_empty() {
        println!("No adoration slots on {day}.");
        return Ok(());
    }
    for s in &slots {
        let names: Vec<String> = s.workers.iter().map(|w| w.full_name()).collect();
        println!(
            "{}  {}-{}  {:<16}  {}/{}  {}",
            s.slot.id,
            s.slot.date_start.format("%H:%M"),
            s.slot.date_end().format("%H:%M"),
            s.slot.location,
            s.workers.len(),
            s.slot.capacity,
            names.join(", "),
        );
    }
    Ok(())
}

async fn list_for_worker(
    pool: &PgPool,
    ctx: &EventContext,
    day: chrono::NaiveDate,
    worker_id: uuid::Uuid,
    adjacency: &AdjacencyConfig,
) -> Result<()> {
    let slots = adoration::slots_for_day_user(pool, ctx.event_id(), day, worker_id).await?;
    if slots.is_empty() {
        println!("No open adoration slots on {day}.");
        return Ok(());
    }
    for s in &slots {
        println!(
            "{}  {}  {:<16}  {}/{}{}",
            s.id,
            s.date_start.format("%H:%M"),
            s.location,
            s.worker_count,
            s.capacity,
            if s.is_signed_up { "  (signed up)" } else { "" },
        );
    }

    let mine = adoration::for_worker_day(pool, ctx.event_id(), worker_id, day, adjacency).await?;
    for a in &mine {
        let before: Vec<String> = a.previous_workers.iter().map(|w| w.full_name()).collect();
        let after: Vec<String> = a.next_workers.iter().map(|w| w.full_name()).collect();
        println!(
            "At {}: after {}, before {}",
            a.start_time.format("%H:%M"),
            if before.is_empty() { "-".to_string() } else { before.join(", ") },
            if after.is_empty() { "-".to_string() } else { after.join(", ") },
        );
    }
    Ok(())
}

fn print_outcome(verb: &str, outcome: &BulkOutcome) {
    println!("{} slot(s) {verb}.", outcome.succeeded.len());
    for f in &outcome.failed {
        println!("  {}: {}", f.id, f.reason);
    }
}
