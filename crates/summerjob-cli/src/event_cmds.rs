//! Handlers for `summerjob event` subcommands.

use anyhow::Result;
use sqlx::PgPool;

use summerjob_core::{ActiveEventCache, events};

use crate::EventCommands;
use crate::resolve::{parse_day, parse_id};

pub async fn run_event_command(command: EventCommands, pool: &PgPool) -> Result<()> {
    match command {
        EventCommands::Create { name, start, end } => {
            let event = events::create_event(pool, &name, parse_day(&start)?, parse_day(&end)?).await?;
            println!("Event created: {} ({})", event.name, event.id);
            println!("Activate it with `summerjob event activate {}`.", event.id);
        }
        EventCommands::List => {
            let all = events::list_events(pool).await?;
            if all.is_empty() {
                println!("No events found. Use `summerjob event create` to add one.");
                return Ok(());
            }
            let name_w = all.iter().map(|e| e.name.len()).max().unwrap_or(4).max(4);
            println!("{:<36}  {:<name_w$}  {:<10}  {:<10}  ACTIVE", "ID", "NAME", "START", "END");
            for e in &all {
                println!(
                    "{:<36}  {:<name_w$}  {:<10}  {:<10}  {}",
                    e.id,
                    e.name,
                    e.start_date,
                    e.end_date,
                    if e.is_active { "*" } else { "" },
                );
            }
        }
        EventCommands::Activate { event_id } => {
            let id = parse_id("event", &event_id)?;
            // One-shot process: a fresh cache is enough.
            let ctx = events::activate_event(pool, &ActiveEventCache::new(), id).await?;
            println!("Active event is now {} ({}).", ctx.event.name, ctx.event_id());
        }
    }
    Ok(())
}
