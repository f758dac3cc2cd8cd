//! Handlers for `summerjob job` subcommands.

use anyhow::{Result, bail};
use sqlx::PgPool;

use summerjob_core::assignment::{self, ActiveJobDescriptions, ActiveJobUpdate, NewActiveJob};

use crate::JobCommands;
use crate::resolve::{parse_id, parse_ids};

pub async fn run_job_command(command: JobCommands, pool: &PgPool) -> Result<()> {
    match command {
        JobCommands::Add {
            plan_id,
            proposed_job_ids,
            public,
            private,
        } => {
            let plan_id = parse_id("plan", &plan_id)?;
            let ids = parse_ids("proposed job", &proposed_job_ids)?;
            if ids.len() > 1 && (public.is_some() || private.is_some()) {
                bail!("--public and --private apply to a single job only");
            }
            let descriptions = ActiveJobDescriptions {
                public_description: public,
                private_description: private,
            };
            let batch: Vec<NewActiveJob> = ids
                .into_iter()
                .map(|proposed_job_id| NewActiveJob {
                    proposed_job_id,
                    descriptions: descriptions.clone(),
                })
                .collect();

            let jobs = assignment::create_active_jobs_bulk(pool, plan_id, &batch).await?;
            for job in &jobs {
                println!("Scheduled {} as active job {}", job.proposed_job_id, job.id);
            }
        }
        JobCommands::Workers { job_id, worker_ids } => {
            let job_id = parse_id("job", &job_id)?;
            let workers = parse_ids("worker", &worker_ids)?;
            let change = assignment::update_active_job_workers(pool, job_id, &workers).await?;
            println!(
                "Job {job_id}: {} added, {} removed.",
                change.added.len(),
                change.removed.len()
            );
            for (worker, previous) in &change.moved {
                println!("  moved {worker} from job {previous}");
            }
        }
        JobCommands::Remove { job_id, worker_id } => {
            let job_id = parse_id("job", &job_id)?;
            let worker_id = parse_id("worker", &worker_id)?;
            let eviction = assignment::remove_worker_from_job(pool, job_id, worker_id).await?;
            if eviction.was_member {
                println!("Worker {worker_id} removed from job {job_id}.");
            } else {
                println!("Worker {worker_id} was not on job {job_id}.");
            }
            for ride in &eviction.deleted_rides {
                println!("  deleted ride {ride} they were driving");
            }
        }
        JobCommands::Responsible { job_id, worker_id } => {
            let job_id = parse_id("job", &job_id)?;
            let worker = worker_id
                .as_deref()
                .map(|w| parse_id("worker", w))
                .transpose()?;
            let update = ActiveJobUpdate {
                responsible_worker_id: Some(worker),
                ..Default::default()
            };
            assignment::update_active_job(pool, job_id, update).await?;
            match worker {
                Some(w) => println!("Worker {w} is responsible for job {job_id}."),
                None => println!("Job {job_id} has no responsible worker."),
            }
        }
        JobCommands::Delete { job_id } => {
            let job_id = parse_id("job", &job_id)?;
            assignment::delete_active_job(pool, job_id).await?;
            println!("Active job {job_id} deleted.");
        }
    }
    Ok(())
}
