mod adoration_cmds;
mod config;
mod event_cmds;
mod job_cmds;
mod my_plan_cmd;
mod plan_cmds;
mod resolve;
mod ride_cmds;
mod serve_cmd;

use clap::{CommandFactory, Parser, Subcommand};

use summerjob_db::pool;

use config::SummerJobConfig;

#[derive(Parser)]
#[command(name = "summerjob", about = "Day planning for summer job volunteers")]
struct Cli {
    /// Database URL (overrides SUMMERJOB_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a summerjob config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/summerjob")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if needed and apply migrations
    DbInit,
    /// Event management
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Day plans of the active event
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Active jobs and their workers
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Rides to and from jobs
    Ride {
        #[command(subcommand)]
        command: RideCommands,
    },
    /// Adoration slots of the active event
    Adoration {
        #[command(subcommand)]
        command: AdorationCommands,
    },
    /// Show a worker's day: job, ride and adoration neighbors
    MyPlan {
        /// Worker ID
        worker_id: String,
        /// Day to show (YYYY-MM-DD); omit to show every plan of the event
        #[arg(long)]
        day: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Serve the JSON API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum EventCommands {
    /// Create an (inactive) event
    Create {
        /// Event name
        name: String,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },
    /// List events
    List,
    /// Make an event the active one
    Activate {
        /// Event ID
        event_id: String,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Create the plan for a day of the active event
    Create {
        /// Day (YYYY-MM-DD)
        day: String,
    },
    /// List plans of the active event
    List,
    /// Show a plan with its jobs and rides
    Show {
        /// Plan ID
        plan_id: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Publish a plan to workers
    Publish {
        /// Plan ID
        plan_id: String,
        /// Withdraw publication instead
        #[arg(long)]
        unpublish: bool,
    },
    /// Delete a plan with all its jobs and rides
    Delete {
        /// Plan ID
        plan_id: String,
    },
    /// Check a plan's assignment invariants
    Check {
        /// Plan ID
        plan_id: String,
    },
    /// Apply a planner's JSON batch of staffed jobs to a plan
    Apply {
        /// Plan ID
        plan_id: String,
        /// Path to the JSON file
        file: String,
    },
}

#[derive(Subcommand)]
pub enum JobCommands {
    /// Schedule proposed jobs into a plan
    Add {
        /// Plan ID
        plan_id: String,
        /// Proposed job IDs (repeat or comma-separate)
        #[arg(required = true)]
        proposed_job_ids: Vec<String>,
        /// Public description (single job only)
        #[arg(long)]
        public: Option<String>,
        /// Private description (single job only)
        #[arg(long)]
        private: Option<String>,
    },
    /// Replace the workers of a job
    Workers {
        /// Active job ID
        job_id: String,
        /// Worker IDs (repeat or comma-separate; none empties the job)
        worker_ids: Vec<String>,
    },
    /// Remove one worker from a job
    Remove {
        /// Active job ID
        job_id: String,
        /// Worker ID
        worker_id: String,
    },
    /// Set or clear the responsible worker of a job
    Responsible {
        /// Active job ID
        job_id: String,
        /// Worker ID; omit to clear
        worker_id: Option<String>,
    },
    /// Delete an active job
    Delete {
        /// Active job ID
        job_id: String,
    },
}

#[derive(Subcommand)]
pub enum RideCommands {
    /// Create a ride under a job
    Create {
        /// Active job ID
        job_id: String,
        /// Driver worker ID
        #[arg(long)]
        driver: String,
        /// Car ID
        #[arg(long)]
        car: String,
        /// Passenger worker IDs (comma-separated)
        #[arg(long, value_delimiter = ',')]
        passengers: Vec<String>,
    },
    /// Replace the passengers of a ride
    Passengers {
        /// Ride ID
        ride_id: String,
        /// Passenger worker IDs (repeat or comma-separate)
        worker_ids: Vec<String>,
    },
    /// Delete a ride
    Delete {
        /// Ride ID
        ride_id: String,
    },
    /// List workers of a plan who have no ride
    Stranded {
        /// Plan ID
        plan_id: String,
    },
}

#[derive(Subcommand)]
pub enum AdorationCommands {
    /// Generate slots over a date range for the active event
    Create {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Start of the first slot of each day (HH:MM)
        #[arg(long)]
        start: String,
        /// No slot ends after this time (HH:MM)
        #[arg(long)]
        end: String,
        /// Slot length in minutes
        #[arg(long, default_value_t = 60)]
        length: i32,
        /// Location
        #[arg(long)]
        location: String,
        /// Workers per slot
        #[arg(long, default_value_t = 1)]
        capacity: i32,
    },
    /// List the slots of a day
    List {
        /// Day (YYYY-MM-DD)
        day: String,
        /// Show the day as this worker sees it
        #[arg(long)]
        worker: Option<String>,
    },
    /// Sign a worker up for a slot
    Signup {
        /// Slot ID
        slot_id: String,
        /// Worker ID
        worker_id: String,
    },
    /// Cancel a worker's sign-up
    Cancel {
        /// Slot ID
        slot_id: String,
        /// Worker ID
        worker_id: String,
    },
    /// Edit a slot within its own day
    Edit {
        /// Slot ID
        slot_id: String,
        /// New start (HH:MM)
        #[arg(long)]
        start: String,
        /// New length in minutes
        #[arg(long)]
        length: i32,
        /// New capacity
        #[arg(long)]
        capacity: i32,
        /// New location
        #[arg(long)]
        location: String,
    },
    /// Delete slots
    Delete {
        /// Slot IDs (repeat or comma-separate)
        #[arg(required = true)]
        slot_ids: Vec<String>,
    },
    /// Move slots to another location
    Relocate {
        /// New location
        location: String,
        /// Slot IDs (repeat or comma-separate)
        #[arg(required = true)]
        slot_ids: Vec<String>,
    },
}

/// Execute the `summerjob init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        adoration: config::AdorationSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!(
        "  adoration.neighbor_window_minutes = {}",
        cfg.adoration.neighbor_window_minutes
    );
    println!();
    println!("Next: run `summerjob db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `summerjob db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = SummerJobConfig::resolve(cli_db_url)?;

    println!("Initializing summerjob database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("summerjob db-init complete.");
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match cli.command {
        Commands::Init { db_url, force } => return cmd_init(&db_url, force),
        Commands::DbInit => return cmd_db_init(cli.database_url.as_deref()).await,
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "summerjob",
                &mut std::io::stdout(),
            );
            return Ok(());
        }
        other => other,
    };

    let resolved = SummerJobConfig::resolve(cli.database_url.as_deref())?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    let result = match command {
        Commands::Event { command } => event_cmds::run_event_command(command, &db_pool).await,
        Commands::Plan { command } => plan_cmds::run_plan_command(command, &db_pool).await,
        Commands::Job { command } => job_cmds::run_job_command(command, &db_pool).await,
        Commands::Ride { command } => ride_cmds::run_ride_command(command, &db_pool).await,
        Commands::Adoration { command } => {
            adoration_cmds::run_adoration_command(command, &db_pool, &resolved.adjacency).await
        }
        Commands::MyPlan {
            worker_id,
            day,
            json,
        } => {
            my_plan_cmd::run_my_plan(
                &db_pool,
                &worker_id,
                day.as_deref(),
                json,
                &resolved.adjacency,
            )
            .await
        }
        Commands::Serve { bind, port } => {
            serve_cmd::run_serve(db_pool.clone(), resolved.adjacency, &bind, port).await
        }
        Commands::Init { .. } | Commands::DbInit | Commands::Completions { .. } => Ok(()),
    };

    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that touch process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}
