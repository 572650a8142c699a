//! Contact Plan Designer CLI
//!
//! Builds (or reloads) the contact list of a scenario and, given a task,
//! designs its contact plan and flight plan.
//!
//! Usage:
//!   plan-contacts scenarios/scenario_1.json tasks/task_1.json \
//!                 --size 50 --mut 0.3 --iter 100 --output-dir logs

use anyhow::Result;
use chrono::DateTime;
use clap::Parser;
use contact_plan::{EngineConfig, MissionController};
use mission_model::loader::{load_scenario, load_task};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    name = "plan-contacts",
    about = "Design contact plans and flight plans for a satellite constellation"
)]
struct Args {
    /// Scenario definition JSON
    scenario: PathBuf,

    /// Task definition JSON; without it only the contact list is built
    task: Option<PathBuf>,

    /// Engine config JSON (defaults apply to missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Population size
    #[arg(short, long)]
    size: Option<usize>,

    /// Mutation rate
    #[arg(short, long = "mut")]
    mutation: Option<f64>,

    /// Max. iterations
    #[arg(short, long)]
    iter: Option<usize>,

    /// Seed for reproducible plans
    #[arg(long)]
    seed: Option<u64>,

    /// Extra GA runs after a structurally invalid plan
    #[arg(long)]
    max_replans: Option<usize>,

    /// Sampling step override in seconds
    #[arg(long)]
    step: Option<i64>,

    /// Directory for generated tables and updated records
    #[arg(short, long, default_value = "logs")]
    output_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };

        let planner = &mut config.planner;
        if let Some(size) = self.size {
            planner.population_size = size;
        }
        if let Some(mutation) = self.mutation {
            planner.mutation_rate = mutation;
        }
        if let Some(iter) = self.iter {
            planner.max_iterations = iter;
        }
        if let Some(max_replans) = self.max_replans {
            planner.max_replans = max_replans;
        }
        if self.seed.is_some() {
            planner.seed = self.seed;
        }
        if self.step.is_some() {
            config.visibility.step_override_s = self.step;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence over --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("SX9-Orbital Contact Plan Designer");
    info!("{}", "=".repeat(60));

    let config = args.engine_config()?;
    let scenario = load_scenario(&args.scenario)?;
    let task = match &args.task {
        Some(path) => Some(load_task(path, &scenario)?),
        None => None,
    };

    let mut controller = MissionController::new(scenario, task, config, &args.output_dir);

    let contacts = controller.contact_list()?.len();
    info!("Contact list: {} contacts", contacts);

    if controller.task().is_some() {
        let accesses = controller.contact_plan()?.accesses();
        info!("Contact plan: {:?}", accesses);
        controller.check_contact_plan()?;

        let entries = controller.flight_plan()?.entries.clone();
        info!("\nFlight plan:");
        for entry in &entries {
            let utc = DateTime::from_timestamp(entry.time, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            let address = controller
                .scenario()
                .address_of(&entry.node)
                .map(|a| a.to_string())
                .unwrap_or_else(|| "-".to_string());
            info!("  {} | {:20} | {:>4} | {}", utc, entry.node, address, entry.command);
        }
    }

    let saved = controller.save_records()?;

    // Summary
    info!("\n{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Contacts: {}", contacts);
    if let Some(outcome) = controller.outcome() {
        info!(
            "Fitness: {:.4} (valid {:.4}) after {} attempt(s), {:?}",
            outcome.fitness.score,
            outcome.fitness.components[0],
            outcome.attempts,
            outcome.termination
        );
    }
    for path in saved {
        info!("  {}", path.display());
    }

    Ok(())
}
