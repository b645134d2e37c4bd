//! Breakwater CLI.
//!
//! `check-config` validates a TOML file and prints resolved settings.
//! `simulate` drives a flaky command through the engine from several
//! blocking workers and reports what the breaker saw.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rand::Rng;

use breakwater::command::{Command, CommandFactory, FallbackError, RunError, SharedError};
use breakwater::config::{load_config, BreakwaterConfig};
use breakwater::metrics::Outcome;
use breakwater::observability::logging;
use breakwater::observability::metrics as telemetry;
use breakwater::request::RequestContext;
use breakwater::storage::InMemoryStateStorage;

#[derive(Parser)]
#[command(name = "breakwater")]
#[command(about = "Circuit breaker and fallback middleware toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print the resolved settings
    CheckConfig {
        path: PathBuf,

        /// Print the resolved config of a single command key
        #[arg(short, long)]
        command: Option<String>,
    },
    /// Run a simulated flaky dependency through the engine
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct SimulateArgs {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 200)]
    requests: u64,

    /// Probability that a single call fails, 0.0 to 1.0
    #[arg(long, default_value_t = 0.3)]
    failure_rate: f64,

    #[arg(long, default_value_t = 4)]
    workers: u64,

    #[arg(long, default_value = "FlakyCall")]
    command_key: String,
}

/// Simulated remote call that fails at a fixed rate.
struct FlakyCall {
    id: u64,
    failure_rate: f64,
    command_key: String,
}

impl Command for FlakyCall {
    type Output = String;

    fn run(&mut self) -> Result<String, RunError> {
        let mut rng = rand::thread_rng();
        std::thread::sleep(Duration::from_millis(rng.gen_range(1..5)));
        if rng.gen_bool(self.failure_rate) {
            return Err(RunError::failure(format!("call {} timed out upstream", self.id)));
        }
        Ok(format!("response {}", self.id))
    }

    fn fallback(&mut self, _cause: Option<&SharedError>) -> Result<String, FallbackError> {
        Ok("default response".to_string())
    }

    fn command_key(&self) -> String {
        self.command_key.clone()
    }

    fn cache_key(&self) -> Option<String> {
        Some(format!("item-{}", self.id % 50))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { path, command } => check_config(&path, command.as_deref())?,
        Commands::Simulate(args) => simulate(args).await?,
    }

    Ok(())
}

fn check_config(path: &Path, command: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    logging::init_logging(&config.observability.log_level)?;
    tracing::info!(path = %path.display(), overrides = config.commands.len(), "Configuration valid");

    let rendered = match command {
        Some(key) => serde_json::to_string_pretty(&config.resolve(key))?,
        None => serde_json::to_string_pretty(&config)?,
    };
    println!("{rendered}");
    Ok(())
}

async fn simulate(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => BreakwaterConfig::default(),
    };
    logging::init_logging(&config.observability.log_level)?;

    // the report below renders the request log
    config.default.request_log.enabled = true;
    let prometheus = if config.observability.metrics_enabled {
        Some(telemetry::install_recorder()?)
    } else {
        None
    };

    let storage = Arc::new(InMemoryStateStorage::new(&config.storage));
    let resolved = config.resolve(&args.command_key);
    let factory = CommandFactory::new(config, storage);
    let context = RequestContext::new();
    let scoped = factory.with_request_context(&context);

    let workers = args.workers.max(1);
    let per_worker = args.requests.div_ceil(workers);
    let failure_rate = args.failure_rate.clamp(0.0, 1.0);

    tracing::info!(
        request_id = %context.id(),
        command = %args.command_key,
        requests = args.requests,
        workers,
        failure_rate,
        "Starting simulation"
    );

    let mut tasks = Vec::with_capacity(workers as usize);
    for worker in 0..workers {
        let factory = scoped.clone();
        let command_key = args.command_key.clone();
        let first = worker * per_worker;
        let last = (first + per_worker).min(args.requests);

        tasks.push(tokio::task::spawn_blocking(move || {
            let (mut served, mut failed) = (0_u64, 0_u64);
            for id in first..last {
                let mut handle = factory.get_command(FlakyCall {
                    id,
                    failure_rate,
                    command_key: command_key.clone(),
                });
                match handle.execute() {
                    Ok(_) => served += 1,
                    Err(err) => {
                        tracing::debug!(worker, id, error = %err, "Request failed");
                        failed += 1;
                    }
                }
            }
            (served, failed)
        }));
    }

    let (mut served, mut failed) = (0_u64, 0_u64);
    for task in tasks {
        let (s, f) = task.await?;
        served += s;
        failed += f;
    }

    let command_metrics = factory
        .metrics_factory()
        .get(&args.command_key, &resolved.metrics);

    println!("== Request log ==");
    println!("{}", context.log().executed_commands_as_string());
    println!();
    println!("== Results ==");
    println!("served: {served}, failed: {failed}");
    for outcome in Outcome::ALL {
        println!("{outcome}: {}", command_metrics.rolling_count(outcome));
    }
    println!();
    println!("== Health snapshot ==");
    println!("{}", serde_json::to_string_pretty(&command_metrics.health_counts())?);

    if let Some(handle) = prometheus {
        println!();
        println!("== Prometheus ==");
        println!("{}", handle.render());
    }

    Ok(())
}
