use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{error, info};

use timetable_solver::catalog::Catalog;
use timetable_solver::model::TimetableModel;
use timetable_solver::{SchedulingInput, SolverConfig, server, solve};

#[derive(Parser)]
#[command(about = "Assigns course sections to classrooms, weekdays and time slots.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve the tables in a JSON file and print or write the timetable.
    Solve {
        /// JSON file with `sections`, `classrooms` and `timeslots`.
        input: PathBuf,

        /// Write the full result as JSON here instead of printing the grid.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: SolveOptions,
    },

    /// Print the model built from a JSON file in LP format.
    EmitLp {
        input: PathBuf,

        #[arg(long)]
        allow_unscheduled: bool,
    },

    /// Serve `POST /v1/schedule/solve` over HTTP.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,

        #[arg(long, default_value_t = 1)]
        max_concurrent_solves: usize,
    },
}

#[derive(Args)]
struct SolveOptions {
    /// JSON solver configuration; the flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// The time limit of the solver in seconds.
    #[arg(short, long)]
    time_limit: Option<f64>,

    #[arg(long)]
    threads: Option<u32>,

    /// Allow sections to stay unscheduled instead of failing.
    #[arg(long)]
    allow_unscheduled: bool,

    /// Show the solver's own log.
    #[arg(long)]
    log_solver: bool,
}

impl SolveOptions {
    fn into_config(self) -> Result<SolverConfig, String> {
        let mut config = match &self.config {
            Some(path) => read_json::<SolverConfig>(path)?,
            None => SolverConfig::default(),
        };
        if self.time_limit.is_some() {
            config.time_limit_secs = self.time_limit;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        config.allow_unscheduled |= self.allow_unscheduled;
        config.log_to_console |= self.log_solver;
        Ok(config)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

fn run_solve(input: &Path, output: Option<&Path>, options: SolveOptions) -> Result<(), String> {
    let config = options.into_config()?;
    let tables: SchedulingInput = read_json(input)?;
    let result = solve(&tables, &config).map_err(|e| e.to_string())?;

    info!(
        "Objective {} ({:?}), {} placements.",
        result.objective,
        result.status,
        result.placements.len()
    );
    match output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
            std::fs::write(path, json)
                .map_err(|e| format!("could not write '{}': {}", path.display(), e))?;
            info!("Timetable written to {}", path.display());
        }
        None => print!("{}", result.timetable),
    }
    Ok(())
}

fn run_emit_lp(input: &Path, allow_unscheduled: bool) -> Result<(), String> {
    let tables: SchedulingInput = read_json(input)?;
    let catalog = Catalog::from_input(&tables).map_err(|e| e.to_string())?;
    let config = SolverConfig {
        allow_unscheduled,
        ..SolverConfig::default()
    };
    let model = TimetableModel::build(&catalog, config.policy());
    print!("{}", model.linear().to_lp());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Solve {
            input,
            output,
            options,
        } => run_solve(&input, output.as_deref(), options),
        Command::EmitLp {
            input,
            allow_unscheduled,
        } => run_emit_lp(&input, allow_unscheduled),
        Command::Serve {
            addr,
            max_concurrent_solves,
        } => server::run_server(addr, max_concurrent_solves)
            .await
            .map_err(|e| e.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
