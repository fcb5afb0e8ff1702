mod abort;
mod config;
mod predict;
mod scheduler;
mod web;

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::abort::AbortHandle;
use crate::config::Config;
use crate::scheduler::{ScheduleRequest, ScheduleState, Storage};

#[derive(Parser)]
#[command(name = "contact-o-mat")]
#[command(about = "Satellite contact prediction and ground-contact scheduling")]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Print results as JSON instead of YAML
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scheduling request
    Validate { request: PathBuf },
    /// Compute contact windows for a scheduling request
    Windows { request: PathBuf },
    /// Schedule a request: baseline plus optimizer proposal
    Run {
        request: PathBuf,
        /// Store the baseline as committed and the proposal for review
        #[arg(long)]
        save: bool,
    },
    /// Promote the pending proposal of a saved run
    Approve { id: String },
    /// Discard the pending proposal of a saved run
    Reject { id: String },
    /// List saved runs
    List {
        #[arg(long, value_enum)]
        state: Option<StateArg>,
    },
    /// Serve the HTTP API
    Serve,
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    Committed,
    Proposed,
}

impl From<StateArg> for ScheduleState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Committed => ScheduleState::Committed,
            StateArg::Proposed => ScheduleState::Proposed,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    let json = cli.json;

    match cli.command {
        Commands::Validate { request } => validate(&config, &request),
        Commands::Windows { request } => windows(&config, &request, json),
        Commands::Run { request, save } => run(&config, &request, save, json),
        Commands::Approve { id } => approve(&config, &id, json),
        Commands::Reject { id } => reject(&config, &id),
        Commands::List { state } => list(&config, state, json),
        Commands::Serve => serve(config),
    }
}

fn load_request(config: &Config, path: &Path) -> Result<ScheduleRequest, ExitCode> {
    let yaml = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading file: {}", e);
        ExitCode::FAILURE
    })?;
    let stored = config.elements.load();
    ScheduleRequest::parse(&yaml, &stored).map_err(|e| {
        eprintln!("Parse error: {}", e);
        ExitCode::FAILURE
    })
}

fn print<T: Serialize>(value: &T, json: bool) -> ExitCode {
    let rendered = if json {
        serde_json::to_string_pretty(value).map_err(|e| e.to_string())
    } else {
        serde_yaml::to_string(value).map_err(|e| e.to_string())
    };
    match rendered {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error rendering output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn validate(config: &Config, path: &Path) -> ExitCode {
    let request = match load_request(config, path) {
        Ok(r) => r,
        Err(code) => return code,
    };

    match scheduler::preflight(&request, config) {
        Ok(stations) => {
            println!(
                "Request is valid ({} satellites, {} stations, {} demands)",
                request.satellites.len(),
                stations.len(),
                request.demands.len()
            );
            println!("  horizon: {} to {}", request.horizon_start, request.horizon_end);
            for station in &stations {
                println!(
                    "  station {}: mask {:.1} deg, capacity {}",
                    station.id, station.min_elevation_deg, station.capacity
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Invalid request: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn windows(config: &Config, path: &Path, json: bool) -> ExitCode {
    let request = match load_request(config, path) {
        Ok(r) => r,
        Err(code) => return code,
    };

    match scheduler::contact_windows(&request, config, &AbortHandle::new()) {
        Ok(catalog) => print(&catalog, json),
        Err(e) => {
            eprintln!("Error computing windows: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, path: &Path, save: bool, json: bool) -> ExitCode {
    let request = match load_request(config, path) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let report = match scheduler::run(&request, config, &AbortHandle::new()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Run failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for unmet in &report.unmet {
        log::warn!(
            "Demand {} (satellite {}) not scheduled: {}",
            unmet.demand_id,
            unmet.satellite_id,
            unmet.reason
        );
    }

    if save {
        let storage = Storage::new(config.storage.base_folder.clone());
        if let Err(e) = storage.save_run(&report) {
            eprintln!("Error saving run: {}", e);
            return ExitCode::FAILURE;
        }
    }

    print(&report, json)
}

fn approve(config: &Config, id: &str, json: bool) -> ExitCode {
    let storage = Storage::new(config.storage.base_folder.clone());
    match storage.approve(id) {
        Ok(record) => print(&record, json),
        Err(e) => {
            eprintln!("Cannot approve {}: {}", id, e);
            ExitCode::FAILURE
        }
    }
}

fn reject(config: &Config, id: &str) -> ExitCode {
    let storage = Storage::new(config.storage.base_folder.clone());
    match storage.reject(id) {
        Ok(()) => {
            println!("Rejected proposal for {}", id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Cannot reject {}: {}", id, e);
            ExitCode::FAILURE
        }
    }
}

fn list(config: &Config, state: Option<StateArg>, json: bool) -> ExitCode {
    let storage = Storage::new(config.storage.base_folder.clone());
    let states = match state {
        Some(s) => vec![s.into()],
        None => vec![ScheduleState::Committed, ScheduleState::Proposed],
    };

    let mut summaries = Vec::new();
    for s in states {
        match storage.list(s) {
            Ok(found) => summaries.extend(found),
            Err(e) => {
                eprintln!("Error listing schedules: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    print(&summaries, json)
}

fn serve(config: Config) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
