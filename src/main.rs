mod abort;
mod acu;
mod command;
mod config;
mod controller;
mod envelope;
mod pattern;
mod web;

use clap::{Parser, Subcommand};
use std::fs;
use std::process::ExitCode;

use crate::acu::SimulatedMount;
use crate::command::Command;
use crate::config::Config;
use crate::controller::{Controller, SessionState};

#[derive(Parser)]
#[command(name = "acu-commander")]
#[command(about = "Radio telescope antenna control unit commander")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a command file
    Validate { request: String },
    /// Run a command file against the simulated ACU
    Run { request: String },
    /// Serve the HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Commands::Validate { request } => validate(&config, &request),
        Commands::Run { request } => run(&config, &request).await,
        Commands::Serve => match web::run_server(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Server error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn load_command(path: &str) -> Result<Command, String> {
    let yaml = fs::read_to_string(path).map_err(|e| format!("Error reading file: {}", e))?;
    serde_yaml::from_str(&yaml).map_err(|e| format!("Parse error: {}", e))
}

fn validate(config: &Config, path: &str) -> ExitCode {
    let command = match load_command(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let ctx = match config.context() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match command.check(&ctx) {
        Ok(()) => {
            println!("Command is valid ({})", command.kind());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Invalid {} command: {}", command.kind(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, path: &str) -> ExitCode {
    let command = match load_command(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let (ctx, settings) = match (config.context(), config.controller_settings()) {
        (Ok(ctx), Ok(settings)) => (ctx, settings),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mount = SimulatedMount::new(ctx.envelope, config.simulator);
    let mut controller = Controller::new(ctx, settings, mount.clone(), mount);

    if let Err(e) = controller.submit(command).await {
        eprintln!("Command rejected: {}", e);
        return ExitCode::FAILURE;
    }
    println!("Command started at {}", chrono::Utc::now());

    let status = controller.wait().await;
    match status.state {
        SessionState::Completed => {
            println!("Command completed");
            ExitCode::SUCCESS
        }
        other => {
            eprintln!("Command did not complete: {:?}", other);
            ExitCode::FAILURE
        }
    }
}
