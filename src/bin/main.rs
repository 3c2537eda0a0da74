//! Schema Archaeologist CLI - infer keys, relationships and domains
//!
//! Usage:
//!   archaeologist discover <environment> [--config <file>] [--format json|summary]
//!   archaeologist environments [--config <file>]
//!
//! Examples:
//!   archaeologist discover legacy --format summary
//!   RUST_LOG=archaeologist=debug archaeologist discover legacy > report.json

use archaeologist::config::Settings;
use archaeologist::discovery::DiscoveryOrchestrator;
use archaeologist::metadata::SqliteProvider;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "archaeologist")]
#[command(about = "Schema Archaeologist - reconstruct undeclared keys and relationships")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run discovery against a configured environment
    Discover {
        /// Environment name from the config file
        environment: String,

        /// Path to the config file (default search order otherwise)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        /// Override the configured worker count
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// List configured environments
    Environments {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Full report as pretty JSON
    Json,
    /// Human-readable digest
    Summary,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Discover {
            environment,
            config,
            format,
            workers,
        } => cmd_discover(environment, config, format, workers),
        Commands::Environments { config } => cmd_environments(config),
    }
}

fn load_settings(config: Option<PathBuf>) -> Option<Settings> {
    let result = match &config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    match result {
        Ok(settings) => Some(settings),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            None
        }
    }
}

fn cmd_discover(
    environment: String,
    config: Option<PathBuf>,
    format: OutputFormat,
    workers: Option<usize>,
) -> ExitCode {
    let Some(settings) = load_settings(config) else {
        return ExitCode::FAILURE;
    };

    let connection = match settings.connection(&environment) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let provider = match SqliteProvider::for_environment(connection) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error opening '{}': {}", environment, e);
            return ExitCode::FAILURE;
        }
    };

    let mut discovery = settings.discovery.clone();
    if let Some(n) = workers {
        discovery.worker_count = n;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(discovery.worker_count.max(1))
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = DiscoveryOrchestrator::new(Arc::new(provider), discovery);
    let report = match runtime.block_on(orchestrator.run(&environment)) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Discovery failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                return ExitCode::FAILURE;
            }
        },
        OutputFormat::Summary => print!("{}", report.render_summary()),
    }
    ExitCode::SUCCESS
}

fn cmd_environments(config: Option<PathBuf>) -> ExitCode {
    let Some(settings) = load_settings(config) else {
        return ExitCode::FAILURE;
    };

    let names = settings.environment_names();
    if names.is_empty() {
        println!("No environments configured.");
        return ExitCode::SUCCESS;
    }
    println!("Environments:");
    for name in names {
        match settings.connection(name) {
            Ok(c) => println!("  - {} ({}: {})", name, c.driver_name(), c.location),
            Err(e) => println!("  - {} (invalid: {})", name, e),
        }
    }
    ExitCode::SUCCESS
}
