//! printquote: print time and filament estimates for binary STL parts.
//!
//! # Logging
//!
//! Set `RUST_LOG` to control log output, or pass `-v` / `-vv`:
//! - `RUST_LOG=printquote_engine=info` - pipeline transitions and fallbacks
//! - `RUST_LOG=debug` - everything
//!
//! # Example
//!
//! ```bash
//! printquote estimate part.stl --set layer_height=0.12 --set infill=30
//! PRINTQUOTE_SLICER=/usr/bin/CuraEngine printquote --format json estimate part.stl
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use printquote_engine::EngineSettings;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{analyze, estimate, health, materials, profiles, telemetry};

/// printquote - estimate print time, filament and layers for a part.
#[derive(Parser)]
#[command(name = "printquote")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine settings file (TOML)
    #[arg(long, global = true, env = "PRINTQUOTE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase log verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate print time, filament and layer count
    Estimate {
        /// Binary STL file
        input: PathBuf,

        /// Print setting as key=value (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Show volume and height of a mesh
    Analyze {
        /// Binary STL file
        input: PathBuf,

        /// Print setting as key=value, for units and scale
        #[arg(long = "set", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Extract print statistics from a G-code file
    Telemetry {
        /// G-code file
        input: PathBuf,
    },

    /// List calibration and machine profiles
    Profiles,

    /// Report whether the configured slicer is usable
    Health,

    /// Manage the materials catalog
    Materials {
        /// Catalog file (JSON)
        #[arg(long, default_value = "materials.json")]
        catalog: PathBuf,

        #[command(subcommand)]
        action: materials::Action,
    },
}

fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "printquote_engine=info,printquote_estimate=info,printquote_mesh=info",
            2 => "printquote_engine=debug,printquote_estimate=debug,printquote_mesh=debug,printquote_gcode=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

impl Cli {
    /// Settings file (if any) with environment overrides applied.
    fn engine_settings(&self) -> Result<EngineSettings> {
        let mut settings = match &self.settings {
            Some(path) => EngineSettings::load(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => EngineSettings::default(),
        };
        settings.apply_env();
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Estimate { input, params } => estimate::run(input, params, &cli).await,
        Commands::Analyze { input, params } => analyze::run(input, params, &cli),
        Commands::Telemetry { input } => telemetry::run(input, &cli),
        Commands::Profiles => profiles::run(&cli),
        Commands::Health => health::run(&cli),
        Commands::Materials { catalog, action } => materials::run(catalog, action, &cli),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {cause}");
            }
            ExitCode::FAILURE
        }
    }
}
