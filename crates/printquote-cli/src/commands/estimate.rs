//! printquote estimate - run the estimation pipeline on a part.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use printquote_engine::{EstimateResponse, Pipeline, PipelineError};
use printquote_estimate::PrintConfiguration;
use tracing::debug;

use super::{parse_params, print_json};
use crate::{Cli, OutputFormat};

pub async fn run(input: &Path, pairs: &[String], cli: &Cli) -> Result<ExitCode> {
    let settings = cli.engine_settings()?;
    let pipeline = Pipeline::from_settings(&settings).context("invalid engine settings")?;
    let bytes =
        std::fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    debug!(path = %input.display(), bytes = bytes.len(), "read mesh");
    let params = parse_params(pairs)?;

    let (outcome, config) = match PrintConfiguration::from_params(&params) {
        Ok(config) => (pipeline.run_with_report(&bytes, &config).await, config),
        Err(e) => (Err(PipelineError::from(e)), PrintConfiguration::default()),
    };
    let response = EstimateResponse::from_outcome(&outcome, &config);

    match cli.format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Text => match &response.estimate {
            Some(body) => {
                println!("Estimate for {}", input.display());
                println!("  Print time: {:.1} min", body.print_time_min);
                println!("  Filament:   {:.2} m ({:.1} g)", body.filament_meters, body.filament_grams);
                println!("  Layers:     {}", body.layers);
                println!("  Volume:     {:.2} cm³", body.volume_cm3);
                println!("  Height:     {:.1} mm", body.height_mm);
                println!("  Units:      {} (scale {})", body.units_used, body.scale_factor);
                match &body.fallback {
                    Some(reason) => println!("  Source:     {} ({reason})", body.source),
                    None => println!("  Source:     {}", body.source),
                }
            }
            None => eprintln!(
                "Error [{}]: {}",
                response.error_kind.as_deref().unwrap_or("unknown"),
                response.error.as_deref().unwrap_or("")
            ),
        },
    }

    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
