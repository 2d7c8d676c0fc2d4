//! printquote telemetry - read print statistics from a toolpath.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use printquote_gcode::scan;

use super::print_json;
use crate::{Cli, OutputFormat};

pub fn run(input: &Path, cli: &Cli) -> Result<ExitCode> {
    let bytes =
        std::fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let extraction = scan(&String::from_utf8_lossy(&bytes));
    let telemetry = extraction.telemetry;

    match cli.format {
        OutputFormat::Json => print_json(&extraction)?,
        OutputFormat::Text => {
            let dialect = extraction.dialect.map_or("unknown", |d| d.name());
            println!("Toolpath {} ({dialect})", input.display());
            println!("  Time:     {:.0} s", telemetry.time_sec);
            println!("  Filament: {:.1} mm ({:?})", telemetry.filament_mm, extraction.filament_source);
            println!("  Layers:   {}", telemetry.layer_count);
            if !telemetry.is_usable() {
                println!("  No filament usage found; estimates would fall back to geometry");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
