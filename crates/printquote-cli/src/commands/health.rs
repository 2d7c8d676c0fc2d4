//! printquote health - check the configured engine.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use printquote_engine::Pipeline;
use serde::Serialize;

use super::print_json;
use crate::{Cli, OutputFormat};

#[derive(Serialize)]
struct Health {
    status: &'static str,
    calibration_profile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    slicer: Option<SlicerHealth>,
}

#[derive(Serialize)]
struct SlicerHealth {
    kind: &'static str,
    executable: String,
    resolved: Option<PathBuf>,
    machine: String,
    timeout_secs: f64,
}

/// Locate `program` the way the OS would when spawning it.
fn resolve(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

pub fn run(cli: &Cli) -> Result<ExitCode> {
    let settings = cli.engine_settings()?;
    let pipeline = Pipeline::from_settings(&settings).context("invalid engine settings")?;

    let slicer = pipeline.slicer().map(|s| SlicerHealth {
        kind: s.kind().name(),
        executable: s.executable().display().to_string(),
        resolved: resolve(s.executable()),
        machine: s.machine().id.clone(),
        timeout_secs: s.timeout().as_secs_f64(),
    });
    let status = match &slicer {
        Some(s) if s.resolved.is_some() => "ok",
        _ => "heuristic_only",
    };
    let health = Health {
        status,
        calibration_profile: pipeline.calibration().name.clone(),
        slicer,
    };

    match cli.format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Text => {
            println!("Status: {}", health.status);
            println!("  Calibration: {}", health.calibration_profile);
            match &health.slicer {
                Some(s) => {
                    println!("  Slicer:      {} at {}", s.kind, s.executable);
                    match &s.resolved {
                        Some(path) => println!("  Resolved:    {}", path.display()),
                        None => println!("  Resolved:    not found, estimates use geometry only"),
                    }
                    println!("  Machine:     {}", s.machine);
                    println!("  Timeout:     {} s", s.timeout_secs);
                }
                None => println!("  Slicer:      not configured"),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
