//! printquote analyze - geometry summary of a mesh.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use printquote_estimate::PrintConfiguration;
use printquote_mesh::analyze_mesh;
use serde::Serialize;

use super::{parse_params, print_json};
use crate::{Cli, OutputFormat};

#[derive(Serialize)]
struct AnalyzeOutput {
    path: String,
    triangles: u32,
    volume_cm3: f64,
    height_mm: f64,
    scale_factor: f64,
}

pub fn run(input: &Path, pairs: &[String], cli: &Cli) -> Result<ExitCode> {
    let config = PrintConfiguration::from_params(&parse_params(pairs)?)?;
    let bytes =
        std::fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let factor = config.scale_factor();
    let geometry = analyze_mesh(&bytes)
        .with_context(|| format!("failed to parse {}", input.display()))?
        .scaled(factor);

    let output = AnalyzeOutput {
        path: input.display().to_string(),
        triangles: geometry.triangle_count,
        volume_cm3: geometry.volume_cm3(),
        height_mm: geometry.height_mm,
        scale_factor: factor,
    };

    match cli.format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => {
            println!("Mesh {}", output.path);
            println!("  Triangles: {}", output.triangles);
            println!("  Volume:    {:.3} cm³", output.volume_cm3);
            println!("  Height:    {:.2} mm", output.height_mm);
            if factor != 1.0 {
                println!("  Scale:     {factor}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
