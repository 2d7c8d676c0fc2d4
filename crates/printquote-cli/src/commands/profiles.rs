//! printquote profiles - list built-in profiles.

use std::process::ExitCode;

use anyhow::Result;
use printquote_engine::MachineProfile;
use printquote_estimate::CalibrationProfile;
use serde::Serialize;

use super::print_json;
use crate::{Cli, OutputFormat};

#[derive(Serialize)]
struct ProfileList {
    calibration: Vec<CalibrationProfile>,
    machines: Vec<MachineProfile>,
}

pub fn run(cli: &Cli) -> Result<ExitCode> {
    let list = ProfileList {
        calibration: CalibrationProfile::builtin_profiles(),
        machines: MachineProfile::all_profiles(),
    };

    match cli.format {
        OutputFormat::Json => print_json(&list)?,
        OutputFormat::Text => {
            println!("Calibration profiles:");
            for profile in &list.calibration {
                println!("  {} (v{})", profile.name, profile.version);
            }
            println!("Machine profiles:");
            for machine in &list.machines {
                println!(
                    "  {:<10} {} ({}x{}x{} mm)",
                    machine.id, machine.name, machine.bed_x, machine.bed_y, machine.bed_z
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
