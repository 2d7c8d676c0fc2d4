//! Versioned calibration table for the heuristic estimator.
//!
//! The constants are empirical. They are kept frozen so that estimates stay
//! comparable with earlier quotes; change them only by adding a new profile
//! backed by a fresh calibration run.

use serde::{Deserialize, Serialize};

use crate::config::{Adhesion, Support};
use crate::error::{ConfigError, Result};

/// Name of the built-in profile.
pub const LEGACY_V1: &str = "legacy-v1";

/// Extrudate multiplier per support mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportFactors {
    /// No support.
    pub none: f64,
    /// Build plate only.
    pub buildplate: f64,
    /// Everywhere.
    pub everywhere: f64,
}

impl SupportFactors {
    /// Factor for a support mode.
    pub fn factor(&self, support: Support) -> f64 {
        match support {
            Support::None => self.none,
            Support::Buildplate => self.buildplate,
            Support::Everywhere => self.everywhere,
        }
    }
}

/// Extra filament (m) per adhesion helper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdhesionMeters {
    /// Nothing.
    pub none: f64,
    /// Skirt.
    pub skirt: f64,
    /// Brim.
    pub brim: f64,
    /// Raft.
    pub raft: f64,
}

impl AdhesionMeters {
    /// Added length for an adhesion helper.
    pub fn meters(&self, adhesion: Adhesion) -> f64 {
        match adhesion {
            Adhesion::None => self.none,
            Adhesion::Skirt => self.skirt,
            Adhesion::Brim => self.brim,
            Adhesion::Raft => self.raft,
        }
    }
}

/// All constants used by the heuristic estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Profile name.
    pub name: String,
    /// Profile revision.
    pub version: u32,
    /// Share of part volume in walls, per wall.
    pub wall_fraction: f64,
    /// Share of part volume in solid skins, per `solid_layer_divisor` layers.
    pub solid_fraction: f64,
    /// Divisor applied to the combined top and bottom layer count.
    pub solid_layer_divisor: f64,
    /// Share of part volume in infill at 100 percent density.
    pub infill_fraction: f64,
    /// Support overhead multipliers.
    pub support: SupportFactors,
    /// Adhesion additions.
    pub adhesion: AdhesionMeters,
    /// Fixed part of the time model (min).
    pub time_base_min: f64,
    /// Minutes per metre of filament.
    pub time_per_meter_min: f64,
    /// Constant added after speed and layer scaling (min).
    pub time_offset_min: f64,
    /// Speed the time model was fitted at (mm/s).
    pub reference_speed: f64,
    /// Layer height the time model was fitted at (mm).
    pub reference_layer_height: f64,
    /// Floor on the reported layer count.
    pub min_layers: u32,
    /// Filament mass per metre (g/m).
    pub grams_per_meter: f64,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::legacy_v1()
    }
}

impl CalibrationProfile {
    /// The historical calibration. These values are a compatibility
    /// contract.
    pub fn legacy_v1() -> Self {
        Self {
            name: LEGACY_V1.into(),
            version: 1,
            wall_fraction: 0.15,
            solid_fraction: 0.1,
            solid_layer_divisor: 10.0,
            infill_fraction: 0.75,
            support: SupportFactors {
                none: 1.0,
                buildplate: 1.1,
                everywhere: 1.25,
            },
            adhesion: AdhesionMeters {
                none: 0.0,
                skirt: 0.5,
                brim: 2.0,
                raft: 5.0,
            },
            time_base_min: 104.7,
            time_per_meter_min: 3.89,
            time_offset_min: 6.47,
            reference_speed: 150.0,
            reference_layer_height: 0.2,
            min_layers: 10,
            grams_per_meter: 2.98,
        }
    }

    /// Get all built-in profiles.
    pub fn builtin_profiles() -> Vec<Self> {
        vec![Self::legacy_v1()]
    }

    /// Look up a built-in profile by name.
    pub fn by_name(name: &str) -> Result<Self> {
        Self::builtin_profiles()
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    /// Reject profiles that would make the estimator divide by zero or
    /// produce non-finite figures.
    pub fn validate(&self) -> Result<()> {
        let divisors = [
            ("reference_speed", self.reference_speed),
            ("reference_layer_height", self.reference_layer_height),
            ("solid_layer_divisor", self.solid_layer_divisor),
        ];
        if let Some((field, _)) = divisors.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(ConfigError::InvalidSettings(format!(
                "calibration profile {}: {field} must be positive",
                self.name
            )));
        }

        let coefficients = [
            ("wall_fraction", self.wall_fraction),
            ("solid_fraction", self.solid_fraction),
            ("infill_fraction", self.infill_fraction),
            ("support.none", self.support.none),
            ("support.buildplate", self.support.buildplate),
            ("support.everywhere", self.support.everywhere),
            ("adhesion.none", self.adhesion.none),
            ("adhesion.skirt", self.adhesion.skirt),
            ("adhesion.brim", self.adhesion.brim),
            ("adhesion.raft", self.adhesion.raft),
            ("time_base_min", self.time_base_min),
            ("time_per_meter_min", self.time_per_meter_min),
            ("time_offset_min", self.time_offset_min),
            ("grams_per_meter", self.grams_per_meter),
        ];
        if let Some((field, _)) = coefficients.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::InvalidSettings(format!(
                "calibration profile {}: {field} must be finite",
                self.name
            )));
        }
        Ok(())
    }
}
