//! Final estimation record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationProfile;

/// Which strategy produced an [`EstimationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    /// Statistics reported by an external slicing engine.
    Slicer,
    /// Geometry-based heuristic.
    Heuristic,
}

impl fmt::Display for EstimateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EstimateSource::Slicer => "slicer",
            EstimateSource::Heuristic => "heuristic",
        })
    }
}

/// Print-planning metrics for one part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    /// Estimated print time (minutes).
    pub print_time_min: f64,
    /// Filament length (m).
    pub filament_meters: f64,
    /// Filament mass (g).
    pub filament_grams: f64,
    /// Layer count, at least the profile minimum.
    pub layers: u32,
    /// Producing strategy.
    pub source: EstimateSource,
}

impl EstimationResult {
    /// Convert slicer-reported statistics.
    ///
    /// Time and filament are clamped at zero and non-finite values read as
    /// zero; the layer count is raised to the profile minimum.
    pub fn from_slicer_stats(
        time_sec: f64,
        filament_mm: f64,
        layer_count: u32,
        calibration: &CalibrationProfile,
    ) -> Self {
        let filament_meters = non_negative(filament_mm) / 1000.0;
        Self {
            print_time_min: non_negative(time_sec) / 60.0,
            filament_meters,
            filament_grams: filament_meters * calibration.grams_per_meter,
            layers: layer_count.max(calibration.min_layers),
            source: EstimateSource::Slicer,
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
