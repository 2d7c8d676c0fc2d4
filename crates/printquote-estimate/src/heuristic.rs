//! Geometry-only estimation.
//!
//! Used when no slicing engine is configured or its output carries no
//! filament figure. Extrudate volume is split into walls, solid skins and
//! infill, each a calibrated share of the part volume:
//!
//! ```text
//! walls  = wall_fraction  × wall_count                         × V
//! solid  = solid_fraction × (top + bottom) / solid_divisor     × V
//! infill = infill_fraction × infill% / 100                     × V
//! ```
//!
//! The sum is scaled by the support overhead, converted to a filament
//! length through the filament cross-section, and the adhesion allowance is
//! added. Time follows a linear model in filament length, scaled by speed
//! and layer height relative to the reference settings.

use std::f64::consts::PI;

use printquote_mesh::GeometrySummary;
use tracing::debug;

use crate::calibration::CalibrationProfile;
use crate::config::PrintConfiguration;
use crate::error::{ConfigError, Result};
use crate::result::{EstimateSource, EstimationResult};

/// Guards `floor(height / layer_height)` against representation error,
/// e.g. `10.0 / 0.2`.
const LAYER_EPSILON: f64 = 1e-9;

/// Heuristic estimator bound to a calibration profile.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEstimator {
    calibration: CalibrationProfile,
}

impl HeuristicEstimator {
    /// Create an estimator using `calibration`.
    pub fn new(calibration: CalibrationProfile) -> Self {
        Self { calibration }
    }

    /// The active calibration profile.
    pub fn calibration(&self) -> &CalibrationProfile {
        &self.calibration
    }

    /// Estimate from normalized geometry.
    ///
    /// `geometry` must already carry the unit and percent scale; it is not
    /// scaled again here. Fails if the configuration has a non-positive
    /// layer height or speed, or if the geometry or the resulting figures
    /// are not finite.
    pub fn estimate(
        &self,
        geometry: &GeometrySummary,
        config: &PrintConfiguration,
    ) -> Result<EstimationResult> {
        config.validate()?;
        self.calibration.validate()?;
        let cal = &self.calibration;

        if !(geometry.volume_mm3.is_finite() && geometry.height_mm.is_finite()) {
            return Err(ConfigError::InvalidSettings(format!(
                "geometry is not finite (volume {} mm3, height {} mm)",
                geometry.volume_mm3, geometry.height_mm
            )));
        }

        let volume_cm3 = geometry.volume_cm3();
        let wall = cal.wall_fraction * f64::from(config.wall_count) * volume_cm3;
        let solid = cal.solid_fraction
            * (f64::from(config.top_layers) + f64::from(config.bottom_layers))
            / cal.solid_layer_divisor
            * volume_cm3;
        let infill = cal.infill_fraction * (config.infill_percent / 100.0) * volume_cm3;
        let extrudate_cm3 = (wall + solid + infill) * cal.support.factor(config.support);

        let radius_cm = config.filament_diameter / 2.0 / 10.0;
        let area_cm2 = PI * radius_cm * radius_cm;
        let filament_meters =
            extrudate_cm3 / area_cm2 / 100.0 + cal.adhesion.meters(config.adhesion);

        let print_time_min = (cal.time_base_min + filament_meters * cal.time_per_meter_min)
            * (cal.reference_speed / config.average_speed())
            * (cal.reference_layer_height / config.layer_height)
            + cal.time_offset_min;

        let filament_grams = filament_meters * cal.grams_per_meter;

        if !(filament_grams.is_finite() && print_time_min.is_finite()) {
            return Err(ConfigError::InvalidSettings(format!(
                "estimate is not finite (filament {filament_meters} m, time {print_time_min} min)"
            )));
        }

        let raw_layers = (geometry.height_mm / config.layer_height + LAYER_EPSILON).floor();
        let layers = (raw_layers as u32).max(cal.min_layers);

        debug!(
            profile = %cal.name,
            volume_cm3,
            extrudate_cm3,
            filament_meters,
            print_time_min,
            layers,
            "heuristic estimate"
        );

        Ok(EstimationResult {
            print_time_min: print_time_min.max(0.0),
            filament_meters,
            filament_grams,
            layers,
            source: EstimateSource::Heuristic,
        })
    }
}

/// Estimate with the built-in calibration.
pub fn estimate_heuristic(
    geometry: &GeometrySummary,
    config: &PrintConfiguration,
) -> Result<EstimationResult> {
    HeuristicEstimator::default().estimate(geometry, config)
}
