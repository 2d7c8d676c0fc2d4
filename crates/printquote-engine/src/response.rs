//! Response envelope handed to the request layer.

use printquote_estimate::{EstimateSource, PrintConfiguration, Units};
use serde::Serialize;

use crate::error::PipelineError;
use crate::pipeline::PipelineReport;

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Rounded estimate with the settings it was computed for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateBody {
    /// Print time (minutes, 1 decimal).
    pub print_time_min: f64,
    /// Filament length (m, 2 decimals).
    pub filament_meters: f64,
    /// Filament mass (g, 1 decimal).
    pub filament_grams: f64,
    /// Layer count.
    pub layers: u32,
    /// Producing strategy.
    pub source: EstimateSource,
    /// Part volume after scaling (cm³, 2 decimals).
    pub volume_cm3: f64,
    /// Part height after scaling (mm, 1 decimal).
    pub height_mm: f64,
    /// Units the mesh was interpreted in.
    pub units_used: Units,
    /// Combined unit and percent scale.
    pub scale_factor: f64,
    /// Reason the heuristic was used, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Echoed print configuration.
    pub settings: PrintConfiguration,
}

/// `success` is always present; the remaining fields depend on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateResponse {
    /// Did the request produce an estimate?
    pub success: bool,
    /// Estimate fields, on success.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<EstimateBody>,
    /// Stable error kind, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Error message, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EstimateResponse {
    /// Successful response for a pipeline report.
    pub fn success(report: &PipelineReport, config: &PrintConfiguration) -> Self {
        let result = &report.result;
        Self {
            success: true,
            estimate: Some(EstimateBody {
                print_time_min: round_to(result.print_time_min, 1),
                filament_meters: round_to(result.filament_meters, 2),
                filament_grams: round_to(result.filament_grams, 1),
                layers: result.layers,
                source: result.source,
                volume_cm3: round_to(report.geometry.volume_cm3(), 2),
                height_mm: round_to(report.geometry.height_mm, 1),
                units_used: config.units,
                scale_factor: config.scale_factor(),
                fallback: report.fallback.as_ref().map(ToString::to_string),
                settings: config.clone(),
            }),
            error_kind: None,
            error: None,
        }
    }

    /// Failed response.
    pub fn failure(err: &PipelineError) -> Self {
        Self {
            success: false,
            estimate: None,
            error_kind: Some(err.kind().to_string()),
            error: Some(err.to_string()),
        }
    }

    /// Build from a pipeline outcome.
    pub fn from_outcome(
        outcome: &Result<PipelineReport, PipelineError>,
        config: &PrintConfiguration,
    ) -> Self {
        match outcome {
            Ok(report) => Self::success(report, config),
            Err(err) => Self::failure(err),
        }
    }
}
