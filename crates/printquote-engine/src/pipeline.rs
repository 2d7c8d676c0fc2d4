//! Estimation pipeline with explicit state transitions.
//!
//! ```text
//! Start ─► GeometryParsed ─┬─► SlicerAttempted ─► TelemetryValidated ─┬─► Done (slicer)
//!                          │          │                               │
//!                          │          └─ failure / timeout ──┐        └─ unusable ─┐
//!                          └─ no slicer / approximate ───────┴─► HeuristicFallback ─┴─► Done (heuristic)
//! ```
//!
//! Configuration and parse errors move to `Failed` and are returned to the
//! caller. Slicer failures never are: once geometry is known the request
//! always completes through one of the two strategies.

use std::borrow::Cow;
use std::fmt;

use printquote_estimate::{
    CalibrationProfile, EstimationResult, HeuristicEstimator, PrintConfiguration,
};
use printquote_gcode::scan;
use printquote_mesh::{analyze_approximate, parse_stl, summarize, write_stl, GeometrySummary, Mesh};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, SettingsError, SlicerError};
use crate::invoker::ExternalSlicer;
use crate::settings::EngineSettings;

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Request accepted.
    Start,
    /// Geometry summary computed and normalized.
    GeometryParsed,
    /// External slicer invoked.
    SlicerAttempted,
    /// Telemetry extracted from the toolpath.
    TelemetryValidated,
    /// Heuristic estimator selected.
    HeuristicFallback,
    /// Result produced.
    Done,
    /// Request rejected.
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineState::Start => "start",
            PipelineState::GeometryParsed => "geometry_parsed",
            PipelineState::SlicerAttempted => "slicer_attempted",
            PipelineState::TelemetryValidated => "telemetry_validated",
            PipelineState::HeuristicFallback => "heuristic_fallback",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        })
    }
}

/// Why the heuristic estimator produced the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FallbackReason {
    /// No external slicer is configured.
    NoSlicer,
    /// Geometry was approximated from the file size.
    ApproximateGeometry,
    /// The slicer failed to start, exited with an error or wrote no toolpath.
    SlicingFailed(String),
    /// The slicer exceeded its time limit.
    Timeout,
    /// The toolpath reported no filament usage.
    TelemetryUnusable,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoSlicer => f.write_str("no slicer configured"),
            FallbackReason::ApproximateGeometry => f.write_str("approximate geometry"),
            FallbackReason::SlicingFailed(msg) => write!(f, "slicing failed: {msg}"),
            FallbackReason::Timeout => f.write_str("slicer timed out"),
            FallbackReason::TelemetryUnusable => f.write_str("telemetry unusable"),
        }
    }
}

impl From<SlicerError> for FallbackReason {
    fn from(err: SlicerError) -> Self {
        match err {
            SlicerError::Timeout(_) => FallbackReason::Timeout,
            other => FallbackReason::SlicingFailed(other.to_string()),
        }
    }
}

/// Result plus the path taken to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Final estimate.
    pub result: EstimationResult,
    /// Normalized geometry the estimate was based on.
    pub geometry: GeometrySummary,
    /// Set when the heuristic produced `result`.
    pub fallback: Option<FallbackReason>,
    /// Visited states, in order.
    pub transitions: Vec<PipelineState>,
}

/// Records and logs state transitions.
struct Trace {
    states: Vec<PipelineState>,
}

impl Trace {
    fn start() -> Self {
        debug!(state = %PipelineState::Start, "pipeline transition");
        Self {
            states: vec![PipelineState::Start],
        }
    }

    fn advance(&mut self, next: PipelineState) {
        let from = self.states.last().copied().unwrap_or(PipelineState::Start);
        debug!(%from, to = %next, "pipeline transition");
        self.states.push(next);
    }

    fn fail(mut self, err: PipelineError) -> PipelineError {
        self.advance(PipelineState::Failed);
        warn!(kind = err.kind(), error = %err, "estimation request failed");
        err
    }
}

/// Estimation orchestrator.
///
/// Holds no per-request state, so one instance can serve concurrent
/// requests.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    slicer: Option<ExternalSlicer>,
    estimator: HeuristicEstimator,
    allow_approximate_geometry: bool,
}

impl Pipeline {
    /// Heuristic-only pipeline using `calibration`.
    pub fn new(calibration: CalibrationProfile) -> Self {
        Self {
            slicer: None,
            estimator: HeuristicEstimator::new(calibration),
            allow_approximate_geometry: false,
        }
    }

    /// Build from engine settings.
    pub fn from_settings(settings: &EngineSettings) -> Result<Self, SettingsError> {
        Ok(Self {
            slicer: settings.build_slicer()?,
            estimator: HeuristicEstimator::new(settings.calibration()?),
            allow_approximate_geometry: settings.allow_approximate_geometry,
        })
    }

    /// Use `slicer` as the primary strategy.
    pub fn with_slicer(mut self, slicer: ExternalSlicer) -> Self {
        self.slicer = Some(slicer);
        self
    }

    /// Degrade unparseable meshes to a size-based approximation instead of
    /// failing.
    pub fn with_approximate_geometry(mut self, allow: bool) -> Self {
        self.allow_approximate_geometry = allow;
        self
    }

    /// Configured slicer, if any.
    pub fn slicer(&self) -> Option<&ExternalSlicer> {
        self.slicer.as_ref()
    }

    /// Active calibration profile.
    pub fn calibration(&self) -> &CalibrationProfile {
        self.estimator.calibration()
    }

    /// Estimate a binary STL.
    pub async fn run(
        &self,
        mesh_stl: &[u8],
        config: &PrintConfiguration,
    ) -> Result<EstimationResult, PipelineError> {
        Ok(self.run_with_report(mesh_stl, config).await?.result)
    }

    /// Estimate a binary STL and report how the result was obtained.
    pub async fn run_with_report(
        &self,
        mesh_stl: &[u8],
        config: &PrintConfiguration,
    ) -> Result<PipelineReport, PipelineError> {
        let mut trace = Trace::start();

        if let Err(e) = config.validate() {
            return Err(trace.fail(e.into()));
        }
        let factor = config.scale_factor();

        let (geometry, mesh) = match parse_stl(mesh_stl) {
            Ok(mesh) => (summarize(&mesh).scaled(factor), Some(mesh)),
            Err(e) if self.allow_approximate_geometry => {
                warn!(error = %e, "mesh unparseable, approximating from size");
                (analyze_approximate(mesh_stl.len()).scaled(factor), None)
            }
            Err(e) => return Err(trace.fail(e.into())),
        };
        trace.advance(PipelineState::GeometryParsed);
        info!(
            volume_cm3 = geometry.volume_cm3(),
            height_mm = geometry.height_mm,
            triangles = geometry.triangle_count,
            scale_factor = factor,
            "geometry parsed"
        );

        let fallback = match (&self.slicer, &mesh) {
            (_, None) => FallbackReason::ApproximateGeometry,
            (None, _) => FallbackReason::NoSlicer,
            (Some(slicer), Some(mesh)) => {
                if !slicer.machine().fits_height(geometry.height_mm) {
                    warn!(
                        height_mm = geometry.height_mm,
                        machine = %slicer.machine().id,
                        "part is taller than the build volume"
                    );
                }
                let stl = normalized_stl(mesh_stl, mesh, factor);
                trace.advance(PipelineState::SlicerAttempted);
                match slicer.slice(&stl, config).await {
                    Ok(toolpath) => {
                        let extraction = scan(&toolpath.gcode);
                        trace.advance(PipelineState::TelemetryValidated);
                        let telemetry = extraction.telemetry;
                        if telemetry.is_usable() {
                            let result = EstimationResult::from_slicer_stats(
                                telemetry.time_sec,
                                telemetry.filament_mm,
                                telemetry.layer_count,
                                self.estimator.calibration(),
                            );
                            trace.advance(PipelineState::Done);
                            info!(
                                source = %result.source,
                                dialect = extraction.dialect.map(|d| d.name()),
                                print_time_min = result.print_time_min,
                                filament_meters = result.filament_meters,
                                "estimate complete"
                            );
                            return Ok(PipelineReport {
                                result,
                                geometry,
                                fallback: None,
                                transitions: trace.states,
                            });
                        }
                        FallbackReason::TelemetryUnusable
                    }
                    Err(e) => e.into(),
                }
            }
        };

        trace.advance(PipelineState::HeuristicFallback);
        info!(reason = %fallback, "using heuristic estimate");
        let result = match self.estimator.estimate(&geometry, config) {
            Ok(result) => result,
            Err(e) => return Err(trace.fail(e.into())),
        };
        trace.advance(PipelineState::Done);
        info!(
            source = %result.source,
            print_time_min = result.print_time_min,
            filament_meters = result.filament_meters,
            "estimate complete"
        );

        Ok(PipelineReport {
            result,
            geometry,
            fallback: Some(fallback),
            transitions: trace.states,
        })
    }
}

/// The STL handed to the slicer, carrying the unit and percent scale.
fn normalized_stl<'a>(original: &'a [u8], mesh: &Mesh, factor: f64) -> Cow<'a, [u8]> {
    if factor == 1.0 {
        Cow::Borrowed(original)
    } else {
        Cow::Owned(write_stl(&mesh.scaled(factor)))
    }
}

/// Estimate with the built-in calibration and no external slicer.
pub async fn run_pipeline(
    mesh_stl: &[u8],
    config: &PrintConfiguration,
) -> Result<EstimationResult, PipelineError> {
    Pipeline::default().run(mesh_stl, config).await
}
