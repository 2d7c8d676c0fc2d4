#![warn(missing_docs)]

//! Print configuration and geometry-based estimation for printquote.
//!
//! This crate holds the per-request [`PrintConfiguration`], the versioned
//! [`CalibrationProfile`] table and the [`HeuristicEstimator`] that turns a
//! [`GeometrySummary`](printquote_mesh::GeometrySummary) into print time,
//! filament usage and layer count without running a slicer.
//!
//! # Example
//!
//! ```ignore
//! use printquote_estimate::{estimate_heuristic, PrintConfiguration};
//! use printquote_mesh::analyze_mesh;
//!
//! let config = PrintConfiguration::default();
//! let geometry = analyze_mesh(&bytes)?.scaled(config.scale_factor());
//! let result = estimate_heuristic(&geometry, &config)?;
//! println!("{:.0} min, {:.2} m", result.print_time_min, result.filament_meters);
//! ```

pub mod calibration;
pub mod config;
pub mod error;
pub mod heuristic;
pub mod result;

pub use calibration::{AdhesionMeters, CalibrationProfile, SupportFactors, LEGACY_V1};
pub use config::{Adhesion, PrintConfiguration, Support, Units, MM_PER_INCH};
pub use error::{ConfigError, Result};
pub use heuristic::{estimate_heuristic, HeuristicEstimator};
pub use result::{EstimateSource, EstimationResult};
