#![warn(missing_docs)]

//! Print statistics from slicer-generated G-code.
//!
//! Slicing engines embed their own estimates as comments, each in its own
//! dialect. This crate scans toolpath text once and collects elapsed time,
//! filament usage and layer count into a [`SlicerTelemetry`] record. When no
//! filament comment is present the cumulative extrusion axis is used instead.
//!
//! # Example
//!
//! ```
//! use printquote_gcode::extract_telemetry;
//!
//! let gcode = ";TIME:125\n;Filament used: 1.234m\n;LAYER:0\nG1 X10 E1.5\n";
//! let telemetry = extract_telemetry(gcode);
//! assert_eq!(telemetry.time_sec, 125.0);
//! assert_eq!(telemetry.layer_count, 1);
//! assert!(telemetry.is_usable());
//! ```

pub mod dialect;
pub mod duration;
pub mod telemetry;

pub use dialect::TelemetryDialect;
pub use duration::parse_duration;
pub use telemetry::{
    detect_dialect, extract_telemetry, scan, Extraction, FilamentSource, SlicerTelemetry,
    TelemetryScanner, PLA_GRAMS_PER_METER,
};
