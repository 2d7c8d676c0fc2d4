//! Single-pass telemetry extraction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dialect::{Comment, TelemetryDialect};

/// Linear density of 1.75 mm PLA (g/m), used to turn a reported mass into
/// a length.
pub const PLA_GRAMS_PER_METER: f64 = 2.98;

/// Print statistics reported by a slicing engine.
///
/// Every field defaults to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SlicerTelemetry {
    /// Estimated print time (seconds).
    pub time_sec: f64,
    /// Filament length (mm).
    pub filament_mm: f64,
    /// Number of layers.
    pub layer_count: u32,
}

impl SlicerTelemetry {
    /// A record can stand in for a real estimate only if it reports a
    /// finite, positive filament length and a finite time.
    ///
    /// Time and layer count may be zero.
    pub fn is_usable(&self) -> bool {
        self.filament_mm.is_finite() && self.filament_mm > 0.0 && self.time_sec.is_finite()
    }
}

/// Where the filament figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilamentSource {
    /// A length comment.
    Length,
    /// A mass comment, converted with [`PLA_GRAMS_PER_METER`].
    Mass,
    /// Maximum cumulative extrusion coordinate.
    Extrusion,
    /// Nothing found.
    #[default]
    None,
}

/// Telemetry plus provenance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extraction {
    /// Extracted statistics.
    pub telemetry: SlicerTelemetry,
    /// First dialect whose comments were recognised.
    pub dialect: Option<TelemetryDialect>,
    /// Origin of `telemetry.filament_mm`.
    pub filament_source: FilamentSource,
}

/// Tracks the cumulative extrusion axis across mode switches and resets.
#[derive(Debug, Clone, Default)]
struct ExtrusionTracker {
    relative: bool,
    /// Filament from finished segments.
    base: f64,
    segment_start: f64,
    segment_max: f64,
    current: f64,
}

impl ExtrusionTracker {
    fn total(&self) -> f64 {
        self.base + (self.segment_max - self.segment_start).max(0.0)
    }

    fn fold_segment(&mut self) {
        self.base += (self.segment_max - self.segment_start).max(0.0);
        self.segment_start = self.current;
        self.segment_max = self.current;
    }

    fn set_relative(&mut self, relative: bool) {
        if relative != self.relative {
            self.fold_segment();
            self.relative = relative;
        }
    }

    fn extrude(&mut self, e: f64) {
        if self.relative {
            self.current += e;
        } else {
            self.current = e;
        }
        self.segment_max = self.segment_max.max(self.current);
    }

    fn reset(&mut self, e: f64) {
        self.fold_segment();
        self.current = e;
        self.segment_start = e;
        self.segment_max = e;
    }
}

/// Incremental scanner, fed one line at a time.
#[derive(Debug, Clone, Default)]
pub struct TelemetryScanner {
    time_sec: Option<f64>,
    length_mm: Option<f64>,
    mass_g: Option<f64>,
    layer_markers: u32,
    layer_count_hint: Option<u32>,
    dialect: Option<TelemetryDialect>,
    extrusion: ExtrusionTracker,
    lines: usize,
}

impl TelemetryScanner {
    /// Create an empty scanner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line of toolpath text.
    pub fn feed_line(&mut self, line: &str) {
        self.lines += 1;
        let line = line.trim();
        if let Some(body) = line.strip_prefix(';') {
            self.feed_comment(body);
        } else if !line.is_empty() {
            self.feed_command(line);
        }
    }

    fn feed_comment(&mut self, body: &str) {
        // First dialect that recognises the line wins, so a line is never
        // counted twice.
        let Some((dialect, comment)) = TelemetryDialect::ALL
            .iter()
            .find_map(|d| d.classify(body).map(|c| (*d, c)))
        else {
            return;
        };

        self.dialect.get_or_insert(dialect);
        match comment {
            Comment::Time(sec) => {
                self.time_sec.get_or_insert(sec);
            }
            Comment::FilamentMm(mm) => {
                self.length_mm.get_or_insert(mm);
            }
            Comment::FilamentGrams(g) => {
                self.mass_g.get_or_insert(g);
            }
            Comment::LayerMarker => self.layer_markers += 1,
            Comment::LayerCount(n) => {
                self.layer_count_hint.get_or_insert(n);
            }
        }
    }

    fn feed_command(&mut self, line: &str) {
        let code = line.split(';').next().unwrap_or_default();
        let mut words = code.split_whitespace();
        let Some(command) = words.next() else {
            return;
        };

        match command.to_ascii_uppercase().as_str() {
            "G0" | "G00" | "G1" | "G01" => {
                if let Some(e) = axis_word(words, 'E') {
                    self.extrusion.extrude(e);
                }
            }
            "G92" => {
                if let Some(e) = axis_word(words, 'E') {
                    self.extrusion.reset(e);
                }
            }
            "M82" | "G90" => self.extrusion.set_relative(false),
            "M83" | "G91" => self.extrusion.set_relative(true),
            _ => {}
        }
    }

    /// Finish the scan and resolve precedence between sources.
    pub fn finish(self) -> Extraction {
        let from_mass = self
            .mass_g
            .map(|g| g / PLA_GRAMS_PER_METER * 1000.0)
            .filter(|mm| mm.is_finite());
        let extruded = Some(self.extrusion.total()).filter(|mm| mm.is_finite() && *mm > 0.0);
        let (filament_mm, filament_source) = if let Some(mm) = self.length_mm {
            (mm, FilamentSource::Length)
        } else if let Some(mm) = from_mass {
            (mm, FilamentSource::Mass)
        } else if let Some(mm) = extruded {
            (mm, FilamentSource::Extrusion)
        } else {
            (0.0, FilamentSource::None)
        };

        let layer_count = if self.layer_markers > 0 {
            self.layer_markers
        } else {
            self.layer_count_hint.unwrap_or(0)
        };

        let telemetry = SlicerTelemetry {
            time_sec: non_negative(self.time_sec.unwrap_or(0.0)),
            filament_mm: non_negative(filament_mm),
            layer_count,
        };

        debug!(
            lines = self.lines,
            dialect = ?self.dialect,
            source = ?filament_source,
            time_sec = telemetry.time_sec,
            filament_mm = telemetry.filament_mm,
            layers = telemetry.layer_count,
            "extracted slicer telemetry"
        );

        Extraction {
            telemetry,
            dialect: self.dialect,
            filament_source,
        }
    }
}

/// Clamp to `[0, +inf)`, mapping non-finite values to zero.
fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

fn axis_word<'a>(words: impl Iterator<Item = &'a str>, axis: char) -> Option<f64> {
    words
        .filter_map(|w| {
            let mut chars = w.chars();
            let first = chars.next()?;
            first
                .eq_ignore_ascii_case(&axis)
                .then(|| chars.as_str().parse::<f64>().ok())
                .flatten()
                .filter(|v| v.is_finite())
        })
        .next()
}

/// Scan toolpath text, keeping provenance.
pub fn scan(gcode: &str) -> Extraction {
    let mut scanner = TelemetryScanner::new();
    for line in gcode.lines() {
        scanner.feed_line(line);
    }
    scanner.finish()
}

/// Extract [`SlicerTelemetry`] from toolpath text.
pub fn extract_telemetry(gcode: &str) -> SlicerTelemetry {
    scan(gcode).telemetry
}

/// Dialect whose comments supplied the statistics, if any were recognised.
pub fn detect_dialect(gcode: &str) -> Option<TelemetryDialect> {
    scan(gcode).dialect
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cura_header_and_layers() {
        let gcode = "\
;FLAVOR:Marlin
;TIME:125
;Filament used: 1.234m
;Layer height: 0.2
;LAYER:0
G1 X10 Y10 E0.5
;LAYER:1
G1 X20 Y10 E1.0
;LAYER:2
G1 X20 Y20 E1.5
;TIME_ELAPSED:125.0
";
        let extraction = scan(gcode);
        let t = extraction.telemetry;

        assert_eq!(t.time_sec, 125.0);
        assert_relative_eq!(t.filament_mm, 1234.0, epsilon = 1e-9);
        assert_eq!(t.layer_count, 3);
        assert_eq!(extraction.dialect, Some(TelemetryDialect::Cura));
        assert_eq!(extraction.filament_source, FilamentSource::Length);
        assert!(t.is_usable());
    }

    #[test]
    fn test_prusa_mass_only() {
        let gcode = "\
;LAYER_CHANGE
;Z:0.2
G1 X1 E2
;LAYER_CHANGE
;Z:0.4
; filament used [g] = 2.98
; estimated printing time (normal mode) = 1h 2m 3s
; estimated printing time (silent mode) = 1h 10m 0s
";
        let extraction = scan(gcode);
        let t = extraction.telemetry;

        assert_eq!(t.time_sec, 3723.0);
        assert_relative_eq!(t.filament_mm, 1000.0, epsilon = 1e-9);
        assert_eq!(t.layer_count, 2);
        assert_eq!(extraction.filament_source, FilamentSource::Mass);
        assert_eq!(extraction.dialect, Some(TelemetryDialect::Prusa));
    }

    #[test]
    fn test_length_beats_mass() {
        let gcode = "; filament used [g] = 10\n; filament used [mm] = 500.0\n";
        let extraction = scan(gcode);
        assert_eq!(extraction.telemetry.filament_mm, 500.0);
        assert_eq!(extraction.filament_source, FilamentSource::Length);
    }

    #[test]
    fn test_extrusion_fallback_absolute() {
        let gcode = "\
M82
G92 E0
G1 X0 Y0 F1200
G1 X10 E4.5
G1 X20 E9.25 ; perimeter
G1 E8.5 F2400 ; retract
G0 X40
";
        let extraction = scan(gcode);
        assert_relative_eq!(extraction.telemetry.filament_mm, 9.25);
        assert_eq!(extraction.filament_source, FilamentSource::Extrusion);
        assert_eq!(extraction.telemetry.time_sec, 0.0);
        assert_eq!(extraction.telemetry.layer_count, 0);
        assert_eq!(extraction.dialect, None);
    }

    #[test]
    fn test_extrusion_across_resets() {
        let gcode = "\
G1 X1 E10
G92 E0
G1 X2 E5
G1 X3 E-1
G92 E0
g1 x4 e2.5
";
        assert_relative_eq!(extract_telemetry(gcode).filament_mm, 17.5);
    }

    #[test]
    fn test_extrusion_relative_mode() {
        let gcode = "\
M83
G1 X1 E1.5
G1 E-0.8
G1 E0.8
G1 X2 E2.0
";
        // Retract and prime cancel out.
        assert_relative_eq!(extract_telemetry(gcode).filament_mm, 3.5, epsilon = 1e-9);
    }

    #[test]
    fn test_layer_count_header_used_without_markers() {
        let gcode = ";LAYER_COUNT:57\n;Filament used: 2m\n";
        assert_eq!(extract_telemetry(gcode).layer_count, 57);

        let gcode = ";LAYER_COUNT:57\n;LAYER:0\n;LAYER:1\n";
        assert_eq!(extract_telemetry(gcode).layer_count, 2);
    }

    #[test]
    fn test_first_time_wins() {
        let gcode = ";TIME:100\n;TIME:200\n";
        assert_eq!(extract_telemetry(gcode).time_sec, 100.0);
    }

    #[test]
    fn test_empty_input_defaults_to_zero() {
        let t = extract_telemetry("");
        assert_eq!(t, SlicerTelemetry::default());
        assert!(!t.is_usable());
    }

    #[test]
    fn test_zero_filament_is_unusable() {
        let t = extract_telemetry(";TIME:300\n;Filament used: 0m\n;LAYER:0\nG1 X1 E5\n");
        assert_eq!(t.filament_mm, 0.0);
        assert_eq!(t.time_sec, 300.0);
        assert!(!t.is_usable());
    }

    #[test]
    fn test_simplify3d_file() {
        let gcode = "\
; G-Code generated by Simplify3D(R) Version 4.1.2
; layer 1, Z = 0.200
G1 X1 E1
; layer 2, Z = 0.400
G1 X2 E2
;   Build time: 0 hours 12 minutes
;   Filament length: 321.0 mm (0.32 m)
;   Plastic weight: 0.96 g (0.00 lb)
";
        let extraction = scan(gcode);
        assert_eq!(extraction.telemetry.time_sec, 720.0);
        assert_eq!(extraction.telemetry.filament_mm, 321.0);
        assert_eq!(extraction.telemetry.layer_count, 2);
        assert_eq!(extraction.dialect, Some(TelemetryDialect::Simplify3D));
    }

    #[test]
    fn test_crlf_lines() {
        let gcode = ";TIME:60\r\n;Filament used: 0.5m\r\n;LAYER:0\r\n";
        let t = extract_telemetry(gcode);
        assert_eq!(t.time_sec, 60.0);
        assert_eq!(t.filament_mm, 500.0);
        assert_eq!(t.layer_count, 1);
    }

    #[test]
    fn test_non_finite_comments_ignored() {
        let t = extract_telemetry(";TIME:1e400\n;Filament used: infm\n;LAYER:0\n");
        assert_eq!(t.time_sec, 0.0);
        assert_eq!(t.filament_mm, 0.0);
        assert!(!t.is_usable());

        let t = extract_telemetry(";TIME:1e400\n;Filament used: 1.2m\n");
        assert_eq!(t.time_sec, 0.0);
        assert_relative_eq!(t.filament_mm, 1200.0, epsilon = 1e-9);
        assert!(t.is_usable());

        let t = extract_telemetry(";TIME:100\n;Filament used: 1e400m\n");
        assert_eq!(t.time_sec, 100.0);
        assert_eq!(t.filament_mm, 0.0);
        assert!(!t.is_usable());
    }

    #[test]
    fn test_non_finite_extrusion_ignored() {
        let t = extract_telemetry("G1 X1 E2.5\nG1 X2 Einf\nG1 X3 ENaN\n");
        assert_relative_eq!(t.filament_mm, 2.5);

        let extraction = scan("M83\nG1 X1 E1e308\nG1 X2 E1e308\n");
        assert_eq!(extraction.telemetry.filament_mm, 0.0);
        assert_eq!(extraction.filament_source, FilamentSource::None);
        assert!(!extraction.telemetry.is_usable());
    }

    #[test]
    fn test_usable_requires_finite_values() {
        let usable = SlicerTelemetry {
            time_sec: 60.0,
            filament_mm: 100.0,
            layer_count: 3,
        };
        assert!(usable.is_usable());
        assert!(!SlicerTelemetry { filament_mm: f64::INFINITY, ..usable }.is_usable());
        assert!(!SlicerTelemetry { filament_mm: f64::NAN, ..usable }.is_usable());
        assert!(!SlicerTelemetry { time_sec: f64::INFINITY, ..usable }.is_usable());
    }

    #[test]
    fn test_mixed_dialect_markers_count_once() {
        let gcode = "\
;LAYER:0
G1 X1 E1
;LAYER_CHANGE
G1 X2 E2
; layer 3, Z = 0.600
G1 X3 E3
;LAYER:3
;LAYER_CHANGE
";
        let extraction = scan(gcode);
        assert_eq!(extraction.telemetry.layer_count, 5);
        assert_eq!(extraction.dialect, Some(TelemetryDialect::Cura));
    }

    #[test]
    fn test_detect_dialect() {
        assert_eq!(detect_dialect(";TIME:60\n"), Some(TelemetryDialect::Cura));
        assert_eq!(
            detect_dialect("; filament used [mm] = 10\n"),
            Some(TelemetryDialect::Prusa)
        );
        assert_eq!(
            detect_dialect(";   Build time: 1 hours 2 minutes\n"),
            Some(TelemetryDialect::Simplify3D)
        );
        assert_eq!(detect_dialect("G1 X1 E2\n"), None);
    }
}
