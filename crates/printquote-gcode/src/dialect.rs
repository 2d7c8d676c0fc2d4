//! Telemetry comment dialects.

use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;

/// Comment convention used by a slicing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryDialect {
    /// Ultimaker Cura / CuraEngine.
    Cura,
    /// PrusaSlicer and its forks (OrcaSlicer, Bambu Studio).
    Prusa,
    /// Simplify3D.
    Simplify3D,
}

/// A telemetry fact recognised on one comment line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Comment {
    /// Total print time (seconds).
    Time(f64),
    /// Filament length (mm).
    FilamentMm(f64),
    /// Filament mass (g).
    FilamentGrams(f64),
    /// Start of a new layer.
    LayerMarker,
    /// Layer total announced in a header.
    LayerCount(u32),
}

impl TelemetryDialect {
    /// All dialects, in matching order.
    pub const ALL: [TelemetryDialect; 3] = [
        TelemetryDialect::Cura,
        TelemetryDialect::Prusa,
        TelemetryDialect::Simplify3D,
    ];

    /// Human-readable engine name.
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryDialect::Cura => "Cura",
            TelemetryDialect::Prusa => "PrusaSlicer",
            TelemetryDialect::Simplify3D => "Simplify3D",
        }
    }

    /// Comment text that starts each layer.
    pub fn layer_marker(&self) -> &'static str {
        match self {
            TelemetryDialect::Cura => ";LAYER:",
            TelemetryDialect::Prusa => ";LAYER_CHANGE",
            TelemetryDialect::Simplify3D => "; layer ",
        }
    }

    /// Interpret a comment body (text after the leading `;`).
    pub(crate) fn classify(&self, body: &str) -> Option<Comment> {
        match self {
            TelemetryDialect::Cura => classify_cura(body),
            TelemetryDialect::Prusa => classify_prusa(body),
            TelemetryDialect::Simplify3D => classify_simplify3d(body),
        }
    }
}

fn classify_cura(body: &str) -> Option<Comment> {
    if let Some(v) = body.strip_prefix("TIME:").or_else(|| body.strip_prefix("PRINT.TIME:")) {
        return finite_number(v).map(Comment::Time);
    }
    if let Some(v) = body.strip_prefix("Filament used:") {
        // One value per extruder: "1.234m, 0.5m"
        let meters = sum_list(v, |part| part.trim_end_matches('m'))?;
        return Some(Comment::FilamentMm(meters * 1000.0));
    }
    if let Some(v) = body.strip_prefix("LAYER_COUNT:") {
        return v.trim().parse().ok().map(Comment::LayerCount);
    }
    if let Some(v) = body.strip_prefix("LAYER:") {
        return v.trim().parse::<i64>().ok().map(|_| Comment::LayerMarker);
    }
    None
}

fn classify_prusa(body: &str) -> Option<Comment> {
    let body = body.trim();
    if body == "LAYER_CHANGE" {
        return Some(Comment::LayerMarker);
    }
    if body.starts_with("estimated printing time") {
        let (_, v) = body.split_once('=')?;
        return parse_duration(v).map(Comment::Time);
    }
    if let Some((_, v)) = body.split_once("total estimated time:") {
        // "model printing time: 1h 2m; total estimated time: 1h 10m"
        return parse_duration(v).map(Comment::Time);
    }
    let (key, value) = body.split_once('=')?;
    match key.trim() {
        "filament used [mm]" => sum_list(value, |p| p).map(Comment::FilamentMm),
        "filament used [m]" => sum_list(value, |p| p).map(|m| Comment::FilamentMm(m * 1000.0)),
        "filament used [g]" | "total filament used [g]" => {
            sum_list(value, |p| p).map(Comment::FilamentGrams)
        }
        _ => None,
    }
}

fn classify_simplify3d(body: &str) -> Option<Comment> {
    let body = body.trim();
    if let Some(v) = body.strip_prefix("Build time:") {
        return parse_duration(v).map(Comment::Time);
    }
    if let Some(v) = body.strip_prefix("Filament length:") {
        return leading_number(v).map(Comment::FilamentMm);
    }
    if let Some(v) = body.strip_prefix("Plastic weight:") {
        return leading_number(v).map(Comment::FilamentGrams);
    }
    if let Some(v) = body.strip_prefix("layer ") {
        // "layer 3, Z = 0.900"
        let (index, rest) = v.split_once(',')?;
        if index.trim().parse::<u32>().is_ok() && rest.trim_start().starts_with("Z") {
            return Some(Comment::LayerMarker);
        }
    }
    None
}

/// Sum a comma separated list of numbers, after `clean` strips any unit.
fn sum_list<'a>(value: &'a str, clean: impl Fn(&'a str) -> &'a str) -> Option<f64> {
    let mut total = 0.0;
    let mut any = false;
    for part in value.split(',') {
        let part = clean(part.trim()).trim();
        if part.is_empty() {
            continue;
        }
        total += finite_number(part)?;
        any = true;
    }
    any.then_some(total).filter(|t| t.is_finite())
}

fn leading_number(value: &str) -> Option<f64> {
    finite_number(value.split_whitespace().next()?)
}

/// Parse a number, rejecting `inf`, `NaN` and literals that overflow `f64`.
fn finite_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cura_comments() {
        let d = TelemetryDialect::Cura;
        assert_eq!(d.classify("TIME:125"), Some(Comment::Time(125.0)));
        assert_eq!(d.classify("PRINT.TIME:60"), Some(Comment::Time(60.0)));
        assert_eq!(d.classify("LAYER:0"), Some(Comment::LayerMarker));
        assert_eq!(d.classify("LAYER:-2"), Some(Comment::LayerMarker));
        assert_eq!(d.classify("LAYER_COUNT:42"), Some(Comment::LayerCount(42)));
        assert_eq!(d.classify("TIME_ELAPSED:12.5"), None);
        match d.classify("Filament used: 1.5m, 0.5m") {
            Some(Comment::FilamentMm(mm)) => assert!((mm - 2000.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_prusa_comments() {
        let d = TelemetryDialect::Prusa;
        assert_eq!(d.classify("LAYER_CHANGE"), Some(Comment::LayerMarker));
        assert_eq!(
            d.classify(" estimated printing time (normal mode) = 1h 2m 3s"),
            Some(Comment::Time(3723.0))
        );
        assert_eq!(
            d.classify(" model printing time: 50m; total estimated time: 1h 0m 10s"),
            Some(Comment::Time(3610.0))
        );
        assert_eq!(
            d.classify(" filament used [mm] = 1000.5, 20"),
            Some(Comment::FilamentMm(1020.5))
        );
        assert_eq!(
            d.classify(" filament used [g] = 3.5"),
            Some(Comment::FilamentGrams(3.5))
        );
        assert_eq!(d.classify(" filament used [cm3] = 2.1"), None);
        assert_eq!(d.classify(" layer_height = 0.2"), None);
    }

    #[test]
    fn test_simplify3d_comments() {
        let d = TelemetryDialect::Simplify3D;
        assert_eq!(
            d.classify("   Build time: 1 hours 23 minutes"),
            Some(Comment::Time(4980.0))
        );
        assert_eq!(
            d.classify("   Filament length: 2154.3 mm (2.15 m)"),
            Some(Comment::FilamentMm(2154.3))
        );
        assert_eq!(
            d.classify("   Plastic weight: 6.42 g (0.01 lb)"),
            Some(Comment::FilamentGrams(6.42))
        );
        assert_eq!(d.classify(" layer 3, Z = 0.900"), Some(Comment::LayerMarker));
        assert_eq!(d.classify(" layer height = 0.2"), None);
    }

    #[test]
    fn test_non_finite_values_ignored() {
        let cura = TelemetryDialect::Cura;
        assert_eq!(cura.classify("TIME:1e400"), None);
        assert_eq!(cura.classify("TIME:NaN"), None);
        assert_eq!(cura.classify("Filament used: infm"), None);
        assert_eq!(cura.classify("Filament used: 1.2m, 1e400m"), None);

        let prusa = TelemetryDialect::Prusa;
        assert_eq!(prusa.classify(" filament used [mm] = inf"), None);
        assert_eq!(prusa.classify(" filament used [g] = 1e308, 1e308"), None);

        let s3d = TelemetryDialect::Simplify3D;
        assert_eq!(s3d.classify("   Filament length: nan mm"), None);
        assert_eq!(s3d.classify("   Plastic weight: -inf g"), None);
    }

    #[test]
    fn test_layer_markers() {
        for dialect in TelemetryDialect::ALL {
            assert!(dialect.layer_marker().starts_with(';'));
            assert!(!dialect.name().is_empty());
        }
    }
}
