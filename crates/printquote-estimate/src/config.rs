//! Print configuration built from request parameters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Support structure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    /// No support.
    #[default]
    None,
    /// Support touching the build plate only.
    Buildplate,
    /// Support everywhere, including on the model.
    Everywhere,
}

/// Bed adhesion helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adhesion {
    /// Nothing.
    None,
    /// Skirt loops around the part.
    #[default]
    Skirt,
    /// Brim attached to the first layer.
    Brim,
    /// Full raft under the part.
    Raft,
}

/// Model units of the uploaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    /// Millimetres.
    #[default]
    Mm,
    /// Inches.
    Inches,
}

impl Units {
    /// Millimetres per model unit.
    pub fn to_mm(&self) -> f64 {
        match self {
            Units::Mm => 1.0,
            Units::Inches => MM_PER_INCH,
        }
    }
}

macro_rules! keyword_enum {
    ($ty:ty { $($text:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    _ => Err(ConfigError::InvalidValue {
                        key: stringify!($ty).to_ascii_lowercase(),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

keyword_enum!(Support {
    "none" => Support::None,
    "buildplate" => Support::Buildplate,
    "everywhere" => Support::Everywhere,
});

keyword_enum!(Adhesion {
    "none" => Adhesion::None,
    "skirt" => Adhesion::Skirt,
    "brim" => Adhesion::Brim,
    "raft" => Adhesion::Raft,
});

keyword_enum!(Units {
    "mm" => Units::Mm,
    "inches" => Units::Inches,
    "in" => Units::Inches,
});

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Units::Mm => "mm",
            Units::Inches => "inches",
        })
    }
}

/// Print parameters for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfiguration {
    /// Layer height (mm).
    pub layer_height: f64,
    /// Infill density (percent, 0 to 100).
    pub infill_percent: f64,
    /// Number of perimeter walls.
    pub wall_count: u32,
    /// Solid top layers.
    pub top_layers: u32,
    /// Solid bottom layers.
    pub bottom_layers: u32,
    /// General print speed (mm/s).
    pub print_speed: f64,
    /// Infill speed (mm/s).
    pub infill_speed: f64,
    /// Wall speed (mm/s).
    pub wall_speed: f64,
    /// Nozzle diameter (mm).
    pub nozzle_diameter: f64,
    /// Filament diameter (mm).
    pub filament_diameter: f64,
    /// Support mode.
    pub support: Support,
    /// Adhesion helper.
    pub adhesion: Adhesion,
    /// Units of the mesh coordinates.
    pub units: Units,
    /// Uniform scale (percent).
    pub scale_percent: f64,
}

impl Default for PrintConfiguration {
    fn default() -> Self {
        Self {
            layer_height: 0.2,
            infill_percent: 15.0,
            wall_count: 3,
            top_layers: 4,
            bottom_layers: 4,
            print_speed: 150.0,
            infill_speed: 150.0,
            wall_speed: 150.0,
            nozzle_diameter: 0.4,
            filament_diameter: 1.75,
            support: Support::None,
            adhesion: Adhesion::Skirt,
            units: Units::Mm,
            scale_percent: 100.0,
        }
    }
}

fn positive(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl PrintConfiguration {
    /// Build a configuration from request parameters.
    ///
    /// Missing keys keep their defaults and unknown keys are ignored. When
    /// `infill_speed` or `wall_speed` is absent it follows `print_speed`.
    /// The result is validated.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self> {
        let mut config = Self::default();
        let mut infill_speed = None;
        let mut wall_speed = None;

        for (key, value) in params {
            match key.as_str() {
                "layer_height" => config.layer_height = parse_value(key, value)?,
                "infill" | "infill_percent" => config.infill_percent = parse_value(key, value)?,
                "wall_count" | "walls" => config.wall_count = parse_value(key, value)?,
                "top_layers" => config.top_layers = parse_value(key, value)?,
                "bottom_layers" => config.bottom_layers = parse_value(key, value)?,
                "print_speed" => config.print_speed = parse_value(key, value)?,
                "infill_speed" => infill_speed = Some(parse_value(key, value)?),
                "wall_speed" => wall_speed = Some(parse_value(key, value)?),
                "nozzle_diameter" => config.nozzle_diameter = parse_value(key, value)?,
                "filament_diameter" => config.filament_diameter = parse_value(key, value)?,
                "support" => config.support = value.parse()?,
                "adhesion" => config.adhesion = value.parse()?,
                "units" => config.units = value.parse()?,
                "scale" | "scale_percent" => config.scale_percent = parse_value(key, value)?,
                _ => {}
            }
        }

        config.infill_speed = infill_speed.unwrap_or(config.print_speed);
        config.wall_speed = wall_speed.unwrap_or(config.print_speed);
        config.validate()?;
        Ok(config)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !positive(self.layer_height) {
            return Err(ConfigError::InvalidSettings(
                "layer_height must be positive".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.infill_percent) {
            return Err(ConfigError::InvalidSettings(
                "infill must be between 0 and 100".into(),
            ));
        }
        for (name, speed) in [
            ("print_speed", self.print_speed),
            ("infill_speed", self.infill_speed),
            ("wall_speed", self.wall_speed),
        ] {
            if !positive(speed) {
                return Err(ConfigError::InvalidSettings(format!(
                    "{name} must be positive"
                )));
            }
        }
        if !positive(self.nozzle_diameter) {
            return Err(ConfigError::InvalidSettings(
                "nozzle_diameter must be positive".into(),
            ));
        }
        if !positive(self.filament_diameter) {
            return Err(ConfigError::InvalidSettings(
                "filament_diameter must be positive".into(),
            ));
        }
        if !positive(self.scale_percent) {
            return Err(ConfigError::InvalidSettings(
                "scale must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Combined unit and percent scale applied to mesh coordinates.
    pub fn scale_factor(&self) -> f64 {
        self.units.to_mm() * self.scale_percent / 100.0
    }

    /// Mean of the print, infill and wall speeds (mm/s).
    pub fn average_speed(&self) -> f64 {
        (self.print_speed + self.infill_speed + self.wall_speed) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = PrintConfiguration::from_params(&BTreeMap::new()).unwrap();
        assert_eq!(config, PrintConfiguration::default());
        assert_eq!(config.scale_factor(), 1.0);
        assert_eq!(config.average_speed(), 150.0);
    }

    #[test]
    fn test_from_params() {
        let config = PrintConfiguration::from_params(&params(&[
            ("layer_height", "0.12"),
            ("infill", "40"),
            ("print_speed", "60"),
            ("wall_speed", "30"),
            ("support", "Everywhere"),
            ("adhesion", "brim"),
            ("units", "inches"),
            ("scale", "50"),
            ("color", "red"),
        ]))
        .unwrap();

        assert_eq!(config.layer_height, 0.12);
        assert_eq!(config.infill_percent, 40.0);
        assert_eq!(config.print_speed, 60.0);
        assert_eq!(config.infill_speed, 60.0);
        assert_eq!(config.wall_speed, 30.0);
        assert_eq!(config.support, Support::Everywhere);
        assert_eq!(config.adhesion, Adhesion::Brim);
        assert_eq!(config.units, Units::Inches);
        assert!((config.scale_factor() - 12.7).abs() < 1e-12);
    }

    #[test]
    fn test_unparseable_value() {
        let err = PrintConfiguration::from_params(&params(&[("layer_height", "thin")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "layer_height".into(),
                value: "thin".into()
            }
        );

        let err = PrintConfiguration::from_params(&params(&[("support", "trees")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_rejects_non_positive() {
        for (key, value) in [
            ("layer_height", "0"),
            ("layer_height", "-0.2"),
            ("print_speed", "0"),
            ("infill_speed", "-5"),
            ("wall_speed", "0"),
            ("nozzle_diameter", "0"),
            ("filament_diameter", "0"),
            ("scale", "0"),
            ("infill", "101"),
            ("infill", "-1"),
        ] {
            let result = PrintConfiguration::from_params(&params(&[(key, value)]));
            assert!(
                matches!(result, Err(ConfigError::InvalidSettings(_))),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_nan_rejected() {
        let config = PrintConfiguration {
            layer_height: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_units_display() {
        assert_eq!(Units::Inches.to_string(), "inches");
        assert_eq!("IN".parse::<Units>().unwrap(), Units::Inches);
    }
}
