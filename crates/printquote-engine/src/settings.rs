//! Engine settings loaded from TOML.
//!
//! ```toml
//! calibration_profile = "legacy-v1"
//! allow_approximate_geometry = false
//!
//! [slicer]
//! kind = "cura_engine"
//! executable = "/usr/bin/CuraEngine"
//! definition = "/usr/share/cura/resources/definitions/fdmprinter.def.json"
//! machine = "ender3"
//! timeout_secs = 120
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use printquote_estimate::{CalibrationProfile, LEGACY_V1};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SettingsError;
use crate::invoker::{ExternalSlicer, SlicerKind, DEFAULT_TIMEOUT};
use crate::machine::MachineProfile;

/// Environment variable overriding the slicer executable.
pub const ENV_SLICER: &str = "PRINTQUOTE_SLICER";
/// Environment variable overriding the slicer timeout (seconds).
pub const ENV_SLICER_TIMEOUT: &str = "PRINTQUOTE_SLICER_TIMEOUT";

/// External slicer section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerSettings {
    /// Engine kind.
    pub kind: SlicerKind,
    /// Executable path or name on `PATH`.
    pub executable: PathBuf,
    /// Printer definition file.
    pub definition: Option<PathBuf>,
    /// Built-in machine profile id.
    pub machine: String,
    /// Hard limit on one run (seconds).
    pub timeout_secs: u64,
    /// Parent directory for per-request scratch directories.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for SlicerSettings {
    fn default() -> Self {
        Self {
            kind: SlicerKind::CuraEngine,
            executable: PathBuf::from("CuraEngine"),
            definition: None,
            machine: "generic".into(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            scratch_dir: None,
        }
    }
}

/// Settings for the estimation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// External slicer; `None` means heuristic only.
    pub slicer: Option<SlicerSettings>,
    /// Built-in calibration profile name.
    pub calibration_profile: String,
    /// Inline calibration profile, used instead of `calibration_profile`.
    pub calibration: Option<CalibrationProfile>,
    /// Degrade unparseable meshes to a size-based approximation.
    pub allow_approximate_geometry: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            slicer: None,
            calibration_profile: LEGACY_V1.into(),
            calibration: None,
            allow_approximate_geometry: false,
        }
    }
}

impl EngineSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded engine settings");
        Self::from_toml_str(&text)
    }

    /// Apply `PRINTQUOTE_SLICER` and `PRINTQUOTE_SLICER_TIMEOUT` from the
    /// process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`.
    ///
    /// An executable override enables the slicer if the settings had none.
    /// Unparseable timeouts are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(exe) = lookup(ENV_SLICER).filter(|v| !v.trim().is_empty()) {
            self.slicer.get_or_insert_with(SlicerSettings::default).executable = exe.into();
        }
        if let Some(secs) = lookup(ENV_SLICER_TIMEOUT).and_then(|v| v.trim().parse().ok()) {
            if let Some(slicer) = self.slicer.as_mut() {
                slicer.timeout_secs = secs;
            }
        }
    }

    /// The active calibration profile.
    pub fn calibration(&self) -> Result<CalibrationProfile, SettingsError> {
        let profile = match &self.calibration {
            Some(inline) => inline.clone(),
            None => CalibrationProfile::by_name(&self.calibration_profile)?,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Build the configured slicer, if any.
    pub fn build_slicer(&self) -> Result<Option<ExternalSlicer>, SettingsError> {
        let Some(cfg) = &self.slicer else {
            return Ok(None);
        };
        let machine = MachineProfile::by_id(&cfg.machine)
            .ok_or_else(|| SettingsError::UnknownMachine(cfg.machine.clone()))?;

        let mut slicer = ExternalSlicer::new(cfg.kind, cfg.executable.clone())
            .with_machine(machine)
            .with_timeout(Duration::from_secs(cfg.timeout_secs));
        if let Some(definition) = &cfg.definition {
            slicer = slicer.with_definition(definition.clone());
        }
        if let Some(root) = &cfg.scratch_dir {
            slicer = slicer.with_scratch_root(root.clone());
        }
        Ok(Some(slicer))
    }
}
