//! Bounded invocation of an external slicing engine.
//!
//! Each call gets its own scratch directory holding `model.stl` and the
//! engine's `output.gcode`. The directory is removed when the call returns,
//! whether the engine succeeded, failed, or was killed on timeout.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use printquote_estimate::{Adhesion, PrintConfiguration, Support};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, SlicerError};
use crate::machine::MachineProfile;

/// Default hard limit on a slicing run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest diagnostic text carried in a [`SlicerError::SlicingFailed`].
pub const MAX_DIAGNOSTIC_LEN: usize = 2048;

/// File name of the model inside the scratch directory.
pub const MODEL_FILE: &str = "model.stl";
/// File name of the toolpath inside the scratch directory.
pub const OUTPUT_FILE: &str = "output.gcode";

/// Supported slicing engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlicerKind {
    /// CuraEngine command-line backend.
    #[default]
    CuraEngine,
    /// PrusaSlicer console mode.
    PrusaSlicer,
}

impl SlicerKind {
    /// Engine name for logs and health reports.
    pub fn name(&self) -> &'static str {
        match self {
            SlicerKind::CuraEngine => "CuraEngine",
            SlicerKind::PrusaSlicer => "PrusaSlicer",
        }
    }
}

/// Toolpath produced by a successful run.
#[derive(Debug, Clone)]
pub struct Toolpath {
    /// G-code text.
    pub gcode: String,
    /// Wall-clock duration of the engine run.
    pub elapsed: Duration,
}

/// An external slicing engine and how to call it.
#[derive(Debug, Clone)]
pub struct ExternalSlicer {
    kind: SlicerKind,
    executable: PathBuf,
    definition: Option<PathBuf>,
    machine: MachineProfile,
    timeout: Duration,
    scratch_root: Option<PathBuf>,
}

impl ExternalSlicer {
    /// Create an invoker for `executable`.
    pub fn new(kind: SlicerKind, executable: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            executable: executable.into(),
            definition: None,
            machine: MachineProfile::default(),
            timeout: DEFAULT_TIMEOUT,
            scratch_root: None,
        }
    }

    /// Set the run time limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the machine profile.
    pub fn with_machine(mut self, machine: MachineProfile) -> Self {
        self.machine = machine;
        self
    }

    /// Set the printer definition file (CuraEngine `-j`, PrusaSlicer `--load`).
    pub fn with_definition(mut self, definition: impl Into<PathBuf>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Engine kind.
    pub fn kind(&self) -> SlicerKind {
        self.kind
    }

    /// Executable path.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Machine profile.
    pub fn machine(&self) -> &MachineProfile {
        &self.machine
    }

    /// Run time limit.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Command-line arguments for one run.
    pub fn arguments(
        &self,
        config: &PrintConfiguration,
        model: &Path,
        output: &Path,
    ) -> Vec<OsString> {
        match self.kind {
            SlicerKind::CuraEngine => self.cura_arguments(config, model, output),
            SlicerKind::PrusaSlicer => self.prusa_arguments(config, model, output),
        }
    }

    fn cura_arguments(
        &self,
        config: &PrintConfiguration,
        model: &Path,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["slice".into()];
        if let Some(definition) = &self.definition {
            args.push("-j".into());
            args.push(definition.into());
        }
        args.push("-o".into());
        args.push(output.into());

        let (support_enable, support_type) = match config.support {
            Support::None => ("false", "buildplate"),
            Support::Buildplate => ("true", "buildplate"),
            Support::Everywhere => ("true", "everywhere"),
        };
        let adhesion = match config.adhesion {
            Adhesion::None => "none",
            Adhesion::Skirt => "skirt",
            Adhesion::Brim => "brim",
            Adhesion::Raft => "raft",
        };

        let settings = [
            ("layer_height", config.layer_height.to_string()),
            ("infill_sparse_density", config.infill_percent.to_string()),
            ("speed_print", config.print_speed.to_string()),
            ("speed_infill", config.infill_speed.to_string()),
            ("speed_wall", config.wall_speed.to_string()),
            ("machine_nozzle_size", config.nozzle_diameter.to_string()),
            ("material_diameter", config.filament_diameter.to_string()),
            ("wall_line_count", config.wall_count.to_string()),
            ("top_layers", config.top_layers.to_string()),
            ("bottom_layers", config.bottom_layers.to_string()),
            ("support_enable", support_enable.to_string()),
            ("support_type", support_type.to_string()),
            ("adhesion_type", adhesion.to_string()),
            ("machine_width", self.machine.bed_x.to_string()),
            ("machine_depth", self.machine.bed_y.to_string()),
            ("machine_height", self.machine.bed_z.to_string()),
            ("machine_heated_bed", self.machine.heated_bed.to_string()),
        ];
        for (key, value) in settings {
            args.push("-s".into());
            args.push(format!("{key}={value}").into());
        }

        args.push("-l".into());
        args.push(model.into());
        args
    }

    fn prusa_arguments(
        &self,
        config: &PrintConfiguration,
        model: &Path,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--export-gcode".into()];
        if let Some(definition) = &self.definition {
            args.push("--load".into());
            args.push(definition.into());
        }

        let (x, y) = (self.machine.bed_x, self.machine.bed_y);
        let options = [
            ("--layer-height", config.layer_height.to_string()),
            ("--fill-density", format!("{}%", config.infill_percent)),
            ("--perimeters", config.wall_count.to_string()),
            ("--top-solid-layers", config.top_layers.to_string()),
            ("--bottom-solid-layers", config.bottom_layers.to_string()),
            ("--solid-infill-speed", config.print_speed.to_string()),
            ("--infill-speed", config.infill_speed.to_string()),
            ("--perimeter-speed", config.wall_speed.to_string()),
            ("--nozzle-diameter", config.nozzle_diameter.to_string()),
            ("--filament-diameter", config.filament_diameter.to_string()),
            ("--bed-shape", format!("0x0,{x}x0,{x}x{y},0x{y}")),
            ("--max-print-height", self.machine.bed_z.to_string()),
        ];
        for (flag, value) in options {
            args.push(flag.into());
            args.push(value.into());
        }

        match config.support {
            Support::None => {}
            Support::Buildplate => {
                args.push("--support-material".into());
                args.push("--support-material-buildplate-only".into());
            }
            Support::Everywhere => args.push("--support-material".into()),
        }
        let adhesion: &[&str] = match config.adhesion {
            Adhesion::None => &["--skirts", "0"],
            Adhesion::Skirt => &["--skirts", "1"],
            Adhesion::Brim => &["--skirts", "0", "--brim-width", "5"],
            Adhesion::Raft => &["--skirts", "0", "--raft-layers", "3"],
        };
        args.extend(adhesion.iter().map(OsString::from));

        args.push("--output".into());
        args.push(output.into());
        args.push(model.into());
        args
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("printquote-");
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    /// Slice a binary STL and return the toolpath text.
    ///
    /// The mesh must already be in millimetres at its final scale. The child
    /// is killed if it outlives the timeout.
    pub async fn slice(&self, mesh_stl: &[u8], config: &PrintConfiguration) -> Result<Toolpath> {
        let scratch = self.scratch_dir()?;
        let model = scratch.path().join(MODEL_FILE);
        let output = scratch.path().join(OUTPUT_FILE);
        tokio::fs::write(&model, mesh_stl).await?;

        let mut command = Command::new(&self.executable);
        command
            .args(self.arguments(config, &model, &output))
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(
            slicer = self.kind.name(),
            program = %self.executable.display(),
            timeout_secs = self.timeout.as_secs_f64(),
            "starting slicer"
        );
        let started = Instant::now();
        let child = command.spawn().map_err(|source| SlicerError::Spawn {
            program: self.executable.clone(),
            source,
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let finished = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    slicer = self.kind.name(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "slicer timed out, process killed"
                );
                return Err(SlicerError::Timeout(self.timeout));
            }
        };
        let elapsed = started.elapsed();

        if !finished.status.success() {
            let diagnostic = bounded_diagnostic(&finished.stderr, &finished.stdout);
            warn!(status = %finished.status, %diagnostic, "slicer exited with failure");
            return Err(SlicerError::SlicingFailed(format!(
                "{} exited with {}: {}",
                self.kind.name(),
                finished.status,
                diagnostic
            )));
        }

        let gcode = match tokio::fs::read(&output).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SlicerError::SlicingFailed(format!(
                    "{} produced no toolpath: {}",
                    self.kind.name(),
                    bounded_diagnostic(&finished.stderr, &finished.stdout)
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if gcode.trim().is_empty() {
            return Err(SlicerError::SlicingFailed(format!(
                "{} produced an empty toolpath",
                self.kind.name()
            )));
        }

        debug!(
            bytes = gcode.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            scratch = %scratch.path().display(),
            "slicer finished"
        );

        Ok(Toolpath { gcode, elapsed })
    }
}

/// Slice `mesh_stl` with `slicer`, bounded by `timeout`.
pub async fn invoke_slicer(
    slicer: &ExternalSlicer,
    mesh_stl: &[u8],
    config: &PrintConfiguration,
    timeout: Duration,
) -> Result<String> {
    let bounded = slicer.clone().with_timeout(timeout);
    Ok(bounded.slice(mesh_stl, config).await?.gcode)
}

/// Tail of the process output, at most [`MAX_DIAGNOSTIC_LEN`] bytes.
///
/// Prefers stderr; falls back to stdout when stderr is empty.
fn bounded_diagnostic(stderr: &[u8], stdout: &[u8]) -> String {
    let raw = if stderr.iter().all(u8::is_ascii_whitespace) {
        stdout
    } else {
        stderr
    };
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.len() <= MAX_DIAGNOSTIC_LEN {
        return text.to_string();
    }
    let mut start = text.len() - MAX_DIAGNOSTIC_LEN;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_cura_arguments() {
        let slicer = ExternalSlicer::new(SlicerKind::CuraEngine, "/usr/bin/CuraEngine")
            .with_definition("/opt/cura/fdmprinter.def.json")
            .with_machine(MachineProfile::prusa_mk4());
        let config = PrintConfiguration {
            support: Support::Everywhere,
            adhesion: Adhesion::Brim,
            ..Default::default()
        };
        let args = args_as_strings(slicer.arguments(
            &config,
            Path::new("/tmp/x/model.stl"),
            Path::new("/tmp/x/output.gcode"),
        ));

        assert_eq!(args[0], "slice");
        assert_eq!(&args[1..3], ["-j", "/opt/cura/fdmprinter.def.json"]);
        assert_eq!(&args[3..5], ["-o", "/tmp/x/output.gcode"]);
        assert!(args.contains(&"layer_height=0.2".to_string()));
        assert!(args.contains(&"infill_sparse_density=15".to_string()));
        assert!(args.contains(&"support_enable=true".to_string()));
        assert!(args.contains(&"support_type=everywhere".to_string()));
        assert!(args.contains(&"adhesion_type=brim".to_string()));
        assert!(args.contains(&"machine_width=250".to_string()));
        assert!(args.contains(&"machine_depth=210".to_string()));
        assert_eq!(&args[args.len() - 2..], ["-l", "/tmp/x/model.stl"]);
    }

    #[test]
    fn test_prusa_arguments() {
        let slicer = ExternalSlicer::new(SlicerKind::PrusaSlicer, "prusa-slicer");
        let config = PrintConfiguration {
            support: Support::Buildplate,
            adhesion: Adhesion::Raft,
            infill_percent: 20.0,
            ..Default::default()
        };
        let args = args_as_strings(slicer.arguments(
            &config,
            Path::new("model.stl"),
            Path::new("output.gcode"),
        ));

        assert_eq!(args[0], "--export-gcode");
        assert!(args.windows(2).any(|w| w == ["--fill-density", "20%"]));
        assert!(args.windows(2).any(|w| w == ["--bed-shape", "0x0,220x0,220x220,0x220"]));
        assert!(args.contains(&"--support-material-buildplate-only".to_string()));
        assert!(args.windows(2).any(|w| w == ["--raft-layers", "3"]));
        assert_eq!(args.last().map(String::as_str), Some("model.stl"));
    }

    #[test]
    fn test_builder_defaults() {
        let slicer = ExternalSlicer::new(SlicerKind::CuraEngine, "CuraEngine");
        assert_eq!(slicer.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(slicer.machine(), &MachineProfile::generic());
        assert_eq!(slicer.kind().name(), "CuraEngine");
        assert_eq!(slicer.executable(), Path::new("CuraEngine"));
    }

    #[test]
    fn test_bounded_diagnostic() {
        assert_eq!(bounded_diagnostic(b"  boom \n", b"ignored"), "boom");
        assert_eq!(bounded_diagnostic(b"\n", b"from stdout"), "from stdout");

        let long = "x".repeat(MAX_DIAGNOSTIC_LEN * 2) + "tail";
        let diag = bounded_diagnostic(long.as_bytes(), b"");
        assert!(diag.len() <= MAX_DIAGNOSTIC_LEN + 3);
        assert!(diag.ends_with("tail"));
        assert!(diag.starts_with("..."));
    }
}
