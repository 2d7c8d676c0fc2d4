//! Error types for the engine.

use std::path::PathBuf;
use std::time::Duration;

use printquote_estimate::ConfigError;
use printquote_mesh::MeshError;
use thiserror::Error;

/// Errors from running an external slicing engine.
///
/// None of these fail a request on their own; the pipeline falls back to
/// the heuristic estimator.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// The engine could not be started.
    #[error("failed to start slicer {program}: {source}")]
    Spawn {
        /// Executable path.
        program: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit or no usable toolpath.
    #[error("slicing failed: {0}")]
    SlicingFailed(String),

    /// The engine ran past its time limit and was killed.
    #[error("slicer timed out after {0:?}")]
    Timeout(Duration),

    /// Scratch directory I/O.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that fail an estimation request.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Mesh could not be parsed.
    #[error("failed to parse mesh: {0}")]
    Parse(#[from] MeshError),

    /// Print configuration is invalid.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
}

impl PipelineError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Parse(_) => "parse_error",
            PipelineError::Configuration(_) => "configuration_error",
        }
    }
}

/// Errors from loading engine settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("failed to read settings {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for this schema.
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// Unknown machine profile name.
    #[error("unknown machine profile: {0}")]
    UnknownMachine(String),

    /// Calibration selection failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from the materials catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Backing file I/O.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file is not a valid catalog.
    #[error("invalid catalog: {0}")]
    Json(#[from] serde_json::Error),

    /// A lock was poisoned by a panicking writer.
    #[error("catalog lock poisoned")]
    Poisoned,
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
