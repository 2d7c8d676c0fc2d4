#![warn(missing_docs)]

//! Slicer invocation and estimation pipeline for printquote.
//!
//! The [`Pipeline`] takes binary STL bytes and a
//! [`PrintConfiguration`](printquote_estimate::PrintConfiguration), runs the
//! configured [`ExternalSlicer`] under a time limit, and reads print time,
//! filament and layer count back out of the toolpath. When no slicer is
//! configured, or it fails, times out or reports no filament, the result
//! comes from the geometry heuristic instead. Every result is tagged with
//! the strategy that produced it.
//!
//! # Example
//!
//! ```ignore
//! use printquote_engine::{EngineSettings, Pipeline};
//! use printquote_estimate::PrintConfiguration;
//!
//! let settings = EngineSettings::load("printquote.toml".as_ref())?;
//! let pipeline = Pipeline::from_settings(&settings)?;
//! let result = pipeline.run(&stl_bytes, &PrintConfiguration::default()).await?;
//! println!("{} min via {}", result.print_time_min, result.source);
//! ```

pub mod catalog;
pub mod error;
pub mod invoker;
pub mod machine;
pub mod pipeline;
pub mod response;
pub mod settings;

pub use catalog::{InMemoryMaterialStore, JsonFileMaterialStore, Material, MaterialStore};
pub use error::{CatalogError, PipelineError, Result, SettingsError, SlicerError};
pub use invoker::{invoke_slicer, ExternalSlicer, SlicerKind, Toolpath, DEFAULT_TIMEOUT};
pub use machine::MachineProfile;
pub use pipeline::{run_pipeline, FallbackReason, Pipeline, PipelineReport, PipelineState};
pub use response::{EstimateBody, EstimateResponse};
pub use settings::{EngineSettings, SlicerSettings, ENV_SLICER, ENV_SLICER_TIMEOUT};
