#![warn(missing_docs)]

//! Binary mesh analysis for printquote.
//!
//! Parses binary STL uploads and reduces them to a [`GeometrySummary`]:
//! enclosed volume from the signed tetrahedron sum, bounding height from
//! the highest vertex, and the facet count.
//!
//! # Example
//!
//! ```ignore
//! use printquote_mesh::analyze_mesh;
//!
//! let bytes = std::fs::read("part.stl")?;
//! let summary = analyze_mesh(&bytes)?;
//! println!("{:.1} cm³, {:.1} mm tall", summary.volume_cm3(), summary.height_mm);
//! ```

pub mod error;
pub mod geometry;
pub mod stl;

pub use error::{MeshError, Result};
pub use geometry::{analyze_approximate, analyze_mesh, summarize, Fidelity, GeometrySummary};
pub use stl::{parse_stl, write_stl, Mesh, Triangle};
