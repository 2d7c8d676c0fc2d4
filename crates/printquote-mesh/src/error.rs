//! Error types for mesh parsing.

use thiserror::Error;

/// Errors that can occur while reading a binary STL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// Input ends before the 84-byte header and count.
    #[error("mesh data too short: {0} bytes, need at least 84")]
    TooShort(usize),

    /// Declared triangle count needs more bytes than are present.
    #[error("mesh truncated: header declares {declared} triangles but only {available} fit")]
    Truncated {
        /// Triangle count from the header.
        declared: u32,
        /// Complete triangles present in the payload.
        available: usize,
    },

    /// Header declares zero triangles.
    #[error("mesh is empty")]
    Empty,

    /// A vertex coordinate is NaN or infinite.
    #[error("mesh has a non-finite vertex in triangle {triangle}")]
    NonFinite {
        /// Zero-based index of the offending triangle.
        triangle: usize,
    },
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
