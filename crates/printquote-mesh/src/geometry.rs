//! Enclosed volume and bounding height.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::stl::{parse_stl, Mesh, PREAMBLE_LEN, TRIANGLE_LEN};

/// How a [`GeometrySummary`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    /// Integrated from parsed facets.
    #[default]
    Exact,
    /// Estimated from file size alone.
    Approximate,
}

/// Geometry derived once per request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometrySummary {
    /// Enclosed volume (mm³).
    pub volume_mm3: f64,
    /// Maximum vertex Z, never negative (mm).
    pub height_mm: f64,
    /// Number of facets.
    pub triangle_count: u32,
    /// Exact or degraded analysis.
    pub fidelity: Fidelity,
}

impl GeometrySummary {
    /// Volume in cm³.
    pub fn volume_cm3(&self) -> f64 {
        self.volume_mm3 / 1000.0
    }

    /// Apply a linear scale: volume by `factor³`, height by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            volume_mm3: self.volume_mm3 * factor.powi(3),
            height_mm: self.height_mm * factor,
            ..*self
        }
    }
}

/// Summarize a parsed mesh.
///
/// The tetrahedron sum is origin independent for closed, consistently
/// wound meshes; the absolute value makes it independent of winding.
pub fn summarize(mesh: &Mesh) -> GeometrySummary {
    let mut signed = 0.0f64;
    let mut max_z = f64::NEG_INFINITY;

    for tri in &mesh.triangles {
        signed += tri.signed_volume();
        for v in &tri.vertices {
            max_z = max_z.max(f64::from(v[2]));
        }
    }

    if signed < 0.0 {
        debug!(signed_volume = signed, "mesh is wound inside-out");
    }

    GeometrySummary {
        volume_mm3: signed.abs(),
        height_mm: max_z.max(0.0),
        triangle_count: mesh.triangle_count() as u32,
        fidelity: Fidelity::Exact,
    }
}

/// Parse a binary STL and summarize it.
pub fn analyze_mesh(data: &[u8]) -> Result<GeometrySummary> {
    let mesh = parse_stl(data)?;
    Ok(summarize(&mesh))
}

/// Floor applied to the size-derived triangle count.
const APPROX_MIN_TRIANGLES: usize = 100;
/// Volume credited per triangle (cm³).
const APPROX_CM3_PER_TRIANGLE: f64 = 0.01;

/// Low-fidelity estimate from the byte length alone.
///
/// Results carry [`Fidelity::Approximate`].
pub fn analyze_approximate(byte_len: usize) -> GeometrySummary {
    let triangles = (byte_len.saturating_sub(PREAMBLE_LEN) / TRIANGLE_LEN).max(APPROX_MIN_TRIANGLES);
    let volume_cm3 = triangles as f64 * APPROX_CM3_PER_TRIANGLE;
    let height_mm = volume_cm3.powf(0.33) * 10.0;

    warn!(
        bytes = byte_len,
        triangles, "using size-based geometry approximation"
    );

    GeometrySummary {
        volume_mm3: volume_cm3 * 1000.0,
        height_mm,
        triangle_count: triangles as u32,
        fidelity: Fidelity::Approximate,
    }
}
