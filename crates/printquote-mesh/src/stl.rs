//! Binary STL reading and writing.
//!
//! Layout: 80-byte header (ignored), little-endian `u32` triangle count,
//! then 50 bytes per triangle: normal (3×f32, ignored), three vertices
//! (3×f32 each) and a 2-byte attribute word (ignored).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MeshError, Result};

/// Size of the ignored header block.
pub const HEADER_LEN: usize = 80;
/// Header plus the triangle count word.
pub const PREAMBLE_LEN: usize = HEADER_LEN + 4;
/// Bytes per triangle record.
pub const TRIANGLE_LEN: usize = 50;

/// A single facet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Vertex positions (mm, or model units before normalization).
    pub vertices: [[f32; 3]; 3],
}

impl Triangle {
    /// Create a triangle from three vertices.
    pub fn new(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Signed volume of the tetrahedron spanned by this facet and the origin.
    ///
    /// `v0 · (v1 × v2) / 6`, accumulated in `f64`.
    pub fn signed_volume(&self) -> f64 {
        let [a, b, c] = self.vertices.map(|v| v.map(f64::from));
        let cross = [
            b[1] * c[2] - b[2] * c[1],
            b[2] * c[0] - b[0] * c[2],
            b[0] * c[1] - b[1] * c[0],
        ];
        (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]) / 6.0
    }

    /// Unit facet normal, or +Z for degenerate facets.
    pub fn normal(&self) -> [f32; 3] {
        let [v0, v1, v2] = self.vertices;
        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let nx = e1[1] * e2[2] - e1[2] * e2[1];
        let ny = e1[2] * e2[0] - e1[0] * e2[2];
        let nz = e1[0] * e2[1] - e1[1] * e2[0];
        let len = (nx * nx + ny * ny + nz * nz).sqrt();
        if len > 1e-10 {
            [nx / len, ny / len, nz / len]
        } else {
            [0.0, 0.0, 1.0]
        }
    }
}

/// Triangle soup read from a binary STL. Lives for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Facets in file order.
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a mesh from facets.
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Number of facets.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Copy of this mesh with every coordinate multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let f = factor as f32;
        let triangles = self
            .triangles
            .iter()
            .map(|t| Triangle {
                vertices: t.vertices.map(|v| v.map(|c| c * f)),
            })
            .collect();
        Self { triangles }
    }

    /// Copy of this mesh translated by `offset`.
    pub fn translated(&self, offset: [f32; 3]) -> Self {
        let triangles = self
            .triangles
            .iter()
            .map(|t| Triangle {
                vertices: t
                    .vertices
                    .map(|v| [v[0] + offset[0], v[1] + offset[1], v[2] + offset[2]]),
            })
            .collect();
        Self { triangles }
    }
}

/// Parse a binary STL.
///
/// Trailing bytes after the declared triangles are ignored. A NaN or
/// infinite coordinate makes the file malformed.
pub fn parse_stl(data: &[u8]) -> Result<Mesh> {
    if data.len() < PREAMBLE_LEN {
        return Err(MeshError::TooShort(data.len()));
    }

    let declared = u32::from_le_bytes([data[80], data[81], data[82], data[83]]);
    if declared == 0 {
        return Err(MeshError::Empty);
    }

    let available = (data.len() - PREAMBLE_LEN) / TRIANGLE_LEN;
    if (declared as usize) > available {
        return Err(MeshError::Truncated {
            declared,
            available,
        });
    }

    let mut triangles = Vec::with_capacity(declared as usize);
    for (index, record) in data[PREAMBLE_LEN..]
        .chunks_exact(TRIANGLE_LEN)
        .take(declared as usize)
        .enumerate()
    {
        // Skip the 12-byte normal.
        let triangle = Triangle::new(
            read_vec3(&record[12..24]),
            read_vec3(&record[24..36]),
            read_vec3(&record[36..48]),
        );
        if !triangle.vertices.iter().flatten().all(|c| c.is_finite()) {
            return Err(MeshError::NonFinite { triangle: index });
        }
        triangles.push(triangle);
    }

    debug!(triangles = triangles.len(), bytes = data.len(), "parsed binary STL");

    Ok(Mesh { triangles })
}

fn read_vec3(bytes: &[u8]) -> [f32; 3] {
    let f = |i: usize| f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    [f(0), f(4), f(8)]
}

/// Serialize a mesh as binary STL with computed facet normals.
pub fn write_stl(mesh: &Mesh) -> Vec<u8> {
    let mut data = Vec::with_capacity(PREAMBLE_LEN + mesh.triangles.len() * TRIANGLE_LEN);

    let mut header = [b' '; HEADER_LEN];
    let tag = b"printquote binary STL";
    header[..tag.len()].copy_from_slice(tag);
    data.extend_from_slice(&header);
    data.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());

    for tri in &mesh.triangles {
        for c in tri.normal() {
            data.extend_from_slice(&c.to_le_bytes());
        }
        for v in tri.vertices {
            for c in v {
                data.extend_from_slice(&c.to_le_bytes());
            }
        }
        // Attribute byte count
        data.extend_from_slice(&[0, 0]);
    }

    data
}
