//! Vector primitives, oriented planes and the canonical point sets.
//!
//! Vectors are plain `nalgebra::Vector3<f64>` values, which already provide
//! dot, cross, norm and the arithmetic operators. This module adds the few
//! pieces with renderer-specific semantics:
//! - [`safe_normalize`], which leaves near-zero vectors untouched
//! - [`Plane`], an outward-facing half-space `dot(n, p) <= d`
//! - [`Solid`], the catalogue of convex point sets the renderer can display

use std::fmt;

use nalgebra::Vector3;
use serde::Deserialize;

use crate::config::GEOM_TOLERANCE;


/// The golden ratio.
pub const PHI: f64 = 1.618_033_988_749_895;

/// Normalises `v`, returning it unchanged if its length is below
/// [`GEOM_TOLERANCE`].
pub fn safe_normalize(v: &Vector3<f64>) -> Vector3<f64> {
    let len = v.norm();
    if len < GEOM_TOLERANCE {
        return *v;
    }
    v / len
}

/// An oriented plane bounding a convex solid.
///
/// A point `p` is inside the half-space when `normal · p <= offset`, so the
/// normal always points out of the solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl Plane {
    pub fn new(normal: Vector3<f64>, offset: f64) -> Self {
        Self { normal, offset }
    }

    /// Positive outside the half-space, negative inside.
    pub fn signed_distance(&self, point: &Vector3<f64>) -> f64 {
        self.normal.dot(point) - self.offset
    }

    pub fn contains(&self, point: &Vector3<f64>, tolerance: f64) -> bool {
        self.signed_distance(point) <= tolerance
    }

    /// Same face seen from the other side.
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            offset: -self.offset,
        }
    }
}

/// Convex solids with a known vertex construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Solid {
    #[default]
    Dodecahedron,
    Cube,
    Octahedron,
    Icosahedron,
}

impl Solid {
    /// Vertices centred on the origin, before any model scaling.
    pub fn vertices(&self) -> Vec<Vector3<f64>> {
        match self {
            Solid::Dodecahedron => {
                let inv = 1.0 / PHI;
                let mut vertices = Vec::with_capacity(20);
                for x in [-1.0, 1.0] {
                    for y in [-1.0, 1.0] {
                        for z in [-1.0, 1.0] {
                            vertices.push(Vector3::new(x, y, z));
                        }
                    }
                }
                for (a, b) in [(-inv, -PHI), (-inv, PHI), (inv, -PHI), (inv, PHI)] {
                    vertices.push(Vector3::new(0.0, a, b));
                }
                for (a, b) in [(-PHI, -inv), (-PHI, inv), (PHI, -inv), (PHI, inv)] {
                    vertices.push(Vector3::new(a, 0.0, b));
                }
                for (a, b) in [(-inv, -PHI), (-inv, PHI), (inv, -PHI), (inv, PHI)] {
                    vertices.push(Vector3::new(a, b, 0.0));
                }
                vertices
            }
            Solid::Cube => {
                let mut vertices = Vec::with_capacity(8);
                for x in [-1.0, 1.0] {
                    for y in [-1.0, 1.0] {
                        for z in [-1.0, 1.0] {
                            vertices.push(Vector3::new(x, y, z));
                        }
                    }
                }
                vertices
            }
            Solid::Octahedron => vec![
                Vector3::x(),
                -Vector3::x(),
                Vector3::y(),
                -Vector3::y(),
                Vector3::z(),
                -Vector3::z(),
            ],
            Solid::Icosahedron => {
                let mut vertices = Vec::with_capacity(12);
                for a in [-1.0, 1.0] {
                    for b in [-PHI, PHI] {
                        vertices.push(Vector3::new(0.0, a, b));
                        vertices.push(Vector3::new(a, b, 0.0));
                        vertices.push(Vector3::new(b, 0.0, a));
                    }
                }
                vertices
            }
        }
    }

    pub fn scaled_vertices(&self, scale: f64) -> Vec<Vector3<f64>> {
        self.vertices().into_iter().map(|v| v * scale).collect()
    }

    /// Number of faces a correct extraction must find.
    pub fn expected_faces(&self) -> usize {
        match self {
            Solid::Dodecahedron => 12,
            Solid::Cube => 6,
            Solid::Octahedron => 8,
            Solid::Icosahedron => 20,
        }
    }
}

impl fmt::Display for Solid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Solid::Dodecahedron => "dodecahedron",
            Solid::Cube => "cube",
            Solid::Octahedron => "octahedron",
            Solid::Icosahedron => "icosahedron",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Solid {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dodecahedron" => Ok(Solid::Dodecahedron),
            "cube" => Ok(Solid::Cube),
            "octahedron" => Ok(Solid::Octahedron),
            "icosahedron" => Ok(Solid::Icosahedron),
            other => Err(anyhow::anyhow!("unknown solid: {}", other)),
        }
    }
}
