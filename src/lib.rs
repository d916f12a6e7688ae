//! Analytic ray casting of a tumbling convex polyhedron.
//!
//! The solid is described only by its bounding half-spaces, extracted once
//! from a vertex set. Every frame the face normals are tumbled and one ray per
//! pixel is clipped against all half-spaces to find the visible face, which
//! is shaded with a single directional light.

pub mod config;
pub mod frame;
pub mod geom;
#[cfg(feature = "visualization")]
pub mod helpers;
pub mod hull;
pub mod orientation;
pub mod output;
pub mod settings;
pub mod trace;
