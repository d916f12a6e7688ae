/// Tolerance for geometric degeneracy: collinear triples, near-zero normals,
/// rays parallel to a face and the half-space side test.
pub const GEOM_TOLERANCE: f64 = 1e-6;
/// Tolerance used when deciding that two extracted planes are the same face.
/// Looser than [`GEOM_TOLERANCE`] since near-duplicate triples on one face
/// produce slightly different normals.
pub const DUPLICATE_PLANE_TOLERANCE: f64 = 1e-3;
/// Default number of candidate plane slots in a [`crate::hull::PlaneSet`].
pub const MAX_PLANES: usize = 30;
/// Packed colour written where a ray misses the solid (green).
pub const BACKGROUND_COLOR: u32 = 0x00FF00;
