//! Half-space extraction from a convex point set.
//!
//! Every triple of points spans a candidate plane. A candidate is a face of
//! the hull when all points lie on one side of it; it is then oriented so the
//! points satisfy `normal · p <= offset` and kept unless an equivalent face
//! has already been found. This is O(N^4) overall and only intended for the
//! few tens of vertices of a regular solid.

use itertools::Itertools;
use nalgebra::Vector3;

use crate::config::{DUPLICATE_PLANE_TOLERANCE, GEOM_TOLERANCE};
use crate::geom::{safe_normalize, Plane};
use crate::orientation::Tumble;


/// The faces of a convex solid, bounded to a fixed number of slots.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneSet {
    planes: Vec<Plane>,
    capacity: usize,
    overflow: Vec<Plane>,
}

impl PlaneSet {
    /// Creates an empty set with room for `capacity` planes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            planes: Vec::with_capacity(capacity),
            capacity,
            overflow: Vec::new(),
        }
    }

    /// Derives the bounding half-spaces of the convex hull of `points`.
    ///
    /// Distinct faces found after `capacity` planes have been accepted are
    /// not stored; their number is available from [`PlaneSet::dropped`].
    pub fn extract(points: &[Vector3<f64>], capacity: usize) -> Self {
        let mut set = Self::with_capacity(capacity);

        for (a, b, c) in points.iter().tuple_combinations() {
            if let Some(plane) = face_plane(a, b, c, points) {
                set.insert(plane);
            }
        }

        set
    }

    /// Adds `plane` unless an equivalent plane is already present.
    /// Returns whether the plane was stored.
    pub fn insert(&mut self, plane: Plane) -> bool {
        if self.planes.iter().any(|existing| is_duplicate(existing, &plane)) {
            return false;
        }
        if self.planes.len() >= self.capacity {
            if !self.overflow.iter().any(|seen| is_duplicate(seen, &plane)) {
                self.overflow.push(plane);
            }
            return false;
        }
        self.planes.push(plane);
        true
    }

    /// A copy with every normal tumbled. Offsets are unchanged since the
    /// rotation is about the solid's own centre.
    pub fn rotated(&self, tumble: &Tumble) -> Self {
        Self {
            planes: self
                .planes
                .iter()
                .map(|plane| Plane::new(tumble.rotate(&plane.normal), plane.offset))
                .collect(),
            capacity: self.capacity,
            overflow: self.overflow.clone(),
        }
    }

    /// Whether `point` lies inside every half-space.
    pub fn contains(&self, point: &Vector3<f64>, tolerance: f64) -> bool {
        self.planes.iter().all(|plane| plane.contains(point, tolerance))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Plane> {
        self.planes.iter()
    }

    pub fn as_slice(&self) -> &[Plane] {
        &self.planes
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of distinct faces rejected because the set was full.
    pub fn dropped(&self) -> usize {
        self.overflow.len()
    }
}

impl<'a> IntoIterator for &'a PlaneSet {
    type Item = &'a Plane;
    type IntoIter = std::slice::Iter<'a, Plane>;

    fn into_iter(self) -> Self::IntoIter {
        self.planes.iter()
    }
}

/// The outward plane through `a`, `b`, `c` if it supports every point,
/// or `None` for collinear triples and planes cutting through the set.
fn face_plane(
    a: &Vector3<f64>,
    b: &Vector3<f64>,
    c: &Vector3<f64>,
    points: &[Vector3<f64>],
) -> Option<Plane> {
    let normal = (b - a).cross(&(c - a));
    if normal.norm() < GEOM_TOLERANCE {
        return None;
    }
    let normal = safe_normalize(&normal);
    let plane = Plane::new(normal, normal.dot(a));

    let mut all_below = true;
    let mut all_above = true;
    for p in points {
        let side = plane.signed_distance(p);
        if side > GEOM_TOLERANCE {
            all_below = false;
        }
        if side < -GEOM_TOLERANCE {
            all_above = false;
        }
    }

    match (all_below, all_above) {
        (_, true) => Some(plane.flipped()),
        (true, false) => Some(plane),
        (false, false) => None,
    }
}

/// Two planes describe the same face when their normals agree and their
/// offsets match, both within [`DUPLICATE_PLANE_TOLERANCE`].
pub fn is_duplicate(a: &Plane, b: &Plane) -> bool {
    (a.normal.dot(&b.normal) - 1.0).abs() < DUPLICATE_PLANE_TOLERANCE
        && (a.offset - b.offset).abs() < DUPLICATE_PLANE_TOLERANCE
}
