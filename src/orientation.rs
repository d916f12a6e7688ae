//! The tumbling spin applied to the solid each frame.
//!
//! The spin is a rotation by `angle` about the y-axis followed by a rotation
//! by `angle / 2` about the x-axis. Because the two rates differ the solid
//! never settles into a single-axis spin. The composition is kept exactly as
//! is so the animation looks the same at every angle; it is not meant to be a
//! general orientation parametrisation.

use nalgebra::Vector3;


/// A tumble by a given angle (radians). Angles grow without bound; only their
/// sine and cosine are used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tumble {
    pub angle: f64,
    cos_a: f64,
    sin_a: f64,
    cos_b: f64,
    sin_b: f64,
}

impl Tumble {
    pub fn new(angle: f64) -> Self {
        let (sin_a, cos_a) = angle.sin_cos();
        let (sin_b, cos_b) = (angle * 0.5).sin_cos();
        Self {
            angle,
            cos_a,
            sin_a,
            cos_b,
            sin_b,
        }
    }

    /// Applies the full two-axis tumble.
    pub fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        let spun = self.rotate_y_only(v);
        let y = self.cos_b * spun.y - self.sin_b * spun.z;
        let z = self.sin_b * spun.y + self.cos_b * spun.z;
        Vector3::new(spun.x, y, z)
    }

    /// Applies only the full-angle component about the y-axis.
    pub fn rotate_y_only(&self, v: &Vector3<f64>) -> Vector3<f64> {
        let x = self.cos_a * v.x + self.sin_a * v.z;
        let z = -self.sin_a * v.x + self.cos_a * v.z;
        Vector3::new(x, v.y, z)
    }
}
