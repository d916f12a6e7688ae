//! Per-pixel ray casting against a set of half-spaces.
//!
//! A convex solid is the intersection of its half-spaces, so a ray hits it
//! exactly when the interval of ray parameters inside every half-space is
//! non-empty. Each plane the ray enters through raises the lower bound of the
//! interval and each plane it leaves through lowers the upper bound; the last
//! plane to raise the lower bound is the visible face.

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::config::{BACKGROUND_COLOR, GEOM_TOLERANCE};
use crate::frame::PixelBuffer;
use crate::geom::{safe_normalize, Plane};


/// A pinhole camera looking down +z.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vector3<f64>,
    pub focal_length: f64,
    /// Pixels per unit of view-plane distance.
    pub screen_scale: f64,
    pub half_width: f64,
    pub half_height: f64,
}

impl Camera {
    pub fn new(
        position: Vector3<f64>,
        focal_length: f64,
        screen_scale: f64,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            position,
            focal_length,
            screen_scale,
            half_width: width as f64 / 2.0,
            half_height: height as f64 / 2.0,
        }
    }

    /// Unit view direction through pixel `(x, y)`, with `y` growing downwards.
    pub fn ray_direction(&self, x: usize, y: usize) -> Vector3<f64> {
        let u = (x as f64 - self.half_width) / self.screen_scale;
        let v = (self.half_height - y as f64) / self.screen_scale;
        safe_normalize(&Vector3::new(u, v, self.focal_length))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 0.0, -5.0), 5.0, 300.0, 800, 600)
    }
}

/// A directional light. `direction` points from the surface towards the light.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub direction: Vector3<f64>,
}

impl Light {
    pub fn new(direction: Vector3<f64>) -> Self {
        Self {
            direction: safe_normalize(&direction),
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(Vector3::new(1.0, 1.0, -1.0))
    }
}

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn grey(c: u8) -> Self {
        Self { r: c, g: c, b: c }
    }

    /// `0x00RRGGBB`
    pub fn packed(&self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

/// Everything needed to turn a ray into a colour, apart from the planes.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub camera: Camera,
    pub light: Light,
    pub background: u32,
    /// Shading normal used when no entering face was recorded.
    pub fallback_normal: Vector3<f64>,
}

impl Scene {
    pub fn new(camera: Camera, light: Light) -> Self {
        Self {
            camera,
            light,
            background: BACKGROUND_COLOR,
            fallback_normal: Vector3::z(),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Camera::default(), Light::default())
    }
}

/// Result of clipping a ray against every half-space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub t_near: f64,
    pub t_far: f64,
    /// Visible ray parameter: `t_near`, or `t_far` when the origin is inside.
    pub t: f64,
    /// Index of the plane the ray enters through last.
    pub plane: Option<usize>,
}

/// Clips the ray `origin + t * dir` against `planes`.
/// Returns `None` when the ray misses the solid or the solid is behind it.
pub fn trace_ray(origin: &Vector3<f64>, dir: &Vector3<f64>, planes: &[Plane]) -> Option<Hit> {
    let mut t_near = f64::NEG_INFINITY;
    let mut t_far = f64::INFINITY;
    let mut entering = None;

    for (i, plane) in planes.iter().enumerate() {
        let denom = plane.normal.dot(dir);
        if denom.abs() < GEOM_TOLERANCE {
            continue;
        }
        let t = (plane.offset - plane.normal.dot(origin)) / denom;
        if denom < 0.0 {
            if t > t_near {
                t_near = t;
                entering = Some(i);
            }
        } else if t < t_far {
            t_far = t;
        }
    }

    if t_near > t_far || t_far < 0.0 {
        return None;
    }

    Some(Hit {
        t_near,
        t_far,
        t: if t_near >= 0.0 { t_near } else { t_far },
        plane: entering,
    })
}

/// Lambertian intensity of a surface with the given normal.
pub fn intensity(normal: &Vector3<f64>, light: &Light) -> u8 {
    let diffuse = normal.dot(&light.direction).max(0.0);
    (diffuse * 255.0).min(255.0) as u8
}

/// Packed colour seen along a single ray.
pub fn shade_ray(origin: &Vector3<f64>, dir: &Vector3<f64>, planes: &[Plane], scene: &Scene) -> u32 {
    match trace_ray(origin, dir, planes) {
        None => scene.background,
        Some(hit) => {
            let normal = hit
                .plane
                .map(|i| planes[i].normal)
                .unwrap_or(scene.fallback_normal);
            Color::grey(intensity(&normal, &scene.light)).packed()
        }
    }
}

/// Packed colour of screen pixel `(x, y)`.
pub fn shade_pixel(x: usize, y: usize, planes: &[Plane], scene: &Scene) -> u32 {
    let dir = scene.camera.ray_direction(x, y);
    shade_ray(&scene.camera.position, &dir, planes, scene)
}

/// Overwrites every pixel of `buffer`. With `parallel` set the scanlines are
/// shared out over the rayon thread pool; the output is identical either way.
pub fn render(planes: &[Plane], scene: &Scene, buffer: &mut PixelBuffer, parallel: bool) {
    let width = buffer.width();
    if width == 0 {
        return;
    }

    let shade_row = |(y, row): (usize, &mut [u32])| {
        for (x, pixel) in row.iter_mut().enumerate() {
            *pixel = shade_pixel(x, y, planes, scene);
        }
    };

    if parallel {
        buffer
            .pixels_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(shade_row);
    } else {
        buffer
            .pixels_mut()
            .chunks_mut(width)
            .enumerate()
            .for_each(shade_row);
    }
}
