//! Struct and functions for working with `Vertex`s from which `Polygon`s are composed.

use crate::float_types::Real;
use nalgebra::{Matrix4, Point3, Vector3};

/// A vertex of a polygon, holding position and normal.
#[derive(Debug, Clone, PartialEq, Copy)]
pub struct Vertex {
    pub pos: Point3<Real>,
    pub normal: Vector3<Real>,
}

impl Vertex {
    /// Create a new [`Vertex`].
    ///
    /// * `pos`    – the position in the mesh's local frame
    /// * `normal` – (optionally non‑unit) normal; it is copied verbatim.
    ///
    /// Non-finite components are replaced by zero so a single corrupt vertex in
    /// an imported buffer cannot poison the BSP classification.
    #[inline]
    pub fn new(mut pos: Point3<Real>, mut normal: Vector3<Real>) -> Self {
        for c in pos.coords.iter_mut() {
            if !c.is_finite() {
                *c = 0.0;
            }
        }
        for c in normal.iter_mut() {
            if !c.is_finite() {
                *c = 0.0;
            }
        }
        Vertex { pos, normal }
    }

    /// Flip vertex normal in place.
    pub fn flip(&mut self) {
        self.normal = -self.normal;
    }

    /// Linear interpolation between `self` (`t = 0`) and `other` (`t = 1`).
    ///
    /// Normals are interpolated linearly as well; callers that shade with them
    /// renormalize on export.
    pub fn interpolate(&self, other: &Vertex, t: Real) -> Vertex {
        let new_pos = self.pos + (other.pos - self.pos) * t;
        let new_normal = self.normal + (other.normal - self.normal) * t;
        Vertex::new(new_pos, new_normal)
    }

    /// Apply an affine transform. `normal_matrix` must be the inverse transpose
    /// of `matrix`.
    pub fn transformed(&self, matrix: &Matrix4<Real>, normal_matrix: &Matrix4<Real>) -> Vertex {
        let pos = matrix.transform_point(&self.pos);
        let normal = normal_matrix.transform_vector(&self.normal);
        let normal = normal.try_normalize(Real::EPSILON).unwrap_or(normal);
        Vertex::new(pos, normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_midpoint() {
        let a = Vertex::new(Point3::new(0.0, 0.0, 0.0), Vector3::x());
        let b = Vertex::new(Point3::new(2.0, 4.0, 0.0), Vector3::y());
        let m = a.interpolate(&b, 0.5);
        assert_eq!(m.pos, Point3::new(1.0, 2.0, 0.0));
        assert_eq!(m.normal, Vector3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn sanitises_non_finite_input() {
        let v = Vertex::new(Point3::new(Real::NAN, 1.0, 2.0), Vector3::new(0.0, Real::INFINITY, 1.0));
        assert_eq!(v.pos, Point3::new(0.0, 1.0, 2.0));
        assert_eq!(v.normal, Vector3::new(0.0, 0.0, 1.0));
    }
}
