//! Oriented planes in Hessian normal form and polygon splitting.

use crate::float_types::{EPSILON, Real};
use crate::mesh::polygon::Polygon;
use crate::mesh::vertex::Vertex;
use nalgebra::{Point3, Vector3};

// Plane classification constants, combined as a bitmask per polygon.
pub const COPLANAR: i8 = 0;
pub const FRONT: i8 = 1;
pub const BACK: i8 = 2;
pub const SPANNING: i8 = 3;

/// A plane `n · p = w`. `normal` is unit length for every plane built through
/// the constructors; a zero normal marks a degenerate polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub normal: Vector3<Real>,
    pub w: Real,
}

/// Result of [`Plane::split_polygon`]: `(coplanar_front, coplanar_back, front, back)`.
pub type SplitBuckets = (Vec<Polygon>, Vec<Polygon>, Vec<Polygon>, Vec<Polygon>);

impl Plane {
    /// Build a plane from a (not necessarily unit) normal and offset.
    pub fn from_normal(normal: Vector3<Real>, w: Real) -> Self {
        let len = normal.norm();
        if len < Real::EPSILON {
            return Plane {
                normal: Vector3::zeros(),
                w: 0.0,
            };
        }
        Plane {
            normal: normal / len,
            w: w / len,
        }
    }

    /// Build a plane through `point` with the given normal.
    pub fn from_point_normal(point: &Point3<Real>, normal: &Vector3<Real>) -> Self {
        let n = normal.try_normalize(Real::EPSILON).unwrap_or_else(Vector3::zeros);
        Plane {
            normal: n,
            w: n.dot(&point.coords),
        }
    }

    /// Plane of a polygon, using Newell's method so that slightly non-planar or
    /// nearly collinear input still gets the normal matching its winding.
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        if vertices.len() < 3 {
            return Plane {
                normal: Vector3::zeros(),
                w: 0.0,
            };
        }
        let newell = vertices
            .iter()
            .zip(vertices.iter().cycle().skip(1))
            .fold(Vector3::zeros(), |acc: Vector3<Real>, (curr, next)| {
                acc + curr.pos.coords.cross(&next.pos.coords)
            });
        let centroid = vertices
            .iter()
            .fold(Vector3::zeros(), |acc: Vector3<Real>, v| acc + v.pos.coords)
            / vertices.len() as Real;
        Self::from_point_normal(&Point3::from(centroid), &newell)
    }

    pub const fn normal(&self) -> Vector3<Real> {
        self.normal
    }

    pub const fn offset(&self) -> Real {
        self.w
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal.norm_squared() < 0.5
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Signed distance of `point` from the plane.
    #[inline]
    pub fn signed_distance(&self, point: &Point3<Real>) -> Real {
        self.normal.dot(&point.coords) - self.w
    }

    pub fn orient_point(&self, point: &Point3<Real>) -> i8 {
        let t = self.signed_distance(point);
        if t < -EPSILON {
            BACK
        } else if t > EPSILON {
            FRONT
        } else {
            COPLANAR
        }
    }

    /// Bitmask of the classifications of every vertex.
    pub fn classify_polygon(&self, polygon: &Polygon) -> i8 {
        polygon
            .vertices
            .iter()
            .fold(COPLANAR, |acc, v| acc | self.orient_point(&v.pos))
    }

    /// Split `polygon` by this plane into four buckets:
    /// `(coplanar_front, coplanar_back, front, back)`.
    ///
    /// Split pieces keep the plane of the source polygon instead of recomputing
    /// it from the (possibly sliver) split vertices.
    pub fn split_polygon(&self, polygon: &Polygon) -> SplitBuckets {
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        let mut front = Vec::new();
        let mut back = Vec::new();

        let types: Vec<i8> = polygon
            .vertices
            .iter()
            .map(|v| self.orient_point(&v.pos))
            .collect();
        let polygon_type = types.iter().fold(COPLANAR, |acc, &t| acc | t);

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    coplanar_front.push(polygon.clone());
                } else {
                    coplanar_back.push(polygon.clone());
                }
            },
            FRONT => front.push(polygon.clone()),
            BACK => back.push(polygon.clone()),
            _ => {
                let count = polygon.vertices.len();
                let mut split_front = Vec::<Vertex>::with_capacity(count + 1);
                let mut split_back = Vec::<Vertex>::with_capacity(count + 1);

                for i in 0..count {
                    let j = (i + 1) % count;
                    let type_i = types[i];
                    let type_j = types[j];
                    let vertex_i = &polygon.vertices[i];
                    let vertex_j = &polygon.vertices[j];

                    if type_i != BACK {
                        split_front.push(*vertex_i);
                    }
                    if type_i != FRONT {
                        split_back.push(*vertex_i);
                    }

                    if (type_i | type_j) == SPANNING {
                        let denom = self.normal.dot(&(vertex_j.pos - vertex_i.pos));
                        if denom.abs() > Real::EPSILON {
                            let t = (self.w - self.normal.dot(&vertex_i.pos.coords)) / denom;
                            let vertex_new = vertex_i.interpolate(vertex_j, t);
                            split_front.push(vertex_new);
                            split_back.push(vertex_new);
                        }
                    }
                }

                if split_front.len() >= 3 {
                    front.push(polygon.with_vertices(split_front));
                }
                if split_back.len() >= 3 {
                    back.push(polygon.with_vertices(split_back));
                }
            },
        }

        (coplanar_front, coplanar_back, front, back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_normal_normalizes_offset() {
        let plane = Plane::from_normal(Vector3::new(0.0, 2.0, 0.0), 4.0);
        assert_eq!(plane.normal, Vector3::y());
        assert_eq!(plane.w, 2.0);
    }

    #[test]
    fn orient_point_uses_epsilon_band() {
        let plane = Plane::from_point_normal(&Point3::origin(), &Vector3::z());
        assert_eq!(plane.orient_point(&Point3::new(0.0, 0.0, 1.0)), FRONT);
        assert_eq!(plane.orient_point(&Point3::new(0.0, 0.0, -1.0)), BACK);
        assert_eq!(plane.orient_point(&Point3::new(5.0, 5.0, EPSILON * 0.1)), COPLANAR);
    }
}
