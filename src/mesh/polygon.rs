//! Convex polygons carrying a material slot.

use crate::float_types::Real;
use crate::mesh::plane::Plane;
use crate::mesh::vertex::Vertex;
use nalgebra::Matrix4;

/// A convex polygon with its supporting plane.
///
/// `material` indexes into the owning leaf mesh's material list; caps produced
/// by the plane brush carry the brush's slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<Vertex>,
    pub plane: Plane,
    pub material: usize,
}

impl Polygon {
    /// Create a polygon and compute its plane from the vertex winding.
    pub fn new(vertices: Vec<Vertex>, material: usize) -> Self {
        let plane = Plane::from_vertices(&vertices);
        Polygon {
            vertices,
            plane,
            material,
        }
    }

    /// A polygon sharing this one's plane and material but with other vertices.
    pub fn with_vertices(&self, vertices: Vec<Vertex>) -> Self {
        Polygon {
            vertices,
            plane: self.plane.clone(),
            material: self.material,
        }
    }

    /// Reverse winding order, flip vertex normals and the plane.
    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.vertices.iter_mut().for_each(Vertex::flip);
        self.plane.flip();
    }

    /// Fan triangulation. BSP splits of convex polygons stay convex, so a fan
    /// from the first vertex is exact.
    pub fn triangulate(&self) -> Vec<[Vertex; 3]> {
        if self.vertices.len() < 3 {
            return Vec::new();
        }
        let v0 = self.vertices[0];
        self.vertices
            .windows(2)
            .skip(1)
            .map(|pair| [v0, pair[0], pair[1]])
            .collect()
    }

    /// Surface area, summed over the fan triangles.
    pub fn area(&self) -> Real {
        self.triangulate()
            .iter()
            .map(|[a, b, c]| (b.pos - a.pos).cross(&(c.pos - a.pos)).norm() * 0.5)
            .sum()
    }

    /// Apply an affine transform. A transform with negative determinant mirrors
    /// the polygon, so winding is reversed to keep the outward orientation.
    pub fn transformed(
        &self,
        matrix: &Matrix4<Real>,
        normal_matrix: &Matrix4<Real>,
        mirrored: bool,
    ) -> Polygon {
        let mut vertices: Vec<Vertex> = self
            .vertices
            .iter()
            .map(|v| v.transformed(matrix, normal_matrix))
            .collect();
        if mirrored {
            vertices.reverse();
        }
        Polygon::new(vertices, self.material)
    }
}
