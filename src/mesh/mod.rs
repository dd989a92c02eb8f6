//! `Mesh` struct: polygon soup with BSP boolean operations, ray casting and
//! affine transforms.

use crate::float_types::{
    Real,
    parry3d::{
        bounding_volume::Aabb,
        query::{Ray, RayCast},
        shape::Triangle,
    },
    tolerance,
};
use nalgebra::{Matrix4, Point3, Vector3};
use std::sync::OnceLock;

pub mod bsp;
pub mod plane;
pub mod polygon;
pub mod vertex;

use bsp::Node;
use polygon::Polygon;
use vertex::Vertex;

/// Closed (or at least consistently wound) polygon geometry of one leaf mesh.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub polygons: Vec<Polygon>,

    /// Lazily calculated AABB that spans `polygons`.
    bounding_box: OnceLock<Aabb>,
}

/// Triangle buffers of a single material slot, ready for upload or export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleBuffers {
    pub material: usize,
    pub positions: Vec<Point3<Real>>,
    pub normals: Vec<Vector3<Real>>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a Mesh from an existing polygon list
    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Mesh {
            polygons,
            bounding_box: OnceLock::new(),
        }
    }

    /// Build a mesh from an indexed triangle list, the layout asset loaders
    /// hand over. Zero-area triangles are dropped.
    pub fn from_triangles(
        positions: &[Point3<Real>],
        triangles: &[[u32; 3]],
        material: usize,
    ) -> Self {
        let polygons = triangles
            .iter()
            .filter_map(|tri| {
                let [a, b, c] = tri.map(|i| positions.get(i as usize).copied());
                let (a, b, c) = (a?, b?, c?);
                let normal = (b - a).cross(&(c - a));
                let normal = normal.try_normalize(tolerance())?;
                Some(Polygon::new(
                    vec![
                        Vertex::new(a, normal),
                        Vertex::new(b, normal),
                        Vertex::new(c, normal),
                    ],
                    material,
                ))
            })
            .collect();
        Mesh::from_polygons(polygons)
    }

    /// Axis-aligned box of the given full extents centred on the origin, faces
    /// wound outward.
    pub fn cuboid(size: Vector3<Real>, material: usize) -> Self {
        let h = size * 0.5;
        // (normal, four corners counter-clockwise seen from outside)
        let faces: [([Real; 3], [[Real; 3]; 4]); 6] = [
            ([-1.0, 0.0, 0.0], [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]]),
            ([1.0, 0.0, 0.0], [[1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, -1.0, 1.0]]),
            ([0.0, -1.0, 0.0], [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]]),
            ([0.0, 1.0, 0.0], [[-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]]),
            ([0.0, 0.0, -1.0], [[-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0]]),
            ([0.0, 0.0, 1.0], [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]]),
        ];

        let polygons = faces
            .iter()
            .map(|(n, corners)| {
                let normal = Vector3::new(n[0], n[1], n[2]);
                let vertices = corners
                    .iter()
                    .map(|c| Vertex::new(Point3::new(c[0] * h.x, c[1] * h.y, c[2] * h.z), normal))
                    .collect();
                Polygon::new(vertices, material)
            })
            .collect();
        Mesh::from_polygons(polygons)
    }

    /// Square of side `2 * half_size` in the local XY plane with normal `+Z`.
    /// Used as the plane brush of a cut.
    pub fn plane_quad(half_size: Real, material: usize) -> Self {
        let n = Vector3::z();
        let s = half_size;
        let vertices = vec![
            Vertex::new(Point3::new(-s, -s, 0.0), n),
            Vertex::new(Point3::new(s, -s, 0.0), n),
            Vertex::new(Point3::new(s, s, 0.0), n),
            Vertex::new(Point3::new(-s, s, 0.0), n),
        ];
        Mesh::from_polygons(vec![Polygon::new(vertices, material)])
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.polygons
            .iter()
            .map(|p| p.vertices.len().saturating_sub(2))
            .sum()
    }

    /// Helper to collect all vertices.
    pub fn vertices(&self) -> Vec<Vertex> {
        self.polygons
            .iter()
            .flat_map(|p| p.vertices.iter().copied())
            .collect()
    }

    /// Bounds of all polygons in the mesh's own frame. An empty mesh yields a
    /// degenerate box at the origin.
    pub fn bounding_box(&self) -> Aabb {
        *self.bounding_box.get_or_init(|| {
            points_aabb(self.polygons.iter().flat_map(|p| p.vertices.iter().map(|v| v.pos)))
                .unwrap_or_else(|| Aabb::new(Point3::origin(), Point3::origin()))
        })
    }

    /// Exact bounds of the mesh after applying `matrix`, or `None` when empty.
    pub fn bounds_under(&self, matrix: &Matrix4<Real>) -> Option<Aabb> {
        points_aabb(
            self.polygons
                .iter()
                .flat_map(|p| p.vertices.iter().map(|v| matrix.transform_point(&v.pos))),
        )
    }

    /// Apply an arbitrary affine transform. Returns `None` when the matrix
    /// cannot be inverted (normals would be undefined).
    pub fn transformed(&self, matrix: &Matrix4<Real>) -> Option<Mesh> {
        let inverse = matrix.try_inverse()?;
        let normal_matrix = inverse.transpose();
        let mirrored = matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0;
        let polygons = self
            .polygons
            .iter()
            .map(|p| p.transformed(matrix, &normal_matrix, mirrored))
            .collect();
        Some(Mesh::from_polygons(polygons))
    }

    /// Invert this Mesh (flip inside vs. outside)
    pub fn inverse(&self) -> Mesh {
        let mut mesh = self.clone();
        mesh.polygons.iter_mut().for_each(Polygon::flip);
        mesh
    }

    /// Return a new Mesh representing the difference `self - other`.
    ///
    /// ```text
    /// let c = a.difference(b);
    ///     +-------+            +-------+
    ///     |       |            |       |
    ///     |   a   |            |   c   |
    ///     |    +--+----+   =   |    +--+
    ///     +----+--+    |       +----+
    ///          |   b   |
    ///          |       |
    ///          +-------+
    /// ```
    ///
    /// Every polygon of both operands goes through the trees, with no
    /// bounding-box shortcut: a plane brush stands for an unbounded half-space.
    pub fn difference(&self, other: &Mesh) -> Mesh {
        let mut a = Node::from_polygons(&self.polygons);
        let mut b = Node::from_polygons(&other.polygons);

        a.invert();
        a.clip_to(&b);
        b.clip_to(&a);
        b.invert();
        b.clip_to(&a);
        b.invert();
        a.build(&b.all_polygons());
        a.invert();

        Mesh::from_polygons(a.all_polygons())
    }

    /// Return a new Mesh representing the intersection of `self` and `other`.
    ///
    /// ```text
    /// let c = a.intersection(b);
    ///     +-------+
    ///     |       |
    ///     |   a   |
    ///     |    +--+----+   =   +--+
    ///     +----+--+    |       +--+
    ///          |   b   |
    ///          |       |
    ///          +-------+
    /// ```
    pub fn intersection(&self, other: &Mesh) -> Mesh {
        let mut a = Node::from_polygons(&self.polygons);
        let mut b = Node::from_polygons(&other.polygons);

        a.invert();
        b.clip_to(&a);
        b.invert();
        a.clip_to(&b);
        b.clip_to(&a);
        a.build(&b.all_polygons());
        a.invert();

        Mesh::from_polygons(a.all_polygons())
    }

    /// Casts a ray defined by `origin` + t * `direction` against all triangles
    /// and returns a list of (intersection_point, t), sorted by ascending t.
    pub fn ray_intersections(
        &self,
        origin: &Point3<Real>,
        direction: &Vector3<Real>,
    ) -> Vec<(Point3<Real>, Real)> {
        let ray = Ray::new(*origin, *direction);
        let mut hits = Vec::new();

        for poly in &self.polygons {
            for [a, b, c] in poly.triangulate() {
                let triangle = Triangle::new(a.pos, b.pos, c.pos);
                if let Some(toi) = triangle.cast_local_ray(&ray, Real::MAX, true) {
                    hits.push((ray.point_at(toi), toi));
                }
            }
        }

        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.dedup_by(|a, b| (a.1 - b.1).abs() < tolerance());
        hits
    }

    /// Signed enclosed volume (divergence theorem). Positive for outward
    /// winding; only meaningful for closed meshes.
    pub fn volume(&self) -> Real {
        self.polygons
            .iter()
            .flat_map(Polygon::triangulate)
            .map(|[a, b, c]| a.pos.coords.dot(&b.pos.coords.cross(&c.pos.coords)) / 6.0)
            .sum()
    }

    /// Flat triangle buffers grouped by material slot, ordered by slot.
    /// Normals are renormalized; vertices are not shared between polygons.
    pub fn triangle_buffers(&self) -> Vec<TriangleBuffers> {
        let mut groups: Vec<TriangleBuffers> = Vec::new();
        for poly in &self.polygons {
            let idx = match groups.iter().position(|g| g.material == poly.material) {
                Some(idx) => idx,
                None => {
                    groups.push(TriangleBuffers {
                        material: poly.material,
                        ..TriangleBuffers::default()
                    });
                    groups.len() - 1
                },
            };
            let group = &mut groups[idx];
            for tri in poly.triangulate() {
                for v in tri {
                    group.indices.push(group.positions.len() as u32);
                    group.positions.push(v.pos);
                    group.normals.push(
                        v.normal
                            .try_normalize(tolerance())
                            .unwrap_or_else(|| poly.plane.normal()),
                    );
                }
            }
        }
        groups.sort_by_key(|g| g.material);
        groups
    }
}

/// AABB of a point cloud, `None` when empty.
pub fn points_aabb(points: impl IntoIterator<Item = Point3<Real>>) -> Option<Aabb> {
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let (mins, maxs) = iter.fold((first, first), |(mins, maxs), p| {
        (mins.inf(&p), maxs.sup(&p))
    });
    Some(Aabb::new(mins, maxs))
}

/// Union of two boxes.
pub fn merge_aabb(a: &Aabb, b: &Aabb) -> Aabb {
    Aabb::new(a.mins.inf(&b.mins), a.maxs.sup(&b.maxs))
}

/// Length of the box diagonal.
pub fn aabb_diagonal(aabb: &Aabb) -> Real {
    (aabb.maxs - aabb.mins).norm()
}

/// Volume of the box.
pub fn aabb_volume(aabb: &Aabb) -> Real {
    let e = aabb.maxs - aabb.mins;
    e.x * e.y * e.z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_is_closed_and_outward() {
        let cube = Mesh::cuboid(Vector3::new(2.0, 4.0, 6.0), 0);
        assert_eq!(cube.polygons.len(), 6);
        assert!((cube.volume() - 48.0).abs() < 1e-9);
        let bb = cube.bounding_box();
        assert_eq!(bb.mins, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(bb.maxs, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn mirrored_transform_keeps_outward_winding() {
        let cube = Mesh::cuboid(Vector3::new(1.0, 1.0, 1.0), 0);
        let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
        let mirrored = cube.transformed(&mirror).unwrap();
        assert!((mirrored.volume() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn singular_transform_is_rejected() {
        let cube = Mesh::cuboid(Vector3::new(1.0, 1.0, 1.0), 0);
        let flatten = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 0.0, 1.0));
        assert!(cube.transformed(&flatten).is_none());
    }

    #[test]
    fn ray_hits_front_face_first() {
        let cube = Mesh::cuboid(Vector3::new(2.0, 2.0, 2.0), 0);
        let hits = cube.ray_intersections(&Point3::new(0.2, 0.1, 5.0), &-Vector3::z());
        assert_eq!(hits.len(), 2);
        assert!((hits[0].0.z - 1.0).abs() < 1e-9);
        assert!((hits[0].1 - 4.0).abs() < 1e-9);
    }

    #[test]
    fn from_triangles_drops_degenerate_faces() {
        let positions = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let mesh = Mesh::from_triangles(&positions, &[[0, 1, 2], [0, 1, 3], [0, 1, 9]], 0);
        assert_eq!(mesh.polygons.len(), 1);
    }

    #[test]
    fn triangle_buffers_group_by_material() {
        let mut cube = Mesh::cuboid(Vector3::new(1.0, 1.0, 1.0), 0);
        cube.polygons[0].material = 1;
        let groups = cube.triangle_buffers();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].material, 0);
        assert_eq!(groups[0].indices.len(), 5 * 2 * 3);
        assert_eq!(groups[1].indices.len(), 2 * 3);
    }
}
