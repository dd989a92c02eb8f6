mod support;

use meshcleave::{
    float_types::EPSILON,
    mesh::plane::{BACK, COPLANAR, FRONT, Plane, SPANNING},
};
use nalgebra::{Point3, Vector3};

use crate::support::make_polygon_3d;

#[test]
fn flip() {
    let mut plane = Plane::from_normal(Vector3::y(), 2.0);
    plane.flip();
    assert_eq!(plane.normal(), Vector3::new(0.0, -1.0, 0.0));
    assert_eq!(plane.offset(), -2.0);
}

#[test]
fn split_polygon() {
    // Define a plane that splits the XY plane at y=0
    let plane = Plane::from_normal(Vector3::new(0.0, 1.0, 0.0), 0.0);

    // A polygon that crosses y=0 line: a square from ( -1, -1 ) to (1, 1 )
    let poly = make_polygon_3d(&[
        [-1.0, -1.0, 0.0],
        [1.0, -1.0, 0.0],
        [1.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0],
    ]);

    let (cf, cb, f, b) = plane.split_polygon(&poly);
    assert_eq!(cf.len(), 0);
    assert_eq!(cb.len(), 0);
    assert_eq!(f.len(), 1);
    assert_eq!(b.len(), 1);

    // Pieces keep the source plane and material.
    assert_eq!(f[0].plane, poly.plane);
    assert_eq!(b[0].material, poly.material);

    for v in &f[0].vertices {
        assert!(v.pos.y >= -EPSILON);
    }
    for v in &b[0].vertices {
        assert!(v.pos.y <= EPSILON);
    }
    // The halves add up to the whole.
    assert!((f[0].area() + b[0].area() - poly.area()).abs() < 1e-9);
}

#[test]
fn coplanar_polygons_sort_by_facing() {
    let plane = Plane::from_normal(Vector3::z(), 0.0);
    let up = make_polygon_3d(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    let mut down = up.clone();
    down.flip();

    let (cf, cb, _, _) = plane.split_polygon(&up);
    assert_eq!((cf.len(), cb.len()), (1, 0));
    let (cf, cb, _, _) = plane.split_polygon(&down);
    assert_eq!((cf.len(), cb.len()), (0, 1));
}

#[test]
fn classify_polygon() {
    let plane = Plane::from_point_normal(&Point3::new(0.0, 0.0, 1.0), &Vector3::z());
    let above = make_polygon_3d(&[[0.0, 0.0, 2.0], [1.0, 0.0, 2.0], [0.0, 1.0, 2.0]]);
    let below = make_polygon_3d(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    let on = make_polygon_3d(&[[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]]);
    let across = make_polygon_3d(&[[0.0, 0.0, 0.0], [1.0, 0.0, 2.0], [0.0, 1.0, 2.0]]);

    assert_eq!(plane.classify_polygon(&above), FRONT);
    assert_eq!(plane.classify_polygon(&below), BACK);
    assert_eq!(plane.classify_polygon(&on), COPLANAR);
    assert_eq!(plane.classify_polygon(&across), SPANNING);
}

#[test]
fn from_vertices_follows_winding() {
    let poly = make_polygon_3d(&[[0.0, 0.0, 3.0], [2.0, 0.0, 3.0], [2.0, 2.0, 3.0], [0.0, 2.0, 3.0]]);
    assert!((poly.plane.normal() - Vector3::z()).norm() < 1e-12);
    assert!((poly.plane.offset() - 3.0).abs() < 1e-12);

    let degenerate = make_polygon_3d(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
    assert!(degenerate.plane.is_degenerate());
}
