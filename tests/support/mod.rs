//! Test support library
//! Provides various helper functions & utilities for tests.

use meshcleave::{
    Camera, CutConfig, Interaction, Material, Mesh, NodeDesc, Viewport,
    float_types::Real,
    interaction::TickStatus,
    mesh::{polygon::Polygon, vertex::Vertex},
    scene::Projection,
};
use nalgebra::{Point2, Point3, Vector3};
use std::sync::Arc;

/// Returns the approximate bounding box `[min_x, min_y, min_z, max_x, max_y, max_z]`
/// for a set of polygons.
pub fn bounding_box(polygons: &[Polygon]) -> [Real; 6] {
    let mut bb = [Real::MAX, Real::MAX, Real::MAX, Real::MIN, Real::MIN, Real::MIN];
    for v in polygons.iter().flat_map(|p| &p.vertices) {
        for (axis, c) in v.pos.coords.iter().enumerate() {
            bb[axis] = bb[axis].min(*c);
            bb[axis + 3] = bb[axis + 3].max(*c);
        }
    }
    bb
}

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

/// Helper to make a simple Polygon in 3D with given vertices.
pub fn make_polygon_3d(points: &[[Real; 3]]) -> Polygon {
    let verts = points
        .iter()
        .map(|p| Vertex::new(Point3::new(p[0], p[1], p[2]), Vector3::z()))
        .collect();
    Polygon::new(verts, 0)
}

/// A model with a single box leaf of the given extents, centred on the origin.
pub fn box_model(size: Vector3<Real>) -> NodeDesc {
    NodeDesc::group("model").with_child(NodeDesc::leaf(
        "box",
        Arc::new(Mesh::cuboid(size, 0)),
        vec![Material::new("grey", [0.6, 0.6, 0.6, 1.0])],
    ))
}

/// Camera on +Z looking at the origin, 60 degree vertical field of view.
pub fn front_camera() -> Camera {
    Camera::look_at(
        Point3::new(0.0, 0.0, 5.0),
        Point3::origin(),
        Vector3::y(),
        Projection::Perspective {
            fov_y: std::f64::consts::FRAC_PI_3 as Real,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        },
    )
}

pub fn viewport() -> Viewport {
    Viewport::new(200.0, 200.0)
}

pub fn ndc_pixel(x: Real, y: Real) -> Point2<Real> {
    viewport().to_pixel(&Point2::new(x, y))
}

/// Pixel under which `point` appears.
pub fn pixel_of<E: meshcleave::BooleanEvaluator>(
    viewer: &Interaction<E>,
    point: &Point3<Real>,
) -> Point2<Real> {
    let ndc = viewer.camera().project(point).expect("point in front of camera");
    viewer.viewport().to_pixel(&ndc)
}

/// Viewer with a 2x2x2 box loaded.
pub fn box_viewer(config: CutConfig) -> Interaction {
    let mut viewer = Interaction::new(front_camera(), viewport(), config).unwrap();
    viewer.load_model(box_model(Vector3::new(2.0, 2.0, 2.0))).unwrap();
    viewer
}

/// Cut the box of `box_viewer` with a horizontal stroke, the plane containing
/// the stroke and the view direction.
pub fn split_box_horizontally() -> Interaction {
    use meshcleave::{Mode, PlaneBasis, PointerEvent};

    let mut viewer = box_viewer(CutConfig {
        plane_basis: PlaneBasis::ViewDirection,
        ..CutConfig::default()
    });
    viewer.enter_mode(Mode::Cut).unwrap();
    viewer
        .handle_pointer(PointerEvent::Down(ndc_pixel(-0.2, 0.0)))
        .unwrap();
    viewer
        .handle_pointer(PointerEvent::Move(ndc_pixel(0.0, 0.0)))
        .unwrap();
    viewer
        .handle_pointer(PointerEvent::Up(ndc_pixel(0.2, 0.0)))
        .unwrap();
    match viewer.finish_cut() {
        TickStatus::Completed(_) => viewer,
        other => panic!("cut did not complete: {other:?}"),
    }
}
