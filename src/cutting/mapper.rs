//! Pointer to world-space mapping for cutting strokes.

use crate::errors::CutError;
use crate::float_types::{Real, tolerance};
use crate::scene::{Camera, NodeId, Scene, Viewport};
use nalgebra::{Point2, Point3};

/// Everything the mapper reads, passed down by the caller instead of being
/// looked up globally.
#[derive(Debug, Clone, Copy)]
pub struct MapContext<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub viewport: &'a Viewport,
    /// Root of the hierarchy the stroke is drawn on.
    pub model: NodeId,
    /// Previous point of the current stroke, if any.
    pub previous: Option<Point3<Real>>,
}

/// Map a pointer position (viewport pixels) to a world point.
///
/// The nearest mesh hit wins. On a miss the ray is intersected with a plane
/// facing the camera through the previous stroke point, or through the model's
/// bounding box center for the first point.
pub fn map_pointer(ctx: &MapContext, pointer: &Point2<Real>) -> Result<Point3<Real>, CutError> {
    let ndc = ctx.viewport.to_ndc(pointer);
    let ray = ctx.camera.ray_from_ndc(&ndc);

    if let Some(hit) = ctx.scene.ray_cast(ctx.model, &ray.origin, &ray.dir) {
        return Ok(hit.point);
    }

    let anchor = match ctx.previous {
        Some(previous) => previous,
        None => ctx
            .scene
            .world_bounds(ctx.model)
            .map(|bounds| bounds.center())
            .ok_or(CutError::NoModel)?,
    };

    let normal = ctx.camera.view_direction();
    let denom = normal.dot(&ray.dir);
    if denom.abs() < tolerance() {
        return Err(CutError::InvalidCuttingPoints(
            "pointer ray is parallel to the fallback plane".to_string(),
        ));
    }
    let t = normal.dot(&(anchor - ray.origin)) / denom;
    if t < 0.0 {
        return Err(CutError::InvalidCuttingPoints(
            "fallback plane lies behind the camera".to_string(),
        ));
    }
    Ok(ray.point_at(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::scene::{Material, NodeDesc, Projection};
    use nalgebra::Vector3;
    use std::sync::Arc;

    fn setup() -> (Scene, NodeId, Camera, Viewport) {
        let mut scene = Scene::new();
        let model = scene.add_root(NodeDesc::leaf(
            "box",
            Arc::new(Mesh::cuboid(Vector3::new(2.0, 2.0, 2.0), 0)),
            vec![Material::new("grey", [0.5; 4])],
        ));
        let camera = Camera::look_at(
            Point3::new(0.0, 0.0, 5.0),
            Point3::origin(),
            Vector3::y(),
            Projection::Orthographic {
                height: 10.0,
                aspect: 1.0,
                near: 0.1,
                far: 100.0,
            },
        );
        (scene, model, camera, Viewport::new(100.0, 100.0))
    }

    #[test]
    fn hit_returns_surface_point() {
        let (scene, model, camera, viewport) = setup();
        let ctx = MapContext {
            scene: &scene,
            camera: &camera,
            viewport: &viewport,
            model,
            previous: None,
        };
        // ndc (0.1, 0.0) with a 10 unit tall orthographic view lands on x = 0.5
        let point = map_pointer(&ctx, &Point2::new(55.0, 50.0)).unwrap();
        assert!((point - Point3::new(0.5, 0.0, 1.0)).norm() < 1e-9);
    }

    #[test]
    fn miss_falls_back_to_view_plane() {
        let (scene, model, camera, viewport) = setup();
        let mut ctx = MapContext {
            scene: &scene,
            camera: &camera,
            viewport: &viewport,
            model,
            previous: None,
        };
        // ndc (0.8, 0.0) lands on x = 4, outside the box
        let point = map_pointer(&ctx, &Point2::new(90.0, 50.0)).unwrap();
        assert!((point - Point3::new(4.0, 0.0, 0.0)).norm() < 1e-9);

        ctx.previous = Some(Point3::new(0.0, 0.0, 1.0));
        let point = map_pointer(&ctx, &Point2::new(90.0, 50.0)).unwrap();
        assert!((point - Point3::new(4.0, 0.0, 1.0)).norm() < 1e-9);
    }

    #[test]
    fn plane_behind_camera_is_rejected() {
        let (scene, model, camera, viewport) = setup();
        let ctx = MapContext {
            scene: &scene,
            camera: &camera,
            viewport: &viewport,
            model,
            previous: Some(Point3::new(0.0, 0.0, 10.0)),
        };
        let err = map_pointer(&ctx, &Point2::new(95.0, 50.0)).unwrap_err();
        assert!(matches!(err, CutError::InvalidCuttingPoints(_)));
    }
}
