//! Derivation of the cutting plane from a screen-space stroke.
//!
//! Preview and commit both go through [`solve`], so the plane drawn while
//! dragging is exactly the plane that gets cut.

use crate::config::{CutConfig, PlaneBasis};
use crate::errors::CutError;
use crate::float_types::{Real, tolerance};
use crate::scene::Camera;
use nalgebra::{Matrix4, Point3, Translation3, UnitQuaternion, Vector3};

/// An oriented plane: unit normal and a point on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CuttingPlane {
    pub normal: Vector3<Real>,
    pub point: Point3<Real>,
}

impl CuttingPlane {
    /// Plane through `point`. Returns `None` for a zero normal.
    pub fn new(normal: Vector3<Real>, point: Point3<Real>) -> Option<Self> {
        let normal = normal.try_normalize(tolerance())?;
        Some(CuttingPlane { normal, point })
    }

    pub fn signed_distance(&self, point: &Point3<Real>) -> Real {
        self.normal.dot(&(point - self.point))
    }

    /// Rotation taking `+Z` onto the normal.
    pub fn rotation(&self) -> UnitQuaternion<Real> {
        UnitQuaternion::rotation_between(&Vector3::z(), &self.normal).unwrap_or_else(|| {
            // antiparallel: any half turn about an axis orthogonal to Z
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI as Real)
        })
    }

    /// World transform of a brush modelled in the XY plane with normal `+Z`.
    pub fn world_transform(&self) -> Matrix4<Real> {
        Translation3::from(self.point.coords).to_homogeneous() * self.rotation().to_homogeneous()
    }
}

/// Derive the cutting plane from the stroke `start -> end`.
///
/// `normal = normalize(drag × axis)` where `axis` is the camera's lateral axis
/// or view direction depending on [`CutConfig::plane_basis`]. The plane passes
/// through `center`, the model's bounding box center.
pub fn solve(
    start: &Point3<Real>,
    end: &Point3<Real>,
    camera: &Camera,
    center: &Point3<Real>,
    config: &CutConfig,
) -> Result<CuttingPlane, CutError> {
    let drag = end - start;
    let axis = match config.plane_basis {
        PlaneBasis::CameraRight => camera.right(),
        PlaneBasis::ViewDirection => camera.view_direction(),
    };
    let cross = drag.cross(&axis);
    // |drag × axis| / |drag| is the sine of the angle between stroke and axis.
    if cross.norm() <= config.degenerate_normal_epsilon * drag.norm() {
        return Err(CutError::DegenerateCuttingPlane);
    }
    Ok(CuttingPlane {
        normal: cross.normalize(),
        point: *center,
    })
}

/// Preview geometry of a plane: a square centred on the plane point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneIndicator {
    pub center: Point3<Real>,
    pub normal: Vector3<Real>,
    /// Corners in winding order, counter-clockwise seen from the normal side.
    pub corners: [Point3<Real>; 4],
}

impl PlaneIndicator {
    pub fn new(plane: &CuttingPlane, half_size: Real) -> Self {
        let m = plane.world_transform();
        let s = half_size;
        let corners = [(-s, -s), (s, -s), (s, s), (-s, s)]
            .map(|(x, y)| m.transform_point(&Point3::new(x, y, 0.0)));
        PlaneIndicator {
            center: plane.point,
            normal: plane.normal,
            corners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Projection;

    fn camera() -> Camera {
        Camera::look_at(
            Point3::new(0.0, 0.0, 5.0),
            Point3::origin(),
            Vector3::y(),
            Projection::Perspective {
                fov_y: 1.0,
                aspect: 1.0,
                near: 0.1,
                far: 100.0,
            },
        )
    }

    #[test]
    fn vertical_stroke_with_lateral_axis() {
        let config = CutConfig::default();
        let plane = solve(
            &Point3::new(0.0, -1.0, 1.0),
            &Point3::new(0.0, 1.0, 1.0),
            &camera(),
            &Point3::origin(),
            &config,
        )
        .unwrap();
        // (0, 2, 0) × (1, 0, 0) = (0, 0, -2)
        assert!((plane.normal - -Vector3::z()).norm() < 1e-9);
        assert_eq!(plane.point, Point3::origin());
    }

    #[test]
    fn horizontal_stroke_is_degenerate_with_lateral_axis() {
        let config = CutConfig::default();
        let err = solve(
            &Point3::new(-1.0, 0.0, 1.0),
            &Point3::new(1.0, 0.0, 1.0),
            &camera(),
            &Point3::origin(),
            &config,
        )
        .unwrap_err();
        assert_eq!(err, CutError::DegenerateCuttingPlane);
    }

    #[test]
    fn degeneracy_does_not_depend_on_stroke_length() {
        let config = CutConfig::default();
        let solve_drag = |drag: Vector3<Real>| {
            let start = Point3::new(0.0, 0.0, 1.0);
            solve(&start, &(start + drag), &camera(), &Point3::origin(), &config)
        };

        // Long and almost along the lateral axis: the normal would be noise.
        assert_eq!(
            solve_drag(Vector3::new(100.0, 1e-5, 0.0)).unwrap_err(),
            CutError::DegenerateCuttingPlane
        );
        assert_eq!(
            solve_drag(Vector3::zeros()).unwrap_err(),
            CutError::DegenerateCuttingPlane
        );
        // Short but well away from the axis.
        let plane = solve_drag(Vector3::new(0.0, 1e-3, 0.0)).unwrap();
        assert!((plane.normal - -Vector3::z()).norm() < 1e-9);
    }

    #[test]
    fn view_direction_basis_contains_the_stroke() {
        let config = CutConfig {
            plane_basis: PlaneBasis::ViewDirection,
            ..CutConfig::default()
        };
        let plane = solve(
            &Point3::new(-1.0, 0.0, 1.0),
            &Point3::new(1.0, 0.0, 1.0),
            &camera(),
            &Point3::origin(),
            &config,
        )
        .unwrap();
        assert!((plane.normal.y.abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn world_transform_maps_z_to_normal() {
        let plane = CuttingPlane::new(Vector3::new(0.0, 0.0, -3.0), Point3::new(1.0, 2.0, 3.0))
            .unwrap();
        let m = plane.world_transform();
        assert!((m.transform_vector(&Vector3::z()) - plane.normal).norm() < 1e-9);
        assert_eq!(m.transform_point(&Point3::origin()), plane.point);

        let indicator = PlaneIndicator::new(&plane, 2.0);
        for corner in indicator.corners {
            assert!(plane.signed_distance(&corner).abs() < 1e-9);
            assert!(((corner - plane.point).norm() - 8.0_f64.sqrt() as Real).abs() < 1e-9);
        }
    }
}
