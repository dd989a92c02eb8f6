//! Camera, projection and viewport. The camera looks down its local `-Z` axis
//! with `+Y` up, the usual real-time graphics convention.

use crate::float_types::{Real, parry3d::query::Ray, tolerance};
use nalgebra::{Point2, Point3, UnitQuaternion, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians.
        fov_y: Real,
        aspect: Real,
        near: Real,
        far: Real,
    },
    Orthographic {
        /// Visible height in world units.
        height: Real,
        aspect: Real,
        near: Real,
        far: Real,
    },
}

impl Projection {
    pub const fn aspect(&self) -> Real {
        match *self {
            Projection::Perspective { aspect, .. } | Projection::Orthographic { aspect, .. } => {
                aspect
            },
        }
    }

    pub const fn with_aspect(self, aspect: Real) -> Self {
        match self {
            Projection::Perspective {
                fov_y, near, far, ..
            } => Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            },
            Projection::Orthographic {
                height, near, far, ..
            } => Projection::Orthographic {
                height,
                aspect,
                near,
                far,
            },
        }
    }
}

/// Size of the drawing surface in pixels; the origin is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: Real,
    pub height: Real,
}

impl Viewport {
    pub const fn new(width: Real, height: Real) -> Self {
        Viewport { width, height }
    }

    pub fn aspect(&self) -> Real {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Pixel coordinates to normalized device coordinates in `[-1, 1]`, `+Y` up.
    pub fn to_ndc(&self, pixel: &Point2<Real>) -> Point2<Real> {
        let w = self.width.max(1.0);
        let h = self.height.max(1.0);
        Point2::new(2.0 * pixel.x / w - 1.0, 1.0 - 2.0 * pixel.y / h)
    }

    /// Inverse of [`to_ndc`](Self::to_ndc).
    pub fn to_pixel(&self, ndc: &Point2<Real>) -> Point2<Real> {
        Point2::new(
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<Real>,
    pub orientation: UnitQuaternion<Real>,
    pub projection: Projection,
}

impl Camera {
    /// Camera at `position` looking at `target`. Falls back to another up
    /// vector when `up` is parallel to the view direction.
    pub fn look_at(
        position: Point3<Real>,
        target: Point3<Real>,
        up: Vector3<Real>,
        projection: Projection,
    ) -> Self {
        let backward = position - target;
        let up = if backward.cross(&up).norm() > tolerance() {
            up
        } else if backward.cross(&Vector3::y()).norm() > tolerance() {
            Vector3::y()
        } else {
            Vector3::z()
        };
        Camera {
            position,
            orientation: UnitQuaternion::face_towards(&backward, &up),
            projection,
        }
    }

    /// Unit vector the camera looks along.
    pub fn view_direction(&self) -> Vector3<Real> {
        self.orientation * -Vector3::z()
    }

    /// The camera's lateral axis.
    pub fn right(&self) -> Vector3<Real> {
        self.orientation * Vector3::x()
    }

    pub fn up(&self) -> Vector3<Real> {
        self.orientation * Vector3::y()
    }

    /// World-space ray through a point in normalized device coordinates. The
    /// direction is unit length.
    pub fn ray_from_ndc(&self, ndc: &Point2<Real>) -> Ray {
        match self.projection {
            Projection::Perspective { fov_y, aspect, .. } => {
                let tan = (fov_y * 0.5).tan();
                let local = Vector3::new(ndc.x * tan * aspect, ndc.y * tan, -1.0);
                Ray::new(self.position, (self.orientation * local).normalize())
            },
            Projection::Orthographic { height, aspect, .. } => {
                let half_h = height * 0.5;
                let local = Vector3::new(ndc.x * half_h * aspect, ndc.y * half_h, 0.0);
                Ray::new(self.position + self.orientation * local, self.view_direction())
            },
        }
    }

    /// Project a world point to normalized device coordinates, `None` when it is
    /// behind the camera.
    pub fn project(&self, point: &Point3<Real>) -> Option<Point2<Real>> {
        let local = self.orientation.inverse() * (point - self.position);
        let depth = -local.z;
        match self.projection {
            Projection::Perspective { fov_y, aspect, .. } => {
                if depth <= tolerance() {
                    return None;
                }
                let tan = (fov_y * 0.5).tan();
                Some(Point2::new(
                    local.x / (depth * tan * aspect),
                    local.y / (depth * tan),
                ))
            },
            Projection::Orthographic { height, aspect, .. } => {
                if depth < 0.0 {
                    return None;
                }
                let half_h = height * 0.5;
                Some(Point2::new(local.x / (half_h * aspect), local.y / half_h))
            },
        }
    }
}
