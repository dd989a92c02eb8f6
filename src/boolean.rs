//! Boolean evaluation of a mesh against a plane brush.
//!
//! The split engine never touches the BSP directly; it talks to a
//! [`BooleanEvaluator`], so hosts can plug in another kernel.

use crate::errors::CutError;
use crate::float_types::Real;
use crate::mesh::Mesh;
use nalgebra::Matrix4;

/// Which half of the mesh operand an evaluation keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    /// `mesh - plane`: the part in front of the plane normal.
    Subtraction,
    /// `mesh ∩ plane`: the part behind the plane normal.
    Intersection,
}

/// An operand of a boolean evaluation: geometry and the transform to place it.
#[derive(Debug, Clone)]
pub struct Brush<'a> {
    pub geometry: &'a Mesh,
    pub transform: Matrix4<Real>,
}

impl<'a> Brush<'a> {
    /// A brush evaluated in the geometry's own frame.
    pub fn at_identity(geometry: &'a Mesh) -> Self {
        Brush {
            geometry,
            transform: Matrix4::identity(),
        }
    }
}

/// Computes `op(mesh, plane)`.
///
/// The plane operand is a finite planar quad standing for the half-space behind
/// its normal. Results are expressed in the frame both operands are placed in.
pub trait BooleanEvaluator {
    fn evaluate(&self, mesh: &Brush, plane: &Brush, op: BooleanOp) -> Result<Mesh, CutError>;
}

/// Default evaluator backed by the crate's BSP tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct BspEvaluator;

impl BspEvaluator {
    fn place(brush: &Brush, role: &str) -> Result<Mesh, CutError> {
        if brush.transform == Matrix4::identity() {
            return Ok(brush.geometry.clone());
        }
        brush
            .geometry
            .transformed(&brush.transform)
            .ok_or_else(|| CutError::SingularTransform(role.to_string()))
    }
}

impl BooleanEvaluator for BspEvaluator {
    fn evaluate(&self, mesh: &Brush, plane: &Brush, op: BooleanOp) -> Result<Mesh, CutError> {
        let mesh = Self::place(mesh, "mesh operand")?;
        let plane = Self::place(plane, "plane operand")?;
        if plane.is_empty() {
            return Err(CutError::Evaluation {
                mesh: "plane operand".to_string(),
                reason: "plane brush has no geometry".to_string(),
            });
        }

        let result = match op {
            BooleanOp::Subtraction => mesh.difference(&plane),
            BooleanOp::Intersection => mesh.intersection(&plane),
        };
        Ok(result)
    }
}
