//! Grouping of split fragments into the two parts and their placement.

use crate::config::CutConfig;
use crate::cutting::split::{Fragment, SplitOutput};
use crate::errors::{CutError, CutSide};
use crate::float_types::{Real, parry3d::bounding_volume::Aabb, tolerance};
use crate::mesh::{aabb_diagonal, merge_aabb};
use crate::scene::{NodeDesc, NodeId, Scene};
use nalgebra::{Matrix4, Vector3};
use tracing::{debug, info};

/// A part as inserted into the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct PartInfo {
    pub id: NodeId,
    pub side: CutSide,
    /// Separation translation applied to the part.
    pub offset: Vector3<Real>,
    /// Uniform scale applied when the part came out oversized, else `1.0`.
    pub safety_scale: Real,
    pub fragment_count: usize,
}

/// Both parts of a successful cut.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledParts {
    pub a: PartInfo,
    pub b: PartInfo,
}

impl AssembledParts {
    pub fn ids(&self) -> [NodeId; 2] {
        [self.a.id, self.b.id]
    }

    pub fn get(&self, id: NodeId) -> Option<&PartInfo> {
        [&self.a, &self.b].into_iter().find(|p| p.id == id)
    }
}

struct PartPlan<'a> {
    side: CutSide,
    fragments: Vec<&'a Fragment>,
    bounds: Aabb,
}

impl<'a> PartPlan<'a> {
    fn collect(output: &'a SplitOutput, side: CutSide) -> Result<Self, CutError> {
        let fragments: Vec<&Fragment> = output.side(side).collect();
        let bounds = fragments
            .iter()
            .filter_map(|f| {
                f.geometry
                    .bounds_under(&(output.model_transform * f.transform))
            })
            .reduce(|a, b| merge_aabb(&a, &b))
            .ok_or(CutError::OneSideEmpty(side))?;
        Ok(PartPlan {
            side,
            fragments,
            bounds,
        })
    }

    /// Separation, then (if needed) a uniform scale about the part's center,
    /// applied on top of the model's world transform.
    fn placement(
        &self,
        offset: Vector3<Real>,
        model_transform: &Matrix4<Real>,
        scale: Real,
    ) -> Matrix4<Real> {
        let c = self.bounds.center().coords;
        Matrix4::new_translation(&offset)
            * Matrix4::new_translation(&c)
            * Matrix4::new_scaling(scale)
            * Matrix4::new_translation(&-c)
            * model_transform
    }

    fn into_desc(self, transform: Matrix4<Real>) -> NodeDesc {
        let mut desc = NodeDesc::group(self.side.label()).with_transform(transform);
        desc.children = self
            .fragments
            .into_iter()
            .map(|f| {
                NodeDesc::leaf(f.name.clone(), f.geometry.clone(), f.materials.clone())
                    .with_transform(f.transform)
            })
            .collect();
        desc
    }
}

/// Turn a split into two separated parts and swap them in for the model.
///
/// Nothing in the scene changes unless both sides have geometry and the model
/// is still a root of `scene`.
pub fn assemble(
    scene: &mut Scene,
    output: &SplitOutput,
    config: &CutConfig,
) -> Result<AssembledParts, CutError> {
    let plan_a = PartPlan::collect(output, CutSide::Subtraction)?;
    let plan_b = PartPlan::collect(output, CutSide::Intersection)?;
    if !scene.roots().contains(&output.model) {
        return Err(CutError::MissingNode(output.model));
    }

    let center_a = plan_a.bounds.center();
    let center_b = plan_b.bounds.center();
    let dir = (center_b - center_a)
        .try_normalize(tolerance())
        .unwrap_or(-output.plane.normal);
    let distance = config.separation_distance(output.model_diagonal);

    let mut infos = Vec::with_capacity(2);
    let mut descs = Vec::with_capacity(2);
    for (plan, sign) in [(plan_a, -1.0), (plan_b, 1.0)] {
        let part_diagonal = aabb_diagonal(&plan.bounds);
        let limit = config.oversize_ratio * output.model_diagonal;
        let scale = if part_diagonal > limit && part_diagonal > 0.0 {
            output.model_diagonal / part_diagonal
        } else {
            1.0
        };
        if scale != 1.0 {
            info!(
                side = %plan.side,
                part_diagonal,
                model_diagonal = output.model_diagonal,
                scale,
                "clamping oversized part"
            );
        }
        let offset = dir * (sign * distance);
        let transform = plan.placement(offset, &output.model_transform, scale);
        infos.push((plan.side, offset, scale, plan.fragments.len()));
        descs.push(plan.into_desc(transform));
    }

    let ids = scene.replace_root(output.model, descs)?;
    let mut parts = infos.into_iter().zip(ids).map(
        |((side, offset, safety_scale, fragment_count), id)| PartInfo {
            id,
            side,
            offset,
            safety_scale,
            fragment_count,
        },
    );
    let (Some(a), Some(b)) = (parts.next(), parts.next()) else {
        return Err(CutError::Assembly("scene did not return two part roots".to_string()));
    };

    debug!(
        model = %output.model_name,
        separation = distance,
        fragments_a = a.fragment_count,
        fragments_b = b.fragment_count,
        "assembled parts"
    );
    Ok(AssembledParts { a, b })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boolean::BspEvaluator;
    use crate::cutting::plane_solver::CuttingPlane;
    use crate::cutting::split::SplitJob;
    use crate::mesh::Mesh;
    use crate::scene::Material;
    use nalgebra::Point3;
    use std::sync::Arc;

    fn box_scene() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let model = scene.add_root(
            NodeDesc::group("model")
                .with_transform(Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0)))
                .with_child(NodeDesc::leaf(
                    "box",
                    Arc::new(Mesh::cuboid(Vector3::new(2.0, 2.0, 2.0), 0)),
                    vec![Material::new("grey", [0.5, 0.5, 0.5, 1.0])],
                )),
        );
        (scene, model)
    }

    #[test]
    fn parts_are_separated_along_the_normal() {
        let (mut scene, model) = box_scene();
        let plane = CuttingPlane::new(Vector3::x(), Point3::new(10.0, 0.0, 0.0)).unwrap();
        let config = CutConfig::default();
        let output = SplitJob::new(&scene, model, plane, &config)
            .unwrap()
            .run(&BspEvaluator);
        let parts = assemble(&mut scene, &output, &config).unwrap();

        assert!(!scene.contains(model));
        assert_eq!(scene.roots(), &parts.ids());
        let d = config.separation_distance(output.model_diagonal);
        // A is the +X half and moves further along +X
        assert!((parts.a.offset - Vector3::new(d, 0.0, 0.0)).norm() < 1e-9);
        assert!((parts.b.offset + Vector3::new(d, 0.0, 0.0)).norm() < 1e-9);

        let bounds_a = scene.world_bounds(parts.a.id).unwrap();
        let bounds_b = scene.world_bounds(parts.b.id).unwrap();
        assert!((bounds_a.mins.x - (10.0 + d)).abs() < 1e-6);
        assert!((bounds_b.maxs.x - (10.0 - d)).abs() < 1e-6);
        assert_eq!(parts.a.safety_scale, 1.0);
    }

    #[test]
    fn empty_side_leaves_scene_untouched() {
        let (mut scene, model) = box_scene();
        let plane = CuttingPlane::new(Vector3::x(), Point3::new(50.0, 0.0, 0.0)).unwrap();
        let config = CutConfig::default();
        let output = SplitJob::new(&scene, model, plane, &config)
            .unwrap()
            .run(&BspEvaluator);
        let before = scene.len();

        let err = assemble(&mut scene, &output, &config).unwrap_err();
        assert_eq!(err, CutError::OneSideEmpty(CutSide::Subtraction));
        assert!(scene.contains(model));
        assert_eq!(scene.len(), before);
    }

    #[test]
    fn oversized_part_is_scaled_back() {
        let (mut scene, model) = box_scene();
        let plane = CuttingPlane::new(Vector3::x(), Point3::new(10.0, 0.0, 0.0)).unwrap();
        let config = CutConfig::default();
        let mut output = SplitJob::new(&scene, model, plane, &config)
            .unwrap()
            .run(&BspEvaluator);
        // Pretend the split returned a runaway fragment for side A.
        let blown_up = output
            .fragments
            .iter()
            .position(|f| f.side == CutSide::Subtraction)
            .unwrap();
        let geometry = output.fragments[blown_up]
            .geometry
            .transformed(&Matrix4::new_scaling(4.0))
            .unwrap();
        output.fragments[blown_up].geometry = Arc::new(geometry);

        let parts = assemble(&mut scene, &output, &config).unwrap();
        assert!(parts.a.safety_scale < 1.0);
        let bounds = scene.world_bounds(parts.a.id).unwrap();
        assert!((aabb_diagonal(&bounds) - output.model_diagonal).abs() < 1e-6);
        assert_eq!(parts.b.safety_scale, 1.0);
    }
}
