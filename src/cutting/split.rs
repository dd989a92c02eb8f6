//! Per-mesh split of a model along a cutting plane.
//!
//! Work is chunked: [`SplitJob::step`] splits at most
//! [`CutConfig::meshes_per_tick`] leaf meshes and reports progress, so a host
//! can spread a cut over several frames.

use crate::boolean::{BooleanEvaluator, BooleanOp, Brush};
use crate::config::CutConfig;
use crate::cutting::plane_solver::CuttingPlane;
use crate::errors::{CutError, CutSide};
use crate::float_types::Real;
use crate::mesh::{Mesh, aabb_diagonal};
use crate::scene::{Material, NodeId, Scene};
use nalgebra::Matrix4;
use std::sync::Arc;
use tracing::{debug, warn};

/// Material slot given to the cap polygons contributed by the plane brush.
/// Rebased onto the fragment's material list after evaluation.
const CAP_MATERIAL_SLOT: usize = usize::MAX;

/// One side's output for one leaf mesh.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub side: CutSide,
    /// Leaf mesh the fragment was cut from.
    pub source: NodeId,
    pub name: String,
    /// Geometry in the source mesh's local frame.
    pub geometry: Arc<Mesh>,
    /// Copies of the source materials with fresh identity.
    pub materials: Vec<Material>,
    /// Source mesh transform relative to the model root.
    pub transform: Matrix4<Real>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitProgress {
    pub processed: usize,
    pub total: usize,
}

impl SplitProgress {
    /// Completion in percent; an empty job counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed * 100) / self.total).min(100) as u8
    }

    pub const fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Everything the split produced, handed to the assembler.
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub model: NodeId,
    pub model_name: String,
    pub plane: CuttingPlane,
    /// World transform of the model root at the time of the cut.
    pub model_transform: Matrix4<Real>,
    pub model_diagonal: Real,
    pub fragments: Vec<Fragment>,
    /// Leaf meshes that could not be split, with the reason.
    pub skipped: Vec<(NodeId, CutError)>,
}

impl SplitOutput {
    pub fn side(&self, side: CutSide) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().filter(move |f| f.side == side)
    }
}

#[derive(Debug, Clone)]
struct SplitTask {
    node: NodeId,
    name: String,
    geometry: Arc<Mesh>,
    materials: Vec<Material>,
    world: Matrix4<Real>,
    relative: Matrix4<Real>,
}

/// Split of one model, advanced cooperatively.
///
/// The job snapshots the leaf meshes when created and never touches the scene
/// afterwards.
#[derive(Debug, Clone)]
pub struct SplitJob {
    tasks: Vec<SplitTask>,
    next: usize,
    meshes_per_tick: usize,
    plane_geometry: Mesh,
    plane_world: Matrix4<Real>,
    output: SplitOutput,
}

/// Plane transform expressed in a mesh's local frame:
/// `inverse(mesh_world) * plane_world`. `None` when the mesh transform is
/// singular.
pub fn plane_in_mesh_frame(
    mesh_world: &Matrix4<Real>,
    plane_world: &Matrix4<Real>,
) -> Option<Matrix4<Real>> {
    mesh_world.try_inverse().map(|inverse| inverse * plane_world)
}

impl SplitJob {
    pub fn new(
        scene: &Scene,
        model: NodeId,
        plane: CuttingPlane,
        config: &CutConfig,
    ) -> Result<Self, CutError> {
        let root = scene.node(model).ok_or(CutError::MissingNode(model))?;
        let model_transform = scene
            .world_transform(model)
            .ok_or(CutError::MissingNode(model))?;
        let bounds = scene.world_bounds(model).ok_or_else(|| CutError::Evaluation {
            mesh: root.name.clone(),
            reason: "model has no geometry".to_string(),
        })?;
        let model_diagonal = aabb_diagonal(&bounds);

        let tasks = scene
            .leaf_meshes(model)
            .into_iter()
            .filter_map(|leaf| {
                let node = scene.node(leaf)?;
                let mesh = node.mesh.as_ref()?;
                Some(SplitTask {
                    node: leaf,
                    name: node.name.clone(),
                    geometry: Arc::clone(&mesh.geometry),
                    materials: mesh.materials.clone(),
                    world: scene.world_transform(leaf)?,
                    relative: scene.transform_relative_to(leaf, model)?,
                })
            })
            .collect::<Vec<_>>();

        let half_size = 0.5 * config.plane_size_factor * model_diagonal.max(Real::EPSILON);
        debug!(
            model = %root.name,
            meshes = tasks.len(),
            diagonal = model_diagonal,
            plane_half_size = half_size,
            "prepared split job"
        );

        Ok(SplitJob {
            tasks,
            next: 0,
            meshes_per_tick: config.meshes_per_tick.max(1),
            plane_geometry: Mesh::plane_quad(half_size, CAP_MATERIAL_SLOT),
            plane_world: plane.world_transform(),
            output: SplitOutput {
                model,
                model_name: root.name.clone(),
                plane,
                model_transform,
                model_diagonal,
                fragments: Vec::new(),
                skipped: Vec::new(),
            },
        })
    }

    pub fn progress(&self) -> SplitProgress {
        SplitProgress {
            processed: self.next,
            total: self.tasks.len(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.tasks.len()
    }

    /// Split the next chunk of leaf meshes.
    pub fn step<E: BooleanEvaluator + ?Sized>(&mut self, evaluator: &E) -> SplitProgress {
        let end = (self.next + self.meshes_per_tick).min(self.tasks.len());
        while self.next < end {
            let task = &self.tasks[self.next];
            match split_one(task, &self.plane_geometry, &self.plane_world, evaluator) {
                Ok(fragments) => {
                    debug!(mesh = %task.name, fragments = fragments.len(), "split mesh");
                    self.output.fragments.extend(fragments);
                },
                Err(err) => {
                    warn!(mesh = %task.name, error = %err, "skipping mesh");
                    self.output.skipped.push((task.node, err));
                },
            }
            self.next += 1;
        }
        self.progress()
    }

    /// Run the remaining meshes and return the output.
    pub fn run<E: BooleanEvaluator + ?Sized>(mut self, evaluator: &E) -> SplitOutput {
        while !self.is_done() {
            self.step(evaluator);
        }
        self.output
    }

    /// Output collected so far. Meshes not yet stepped are missing from it.
    pub fn finish(self) -> SplitOutput {
        self.output
    }
}

fn split_one<E: BooleanEvaluator + ?Sized>(
    task: &SplitTask,
    plane_geometry: &Mesh,
    plane_world: &Matrix4<Real>,
    evaluator: &E,
) -> Result<Vec<Fragment>, CutError> {
    let local = plane_in_mesh_frame(&task.world, plane_world)
        .ok_or_else(|| CutError::SingularTransform(task.name.clone()))?;
    let local_plane = plane_geometry
        .transformed(&local)
        .ok_or_else(|| CutError::SingularTransform(task.name.clone()))?;

    let mesh_brush = Brush::at_identity(&task.geometry);
    let plane_brush = Brush::at_identity(&local_plane);

    let sides = [
        (CutSide::Subtraction, BooleanOp::Subtraction),
        (CutSide::Intersection, BooleanOp::Intersection),
    ];
    let mut results = Vec::with_capacity(2);
    for (side, op) in sides {
        let geometry = evaluator
            .evaluate(&mesh_brush, &plane_brush, op)
            .map_err(|err| match err {
                CutError::Evaluation { .. } => err,
                other => CutError::Evaluation {
                    mesh: task.name.clone(),
                    reason: other.to_string(),
                },
            })?;
        results.push((side, geometry));
    }

    Ok(results
        .into_iter()
        .filter(|(_, geometry)| !geometry.is_empty())
        .map(|(side, geometry)| {
            let (geometry, materials) = rebase_cap_material(geometry, &task.materials);
            Fragment {
                side,
                source: task.node,
                name: task.name.clone(),
                geometry: Arc::new(geometry),
                materials,
                transform: task.relative,
            }
        })
        .collect())
}

/// Give the cap polygons the first material of the source mesh and duplicate
/// the material list. Out-of-range slots are clamped the same way.
fn rebase_cap_material(mut geometry: Mesh, materials: &[Material]) -> (Mesh, Vec<Material>) {
    let mut materials: Vec<Material> = materials.iter().map(Material::duplicate).collect();
    if materials.is_empty() {
        materials.push(Material::new("cut", [0.8, 0.8, 0.8, 1.0]));
    }
    let last = materials.len() - 1;
    for polygon in &mut geometry.polygons {
        if polygon.material == CAP_MATERIAL_SLOT {
            polygon.material = 0;
        } else if polygon.material > last {
            polygon.material = last;
        }
    }
    (geometry, materials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boolean::BspEvaluator;
    use crate::scene::NodeDesc;
    use nalgebra::{Point3, Vector3};

    fn two_box_model(scene: &mut Scene) -> NodeId {
        let leaf = |name: &str, offset: Vector3<Real>| {
            NodeDesc::leaf(
                name,
                Arc::new(Mesh::cuboid(Vector3::new(2.0, 2.0, 2.0), 0)),
                vec![Material::new(name, [0.5, 0.5, 0.5, 1.0])],
            )
            .with_transform(Matrix4::new_translation(&offset))
        };
        scene.add_root(
            NodeDesc::group("model")
                .with_child(leaf("left", Vector3::new(-3.0, 0.0, 0.0)))
                .with_child(leaf("right", Vector3::new(3.0, 0.0, 0.0))),
        )
    }

    #[test]
    fn plane_in_mesh_frame_round_trip() {
        let mesh_world = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0))
            * Matrix4::new_rotation(Vector3::new(0.3, -0.2, 0.9))
            * Matrix4::new_scaling(2.0);
        let plane = CuttingPlane::new(Vector3::new(1.0, 1.0, 0.0), Point3::new(0.5, 0.0, -1.0))
            .unwrap();
        let plane_world = plane.world_transform();
        let local = plane_in_mesh_frame(&mesh_world, &plane_world).unwrap();

        let p = Point3::new(0.7, -1.3, 0.0);
        let via_local = mesh_world.transform_point(&local.transform_point(&p));
        assert!((via_local - plane_world.transform_point(&p)).norm() < 1e-9);
    }

    #[test]
    fn steps_one_mesh_per_tick() {
        let mut scene = Scene::new();
        let model = two_box_model(&mut scene);
        let plane = CuttingPlane::new(Vector3::y(), Point3::origin()).unwrap();
        let mut job = SplitJob::new(&scene, model, plane, &CutConfig::default()).unwrap();

        assert_eq!(job.progress().percent(), 0);
        assert_eq!(job.step(&BspEvaluator).percent(), 50);
        assert!(!job.is_done());
        assert_eq!(job.step(&BspEvaluator).percent(), 100);
        assert!(job.is_done());

        let output = job.finish();
        assert_eq!(output.fragments.len(), 4);
        assert_eq!(output.side(CutSide::Subtraction).count(), 2);
        for fragment in &output.fragments {
            assert!((fragment.geometry.volume() - 4.0).abs() < 1e-6);
            let source = scene.node(fragment.source).unwrap();
            let original = &source.mesh.as_ref().unwrap().materials[0];
            assert_ne!(fragment.materials[0].id, original.id);
            assert_eq!(fragment.transform, source.transform);
        }
    }

    #[test]
    fn plane_missing_a_mesh_keeps_it_whole_on_one_side() {
        let mut scene = Scene::new();
        let model = two_box_model(&mut scene);
        // x = 3 plane crosses the right box only
        let plane = CuttingPlane::new(Vector3::x(), Point3::new(3.0, 0.0, 0.0)).unwrap();
        let output = SplitJob::new(&scene, model, plane, &CutConfig::default())
            .unwrap()
            .run(&BspEvaluator);

        assert_eq!(output.side(CutSide::Subtraction).count(), 1);
        assert_eq!(output.side(CutSide::Intersection).count(), 2);
        let whole = output
            .side(CutSide::Intersection)
            .find(|f| f.name == "left")
            .unwrap();
        assert!((whole.geometry.volume() - 8.0).abs() < 1e-6);
    }

    #[test]
    fn singular_mesh_is_skipped() {
        let mut scene = Scene::new();
        let model = scene.add_root(
            NodeDesc::group("model")
                .with_child(
                    NodeDesc::leaf(
                        "flat",
                        Arc::new(Mesh::cuboid(Vector3::new(2.0, 2.0, 2.0), 0)),
                        vec![Material::new("m", [1.0; 4])],
                    )
                    .with_transform(Matrix4::new_nonuniform_scaling(&Vector3::new(
                        1.0, 0.0, 1.0,
                    ))),
                )
                .with_child(NodeDesc::leaf(
                    "solid",
                    Arc::new(Mesh::cuboid(Vector3::new(2.0, 2.0, 2.0), 0)),
                    vec![Material::new("m", [1.0; 4])],
                )),
        );
        let plane = CuttingPlane::new(Vector3::z(), Point3::origin()).unwrap();
        let output = SplitJob::new(&scene, model, plane, &CutConfig::default())
            .unwrap()
            .run(&BspEvaluator);

        assert_eq!(output.skipped.len(), 1);
        assert!(matches!(output.skipped[0].1, CutError::SingularTransform(_)));
        assert_eq!(output.fragments.len(), 2);
    }
}
