//! Arena-backed scene graph.
//!
//! Nodes live in a slot vector addressed by [`NodeId`]. A removed node leaves
//! an empty slot behind, so ids handed out earlier never alias a new node.

use crate::errors::CutError;
use crate::float_types::{Real, parry3d::bounding_volume::Aabb};
use crate::mesh::{Mesh, merge_aabb};
use nalgebra::{Matrix4, Point3, Vector3};
use std::sync::Arc;

pub mod camera;
pub mod material;

pub use camera::{Camera, Projection, Viewport};
pub use material::{Material, MaterialId};

/// Handle of a node in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Geometry and materials of a renderable node. Polygons index into
/// `materials` through their material slot.
#[derive(Debug, Clone)]
pub struct LeafMesh {
    pub geometry: Arc<Mesh>,
    pub materials: Vec<Material>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: Matrix4<Real>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub mesh: Option<LeafMesh>,
}

/// Detached node hierarchy, the form a parsed model or an assembled part takes
/// before it is inserted into a [`Scene`].
#[derive(Debug, Clone)]
pub struct NodeDesc {
    pub name: String,
    pub transform: Matrix4<Real>,
    pub mesh: Option<LeafMesh>,
    pub children: Vec<NodeDesc>,
}

impl NodeDesc {
    pub fn group(name: impl Into<String>) -> Self {
        NodeDesc {
            name: name.into(),
            transform: Matrix4::identity(),
            mesh: None,
            children: Vec::new(),
        }
    }

    pub fn leaf(name: impl Into<String>, geometry: Arc<Mesh>, materials: Vec<Material>) -> Self {
        NodeDesc {
            mesh: Some(LeafMesh {
                geometry,
                materials,
            }),
            ..NodeDesc::group(name)
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<Real>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: NodeDesc) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
    roots: Vec<NodeId>,
}

/// Nearest ray hit on a leaf mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneHit {
    pub node: NodeId,
    pub point: Point3<Real>,
    /// Ray parameter of the hit, in units of the ray direction.
    pub toi: Real,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Insert a hierarchy as a new root and return the root's id.
    pub fn add_root(&mut self, desc: NodeDesc) -> NodeId {
        let id = self.insert(desc, None);
        self.roots.push(id);
        id
    }

    fn insert(&mut self, desc: NodeDesc, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            name: desc.name,
            transform: desc.transform,
            parent,
            children: Vec::new(),
            mesh: desc.mesh,
        }));
        let children: Vec<NodeId> = desc
            .children
            .into_iter()
            .map(|child| self.insert(child, Some(id)))
            .collect();
        if let Some(node) = self.node_mut(id) {
            node.children = children;
        }
        id
    }

    /// `id` followed by all of its descendants, depth first.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Nodes below (and including) `id` that carry a mesh.
    pub fn leaf_meshes(&self, id: NodeId) -> Vec<NodeId> {
        self.subtree(id)
            .into_iter()
            .filter(|n| self.node(*n).is_some_and(|node| node.mesh.is_some()))
            .collect()
    }

    /// Product of the transforms from the scene root down to `id`.
    pub fn world_transform(&self, id: NodeId) -> Option<Matrix4<Real>> {
        let mut node = self.node(id)?;
        let mut world = node.transform;
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            world = node.transform * world;
        }
        Some(world)
    }

    /// Transform of `id` expressed in the frame of its ancestor `ancestor`
    /// (the ancestor's own transform is excluded). `None` when `ancestor` is not
    /// on the path to the root.
    pub fn transform_relative_to(&self, id: NodeId, ancestor: NodeId) -> Option<Matrix4<Real>> {
        if id == ancestor {
            return Some(Matrix4::identity());
        }
        let mut node = self.node(id)?;
        let mut relative = node.transform;
        loop {
            let parent = node.parent?;
            if parent == ancestor {
                return Some(relative);
            }
            node = self.node(parent)?;
            relative = node.transform * relative;
        }
    }

    /// World-space bounds of every mesh below `id`, `None` when there is none.
    pub fn world_bounds(&self, id: NodeId) -> Option<Aabb> {
        self.leaf_meshes(id)
            .into_iter()
            .filter_map(|leaf| {
                let world = self.world_transform(leaf)?;
                self.node(leaf)?.mesh.as_ref()?.geometry.bounds_under(&world)
            })
            .reduce(|a, b| merge_aabb(&a, &b))
    }

    /// Nearest intersection of a world-space ray with any mesh below `id`.
    pub fn ray_cast(
        &self,
        id: NodeId,
        origin: &Point3<Real>,
        direction: &Vector3<Real>,
    ) -> Option<SceneHit> {
        self.leaf_meshes(id)
            .into_iter()
            .filter_map(|leaf| {
                let world = self.world_transform(leaf)?;
                let inverse = world.try_inverse()?;
                let local_origin = inverse.transform_point(origin);
                let local_dir = inverse.transform_vector(direction);
                let mesh = self.node(leaf)?.mesh.as_ref()?;
                // An affine map keeps the ray parameter, so `toi` compares
                // across meshes.
                let (point, toi) = mesh
                    .geometry
                    .ray_intersections(&local_origin, &local_dir)
                    .into_iter()
                    .find(|(_, toi)| *toi >= 0.0)?;
                Some(SceneHit {
                    node: leaf,
                    point: world.transform_point(&point),
                    toi,
                })
            })
            .min_by(|a, b| a.toi.total_cmp(&b.toi))
    }

    /// Remove `id` and its descendants. Returns the number of removed nodes.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        let ids = self.subtree(id);
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            if let Some(parent) = self.node_mut(parent) {
                parent.children.retain(|c| *c != id);
            }
        }
        self.roots.retain(|r| *r != id);
        for removed in &ids {
            self.nodes[removed.0] = None;
        }
        ids.len()
    }

    /// Swap the root `old` for the given hierarchies in one step. The new roots
    /// take the old root's place in the root order.
    ///
    /// Fails without touching the scene when `old` is not a live root.
    pub fn replace_root(
        &mut self,
        old: NodeId,
        replacements: Vec<NodeDesc>,
    ) -> Result<Vec<NodeId>, CutError> {
        let position = self
            .roots
            .iter()
            .position(|r| *r == old)
            .ok_or(CutError::MissingNode(old))?;
        if !self.contains(old) {
            return Err(CutError::MissingNode(old));
        }

        self.remove_subtree(old);
        let ids: Vec<NodeId> = replacements
            .into_iter()
            .map(|desc| self.insert(desc, None))
            .collect();
        self.roots.splice(position..position, ids.iter().copied());
        Ok(ids)
    }
}
