//! Single-part selection with exact material restore.

use crate::errors::CutError;
use crate::scene::{Material, NodeId, Scene};
use hashbrown::HashMap;
use tracing::debug;

/// At most one selected part. While selected, every leaf of the part shows the
/// highlight material and its original materials are kept here.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    part: Option<NodeId>,
    saved: HashMap<NodeId, Vec<Material>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn selected(&self) -> Option<NodeId> {
        self.part
    }

    /// Original materials of every highlighted leaf.
    pub fn saved_materials(&self) -> &HashMap<NodeId, Vec<Material>> {
        &self.saved
    }

    /// Select `part`, restoring the previous selection first.
    pub fn select(
        &mut self,
        scene: &mut Scene,
        part: NodeId,
        highlight: &Material,
    ) -> Result<(), CutError> {
        if self.part == Some(part) {
            return Ok(());
        }
        if !scene.contains(part) {
            return Err(CutError::MissingNode(part));
        }
        self.clear(scene);

        for leaf in scene.leaf_meshes(part) {
            let Some(mesh) = scene.node_mut(leaf).and_then(|n| n.mesh.as_mut()) else {
                continue;
            };
            let highlighted = vec![highlight.clone(); mesh.materials.len()];
            let original = std::mem::replace(&mut mesh.materials, highlighted);
            self.saved.insert(leaf, original);
        }
        self.part = Some(part);
        debug!(part = part.index(), leaves = self.saved.len(), "selected part");
        Ok(())
    }

    /// Put the saved materials back and deselect.
    pub fn clear(&mut self, scene: &mut Scene) {
        for (leaf, materials) in self.saved.drain() {
            if let Some(mesh) = scene.node_mut(leaf).and_then(|n| n.mesh.as_mut()) {
                mesh.materials = materials;
            }
        }
        if let Some(part) = self.part.take() {
            debug!(part = part.index(), "cleared selection");
        }
    }

    /// Drop the selection without touching the scene, for when the part left it.
    pub fn forget(&mut self) {
        self.saved.clear();
        self.part = None;
    }
}
