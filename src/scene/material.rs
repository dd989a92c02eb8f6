//! Surface materials attached to leaf meshes.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a material instance.
///
/// Two materials with the same id are the same instance; [`Material::duplicate`]
/// is the only way to obtain a new one from an existing material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(u64);

impl MaterialId {
    pub fn fresh() -> Self {
        MaterialId(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Metallic-roughness material, the subset that survives a GLB round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
}

impl Material {
    pub fn new(name: impl Into<String>, base_color: [f32; 4]) -> Self {
        Material {
            id: MaterialId::fresh(),
            name: name.into(),
            base_color,
            metallic: 0.0,
            roughness: 1.0,
        }
    }

    pub const fn with_pbr(mut self, metallic: f32, roughness: f32) -> Self {
        self.metallic = metallic;
        self.roughness = roughness;
        self
    }

    /// Copy of this material with a new identity.
    ///
    /// `Clone` keeps the id and is used where the exact instance has to come
    /// back (selection restore); split fragments use this instead.
    pub fn duplicate(&self) -> Self {
        Material {
            id: MaterialId::fresh(),
            ..self.clone()
        }
    }

    /// Whether the material needs alpha blending on export.
    pub fn is_translucent(&self) -> bool {
        self.base_color[3] < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_gets_fresh_identity() {
        let red = Material::new("red", [1.0, 0.0, 0.0, 1.0]);
        let copy = red.duplicate();
        assert_ne!(copy.id, red.id);
        assert_eq!(copy.name, red.name);
        assert_eq!(red.clone().id, red.id);
    }
}
