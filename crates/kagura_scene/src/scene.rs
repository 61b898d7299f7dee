use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use kagura_animation::SkinnedMesh;
use kagura_core::MeshId;

new_key_type! {
    pub struct MeshKey;
}

/// Converts a `0xRRGGBB` hex color to RGB in `[0, 1]`.
#[must_use]
pub fn color_from_hex(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
    /// Unit vector pointing towards the light
    pub direction: Vec3,
}

/// A skinned mesh placed in the scene.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub mesh: Arc<SkinnedMesh>,
    pub position: Vec3,
    pub visible: bool,
}

/// Everything the renderer draws besides the sky and helper overlays.
#[derive(Debug)]
pub struct Scene {
    pub background: Vec3,
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    meshes: SlotMap<MeshKey, MeshInstance>,
    lookup: FxHashMap<MeshId, MeshKey>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// White background with a dim ambient light and one warm key light.
    #[must_use]
    pub fn new() -> Self {
        Self {
            background: color_from_hex(0xff_ffff),
            ambient: AmbientLight {
                color: color_from_hex(0x66_6666),
                intensity: 1.0,
            },
            directional: DirectionalLight {
                color: color_from_hex(0x88_7766),
                intensity: 1.0,
                direction: Vec3::new(-1.0, 1.0, 1.0).normalize(),
            },
            meshes: SlotMap::with_key(),
            lookup: FxHashMap::default(),
        }
    }

    /// Adds a mesh, or moves it if its id is already present.
    pub fn add_mesh(&mut self, mesh: Arc<SkinnedMesh>, position: Vec3) -> MeshKey {
        let id = mesh.id;
        if let Some(&key) = self.lookup.get(&id)
            && let Some(instance) = self.meshes.get_mut(key)
        {
            instance.mesh = mesh;
            instance.position = position;
            return key;
        }

        log::debug!("Scene: added '{}' at {position}", mesh.name);
        let key = self.meshes.insert(MeshInstance {
            mesh,
            position,
            visible: true,
        });
        self.lookup.insert(id, key);
        key
    }

    pub fn remove_mesh(&mut self, id: &MeshId) -> Option<MeshInstance> {
        let key = self.lookup.remove(id)?;
        self.meshes.remove(key)
    }

    #[must_use]
    pub fn get(&self, id: &MeshId) -> Option<&MeshInstance> {
        self.lookup.get(id).and_then(|&key| self.meshes.get(key))
    }

    pub fn get_mut(&mut self, id: &MeshId) -> Option<&mut MeshInstance> {
        self.lookup.get(id).and_then(|&key| self.meshes.get_mut(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn meshes(&self) -> impl Iterator<Item = &MeshInstance> {
        self.meshes.values()
    }
}
