use std::sync::Arc;

use kagura_core::MeshId;

use crate::grant::GrantBone;
use crate::ik::IkChain;
use crate::physics::PhysicsRig;
use crate::skeleton::Skeleton;

/// Rig data attached to a skinned mesh by its loader.
#[derive(Debug, Clone, Default)]
pub struct RigMetadata {
    pub ik_chains: Vec<IkChain>,
    pub grants: Vec<GrantBone>,
    pub physics: Option<PhysicsRig>,
}

/// The animation-facing half of a loaded character model.
///
/// Geometry lives with the renderer; this carries what the helper needs to
/// drive the bones.
#[derive(Debug, Clone)]
pub struct SkinnedMesh {
    pub id: MeshId,
    pub name: String,
    pub skeleton: Arc<Skeleton>,
    pub morph_names: Vec<String>,
    pub rig: RigMetadata,
}

impl SkinnedMesh {
    #[must_use]
    pub fn new(name: impl Into<String>, skeleton: Skeleton) -> Self {
        Self {
            id: MeshId::new(),
            name: name.into(),
            skeleton: Arc::new(skeleton),
            morph_names: Vec::new(),
            rig: RigMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: MeshId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_morphs(mut self, names: Vec<String>) -> Self {
        self.morph_names = names;
        self
    }

    #[must_use]
    pub fn with_rig(mut self, rig: RigMetadata) -> Self {
        self.rig = rig;
        self
    }

    #[must_use]
    pub fn has_physics_rig(&self) -> bool {
        self.rig.physics.as_ref().is_some_and(|p| !p.is_empty())
    }
}
