use glam::{Affine3A, Quat, Vec3};
use rustc_hash::FxHashMap;

use kagura_core::AnimationError;

use crate::pose::Pose;

/// A single bone in bind pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Parent index. Parents always precede their children.
    pub parent: Option<usize>,
    /// Rest translation relative to the parent
    pub translation: Vec3,
    /// Rest rotation relative to the parent
    pub rotation: Quat,
}

impl Bone {
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<usize>, translation: Vec3) -> Self {
        Self {
            name: name.into(),
            parent,
            translation,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Bone hierarchy shared by every pose of a mesh.
///
/// The bone list is ordered parents-first so a single forward pass
/// propagates world transforms.
#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
    lookup: FxHashMap<String, usize>,
    /// Inverse of each bone's rest world transform
    inverse_bind_matrices: Vec<Affine3A>,
    rest_pose: Pose,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Result<Self, AnimationError> {
        let mut lookup = FxHashMap::default();

        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent
                && parent >= index
            {
                return Err(AnimationError::InvalidSkeleton(format!(
                    "bone '{}' (#{index}) lists parent #{parent}, which does not precede it",
                    bone.name
                )));
            }
            if !bone.translation.is_finite() || !bone.rotation.is_finite() {
                return Err(AnimationError::InvalidSkeleton(format!(
                    "bone '{}' has a non-finite rest transform",
                    bone.name
                )));
            }
            // First occurrence wins for duplicated names.
            lookup.entry(bone.name.clone()).or_insert(index);
        }

        let mut skeleton = Self {
            bones,
            lookup,
            inverse_bind_matrices: Vec::new(),
            rest_pose: Pose::default(),
        };

        let mut rest = Pose::from_locals(
            skeleton.bones.iter().map(|b| b.translation).collect(),
            skeleton.bones.iter().map(|b| b.rotation).collect(),
            0,
        );
        rest.update_world(&skeleton);

        skeleton.inverse_bind_matrices = (0..skeleton.bones.len())
            .map(|i| rest.world_matrix(i).inverse())
            .collect();
        skeleton.rest_pose = rest;

        Ok(skeleton)
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.bones.get(index).and_then(|b| b.parent)
    }

    /// Looks up a bone index by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Pose with every bone at rest and no morph applied.
    #[inline]
    #[must_use]
    pub fn rest_pose(&self) -> &Pose {
        &self.rest_pose
    }

    #[inline]
    #[must_use]
    pub fn inverse_bind_matrices(&self) -> &[Affine3A] {
        &self.inverse_bind_matrices
    }

    /// Validates a bone index coming from rig metadata.
    pub fn check_index(&self, index: usize, context: &str) -> Result<(), AnimationError> {
        if index < self.bones.len() {
            Ok(())
        } else {
            Err(AnimationError::BoneOutOfRange {
                context: context.to_string(),
                index,
                count: self.bones.len(),
            })
        }
    }
}
