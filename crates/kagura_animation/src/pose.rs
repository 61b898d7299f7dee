use glam::{Affine3A, Mat4, Quat, Vec3};

use crate::skeleton::Skeleton;

/// Runtime bone transforms and morph weights for one skinned mesh.
///
/// Local transforms are the source of truth; world transforms are derived by
/// [`Pose::update_world`] and are relative to the mesh origin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    translations: Vec<Vec3>,
    rotations: Vec<Quat>,
    world_positions: Vec<Vec3>,
    world_rotations: Vec<Quat>,
    morph_weights: Vec<f32>,
}

impl Pose {
    pub(crate) fn from_locals(translations: Vec<Vec3>, rotations: Vec<Quat>, morph_count: usize) -> Self {
        let count = translations.len();
        Self {
            translations,
            rotations,
            world_positions: vec![Vec3::ZERO; count],
            world_rotations: vec![Quat::IDENTITY; count],
            morph_weights: vec![0.0; morph_count],
        }
    }

    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.translations.len()
    }

    #[inline]
    #[must_use]
    pub fn translation(&self, bone: usize) -> Vec3 {
        self.translations[bone]
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self, bone: usize) -> Quat {
        self.rotations[bone]
    }

    #[inline]
    pub fn set_translation(&mut self, bone: usize, translation: Vec3) {
        self.translations[bone] = translation;
    }

    #[inline]
    pub fn set_rotation(&mut self, bone: usize, rotation: Quat) {
        self.rotations[bone] = rotation;
    }

    #[inline]
    #[must_use]
    pub fn world_position(&self, bone: usize) -> Vec3 {
        self.world_positions[bone]
    }

    #[inline]
    #[must_use]
    pub fn world_rotation(&self, bone: usize) -> Quat {
        self.world_rotations[bone]
    }

    #[must_use]
    pub fn world_matrix(&self, bone: usize) -> Affine3A {
        Affine3A::from_rotation_translation(self.world_rotations[bone], self.world_positions[bone])
    }

    #[inline]
    #[must_use]
    pub fn morph_weights(&self) -> &[f32] {
        &self.morph_weights
    }

    /// Resizes the morph weight table, zero-filling new entries.
    pub fn resize_morphs(&mut self, count: usize) {
        self.morph_weights.resize(count, 0.0);
    }

    #[inline]
    pub fn set_morph_weight(&mut self, morph: usize, weight: f32) {
        if let Some(w) = self.morph_weights.get_mut(morph) {
            *w = weight;
        }
    }

    /// Recomputes every world transform from local transforms.
    pub fn update_world(&mut self, skeleton: &Skeleton) {
        self.update_world_from(skeleton, 0);
    }

    /// Recomputes world transforms for bones `start..`.
    ///
    /// Bones before `start` must already be up to date. Because parents
    /// precede children this covers the whole subtree of `start`.
    pub fn update_world_from(&mut self, skeleton: &Skeleton, start: usize) {
        for i in start..self.translations.len() {
            match skeleton.parent(i) {
                Some(p) => {
                    let parent_rotation = self.world_rotations[p];
                    self.world_positions[i] = self.world_positions[p] + parent_rotation * self.translations[i];
                    self.world_rotations[i] = (parent_rotation * self.rotations[i]).normalize();
                }
                None => {
                    self.world_positions[i] = self.translations[i];
                    self.world_rotations[i] = self.rotations[i].normalize();
                }
            }
        }
    }

    /// Sets a bone's world rotation by solving for its local rotation.
    pub fn set_world_rotation(&mut self, skeleton: &Skeleton, bone: usize, world: Quat) {
        let parent_world = skeleton
            .parent(bone)
            .map_or(Quat::IDENTITY, |p| self.world_rotations[p]);
        self.rotations[bone] = (parent_world.inverse() * world).normalize();
    }

    /// Joint matrices for GPU skinning (`world * inverse_bind`).
    #[must_use]
    pub fn skinning_matrices(&self, skeleton: &Skeleton) -> Vec<Mat4> {
        skeleton
            .inverse_bind_matrices()
            .iter()
            .enumerate()
            .map(|(i, ibm)| Mat4::from(self.world_matrix(i) * *ibm))
            .collect()
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.translations.iter().all(|v| v.is_finite())
            && self.rotations.iter().all(|q| q.is_finite())
            && self.morph_weights.iter().all(|w| w.is_finite())
    }
}
