use glam::Quat;

use kagura_core::AnimationError;

use crate::pose::Pose;
use crate::skeleton::Skeleton;

/// A bone that appends part of another bone's local motion to its own.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantBone {
    pub bone: usize,
    pub source: usize,
    pub ratio: f32,
    pub affect_rotation: bool,
    pub affect_position: bool,
}

#[derive(Debug, Clone)]
pub struct GrantSolver {
    grants: Vec<GrantBone>,
}

impl GrantSolver {
    pub fn new(grants: Vec<GrantBone>, skeleton: &Skeleton) -> Result<Self, AnimationError> {
        for grant in &grants {
            skeleton.check_index(grant.bone, "grant bone")?;
            skeleton.check_index(grant.source, "grant source")?;
        }
        Ok(Self { grants })
    }

    #[inline]
    #[must_use]
    pub fn grants(&self) -> &[GrantBone] {
        &self.grants
    }

    /// Applies grants in declaration order, then refreshes world transforms.
    ///
    /// Sources are read from `pose` as it stands, so a grant that depends on
    /// another grant must be declared after it.
    pub fn apply(&self, skeleton: &Skeleton, pose: &mut Pose) {
        let rest = skeleton.rest_pose();

        for grant in &self.grants {
            if grant.affect_rotation {
                let appended = Quat::IDENTITY.slerp(pose.rotation(grant.source), grant.ratio);
                pose.set_rotation(grant.bone, (pose.rotation(grant.bone) * appended).normalize());
            }
            if grant.affect_position {
                let offset = pose.translation(grant.source) - rest.translation(grant.source);
                pose.set_translation(grant.bone, pose.translation(grant.bone) + offset * grant.ratio);
            }
        }

        if !self.grants.is_empty() {
            pose.update_world(skeleton);
        }
    }
}
