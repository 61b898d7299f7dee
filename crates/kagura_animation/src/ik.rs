//! Cyclic-coordinate-descent IK.
//!
//! Each chain names a goal bone (where the effector should end up), an
//! effector bone, and the links between them ordered from the effector
//! towards the root. Every iteration rotates each link so the
//! link→effector direction swings onto the link→goal direction.

use glam::{EulerRot, Quat, Vec3};
use smallvec::SmallVec;

use kagura_core::AnimationError;

use crate::pose::Pose;
use crate::skeleton::Skeleton;

/// Angles below this are treated as already solved.
const MIN_SOLVE_ANGLE: f32 = 1e-5;

#[derive(Debug, Clone, PartialEq)]
pub struct IkLink {
    pub bone: usize,
    /// Restricts the link to rotate about this axis only (knees).
    pub limitation: Option<Vec3>,
    /// Lower XYZ euler bound, radians
    pub rotation_min: Option<Vec3>,
    /// Upper XYZ euler bound, radians
    pub rotation_max: Option<Vec3>,
}

impl IkLink {
    #[must_use]
    pub fn new(bone: usize) -> Self {
        Self {
            bone,
            limitation: None,
            rotation_min: None,
            rotation_max: None,
        }
    }

    #[must_use]
    pub fn with_limitation(mut self, axis: Vec3) -> Self {
        self.limitation = Some(axis);
        self
    }

    #[must_use]
    pub fn with_rotation_limits(mut self, min: Vec3, max: Vec3) -> Self {
        self.rotation_min = Some(min);
        self.rotation_max = Some(max);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IkChain {
    pub name: String,
    /// Bone whose world position is the target
    pub goal: usize,
    /// Bone that should reach the goal
    pub effector: usize,
    /// Links ordered from the effector's parent towards the root
    pub links: SmallVec<[IkLink; 4]>,
    pub iterations: u32,
    /// Per-step rotation floor, radians
    pub min_angle: Option<f32>,
    /// Per-step rotation ceiling, radians
    pub max_angle: Option<f32>,
}

/// Solves every IK chain of one rig, in declaration order.
#[derive(Debug, Clone)]
pub struct IkSolver {
    chains: Vec<IkChain>,
}

impl IkSolver {
    /// Validates all bone references against `skeleton`.
    pub fn new(chains: Vec<IkChain>, skeleton: &Skeleton) -> Result<Self, AnimationError> {
        for chain in &chains {
            let context = format!("IK chain '{}'", chain.name);
            skeleton.check_index(chain.goal, &context)?;
            skeleton.check_index(chain.effector, &context)?;
            for link in &chain.links {
                skeleton.check_index(link.bone, &context)?;
            }
        }
        Ok(Self { chains })
    }

    #[inline]
    #[must_use]
    pub fn chains(&self) -> &[IkChain] {
        &self.chains
    }

    /// Runs every chain against `pose`, whose world transforms must be current.
    ///
    /// On return the world transforms reflect the solved rotations.
    pub fn solve(&self, skeleton: &Skeleton, pose: &mut Pose) -> Result<(), AnimationError> {
        for chain in &self.chains {
            solve_chain(chain, skeleton, pose);

            if !chain.links.iter().all(|l| pose.rotation(l.bone).is_finite()) {
                return Err(AnimationError::IkDiverged {
                    chain: chain.name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn solve_chain(chain: &IkChain, skeleton: &Skeleton, pose: &mut Pose) {
    let goal_position = pose.world_position(chain.goal);

    for _ in 0..chain.iterations {
        let mut rotated = false;

        for link in &chain.links {
            let link_position = pose.world_position(link.bone);
            let inv_link_rotation = pose.world_rotation(link.bone).inverse();

            let Some(effector_dir) =
                (inv_link_rotation * (pose.world_position(chain.effector) - link_position)).try_normalize()
            else {
                continue;
            };
            let Some(goal_dir) = (inv_link_rotation * (goal_position - link_position)).try_normalize() else {
                continue;
            };

            let mut angle = goal_dir.dot(effector_dir).clamp(-1.0, 1.0).acos();
            if angle < MIN_SOLVE_ANGLE {
                continue;
            }
            if let Some(min) = chain.min_angle {
                angle = angle.max(min);
            }
            if let Some(max) = chain.max_angle {
                angle = angle.min(max);
            }

            // Parallel but opposite vectors have no defined axis.
            let Some(axis) = effector_dir.cross(goal_dir).try_normalize() else {
                continue;
            };

            let mut rotation = (pose.rotation(link.bone) * Quat::from_axis_angle(axis, angle)).normalize();

            if let Some(limitation) = link.limitation {
                let c = rotation.w.min(1.0);
                let s = (1.0 - c * c).max(0.0).sqrt();
                rotation = Quat::from_xyzw(limitation.x * s, limitation.y * s, limitation.z * s, c);
            }

            if link.rotation_min.is_some() || link.rotation_max.is_some() {
                let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
                let mut euler = Vec3::new(x, y, z);
                if let Some(min) = link.rotation_min {
                    euler = euler.max(min);
                }
                if let Some(max) = link.rotation_max {
                    euler = euler.min(max);
                }
                rotation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);
            }

            pose.set_rotation(link.bone, rotation);
            pose.update_world_from(skeleton, link.bone);
            rotated = true;
        }

        if !rotated {
            break;
        }
    }
}
