//! Rigid-body stage of the per-frame update.
//!
//! # Overview
//!
//! The coordinator talks to physics through [`PhysicsWorld`]. A world is
//! built per entity from the rig's [`PhysicsRig`] by a [`PhysicsFactory`];
//! the default factory builds a [`RigidBodyWorld`].
//!
//! Each frame the world is stepped against the animated (IK-corrected) pose
//! and then writes the simulated bone rotations back, overriding animation
//! for every dynamic body.
//!
//! [`RigidBodyWorld`] is deliberately small: every dynamic body is a bone
//! whose tip is a verlet particle pulled by gravity, softly sprung towards
//! its animated position and held at a fixed distance from the bone head.
//! Time advances in fixed `unit_step` sub-steps with at most
//! `max_step_num` sub-steps per call; leftover time carries over.

use std::sync::Arc;

use glam::{Quat, Vec3};

use kagura_core::AnimationError;

use crate::pose::Pose;
use crate::skeleton::Skeleton;

/// Offsets shorter than this make a dynamic body behave as static.
const MIN_TIP_LENGTH: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsSettings {
    /// Fixed simulation sub-step, seconds
    pub unit_step: f32,
    /// Upper bound on sub-steps per `step` call
    pub max_step_num: u32,
    pub gravity: Vec3,
    /// Steps run right after a world is created
    pub warmup_steps: u32,
    /// Velocity damping for bodies that do not set their own
    pub damping: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            unit_step: 1.0 / 65.0,
            max_step_num: 3,
            gravity: Vec3::new(0.0, -98.0, 0.0),
            warmup_steps: 60,
            damping: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    /// Follows its bone; never simulated
    #[default]
    Static,
    /// Simulated; the result overrides the bone's rotation
    Dynamic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyDesc {
    pub name: String,
    pub bone: usize,
    pub kind: BodyKind,
    /// Tip of the body in the bone's local frame
    pub tip: Vec3,
    pub damping: Option<f32>,
}

/// Spring between two bodies. Only its stiffness is modelled: the spring
/// pulls `body_b` back towards its animated orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct JointDesc {
    pub name: String,
    pub body_a: usize,
    pub body_b: usize,
    /// 0 leaves the body free, 1 pins it to the animation
    pub stiffness: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsRig {
    pub bodies: Vec<RigidBodyDesc>,
    pub joints: Vec<JointDesc>,
}

impl PhysicsRig {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

/// World-space pose of one body, for helper overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyTransform {
    pub body: usize,
    pub position: Vec3,
    pub rotation: Quat,
    pub dynamic: bool,
}

pub trait PhysicsWorld: Send {
    /// Drops all velocities and re-seeds bodies from `pose`.
    fn reset(&mut self, skeleton: &Skeleton, pose: &Pose);

    /// Advances the simulation by `dt` seconds against the animated `pose`.
    fn step(&mut self, dt: f32, skeleton: &Skeleton, pose: &Pose) -> Result<(), AnimationError>;

    /// Writes simulated bone rotations into `pose` (locals only).
    fn write_back(&self, skeleton: &Skeleton, pose: &mut Pose);

    fn body_transforms(&self) -> &[BodyTransform];

    /// Settles the bodies before the first visible frame.
    fn warmup(&mut self, steps: u32, unit_step: f32, skeleton: &Skeleton, pose: &Pose) -> Result<(), AnimationError> {
        for _ in 0..steps {
            self.step(unit_step, skeleton, pose)?;
        }
        Ok(())
    }
}

/// Builds a physics world for one entity.
pub type PhysicsFactory = Arc<
    dyn Fn(&PhysicsRig, &Skeleton, &PhysicsSettings) -> Result<Box<dyn PhysicsWorld>, AnimationError> + Send + Sync,
>;

/// The factory used unless the helper is given another one.
#[must_use]
pub fn default_physics_factory() -> PhysicsFactory {
    Arc::new(|rig, skeleton, settings| Ok(Box::new(RigidBodyWorld::new(rig, skeleton, settings.clone())?)))
}

#[derive(Debug, Clone)]
struct SimBody {
    desc_index: usize,
    name: String,
    bone: usize,
    dynamic: bool,
    tip_offset: Vec3,
    tip_length: f32,
    damping: f32,
    stiffness: f32,
    tip: Vec3,
    prev_tip: Vec3,
}

/// Built-in tip-particle integrator.
#[derive(Debug, Clone)]
pub struct RigidBodyWorld {
    settings: PhysicsSettings,
    /// Sorted by bone index so parents settle before children.
    bodies: Vec<SimBody>,
    working: Pose,
    animated_rotations: Vec<Quat>,
    accumulator: f32,
    transforms: Vec<BodyTransform>,
}

impl RigidBodyWorld {
    pub fn new(rig: &PhysicsRig, skeleton: &Skeleton, settings: PhysicsSettings) -> Result<Self, AnimationError> {
        let mut bodies = Vec::with_capacity(rig.bodies.len());

        for (index, desc) in rig.bodies.iter().enumerate() {
            skeleton.check_index(desc.bone, &format!("rigid body '{}'", desc.name))?;

            let stiffness = rig
                .joints
                .iter()
                .filter(|j| j.body_b == index)
                .map(|j| j.stiffness)
                .sum::<f32>()
                .clamp(0.0, 1.0);
            let tip_length = desc.tip.length();

            bodies.push(SimBody {
                desc_index: index,
                name: desc.name.clone(),
                bone: desc.bone,
                dynamic: desc.kind == BodyKind::Dynamic && tip_length >= MIN_TIP_LENGTH,
                tip_offset: desc.tip,
                tip_length,
                damping: desc.damping.unwrap_or(settings.damping).clamp(0.0, 1.0),
                stiffness,
                tip: Vec3::ZERO,
                prev_tip: Vec3::ZERO,
            });
        }

        for joint in &rig.joints {
            for body in [joint.body_a, joint.body_b] {
                if body >= rig.bodies.len() {
                    return Err(AnimationError::InvalidSkeleton(format!(
                        "joint '{}' references rigid body {body}, but the rig has {}",
                        joint.name,
                        rig.bodies.len()
                    )));
                }
            }
        }

        bodies.sort_by_key(|b| b.bone);

        let mut world = Self {
            settings,
            bodies,
            working: skeleton.rest_pose().clone(),
            animated_rotations: Vec::new(),
            accumulator: 0.0,
            transforms: Vec::new(),
        };
        world.reset(skeleton, skeleton.rest_pose());
        Ok(world)
    }

    #[must_use]
    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    fn animated_tip(&self, body: &SimBody) -> Vec3 {
        self.working.world_position(body.bone) + self.working.world_rotation(body.bone) * body.tip_offset
    }

    fn substep(&mut self, skeleton: &Skeleton, h: f32) {
        let gravity = self.settings.gravity * h * h;

        for i in 0..self.bodies.len() {
            let bone = self.bodies[i].bone;

            // Start from the animated local rotation under the simulated parent.
            self.working.set_rotation(bone, self.animated_rotations[bone]);
            self.working.update_world_from(skeleton, bone);

            let body = &self.bodies[i];
            let target = self.animated_tip(body);
            if !body.dynamic {
                let body = &mut self.bodies[i];
                body.tip = target;
                body.prev_tip = target;
                continue;
            }

            let anchor = self.working.world_position(bone);
            let velocity = (body.tip - body.prev_tip) * (1.0 - body.damping);
            let free = body.tip + velocity + gravity + (target - body.tip) * body.stiffness;
            let rest_dir = (target - anchor) / body.tip_length;
            let constrained = anchor + (free - anchor).normalize_or(rest_dir) * body.tip_length;

            let world_rotation = self.working.world_rotation(bone);
            let delta = Quat::from_rotation_arc(rest_dir.normalize_or(Vec3::Y), (constrained - anchor) / body.tip_length);
            let aimed = (delta * world_rotation).normalize();

            let body = &mut self.bodies[i];
            body.prev_tip = body.tip;
            body.tip = constrained;

            self.working.set_world_rotation(skeleton, bone, aimed);
            self.working.update_world_from(skeleton, bone);
        }
    }

    fn refresh_transforms(&mut self) {
        self.transforms.clear();
        for body in &self.bodies {
            self.transforms.push(BodyTransform {
                body: body.desc_index,
                position: self.working.world_position(body.bone),
                rotation: self.working.world_rotation(body.bone),
                dynamic: body.dynamic,
            });
        }
        self.transforms.sort_by_key(|t| t.body);
    }

    fn capture(&mut self, skeleton: &Skeleton, pose: &Pose) {
        self.working.clone_from(pose);
        self.animated_rotations.clear();
        self.animated_rotations
            .extend((0..skeleton.len()).map(|bone| pose.rotation(bone)));
    }
}

impl PhysicsWorld for RigidBodyWorld {
    fn reset(&mut self, skeleton: &Skeleton, pose: &Pose) {
        self.capture(skeleton, pose);
        self.accumulator = 0.0;

        for i in 0..self.bodies.len() {
            let tip = self.animated_tip(&self.bodies[i]);
            let body = &mut self.bodies[i];
            body.tip = tip;
            body.prev_tip = tip;
        }
        self.refresh_transforms();
    }

    fn step(&mut self, dt: f32, skeleton: &Skeleton, pose: &Pose) -> Result<(), AnimationError> {
        self.capture(skeleton, pose);

        let unit = self.settings.unit_step;
        self.accumulator += dt;
        let mut steps = (self.accumulator / unit).floor().max(0.0) as u32;
        self.accumulator -= steps as f32 * unit;
        steps = steps.min(self.settings.max_step_num);

        if steps == 0 {
            // Keep the previous simulated rotations on top of the new animation.
            for body in self.bodies.iter().filter(|b| b.dynamic) {
                let tip_dir = (body.tip - self.working.world_position(body.bone)).normalize_or(Vec3::Y);
                let parent = skeleton
                    .parent(body.bone)
                    .map_or(Quat::IDENTITY, |p| self.working.world_rotation(p));
                let current = parent * self.animated_rotations[body.bone];
                let delta = Quat::from_rotation_arc((current * body.tip_offset).normalize_or(Vec3::Y), tip_dir);
                self.working.set_world_rotation(skeleton, body.bone, (delta * current).normalize());
                self.working.update_world_from(skeleton, body.bone);
            }
        }

        for _ in 0..steps {
            self.substep(skeleton, unit);
        }

        if let Some(body) = self
            .bodies
            .iter()
            .find(|b| !b.tip.is_finite() || !self.working.rotation(b.bone).is_finite())
        {
            return Err(AnimationError::PhysicsDiverged {
                body: body.name.clone(),
            });
        }

        self.refresh_transforms();
        Ok(())
    }

    fn write_back(&self, _skeleton: &Skeleton, pose: &mut Pose) {
        for body in self.bodies.iter().filter(|b| b.dynamic) {
            pose.set_rotation(body.bone, self.working.rotation(body.bone));
        }
    }

    fn body_transforms(&self) -> &[BodyTransform] {
        &self.transforms
    }
}
