use std::sync::Arc;

use kagura_core::AnimationError;

use crate::Features;
use crate::action::{AnimationAction, LoopMode, PlaybackState};
use crate::binder::Binder;
use crate::clip::AnimationClip;
use crate::grant::GrantSolver;
use crate::ik::IkSolver;
use crate::mesh::SkinnedMesh;
use crate::physics::{BodyTransform, PhysicsFactory, PhysicsWorld};
use crate::pose::Pose;
use crate::settings::HelperSettings;

/// How a mesh should be driven once registered.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    pub clip: Option<Arc<AnimationClip>>,
    pub enable_physics: bool,
    pub loop_mode: LoopMode,
}

impl RegisterOptions {
    #[must_use]
    pub fn with_clip(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip: Some(clip),
            ..Default::default()
        }
    }
}

/// One registered mesh together with its per-stage solvers.
pub struct AnimatedEntity {
    mesh: Arc<SkinnedMesh>,
    action: Option<AnimationAction>,
    ik: Option<IkSolver>,
    grant: Option<GrantSolver>,
    physics: Option<Box<dyn PhysicsWorld>>,
    /// Output of the sampling stage; the base every IK pass starts from.
    sampled: Pose,
    /// Final pose after IK, grants and physics.
    pose: Pose,
    state: PlaybackState,
    cycle: u64,
}

impl AnimatedEntity {
    pub(crate) fn new(
        mesh: Arc<SkinnedMesh>,
        options: RegisterOptions,
        features: Features,
        settings: &HelperSettings,
        physics_factory: &PhysicsFactory,
    ) -> Result<Self, AnimationError> {
        let skeleton = Arc::clone(&mesh.skeleton);
        let rig = &mesh.rig;

        let action = options.clip.map(|clip| {
            let bindings = Binder::bind(&clip, &skeleton, &mesh.morph_names);
            AnimationAction::new(clip, bindings, options.loop_mode)
        });

        let ik = if rig.ik_chains.is_empty() {
            None
        } else {
            Some(IkSolver::new(rig.ik_chains.clone(), &skeleton)?)
        };

        let grant = if rig.grants.is_empty() {
            None
        } else {
            Some(GrantSolver::new(rig.grants.clone(), &skeleton)?)
        };

        let physics = match &rig.physics {
            Some(physics_rig) if options.enable_physics && !physics_rig.is_empty() => {
                Some(physics_factory(physics_rig, &skeleton, &settings.physics)?)
            }
            _ => None,
        };

        let mut sampled = skeleton.rest_pose().clone();
        sampled.resize_morphs(mesh.morph_names.len());

        let mut entity = Self {
            mesh,
            action,
            ik,
            grant,
            physics,
            pose: sampled.clone(),
            sampled,
            state: PlaybackState::Idle,
            cycle: 0,
        };

        entity.sample(0.0);
        if let Err(err) = entity.solve(features) {
            log::warn!("Initial solve failed for '{}', keeping the sampled pose: {err}", entity.mesh.name);
        }

        if let Some(physics) = entity.physics.as_mut() {
            let unit_step = settings.physics.unit_step;
            physics.reset(&skeleton, &entity.pose);
            physics.warmup(settings.physics.warmup_steps, unit_step, &skeleton, &entity.pose)?;
            physics.write_back(&skeleton, &mut entity.pose);
            entity.pose.update_world(&skeleton);
        }

        Ok(entity)
    }

    /// Runs one frame of the pipeline: sample, IK, grant, physics.
    pub(crate) fn update(&mut self, dt: f32, features: Features, settings: &HelperSettings) -> Result<(), AnimationError> {
        let mut looped = false;

        if features.contains(Features::ANIMATION)
            && let Some(action) = self.action.as_mut()
        {
            action.advance(dt);
            let playhead = action.playhead(settings.afterglow);
            looped = playhead.cycle != self.cycle;
            self.cycle = playhead.cycle;
            self.state = playhead.state;
            self.sample(playhead.clip_time);
        }

        self.solve(features)?;

        if features.contains(Features::PHYSICS)
            && let Some(physics) = self.physics.as_mut()
        {
            let skeleton = &self.mesh.skeleton;
            if looped && settings.reset_physics_on_loop {
                physics.reset(skeleton, &self.pose);
            }
            if let Err(err) = physics.step(dt, skeleton, &self.pose) {
                physics.reset(skeleton, &self.pose);
                return Err(err);
            }
            physics.write_back(skeleton, &mut self.pose);
            self.pose.update_world(skeleton);
        }

        Ok(())
    }

    fn sample(&mut self, clip_time: f32) {
        let skeleton = &self.mesh.skeleton;
        let Some(action) = self.action.as_mut() else {
            return;
        };

        self.sampled.clone_from(skeleton.rest_pose());
        self.sampled.resize_morphs(self.mesh.morph_names.len());
        action.apply(clip_time, &mut self.sampled);
        self.sampled.update_world(skeleton);
    }

    /// Rebuilds `pose` from the sampled pose and runs IK and grants on it.
    fn solve(&mut self, features: Features) -> Result<(), AnimationError> {
        let skeleton = &self.mesh.skeleton;
        self.pose.clone_from(&self.sampled);

        if features.contains(Features::IK)
            && let Some(ik) = &self.ik
            && let Err(err) = ik.solve(skeleton, &mut self.pose)
        {
            self.pose.clone_from(&self.sampled);
            return Err(err);
        }

        if features.contains(Features::GRANT)
            && let Some(grant) = &self.grant
        {
            grant.apply(skeleton, &mut self.pose);
        }

        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> &Arc<SkinnedMesh> {
        &self.mesh
    }

    #[must_use]
    pub fn action(&self) -> Option<&AnimationAction> {
        self.action.as_ref()
    }

    /// Accumulated playback time, or zero without a clip.
    #[must_use]
    pub fn local_time(&self) -> f64 {
        self.action.as_ref().map_or(0.0, AnimationAction::local_time)
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// The observable pose after every enabled stage.
    #[inline]
    #[must_use]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// The pose as sampled from the clip, before IK.
    #[inline]
    #[must_use]
    pub fn sampled_pose(&self) -> &Pose {
        &self.sampled
    }

    #[must_use]
    pub fn ik(&self) -> Option<&IkSolver> {
        self.ik.as_ref()
    }

    #[must_use]
    pub fn has_ik(&self) -> bool {
        self.ik.is_some()
    }

    #[must_use]
    pub fn has_grants(&self) -> bool {
        self.grant.is_some()
    }

    #[must_use]
    pub fn has_physics(&self) -> bool {
        self.physics.is_some()
    }

    /// Rigid-body transforms for overlays; empty without physics.
    #[must_use]
    pub fn body_transforms(&self) -> &[BodyTransform] {
        match &self.physics {
            Some(physics) => physics.body_transforms(),
            None => &[],
        }
    }
}

impl std::fmt::Debug for AnimatedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimatedEntity")
            .field("mesh", &self.mesh.id)
            .field("state", &self.state)
            .field("local_time", &self.local_time())
            .field("ik", &self.ik.is_some())
            .field("physics", &self.physics.is_some())
            .finish_non_exhaustive()
    }
}
