//! Animation Helper Tests
//!
//! Tests for:
//! - Local time accumulation and delta validation
//! - Feature toggles (animation freeze, IK on/off)
//! - Stage ordering: IK after sampling, physics over animation
//! - Playback state transitions with and without afterglow
//! - Register / unregister lifecycle
//! - Failure isolation between entities

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Quat, Vec3};
use smallvec::smallvec;

use kagura::animation::{
    AnimationClip, AnimationHelper, BodyKind, BodyTransform, Bone, Features, GrantBone, HelperSettings, IkChain, IkLink,
    InterpolationMode, KeyframeTrack, LoopMode, PhysicsFactory, PhysicsRig, PhysicsSettings, PhysicsWorld,
    PlaybackState, Pose, RegisterOptions, RigMetadata, RigidBodyDesc, Skeleton, SkinnedMesh, Track,
};
use kagura::{AnimationError, MeshId};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn time_approx(a: f64, b: f64) -> bool {
    (a - b).abs() < f64::from(EPSILON)
}

fn quat_approx(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() > 1.0 - EPSILON
}

// ============================================================================
// Fixtures
// ============================================================================

fn arm_mesh(name: &str) -> Arc<SkinnedMesh> {
    let skeleton = Skeleton::new(vec![
        Bone::new("root", None, Vec3::ZERO),
        Bone::new("arm", Some(0), Vec3::new(0.0, 2.0, 0.0)),
    ])
    .unwrap();
    Arc::new(SkinnedMesh::new(name, skeleton).with_morphs(vec!["smile".into()]))
}

/// Two seconds: the arm swings a quarter turn and the smile fades in.
fn wave_clip() -> Arc<AnimationClip> {
    Arc::new(AnimationClip::new(
        "wave",
        vec![
            Track::bone_rotation(
                "arm",
                KeyframeTrack::new(
                    vec![0.0, 2.0],
                    vec![Quat::IDENTITY, Quat::from_rotation_z(FRAC_PI_2)],
                    InterpolationMode::Linear,
                ),
            ),
            Track::morph_weight(
                "smile",
                KeyframeTrack::new(vec![0.0, 2.0], vec![0.0, 1.0], InterpolationMode::Linear),
            ),
        ],
    ))
}

fn play(clip: Arc<AnimationClip>, loop_mode: LoopMode) -> RegisterOptions {
    RegisterOptions {
        clip: Some(clip),
        enable_physics: true,
        loop_mode,
    }
}

/// root -> upper -> lower -> foot, plus an animated goal bone.
fn leg_mesh() -> Arc<SkinnedMesh> {
    let skeleton = Skeleton::new(vec![
        Bone::new("root", None, Vec3::ZERO),
        Bone::new("upper", Some(0), Vec3::new(0.0, 4.0, 0.0)),
        Bone::new("lower", Some(1), Vec3::new(0.0, -2.0, 0.0)),
        Bone::new("foot", Some(2), Vec3::new(0.0, -2.0, 0.0)),
        Bone::new("goal", Some(0), Vec3::new(1.0, 1.0, 0.0)),
    ])
    .unwrap();

    let rig = RigMetadata {
        ik_chains: vec![IkChain {
            name: "leg".into(),
            goal: 4,
            effector: 3,
            links: smallvec![IkLink::new(2), IkLink::new(1)],
            iterations: 40,
            min_angle: None,
            max_angle: None,
        }],
        ..Default::default()
    };
    Arc::new(SkinnedMesh::new("leg", skeleton).with_rig(rig))
}

fn goal_clip() -> Arc<AnimationClip> {
    Arc::new(AnimationClip::new(
        "step",
        vec![Track::bone_translation(
            "goal",
            KeyframeTrack::new(
                vec![0.0, 2.0],
                vec![Vec3::new(1.0, 1.0, 0.0), Vec3::new(1.5, 0.5, 0.0)],
                InterpolationMode::Linear,
            ),
        )],
    ))
}

/// A root with one sideways hair strand that gravity should pull down.
fn hair_mesh() -> Arc<SkinnedMesh> {
    let skeleton = Skeleton::new(vec![
        Bone::new("head", None, Vec3::ZERO),
        Bone::new("hair", Some(0), Vec3::new(0.0, 1.0, 0.0)),
    ])
    .unwrap();

    let rig = RigMetadata {
        physics: Some(PhysicsRig {
            bodies: vec![RigidBodyDesc {
                name: "hair".into(),
                bone: 1,
                kind: BodyKind::Dynamic,
                tip: Vec3::X,
                damping: None,
            }],
            joints: Vec::new(),
        }),
        ..Default::default()
    };
    Arc::new(SkinnedMesh::new("hair", skeleton).with_rig(rig))
}

/// Steps succeed until `remaining` runs out, then report divergence.
struct FlakyWorld {
    remaining: Arc<AtomicU32>,
    resets: Arc<AtomicU32>,
}

impl PhysicsWorld for FlakyWorld {
    fn reset(&mut self, _skeleton: &Skeleton, _pose: &Pose) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn step(&mut self, _dt: f32, _skeleton: &Skeleton, _pose: &Pose) -> Result<(), AnimationError> {
        let left = self.remaining.load(Ordering::SeqCst);
        if left == 0 {
            return Err(AnimationError::PhysicsDiverged { body: "flaky".into() });
        }
        self.remaining.store(left - 1, Ordering::SeqCst);
        Ok(())
    }

    fn write_back(&self, _skeleton: &Skeleton, _pose: &mut Pose) {}

    fn body_transforms(&self) -> &[BodyTransform] {
        &[]
    }
}

fn flaky_factory(remaining: Arc<AtomicU32>, resets: Arc<AtomicU32>) -> PhysicsFactory {
    Arc::new(move |_rig, _skeleton, _settings| {
        Ok(Box::new(FlakyWorld {
            remaining: Arc::clone(&remaining),
            resets: Arc::clone(&resets),
        }) as Box<dyn PhysicsWorld>)
    })
}

fn no_warmup() -> HelperSettings {
    HelperSettings {
        physics: PhysicsSettings {
            warmup_steps: 0,
            ..Default::default()
        },
        ..Default::default()
    }
}

// ============================================================================
// Time accumulation
// ============================================================================

#[test]
fn local_time_is_sum_of_deltas() {
    let mut helper = AnimationHelper::default();
    let mesh = arm_mesh("a");
    let id = mesh.id;
    helper.register(mesh, play(wave_clip(), LoopMode::Once)).unwrap();

    for dt in [0.016, 0.033, 0.0, 0.25] {
        helper.advance(dt).unwrap();
    }

    assert!(time_approx(helper.entity(&id).unwrap().local_time(), 0.299));
}

#[test]
fn rechunked_deltas_give_the_same_pose() {
    let mut coarse = AnimationHelper::default();
    let mut fine = AnimationHelper::default();
    let mesh = arm_mesh("a");
    let id = mesh.id;
    coarse.register(Arc::clone(&mesh), play(wave_clip(), LoopMode::Once)).unwrap();
    fine.register(mesh, play(wave_clip(), LoopMode::Once)).unwrap();

    coarse.advance(1.0).unwrap();
    for _ in 0..4 {
        fine.advance(0.25).unwrap();
    }

    let a = coarse.entity(&id).unwrap().pose();
    let b = fine.entity(&id).unwrap().pose();
    assert!(quat_approx(a.rotation(1), b.rotation(1)));
    assert!(approx(a.morph_weights()[0], b.morph_weights()[0]));
    assert!(approx(a.morph_weights()[0], 0.5));
}

#[test]
fn invalid_delta_is_rejected_without_side_effects() {
    let mut helper = AnimationHelper::default();
    let mesh = arm_mesh("a");
    let id = mesh.id;
    helper.register(mesh, play(wave_clip(), LoopMode::Once)).unwrap();
    helper.advance(0.5).unwrap();
    let before = helper.entity(&id).unwrap().pose().clone();

    assert_eq!(helper.advance(-0.1), Err(AnimationError::InvalidTimeDelta(-0.1)));
    assert!(matches!(helper.advance(f32::NAN), Err(AnimationError::InvalidTimeDelta(_))));
    assert!(matches!(helper.advance(f32::INFINITY), Err(AnimationError::InvalidTimeDelta(_))));

    let entity = helper.entity(&id).unwrap();
    assert!(time_approx(entity.local_time(), 0.5));
    assert_eq!(entity.pose(), &before);
}

#[test]
fn advance_with_no_entities_is_a_no_op() {
    let mut helper = AnimationHelper::default();
    helper.advance(0.016).unwrap();
    assert!(helper.is_empty());
}

// ============================================================================
// Feature toggles
// ============================================================================

#[test]
fn disabling_animation_freezes_time_and_pose() {
    let mut helper = AnimationHelper::default();
    let mesh = arm_mesh("a");
    let id = mesh.id;
    helper.register(mesh, play(wave_clip(), LoopMode::Once)).unwrap();
    helper.advance(0.5).unwrap();
    let frozen = helper.entity(&id).unwrap().pose().rotation(1);

    helper.set_feature(Features::ANIMATION, false);
    assert!(!helper.is_enabled(Features::ANIMATION));
    helper.advance(1.0).unwrap();

    let entity = helper.entity(&id).unwrap();
    assert!(time_approx(entity.local_time(), 0.5));
    assert!(quat_approx(entity.pose().rotation(1), frozen));

    helper.set_feature(Features::ANIMATION, true);
    helper.advance(0.5).unwrap();
    assert!(time_approx(helper.entity(&id).unwrap().local_time(), 1.0));
}

#[test]
fn ik_runs_after_sampling() {
    let mut helper = AnimationHelper::default();
    let mesh = leg_mesh();
    let id = mesh.id;
    helper.register(mesh, play(goal_clip(), LoopMode::Once)).unwrap();

    helper.advance(1.0).unwrap();

    let entity = helper.entity(&id).unwrap();
    assert!(entity.has_ik());
    let goal = entity.pose().world_position(4);
    assert!(goal.distance(Vec3::new(1.25, 0.75, 0.0)) < EPSILON);
    assert!(entity.pose().world_position(3).distance(goal) < 1e-2);

    // The sampled pose is untouched by IK.
    assert!(entity.sampled_pose().world_position(3).length() < EPSILON);
}

#[test]
fn disabling_ik_leaves_sampled_pose() {
    let mut helper = AnimationHelper::default();
    let mesh = leg_mesh();
    let id = mesh.id;
    helper.register(mesh, play(goal_clip(), LoopMode::Once)).unwrap();

    helper.set_feature(Features::IK, false);
    helper.advance(1.0).unwrap();

    let entity = helper.entity(&id).unwrap();
    assert_eq!(entity.pose(), entity.sampled_pose());
}

#[test]
fn grant_bone_follows_half_of_its_source() {
    let skeleton = Skeleton::new(vec![
        Bone::new("root", None, Vec3::ZERO),
        Bone::new("arm", Some(0), Vec3::new(0.0, 2.0, 0.0)),
        Bone::new("twist", Some(0), Vec3::new(1.0, 2.0, 0.0)),
    ])
    .unwrap();
    let rig = RigMetadata {
        grants: vec![GrantBone {
            bone: 2,
            source: 1,
            ratio: 0.5,
            affect_rotation: true,
            affect_position: false,
        }],
        ..Default::default()
    };
    let mesh = Arc::new(SkinnedMesh::new("arm", skeleton).with_rig(rig));
    let id = mesh.id;

    let mut helper = AnimationHelper::default();
    helper.register(mesh, play(wave_clip(), LoopMode::Once)).unwrap();
    helper.advance(1.0).unwrap();

    let entity = helper.entity(&id).unwrap();
    assert!(entity.has_grants());
    assert!(quat_approx(entity.pose().rotation(1), Quat::from_rotation_z(FRAC_PI_2 / 2.0)));
    assert!(quat_approx(entity.pose().rotation(2), Quat::from_rotation_z(FRAC_PI_2 / 4.0)));

    helper.set_feature(Features::GRANT, false);
    helper.advance(0.0).unwrap();
    assert!(quat_approx(helper.entity(&id).unwrap().pose().rotation(2), Quat::IDENTITY));
}

#[test]
fn physics_overrides_animation() {
    let mut helper = AnimationHelper::default();
    let mesh = hair_mesh();
    let id = mesh.id;
    helper.register(mesh, RegisterOptions { enable_physics: true, ..Default::default() }).unwrap();
    helper.advance(0.1).unwrap();

    let entity = helper.entity(&id).unwrap();
    assert!(entity.has_physics());
    assert_eq!(entity.sampled_pose().rotation(1), Quat::IDENTITY);

    let tip = entity.pose().world_rotation(1) * Vec3::X;
    assert!(tip.y < -0.1, "hair should hang down, tip direction {tip}");
    assert_eq!(entity.body_transforms().len(), 1);
}

#[test]
fn physics_disabled_at_registration() {
    let mut helper = AnimationHelper::default();
    let mesh = hair_mesh();
    let id = mesh.id;
    helper.register(mesh, RegisterOptions::default()).unwrap();
    helper.advance(0.1).unwrap();

    let entity = helper.entity(&id).unwrap();
    assert!(!entity.has_physics());
    assert!(entity.body_transforms().is_empty());
    assert_eq!(entity.pose().rotation(1), Quat::IDENTITY);
}

// ============================================================================
// Playback states
// ============================================================================

#[test]
fn afterglow_holds_last_pose_before_idle() {
    let mut helper = AnimationHelper::default();
    helper.set_afterglow(1.0);
    let mesh = arm_mesh("a");
    let id = mesh.id;
    helper.register(mesh, play(wave_clip(), LoopMode::Once)).unwrap();
    assert_eq!(helper.entity(&id).unwrap().state(), PlaybackState::Idle);

    helper.advance(0.5).unwrap();
    assert_eq!(helper.entity(&id).unwrap().state(), PlaybackState::Playing);

    helper.advance(2.0).unwrap();
    let entity = helper.entity(&id).unwrap();
    assert_eq!(entity.state(), PlaybackState::Holding);
    assert!(quat_approx(entity.pose().rotation(1), Quat::from_rotation_z(FRAC_PI_2)));

    helper.advance(1.0).unwrap();
    let entity = helper.entity(&id).unwrap();
    assert_eq!(entity.state(), PlaybackState::Idle);
    assert!(quat_approx(entity.pose().rotation(1), Quat::from_rotation_z(FRAC_PI_2)));
}

#[test]
fn without_afterglow_clip_goes_idle_at_end() {
    let mut helper = AnimationHelper::default();
    let mesh = arm_mesh("a");
    let id = mesh.id;
    helper.register(mesh, play(wave_clip(), LoopMode::Once)).unwrap();

    helper.advance(0.5).unwrap();
    assert_eq!(helper.entity(&id).unwrap().state(), PlaybackState::Playing);
    helper.advance(2.0).unwrap();
    assert_eq!(helper.entity(&id).unwrap().state(), PlaybackState::Idle);
}

#[test]
fn clip_end_lands_exactly_on_duration() {
    for (afterglow, end_state) in [(1.0, PlaybackState::Holding), (0.0, PlaybackState::Idle)] {
        let mut helper = AnimationHelper::default();
        helper.set_afterglow(afterglow);
        let mesh = arm_mesh("a");
        let id = mesh.id;
        helper.register(mesh, play(wave_clip(), LoopMode::Once)).unwrap();

        helper.advance(1.0).unwrap();
        let entity = helper.entity(&id).unwrap();
        assert_eq!(entity.state(), PlaybackState::Playing);
        assert!(time_approx(entity.local_time(), 1.0));

        helper.advance(1.0).unwrap();
        let entity = helper.entity(&id).unwrap();
        assert_eq!(entity.local_time(), 2.0);
        assert_eq!(entity.state(), end_state, "afterglow {afterglow}");
        assert!(approx(entity.pose().morph_weights()[0], 1.0));
    }
}

#[test]
fn long_running_loop_keeps_advancing() {
    let mut helper = AnimationHelper::default();
    let mesh = arm_mesh("a");
    let id = mesh.id;
    helper.register(mesh, play(wave_clip(), LoopMode::Loop)).unwrap();

    // 2^21 seconds, about 24 days: a whole number of 2 s cycles.
    helper.advance(2_097_152.0).unwrap();
    let start = helper.entity(&id).unwrap().local_time();
    assert!(approx(helper.entity(&id).unwrap().pose().morph_weights()[0], 0.0));

    for _ in 0..60 {
        helper.advance(1.0 / 60.0).unwrap();
    }

    let entity = helper.entity(&id).unwrap();
    assert!((entity.local_time() - start - 1.0).abs() < 1e-5);
    assert_eq!(entity.state(), PlaybackState::Playing);
    assert!((entity.pose().morph_weights()[0] - 0.5).abs() < 1e-3);
}

#[test]
fn negative_afterglow_is_clamped() {
    let mut helper = AnimationHelper::default();
    helper.set_afterglow(-3.0);
    assert_eq!(helper.settings().afterglow, 0.0);
    helper.set_afterglow(f32::NAN);
    assert_eq!(helper.settings().afterglow, 0.0);
}

#[test]
fn looping_clip_keeps_playing() {
    let mut helper = AnimationHelper::default();
    let mesh = arm_mesh("a");
    let id = mesh.id;
    helper.register(mesh, play(wave_clip(), LoopMode::Loop)).unwrap();

    helper.advance(2.5).unwrap();
    let entity = helper.entity(&id).unwrap();
    assert_eq!(entity.state(), PlaybackState::Playing);
    assert!(approx(entity.pose().morph_weights()[0], 0.25));
}

#[test]
fn mesh_without_clip_stays_idle_at_rest() {
    let mut helper = AnimationHelper::default();
    let mesh = arm_mesh("static");
    let id = mesh.id;
    helper.register(mesh, RegisterOptions::default()).unwrap();
    helper.advance(1.0).unwrap();

    let entity = helper.entity(&id).unwrap();
    assert!(entity.action().is_none());
    assert_eq!(entity.state(), PlaybackState::Idle);
    assert_eq!(entity.local_time(), 0.0);
    assert_eq!(entity.pose().rotation(1), Quat::IDENTITY);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn registering_twice_replaces_the_entity() {
    let mut helper = AnimationHelper::default();
    let mesh = arm_mesh("a");
    let id = mesh.id;
    helper.register(Arc::clone(&mesh), play(wave_clip(), LoopMode::Once)).unwrap();
    helper.advance(1.0).unwrap();

    helper.register(mesh, play(wave_clip(), LoopMode::Loop)).unwrap();

    assert_eq!(helper.len(), 1);
    let entity = helper.entity(&id).unwrap();
    assert_eq!(entity.local_time(), 0.0);
    assert_eq!(entity.action().unwrap().loop_mode, LoopMode::Loop);
}

#[test]
fn unregister_mid_play() {
    let mut helper = AnimationHelper::default();
    let a = arm_mesh("a");
    let b = arm_mesh("b");
    let (id_a, id_b) = (a.id, b.id);
    helper.register(a, play(wave_clip(), LoopMode::Once)).unwrap();
    helper.register(b, play(wave_clip(), LoopMode::Once)).unwrap();
    helper.advance(0.5).unwrap();

    assert!(helper.unregister(&id_a));
    assert!(!helper.unregister(&id_a));
    helper.advance(0.5).unwrap();

    assert_eq!(helper.len(), 1);
    assert!(!helper.contains(&id_a));
    assert!(time_approx(helper.entity(&id_b).unwrap().local_time(), 1.0));
}

#[test]
fn unregister_unknown_mesh_returns_false() {
    let mut helper = AnimationHelper::default();
    assert!(!helper.unregister(&MeshId::new()));
}

#[test]
fn invalid_rig_is_rejected_and_keeps_previous_entity() {
    let mut helper = AnimationHelper::default();
    let good = leg_mesh();
    let id = good.id;
    helper.register(Arc::clone(&good), play(goal_clip(), LoopMode::Once)).unwrap();
    helper.advance(0.5).unwrap();

    let mut broken = (*good).clone();
    broken.rig.ik_chains[0].links.push(IkLink::new(99));
    let result = helper.register(Arc::new(broken), RegisterOptions::default());

    assert!(matches!(result, Err(AnimationError::BoneOutOfRange { index: 99, .. })));
    assert!(time_approx(helper.entity(&id).unwrap().local_time(), 0.5));
}

#[test]
fn ik_divergence_during_registration_is_not_fatal() {
    let mut helper = AnimationHelper::default();
    let mesh = leg_mesh();
    let id = mesh.id;
    let corrupt = Arc::new(AnimationClip::new(
        "corrupt",
        vec![Track::bone_rotation(
            "lower",
            KeyframeTrack::new(
                vec![0.0, 2.0],
                vec![Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0); 2],
                InterpolationMode::Linear,
            ),
        )],
    ));

    helper.register(mesh, play(corrupt, LoopMode::Once)).unwrap();

    // The sampled pose is kept as-is; IK touched nothing.
    let entity = helper.entity(&id).unwrap();
    assert_eq!(entity.pose().rotation(1), Quat::IDENTITY);
    assert!(!entity.pose().rotation(2).is_finite());
    helper.advance(0.5).unwrap();
    assert!(time_approx(helper.entity(&id).unwrap().local_time(), 0.5));
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn physics_failure_is_isolated_to_its_entity() {
    let remaining = Arc::new(AtomicU32::new(0));
    let resets = Arc::new(AtomicU32::new(0));
    let mut helper = AnimationHelper::new(no_warmup())
        .with_physics_factory(flaky_factory(Arc::clone(&remaining), Arc::clone(&resets)));

    let hair = hair_mesh();
    let arm = arm_mesh("healthy");
    let (hair_id, arm_id) = (hair.id, arm.id);
    helper.register(hair, play(wave_clip(), LoopMode::Once)).unwrap();
    helper.register(arm, play(wave_clip(), LoopMode::Once)).unwrap();
    let resets_after_register = resets.load(Ordering::SeqCst);

    helper.advance(1.0).unwrap();

    assert!(time_approx(helper.entity(&arm_id).unwrap().local_time(), 1.0));
    let failed = helper.entity(&hair_id).unwrap();
    assert!(time_approx(failed.local_time(), 1.0));
    assert_eq!(resets.load(Ordering::SeqCst), resets_after_register + 1);

    remaining.store(u32::MAX, Ordering::SeqCst);
    helper.advance(0.5).unwrap();
    assert!(time_approx(helper.entity(&hair_id).unwrap().local_time(), 1.5));
}

#[test]
fn failing_factory_rejects_registration() {
    let factory: PhysicsFactory = Arc::new(|_rig, _skeleton, _settings| {
        Err(AnimationError::InvalidSkeleton("no backend".into()))
    });
    let mut helper = AnimationHelper::default().with_physics_factory(factory);

    let hair = hair_mesh();
    let id = hair.id;
    assert!(helper.register(Arc::clone(&hair), RegisterOptions { enable_physics: true, ..Default::default() }).is_err());
    assert!(!helper.contains(&id));

    // Without physics the factory is never consulted.
    helper.register(hair, RegisterOptions::default()).unwrap();
    assert!(helper.contains(&id));
}
