//! Animation Playback Tests
//!
//! Tests for:
//! - KeyframeTrack linear/step/cubic interpolation and cursor sampling
//! - AnimationClip duration and motion merging
//! - AnimationAction playheads for Once, Loop and PingPong with afterglow
//! - Binder dropping tracks the rig cannot use

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Quat, Vec3};

use kagura::animation::{
    AnimationAction, AnimationClip, Binder, Bone, InterpolationMode, KeyframeCursor, KeyframeTrack, LoopMode,
    PlaybackState, Skeleton, Track,
};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn quat_approx(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() > 1.0 - 1e-4
}

fn arm() -> Skeleton {
    Skeleton::new(vec![
        Bone::new("root", None, Vec3::ZERO),
        Bone::new("arm", Some(0), Vec3::new(0.0, 2.0, 0.0)),
    ])
    .unwrap()
}

fn two_second_clip() -> Arc<AnimationClip> {
    Arc::new(AnimationClip::new(
        "wave",
        vec![Track::bone_rotation(
            "arm",
            KeyframeTrack::new(
                vec![0.0, 2.0],
                vec![Quat::IDENTITY, Quat::from_rotation_z(FRAC_PI_2)],
                InterpolationMode::Linear,
            ),
        )],
    ))
}

fn action(loop_mode: LoopMode) -> AnimationAction {
    let clip = two_second_clip();
    let bindings = Binder::bind(&clip, &arm(), &[]);
    AnimationAction::new(clip, bindings, loop_mode)
}

// ============================================================================
// KeyframeTrack
// ============================================================================

#[test]
fn track_linear_f32_midpoint() {
    let track = KeyframeTrack::new(vec![0.0, 1.0], vec![0.0_f32, 10.0], InterpolationMode::Linear);

    let mut cursor = KeyframeCursor::default();
    let val = track.sample_with_cursor(0.5, &mut cursor).unwrap();
    assert!(approx(val, 5.0), "Expected 5.0, got {val}");
}

#[test]
fn track_clamps_outside_key_range() {
    let track = KeyframeTrack::new(vec![1.0, 2.0], vec![10.0_f32, 20.0], InterpolationMode::Linear);

    assert!(approx(track.sample(0.0).unwrap(), 10.0));
    assert!(approx(track.sample(5.0).unwrap(), 20.0));
}

#[test]
fn track_step_holds_previous_key() {
    let track = KeyframeTrack::new(vec![0.0, 1.0, 2.0], vec![1.0_f32, 2.0, 3.0], InterpolationMode::Step);

    assert!(approx(track.sample(0.99).unwrap(), 1.0));
    assert!(approx(track.sample(1.0).unwrap(), 2.0));
    assert!(approx(track.sample(1.5).unwrap(), 2.0));
}

#[test]
fn track_cubic_with_zero_tangents_eases() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![0.0_f32, 0.0, 0.0, 0.0, 1.0, 0.0],
        InterpolationMode::CubicSpline,
    );

    assert!(approx(track.sample(0.5).unwrap(), 0.5));
    // Smoothstep: slower than linear near the ends.
    assert!(track.sample(0.1).unwrap() < 0.1);
}

#[test]
fn track_quat_linear_slerps() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![Quat::IDENTITY, Quat::from_rotation_y(FRAC_PI_2)],
        InterpolationMode::Linear,
    );

    let q = track.sample(0.5).unwrap();
    assert!(quat_approx(q, Quat::from_rotation_y(FRAC_PI_2 / 2.0)));
}

#[test]
fn empty_track_samples_nothing() {
    let track: KeyframeTrack<f32> = KeyframeTrack::new(vec![], vec![], InterpolationMode::Linear);
    let mut cursor = KeyframeCursor::default();
    assert!(track.sample(0.0).is_none());
    assert!(track.sample_with_cursor(0.0, &mut cursor).is_none());
}

#[test]
fn cursor_matches_stateless_sampling_when_seeking() {
    let times: Vec<f32> = (0..20).map(|i| i as f32 * 0.5).collect();
    let values: Vec<f32> = (0..20).map(|i| (i * i) as f32).collect();
    let track = KeyframeTrack::new(times, values, InterpolationMode::Linear);

    let mut cursor = KeyframeCursor::default();
    // Forward, a long jump, then backwards.
    for t in [0.1, 0.6, 1.2, 7.7, 3.3, 0.0, 9.5, 2.25] {
        let cached = track.sample_with_cursor(t, &mut cursor).unwrap();
        let fresh = track.sample(t).unwrap();
        assert!(approx(cached, fresh), "t={t}: {cached} vs {fresh}");
    }
}

// ============================================================================
// AnimationClip
// ============================================================================

#[test]
fn clip_duration_is_latest_key() {
    let clip = AnimationClip::new(
        "mixed",
        vec![
            Track::morph_weight("blink", KeyframeTrack::new(vec![0.0, 0.5], vec![0.0, 1.0], InterpolationMode::Linear)),
            Track::bone_translation(
                "arm",
                KeyframeTrack::new(vec![0.0, 3.0], vec![Vec3::ZERO, Vec3::ONE], InterpolationMode::Linear),
            ),
        ],
    );
    assert!(approx(clip.duration, 3.0));
}

#[test]
fn merged_clip_concatenates_tracks() {
    let a = (*two_second_clip()).clone();
    let b = AnimationClip::new(
        "blink",
        vec![Track::morph_weight(
            "blink",
            KeyframeTrack::new(vec![0.0, 4.0], vec![0.0, 1.0], InterpolationMode::Linear),
        )],
    );

    let merged = AnimationClip::merge("wave+blink", [a, b]);
    assert_eq!(merged.tracks.len(), 2);
    assert!(approx(merged.duration, 4.0));
}

// ============================================================================
// Binder
// ============================================================================

#[test]
fn binder_drops_unknown_and_mistyped_tracks() {
    let clip = AnimationClip::new(
        "noisy",
        vec![
            Track::bone_rotation(
                "arm",
                KeyframeTrack::new(vec![0.0], vec![Quat::IDENTITY], InterpolationMode::Linear),
            ),
            Track::bone_rotation(
                "tail",
                KeyframeTrack::new(vec![0.0], vec![Quat::IDENTITY], InterpolationMode::Linear),
            ),
            Track::morph_weight("smile", KeyframeTrack::new(vec![0.0], vec![1.0], InterpolationMode::Linear)),
            // Malformed: two values for one key.
            Track::morph_weight("blink", KeyframeTrack::new(vec![0.0], vec![1.0, 2.0], InterpolationMode::Linear)),
        ],
    );

    let morphs = vec!["smile".to_string(), "blink".to_string()];
    let bindings = Binder::bind(&clip, &arm(), &morphs);
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].track_index, 0);
    assert_eq!(bindings[1].track_index, 2);
}

// ============================================================================
// AnimationAction playheads
// ============================================================================

#[test]
fn once_plays_then_holds_then_idles() {
    let mut action = action(LoopMode::Once);

    action.advance(1.0);
    let head = action.playhead(0.5);
    assert_eq!(head.state, PlaybackState::Playing);
    assert!(approx(head.clip_time, 1.0));

    action.advance(1.2);
    let head = action.playhead(0.5);
    assert_eq!(head.state, PlaybackState::Holding);
    assert!(approx(head.clip_time, 2.0));

    action.advance(0.5);
    assert_eq!(action.playhead(0.5).state, PlaybackState::Idle);
    assert!((action.local_time() - 2.7).abs() < 1e-4);
}

#[test]
fn once_without_afterglow_goes_idle_at_the_end() {
    let mut action = action(LoopMode::Once);
    action.advance(2.0);
    assert_eq!(action.playhead(0.0).state, PlaybackState::Idle);
}

#[test]
fn loop_holds_before_wrapping() {
    let mut action = action(LoopMode::Loop);

    action.advance(2.5);
    let head = action.playhead(1.0);
    assert_eq!(head.state, PlaybackState::Holding);
    assert!(approx(head.clip_time, 2.0));
    assert_eq!(head.cycle, 0);

    action.advance(0.75);
    let head = action.playhead(1.0);
    assert_eq!(head.state, PlaybackState::Playing);
    assert!(approx(head.clip_time, 0.25));
    assert_eq!(head.cycle, 1);
}

#[test]
fn loop_without_afterglow_wraps_on_duration() {
    let mut action = action(LoopMode::Loop);
    action.advance(4.5);
    let head = action.playhead(0.0);
    assert_eq!(head.cycle, 2);
    assert!(approx(head.clip_time, 0.5));
}

#[test]
fn ping_pong_reverses_and_never_ends() {
    let mut action = action(LoopMode::PingPong);

    action.advance(2.5);
    let head = action.playhead(3.0);
    assert_eq!(head.state, PlaybackState::Playing);
    assert!(approx(head.clip_time, 1.5));

    action.advance(100.0);
    assert_eq!(action.playhead(3.0).state, PlaybackState::Playing);
}

#[test]
fn apply_writes_sampled_rotation() {
    let skeleton = arm();
    let mut action = action(LoopMode::Once);
    let mut pose = skeleton.rest_pose().clone();

    action.apply(1.0, &mut pose);
    pose.update_world(&skeleton);

    assert!(quat_approx(pose.rotation(1), Quat::from_rotation_z(FRAC_PI_2 / 2.0)));
    // Root untouched.
    assert_eq!(pose.rotation(0), Quat::IDENTITY);
}
