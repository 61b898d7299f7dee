use std::sync::Arc;

use crate::binding::{BindingSlot, PropertyBinding};
use crate::clip::{AnimationClip, TrackData};
use crate::pose::Pose;
use crate::tracks::KeyframeCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play once and stay on the final pose.
    #[default]
    Once,
    /// Restart after the clip (and any afterglow) ends.
    Loop,
    /// Play forward, then backward, forever.
    PingPong,
}

/// Per-entity playback phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    /// The clip has ended and the last pose is held for the afterglow window.
    Holding,
}

/// Where an action's local time lands inside its clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playhead {
    /// Time at which the clip is sampled
    pub clip_time: f32,
    pub state: PlaybackState,
    /// Completed loop cycles (always zero for `Once`)
    pub cycle: u64,
}

/// A clip bound to one rig, with its accumulated local time.
#[derive(Debug, Clone)]
pub struct AnimationAction {
    clip: Arc<AnimationClip>,
    pub loop_mode: LoopMode,
    /// Kept in `f64` so long-running loops keep frame resolution
    local_time: f64,
    bindings: Vec<PropertyBinding>,
    track_cursors: Vec<KeyframeCursor>,
}

impl AnimationAction {
    #[must_use]
    pub fn new(clip: Arc<AnimationClip>, bindings: Vec<PropertyBinding>, loop_mode: LoopMode) -> Self {
        let track_count = clip.tracks.len();
        Self {
            clip,
            loop_mode,
            local_time: 0.0,
            bindings,
            track_cursors: vec![KeyframeCursor::default(); track_count],
        }
    }

    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    /// Accumulated playback time; the sum of every delta applied.
    #[inline]
    #[must_use]
    pub fn local_time(&self) -> f64 {
        self.local_time
    }

    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &[PropertyBinding] {
        &self.bindings
    }

    pub fn advance(&mut self, dt: f32) {
        self.local_time += f64::from(dt);
    }

    /// Maps local time onto the clip.
    ///
    /// For `Loop`, each cycle lasts `duration + afterglow`: the clip plays,
    /// the last pose is held, then playback wraps. `PingPong` never holds.
    #[must_use]
    pub fn playhead(&self, afterglow: f32) -> Playhead {
        let duration = f64::from(self.clip.duration);
        let time = self.local_time;
        let afterglow = f64::from(afterglow.max(0.0));

        match self.loop_mode {
            LoopMode::Once => {
                let state = if time < duration {
                    PlaybackState::Playing
                } else if time < duration + afterglow {
                    PlaybackState::Holding
                } else {
                    PlaybackState::Idle
                };
                Playhead {
                    clip_time: time.min(duration) as f32,
                    state,
                    cycle: 0,
                }
            }
            LoopMode::Loop => {
                let period = duration + afterglow;
                if period <= 0.0 {
                    return Playhead {
                        clip_time: 0.0,
                        state: PlaybackState::Idle,
                        cycle: 0,
                    };
                }
                let cycle = (time / period).floor();
                let phase = time - cycle * period;
                let (clip_time, state) = if phase < duration {
                    (phase, PlaybackState::Playing)
                } else {
                    (duration, PlaybackState::Holding)
                };
                Playhead {
                    clip_time: clip_time as f32,
                    state,
                    cycle: cycle as u64,
                }
            }
            LoopMode::PingPong => {
                if duration <= 0.0 {
                    return Playhead {
                        clip_time: 0.0,
                        state: PlaybackState::Idle,
                        cycle: 0,
                    };
                }
                let double = duration * 2.0;
                let cycle = (time / double).floor();
                let phase = time - cycle * double;
                let clip_time = if phase > duration { double - phase } else { phase };
                Playhead {
                    clip_time: clip_time as f32,
                    state: PlaybackState::Playing,
                    cycle: cycle as u64,
                }
            }
        }
    }

    /// Samples every bound track at `clip_time` and writes it into `pose`.
    ///
    /// Only local transforms and morph weights are touched; the caller
    /// refreshes world transforms.
    pub fn apply(&mut self, clip_time: f32, pose: &mut Pose) {
        for binding in &self.bindings {
            let track = &self.clip.tracks[binding.track_index];
            let cursor = &mut self.track_cursors[binding.track_index];

            match (&track.data, binding.slot) {
                (TrackData::Vector3(t), BindingSlot::Translation(bone)) => {
                    if let Some(value) = t.sample_with_cursor(clip_time, cursor) {
                        pose.set_translation(bone, value);
                    }
                }
                (TrackData::Quaternion(t), BindingSlot::Rotation(bone)) => {
                    if let Some(value) = t.sample_with_cursor(clip_time, cursor) {
                        pose.set_rotation(bone, value.normalize());
                    }
                }
                (TrackData::Scalar(t), BindingSlot::Morph(morph)) => {
                    if let Some(value) = t.sample_with_cursor(clip_time, cursor) {
                        pose.set_morph_weight(morph, value);
                    }
                }
                _ => {}
            }
        }
    }
}
