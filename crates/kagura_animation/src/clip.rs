use glam::{Quat, Vec3};

use crate::tracks::KeyframeTrack;

/// What a track drives on the rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackTarget {
    /// Local translation of the named bone
    BoneTranslation,
    /// Local rotation of the named bone
    BoneRotation,
    /// Weight of the named morph target
    MorphWeight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMeta {
    /// Bone or morph name, resolved at bind time
    pub name: String,
    pub target: TrackTarget,
}

#[derive(Debug, Clone)]
pub enum TrackData {
    Vector3(KeyframeTrack<Vec3>),
    Quaternion(KeyframeTrack<Quat>),
    Scalar(KeyframeTrack<f32>),
}

impl TrackData {
    #[must_use]
    pub fn duration(&self) -> f32 {
        match self {
            TrackData::Vector3(t) => t.duration(),
            TrackData::Quaternion(t) => t.duration(),
            TrackData::Scalar(t) => t.duration(),
        }
    }

    /// The keyframe layout is valid and the value type suits `target`.
    #[must_use]
    pub fn is_compatible_with(&self, target: TrackTarget) -> bool {
        match (self, target) {
            (TrackData::Vector3(t), TrackTarget::BoneTranslation) => t.is_well_formed(),
            (TrackData::Quaternion(t), TrackTarget::BoneRotation) => t.is_well_formed(),
            (TrackData::Scalar(t), TrackTarget::MorphWeight) => t.is_well_formed(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub meta: TrackMeta,
    pub data: TrackData,
}

impl Track {
    #[must_use]
    pub fn bone_rotation(bone: impl Into<String>, track: KeyframeTrack<Quat>) -> Self {
        Self {
            meta: TrackMeta {
                name: bone.into(),
                target: TrackTarget::BoneRotation,
            },
            data: TrackData::Quaternion(track),
        }
    }

    #[must_use]
    pub fn bone_translation(bone: impl Into<String>, track: KeyframeTrack<Vec3>) -> Self {
        Self {
            meta: TrackMeta {
                name: bone.into(),
                target: TrackTarget::BoneTranslation,
            },
            data: TrackData::Vector3(track),
        }
    }

    #[must_use]
    pub fn morph_weight(morph: impl Into<String>, track: KeyframeTrack<f32>) -> Self {
        Self {
            meta: TrackMeta {
                name: morph.into(),
                target: TrackTarget::MorphWeight,
            },
            data: TrackData::Scalar(track),
        }
    }
}

/// A named set of tracks. Duration is the latest key time over all tracks.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks
            .iter()
            .map(|t| t.data.duration())
            .fold(0.0_f32, f32::max);

        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    /// Combines several motions into one clip, as when a model is loaded
    /// with more than one motion file.
    #[must_use]
    pub fn merge(name: impl Into<String>, clips: impl IntoIterator<Item = AnimationClip>) -> Self {
        let tracks = clips.into_iter().flat_map(|clip| clip.tracks).collect();
        Self::new(name, tracks)
    }
}
