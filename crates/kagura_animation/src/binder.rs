use crate::binding::{BindingSlot, PropertyBinding};
use crate::clip::{AnimationClip, TrackTarget};
use crate::skeleton::Skeleton;

pub struct Binder;

impl Binder {
    /// Resolves clip tracks against a skeleton and morph list.
    ///
    /// Tracks whose bone or morph is missing, or whose value type does not
    /// match the target, are dropped. Motions authored for another model
    /// routinely carry such tracks.
    #[must_use]
    pub fn bind(clip: &AnimationClip, skeleton: &Skeleton, morph_names: &[String]) -> Vec<PropertyBinding> {
        let mut bindings = Vec::with_capacity(clip.tracks.len());
        let mut dropped = 0usize;

        for (track_index, track) in clip.tracks.iter().enumerate() {
            if !track.data.is_compatible_with(track.meta.target) {
                dropped += 1;
                continue;
            }

            let name = track.meta.name.as_str();
            let slot = match track.meta.target {
                TrackTarget::BoneTranslation => skeleton.find(name).map(BindingSlot::Translation),
                TrackTarget::BoneRotation => skeleton.find(name).map(BindingSlot::Rotation),
                TrackTarget::MorphWeight => morph_names
                    .iter()
                    .position(|m| m == name)
                    .map(BindingSlot::Morph),
            };

            match slot {
                Some(slot) => bindings.push(PropertyBinding { track_index, slot }),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            log::debug!(
                "Clip '{}': bound {} tracks, dropped {dropped} unmatched",
                clip.name,
                bindings.len()
            );
        }

        bindings
    }
}
