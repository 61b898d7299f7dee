//! Skeletal playback for Kagura.
//!
//! - keyframe [`tracks`] grouped into [`clip`]s and played by an [`action`]
//! - a parents-first [`skeleton`] and the runtime [`pose`] it drives
//! - CCD [`ik`], [`grant`] bones and rigid-body [`physics`]
//! - the [`helper`] that runs all of the above once per frame

mod values;
pub mod tracks;
pub mod clip;
pub mod action;
pub mod binding;
pub mod binder;
pub mod skeleton;
pub mod pose;
pub mod ik;
pub mod grant;
pub mod physics;
pub mod settings;
pub mod mesh;
pub mod entity;
pub mod helper;

use bitflags::bitflags;

pub use action::{AnimationAction, LoopMode, PlaybackState, Playhead};
pub use binder::Binder;
pub use binding::{BindingSlot, PropertyBinding};
pub use clip::{AnimationClip, Track, TrackData, TrackMeta, TrackTarget};
pub use entity::{AnimatedEntity, RegisterOptions};
pub use grant::{GrantBone, GrantSolver};
pub use helper::{AnimationHelper, EntityKey};
pub use ik::{IkChain, IkLink, IkSolver};
pub use mesh::{RigMetadata, SkinnedMesh};
pub use physics::{
    BodyKind, BodyTransform, JointDesc, PhysicsFactory, PhysicsRig, PhysicsSettings, PhysicsWorld, RigidBodyDesc,
    RigidBodyWorld, default_physics_factory,
};
pub use pose::Pose;
pub use settings::HelperSettings;
pub use skeleton::{Bone, Skeleton};
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
pub use values::Interpolatable;

bitflags! {
    /// Stages of the per-frame update, each toggled globally on the helper.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        const ANIMATION = 1 << 0;
        const IK        = 1 << 1;
        const GRANT     = 1 << 2;
        const PHYSICS   = 1 << 3;
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::all()
    }
}
