//! Kagura: skinned character playback with CCD IK, grant bones and
//! rigid-body write-back, driven by a single per-frame coordinator.
//!
//! This crate re-exports the workspace crates under short module names and
//! lifts the commonly used types to the root.

pub use kagura_animation as animation;
pub use kagura_app as app;
pub use kagura_assets as assets;
pub use kagura_render as render;
pub use kagura_scene as scene;

pub use kagura_core::{errors, fps_counter, id, time};
pub use kagura_core::{AnimationError, AssetError, Clock, ControlError, Error, FpsCounter, MeshId, RenderError, Result};

pub use kagura_animation::{
    AnimatedEntity, AnimationAction, AnimationClip, AnimationHelper, Bone, Features, HelperSettings, LoopMode,
    PlaybackState, Pose, RegisterOptions, Skeleton, SkinnedMesh,
};
pub use kagura_app::{ControlDescriptor, ControlEvent, ControlKind, ModelOptions, Stage, StageSettings};
pub use kagura_assets::{AssetLoader, LoadEvent, LoadedModel, ModelRequest};
pub use kagura_render::{FrameRenderer, FrameStats, HeadlessRenderer, OutlineEffect};
pub use kagura_scene::{Camera, OrbitControls, Scene, SkyField, SkyParameters};
